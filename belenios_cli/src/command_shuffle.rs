use crate::config::Config;
use crate::{election_dir, fail, loader, number_arg};
use belenios::{find_owner, Shuffle};

pub fn command_shuffle(matches: &clap::ArgMatches, config: &Config) {
    let dir = election_dir(matches, config);
    let record = loader::load_record("shuffle", &dir);
    let tally = loader::require_tally("shuffle", &record);

    let owner = number_arg("shuffle", matches, "owner");
    find_owner(&record.trustees, owner).unwrap_or_else(|e| fail("shuffle", e));

    // Each shuffle mixes the output of the previous one
    let inputs = match record.shuffles.last() {
        Some(previous) => previous.ciphertexts.clone(),
        None => tally.mix_inputs(&record.election),
    };

    let mut rng = rand::thread_rng();
    let shuffle = Shuffle::generate(&mut rng, &record.election.public_key, owner, &inputs)
        .unwrap_or_else(|e| fail("shuffle", e));
    tracing::info!(owner, previous = record.shuffles.len(), "shuffled ciphertexts");

    let shuffle = serde_json::to_string(&shuffle).unwrap_or_else(|e| fail("shuffle", e));
    println!("{}", shuffle);
}
