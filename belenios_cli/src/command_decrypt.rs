use crate::config::Config;
use crate::{election_dir, expand, fail, loader, number_arg};
use belenios::{find_owner, PartialDecryption, Point, Scalar};
use std::path::Path;

pub fn command_decrypt(matches: &clap::ArgMatches, config: &Config) {
    let dir = election_dir(matches, config);
    let record = loader::load_record("decrypt", &dir);
    let tally = loader::require_tally("decrypt", &record);
    let election = &record.election;

    let owner = number_arg("decrypt", matches, "owner");
    // Unwrap is OK, secret is required
    let secret_location = expand(matches.value_of("secret").unwrap());
    let secret: Scalar = loader::read_text("decrypt", Path::new(&secret_location))
        .trim()
        .parse()
        .unwrap_or_else(|e| fail("decrypt", e));

    let (t, local) = find_owner(&record.trustees, owner).unwrap_or_else(|e| fail("decrypt", e));
    if record.trustees[t].owner_key(local) != Some(Point::mul_base(&secret)) {
        fail("decrypt", format!("secret does not match owner {}", owner));
    }

    let fingerprint = election.fingerprint().unwrap_or_else(|e| fail("decrypt", e));
    let input = tally
        .decryption_input(election, &record.shuffles)
        .unwrap_or_else(|e| fail("decrypt", e));

    let mut rng = rand::thread_rng();
    let partial = PartialDecryption::compute(&mut rng, &fingerprint, owner, &secret, &input);
    tracing::info!(owner, "computed partial decryption");

    let partial = serde_json::to_string(&partial).unwrap_or_else(|e| fail("decrypt", e));
    println!("{}", partial);
}
