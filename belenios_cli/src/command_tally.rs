use crate::config::Config;
use crate::{election_dir, fail, loader};
use belenios::{EncryptedTally, Roll};

pub fn command_tally(matches: &clap::ArgMatches, config: &Config) {
    let dir = election_dir(matches, config);
    let record = loader::load_record("tally", &dir);
    let election = &record.election;
    let fingerprint = election.fingerprint().unwrap_or_else(|e| fail("tally", e));
    let roll = Roll::new(&record.credentials);

    // Invalid ballots are left out, the verifier reports them
    let mut valid = Vec::with_capacity(record.ballots.len());
    for ballot in &record.ballots {
        match ballot.verify(election, &fingerprint, &roll) {
            Ok(report) if report.is_success() => valid.push(ballot),
            Ok(_) => tracing::warn!(tracker = %ballot.tracker().unwrap_or_default(), "skipping invalid ballot"),
            Err(e) => tracing::warn!(error = %e, "skipping malformed ballot"),
        }
    }

    let tally = EncryptedTally::compute(election, &roll, valid).unwrap_or_else(|e| fail("tally", e));
    let tally = serde_json::to_string_pretty(&tally).unwrap_or_else(|e| fail("tally", e));
    println!("{}", tally);
}
