use crate::config::Config;
use crate::{election_dir, fail, loader};
use belenios::{verify_election, Outcome, RevotePolicy};

pub fn command_verify(matches: &clap::ArgMatches, config: &Config) {
    let dir = election_dir(matches, config);
    let record = loader::load_record("verify", &dir);

    let revote_policy = match matches.value_of("revote") {
        Some("reject") => RevotePolicy::Reject,
        _ => RevotePolicy::LastByHeight,
    };
    let verify_config = config.verify_config(revote_policy);

    let report = verify_election(&record, &verify_config).unwrap_or_else(|e| fail("verify", e));

    if matches.is_present("json") {
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| fail("verify", e));
        println!("{}", json);
    } else {
        println!("{}", report);
    }

    if report.is_success() {
        println!("> Election verified OK");
    } else {
        eprintln!(
            "belenios-tool verify: {} failed checks",
            report.count(Outcome::Failed)
        );
        std::process::exit(1);
    }
}
