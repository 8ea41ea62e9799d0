use crate::config::Config;
use crate::{election_dir, fail, loader};
use belenios::{check_partial_decryptions, combine_factors, ElectionResult, Report};

pub fn command_result(matches: &clap::ArgMatches, config: &Config) {
    let dir = election_dir(matches, config);
    let record = loader::load_record("result", &dir);
    let tally = loader::require_tally("result", &record);
    let election = &record.election;

    let fingerprint = election.fingerprint().unwrap_or_else(|e| fail("result", e));
    let input = tally
        .decryption_input(election, &record.shuffles)
        .unwrap_or_else(|e| fail("result", e));

    // Only partial decryptions that verify against their owner's key are combined
    let mut report = Report::new();
    let valid = check_partial_decryptions(
        &record.trustees,
        &fingerprint,
        &input,
        &record.partial_decryptions,
        !config.sequential,
        &mut report,
        "partial decryptions",
    );
    tracing::info!(
        published = record.partial_decryptions.len(),
        valid = valid.len(),
        "checked partial decryptions"
    );

    let factors = combine_factors(&record.trustees, &input, valid).unwrap_or_else(|e| fail("result", e));
    let result = ElectionResult::compute(election, &input, &factors, tally.total_weight)
        .unwrap_or_else(|e| fail("result", e));

    let result = serde_json::to_string_pretty(&result).unwrap_or_else(|e| fail("result", e));
    println!("{}", result);
}
