use crate::config::Config;
use crate::{election_dir, expand, fail, loader};
use belenios::{Ballot, Choice, Credential, Election, Question};
use serde_json::Value;
use std::path::Path;

pub fn command_vote(matches: &clap::ArgMatches, config: &Config) {
    let dir = election_dir(matches, config);
    let election: Election = loader::read_json("vote", &Path::new(&dir).join("election.json"));

    // Unwraps are OK, both these args are required
    let seed_location = expand(matches.value_of("seed").unwrap());
    let choices = matches.value_of("CHOICES").unwrap();

    let seed = loader::read_text("vote", Path::new(&seed_location));
    let credential = Credential::derive(&election.uuid, seed.trim()).unwrap_or_else(|e| fail("vote", e));

    let choices: Value = serde_json::from_str(choices)
        .unwrap_or_else(|e| fail("vote", format!("invalid choices: {}", e)));
    let choices = parse_choices(&election, &choices).unwrap_or_else(|e| fail("vote", e));

    let mut rng = rand::thread_rng();
    let ballot = Ballot::generate(&mut rng, &election, &credential, &choices)
        .unwrap_or_else(|e| fail("vote", e));
    tracing::info!(
        tracker = %ballot.tracker().unwrap_or_default(),
        "ballot created"
    );

    let ballot = serde_json::to_string(&ballot).unwrap_or_else(|e| fail("vote", e));
    println!("{}", ballot);
}

/// Turn the command-line JSON into one `Choice` per question.
///
/// Homomorphic questions take an array of 0/1 (blank flag first), list questions an array of
/// rows and non-homomorphic questions a string.
fn parse_choices(election: &Election, value: &Value) -> Result<Vec<Choice>, String> {
    let values = value.as_array().ok_or("choices must be a JSON array")?;
    if values.len() != election.questions.len() {
        return Err(format!(
            "expected choices for {} questions, found {}",
            election.questions.len(),
            values.len()
        ));
    }

    election
        .questions
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (question, value))| {
            let invalid = |e: serde_json::Error| format!("question {}: {}", i, e);
            match question {
                Question::Homomorphic(_) => serde_json::from_value(value.clone())
                    .map(Choice::Homomorphic)
                    .map_err(invalid),
                Question::List(_) => serde_json::from_value(value.clone())
                    .map(Choice::List)
                    .map_err(invalid),
                Question::NonHomomorphic(_) => value
                    .as_str()
                    .map(|s| Choice::NonHomomorphic(s.as_bytes().to_vec()))
                    .ok_or_else(|| format!("question {}: expected a string", i)),
            }
        })
        .collect()
}
