use crate::{expand, fail, number_arg};
use belenios::{Credential, CredentialEntry};
use std::fs::File;
use std::io::prelude::*;

pub fn command_credgen(matches: &clap::ArgMatches) {
    // Unwraps are OK, these args are required or defaulted
    let uuid = matches.value_of("uuid").unwrap();
    let private_location = expand(matches.value_of("private").unwrap());
    let count = number_arg("credgen", matches, "count");
    let weight = number_arg("credgen", matches, "weight") as u64;
    if weight == 0 {
        fail("credgen", "weight must be positive");
    }

    let mut rng = rand::thread_rng();
    let mut seeds = String::new();
    let mut roll = Vec::with_capacity(count);
    for _ in 0..count {
        let seed = Credential::generate_seed(&mut rng);
        let credential = Credential::derive(uuid, &seed).unwrap_or_else(|e| fail("credgen", e));
        seeds.push_str(&seed);
        seeds.push('\n');
        roll.push(CredentialEntry {
            credential: credential.public,
            weight,
        });
    }

    let mut file = File::create(&private_location).unwrap_or_else(|e| {
        fail(
            "credgen",
            format!("cannot create file {}: {}", private_location, e),
        )
    });
    file.write_all(seeds.as_bytes()).unwrap_or_else(|e| {
        fail(
            "credgen",
            format!("unable to write seeds to {}: {}", private_location, e),
        )
    });
    tracing::info!(count, uuid, "generated credentials");

    let roll = serde_json::to_string_pretty(&roll).unwrap_or_else(|e| fail("credgen", e));
    println!("{}", roll);
}
