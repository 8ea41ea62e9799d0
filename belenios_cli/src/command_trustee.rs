use crate::{expand, fail, number_arg};
use belenios::{PedersenTrustee, Scalar, Trustee, TrusteePublicKey};
use std::fs::File;
use std::io::prelude::*;

pub fn command_trustee_keygen(matches: &clap::ArgMatches) {
    // Unwrap is OK, secret is required
    let secret_location = expand(matches.value_of("secret").unwrap());
    let mut rng = rand::thread_rng();

    let trustee = if matches.is_present("threshold") {
        let threshold = number_arg("trustee-keygen", matches, "threshold");
        let count = number_arg("trustee-keygen", matches, "count");
        let (trustee, shares) = PedersenTrustee::generate(&mut rng, threshold, count)
            .unwrap_or_else(|e| fail("trustee-keygen", e));
        for (i, share) in shares.iter().enumerate() {
            write_secret(&format!("{}-{}", secret_location, i + 1), share);
        }
        tracing::info!(threshold, count, "generated threshold trustee");
        Trustee::Pedersen(trustee)
    } else {
        let (key, secret) = TrusteePublicKey::generate(&mut rng);
        write_secret(&secret_location, &secret);
        tracing::info!(public_key = %key.public_key, "generated trustee key");
        Trustee::Single(key)
    };

    let trustee = serde_json::to_string_pretty(&trustee).unwrap_or_else(|e| fail("trustee-keygen", e));
    println!("{}", trustee);
}

fn write_secret(location: &str, secret: &Scalar) {
    let mut file = File::create(location).unwrap_or_else(|e| {
        fail(
            "trustee-keygen",
            format!("cannot create file {}: {}", location, e),
        )
    });

    file.write_all(secret.to_string().as_bytes())
        .unwrap_or_else(|e| {
            fail(
                "trustee-keygen",
                format!("unable to write secret to {}: {}", location, e),
            )
        });
}
