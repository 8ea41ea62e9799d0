//! Reads an election directory into an [`ElectionRecord`].
//!
//! Layout:
//!
//! ```text
//! election.json                 Election
//! trustees.json                 [Trustee]
//! public_creds.json             ["<credential>[,<weight>]"]
//! ballots.jsonl                 one Ballot per line, in casting order
//! shuffles.jsonl                one Shuffle per line, in mixing order
//! encrypted_tally.json          EncryptedTally (optional)
//! partial_decryptions.jsonl     one PartialDecryption per line
//! result.json                   ElectionResult (optional)
//! ```
//!
//! Only the first three files are required.

use crate::fail;
use belenios::ElectionRecord;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub fn load_record(command: &str, dir: &str) -> ElectionRecord {
    let dir = Path::new(dir);
    let record = ElectionRecord {
        election: read_json(command, &dir.join("election.json")),
        trustees: read_json(command, &dir.join("trustees.json")),
        credentials: read_json(command, &dir.join("public_creds.json")),
        ballots: read_lines(command, &dir.join("ballots.jsonl")),
        shuffles: read_lines(command, &dir.join("shuffles.jsonl")),
        encrypted_tally: read_optional(command, &dir.join("encrypted_tally.json")),
        partial_decryptions: read_lines(command, &dir.join("partial_decryptions.jsonl")),
        result: read_optional(command, &dir.join("result.json")),
    };
    tracing::debug!(
        dir = %dir.display(),
        ballots = record.ballots.len(),
        shuffles = record.shuffles.len(),
        partial_decryptions = record.partial_decryptions.len(),
        "loaded election record"
    );
    record
}

pub fn read_text(command: &str, path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(command, format!("unable to read {}: {}", path.display(), e)))
}

fn parse<T: DeserializeOwned>(command: &str, path: &Path, text: &str) -> T {
    serde_json::from_str(text)
        .unwrap_or_else(|e| fail(command, format!("unable to parse {}: {}", path.display(), e)))
}

pub fn read_json<T: DeserializeOwned>(command: &str, path: &Path) -> T {
    parse(command, path, &read_text(command, path))
}

fn read_optional<T: DeserializeOwned>(command: &str, path: &Path) -> Option<T> {
    if path.exists() {
        Some(read_json(command, path))
    } else {
        None
    }
}

/// One JSON value per non-empty line; a missing file is an empty list.
fn read_lines<T: DeserializeOwned>(command: &str, path: &Path) -> Vec<T> {
    if !path.exists() {
        return Vec::new();
    }
    read_text(command, path)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse(command, path, line))
        .collect()
}

/// Require the encrypted tally, which every post-tally command needs.
pub fn require_tally<'a>(command: &str, record: &'a ElectionRecord) -> &'a belenios::EncryptedTally {
    record
        .encrypted_tally
        .as_ref()
        .unwrap_or_else(|| fail(command, "encrypted_tally.json is missing, run `tally` first"))
}
