//! Fiat-Shamir challenges and content hashes.

use crate::{Point, Scalar};
use digest::Digest;
use sha2::Sha256;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Unpadded standard base64 of the SHA-256 of `text`.
///
/// Used for election fingerprints, ballot hashes and trackers.
pub fn sha256_b64(text: &str) -> String {
    base64::encode_config(&sha256(text.as_bytes()), base64::STANDARD_NO_PAD)
}

/// The challenge function shared by every proof:
/// `SHA-256(prefix | "|" | e1 "," e2 "," ...)` read as a big-endian integer mod `L`.
pub fn hash_to_scalar(prefix: &str, elements: &[Point]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    for (i, e) in elements.iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(e.to_hex().as_bytes());
    }
    Scalar::reduce_be(&hasher.finalize())
}

/// Render a list of elements the way they appear inside proof prefixes.
pub(crate) fn join_points<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> String {
    points
        .into_iter()
        .map(Point::to_hex)
        .collect::<Vec<_>>()
        .join(",")
}
