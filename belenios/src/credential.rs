use crate::{Error, Point, Scalar};
use hkdf::Hkdf;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Number of characters in a generated credential seed.
pub const SEED_LENGTH: usize = 15;

/// A voter credential: the private signing scalar and its public group element.
///
/// Both halves are a pure function of the election uuid and the voter's secret seed, so the
/// voter only needs to keep the seed.
#[derive(Clone)]
pub struct Credential {
    pub private: Scalar,
    pub public: Point,
}

impl Credential {
    /// Derive the credential for `seed` in the election `uuid`.
    pub fn derive(uuid: &str, seed: &str) -> Result<Self, Error> {
        if seed.is_empty() || !seed.bytes().all(|b| BASE58_ALPHABET.contains(&b)) {
            return Err(Error::InvalidCredential(seed.to_owned()));
        }

        let h = Hkdf::<Sha256>::new(Some(uuid.as_bytes()), seed.as_bytes());
        let mut okm = [0u8; 64];
        h.expand(b"belenios credential", &mut okm)
            .map_err(|_| Error::KeyDerivation)?;

        let private = Scalar::reduce_wide(&okm);
        Ok(Credential {
            private,
            public: Point::mul_base(&private),
        })
    }

    /// Generate a fresh random seed.
    pub fn generate_seed<R: Rng>(rng: &mut R) -> String {
        (0..SEED_LENGTH)
            .map(|_| BASE58_ALPHABET[rng.gen_range(0, BASE58_ALPHABET.len())] as char)
            .collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Credential({})", self.public)
    }
}

/// One line of the public credential roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialEntry {
    pub credential: Point,
    pub weight: u64,
}

impl FromStr for CredentialEntry {
    type Err = Error;

    /// Accepts `<credential>` or `<credential>,<weight>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ',');
        let credential = parts.next().unwrap_or_default().parse()?;
        let weight = match parts.next() {
            Some(w) => w
                .parse()
                .map_err(|_| Error::InvalidCredential(s.to_owned()))?,
            None => 1,
        };
        Ok(CredentialEntry { credential, weight })
    }
}

impl fmt::Display for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.weight == 1 {
            write!(f, "{}", self.credential)
        } else {
            write!(f, "{},{}", self.credential, self.weight)
        }
    }
}

impl Serialize for CredentialEntry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CredentialEntry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The published credential roll, indexed by credential.
#[derive(Clone, Debug, Default)]
pub struct Roll {
    weights: HashMap<String, u64>,
}

impl Roll {
    pub fn new(entries: &[CredentialEntry]) -> Self {
        Roll {
            weights: entries
                .iter()
                .map(|e| (e.credential.to_hex(), e.weight))
                .collect(),
        }
    }

    /// Weight of `credential`, or `None` if it is not on the roll.
    pub fn weight(&self, credential: &Point) -> Option<u64> {
        self.weights.get(&credential.to_hex()).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn derivation_is_deterministic_and_election_bound() {
        let a = Credential::derive("uuid-1", "abcDEF123456789").unwrap();
        let b = Credential::derive("uuid-1", "abcDEF123456789").unwrap();
        let c = Credential::derive("uuid-2", "abcDEF123456789").unwrap();
        assert_eq!(a.public, b.public);
        assert_ne!(a.public, c.public);
        assert_eq!(Point::mul_base(&a.private), a.public);
        assert!(a.public.is_valid());
    }

    #[test]
    fn rejects_bad_seed() {
        assert!(Credential::derive("uuid", "").is_err());
        // 0, O, I and l are not in the alphabet
        assert!(Credential::derive("uuid", "0OIl").is_err());
    }

    #[test]
    fn generated_seeds_derive() {
        let mut rng = ChaCha20Rng::seed_from_u64(40);
        let seed = Credential::generate_seed(&mut rng);
        assert_eq!(seed.len(), SEED_LENGTH);
        Credential::derive("uuid", &seed).unwrap();
    }

    #[test]
    fn roll_entries() {
        let cred = Point::from_int(5);
        let plain: CredentialEntry = cred.to_hex().parse().unwrap();
        assert_eq!(plain.weight, 1);
        let weighted: CredentialEntry = format!("{},3", cred).parse().unwrap();
        assert_eq!(weighted.weight, 3);
        assert_eq!(weighted.to_string(), format!("{},3", cred));
        assert!(format!("{},x", cred).parse::<CredentialEntry>().is_err());
        let json = serde_json::to_string(&vec![plain, weighted]).unwrap();
        let back: Vec<CredentialEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![plain, weighted]);

        let roll = Roll::new(&[weighted]);
        assert_eq!(roll.weight(&cred), Some(3));
        assert_eq!(roll.weight(&Point::from_int(6)), None);
    }
}
