use crate::*;
use rand_core::{CryptoRng, RngCore};

/// A trustee holds (a share of) the election decryption key.
///
/// A `Single` trustee owns one key outright. A `Pedersen` trustee is a group of `n`
/// participants running a `(threshold, n)` scheme: any `threshold` of them can decrypt, and the
/// group contributes the sum of the constant terms of their committed polynomials to the
/// election key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Trustee {
    Single(TrusteePublicKey),
    Pedersen(PedersenTrustee),
}

/// A public key together with a proof of knowledge of its secret.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrusteePublicKey {
    pub pok: Proof,
    pub public_key: Point,
}

fn pok_prefix(public_key: &Point) -> String {
    format!("pok|{}|{}", GROUP_NAME, public_key)
}

impl TrusteePublicKey {
    /// Generate a fresh key pair, returning the published key and the secret.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> (Self, Scalar) {
        let secret = Scalar::random(rng);
        (TrusteePublicKey::from_secret(rng, &secret), secret)
    }

    pub fn from_secret<R: RngCore + CryptoRng>(rng: &mut R, secret: &Scalar) -> Self {
        let public_key = Point::mul_base(secret);
        let pok = Proof::prove_dlog(rng, &pok_prefix(&public_key), &Point::generator(), secret);
        TrusteePublicKey { pok, public_key }
    }

    pub fn verify(&self) -> bool {
        self.public_key.is_valid()
            && self
                .pok
                .verify_dlog(&pok_prefix(&self.public_key), &Point::generator(), &self.public_key)
    }
}

/// A JSON message together with a Schnorr signature by the holder of some key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedMessage {
    pub message: String,
    pub signature: Proof,
}

fn message_prefix(message: &str) -> String {
    format!("sigmsg|{}", sha256_b64(message))
}

impl SignedMessage {
    pub fn sign<R: RngCore + CryptoRng, T: serde::Serialize>(
        rng: &mut R,
        secret: &Scalar,
        content: &T,
    ) -> Result<Self, Error> {
        let message = serde_json::to_string(content)?;
        let signature = Proof::prove_dlog(rng, &message_prefix(&message), &Point::generator(), secret);
        Ok(SignedMessage { message, signature })
    }

    pub fn verify(&self, signer: &Point) -> bool {
        signer.is_valid()
            && self
                .signature
                .verify_dlog(&message_prefix(&self.message), &Point::generator(), signer)
    }

    pub fn content<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_str(&self.message)?)
    }
}

/// Content of a participant certificate, self-signed by `verification`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CertKeys {
    pub verification: Point,
}

/// Commitments `g^{a_0}, ..., g^{a_{t-1}}` to a participant's polynomial.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CoefExps {
    pub coefexps: Vec<Point>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PedersenTrustee {
    pub threshold: usize,
    pub certs: Vec<SignedMessage>,
    pub coefexps: Vec<SignedMessage>,
    pub verification_keys: Vec<TrusteePublicKey>,
}

impl PedersenTrustee {
    /// Run the distributed key generation for `n` participants locally.
    ///
    /// Returns the public record and the secret share of each participant, in owner order.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        threshold: usize,
        n: usize,
    ) -> Result<(Self, Vec<Scalar>), Error> {
        if threshold == 0 || threshold > n {
            return Err(Error::InvalidThreshold { threshold, size: n });
        }

        let mut certs = Vec::with_capacity(n);
        let mut coefexps = Vec::with_capacity(n);
        let mut polynomials = Vec::with_capacity(n);
        for _ in 0..n {
            let signing_key = Scalar::random(rng);
            let keys = CertKeys {
                verification: Point::mul_base(&signing_key),
            };
            certs.push(SignedMessage::sign(rng, &signing_key, &keys)?);

            let coefficients: Vec<Scalar> = (0..threshold).map(|_| Scalar::random(rng)).collect();
            let commitments = CoefExps {
                coefexps: coefficients.iter().map(Point::mul_base).collect(),
            };
            coefexps.push(SignedMessage::sign(rng, &signing_key, &commitments)?);
            polynomials.push(coefficients);
        }

        // Participant j receives f_k(j) from every k and sums them.
        let shares: Vec<Scalar> = (1..=n)
            .map(|j| polynomials.iter().map(|p| evaluate(p, j)).sum())
            .collect();
        let verification_keys = shares
            .iter()
            .map(|s| TrusteePublicKey::from_secret(rng, s))
            .collect();

        let trustee = PedersenTrustee {
            threshold,
            certs,
            coefexps,
            verification_keys,
        };
        Ok((trustee, shares))
    }

    pub fn size(&self) -> usize {
        self.verification_keys.len()
    }

    /// The polynomial commitments of every participant.
    pub fn commitments(&self) -> Result<Vec<Vec<Point>>, Error> {
        self.coefexps
            .iter()
            .map(|m| m.content::<CoefExps>().map(|c| c.coefexps))
            .collect()
    }

    /// Contribution to the election public key: the sum of the constant-term commitments.
    pub fn contribution(&self) -> Result<Point, Error> {
        let commitments = self.commitments()?;
        commitments
            .iter()
            .map(|c| c.first().copied().ok_or(Error::Missing("coefficient commitment")))
            .sum()
    }

    /// Expected verification key of participant `j` (1-based) from the committed polynomials.
    fn expected_verification_key(commitments: &[Vec<Point>], j: usize) -> Point {
        let powers: Vec<Scalar> = (0..commitments.first().map(Vec::len).unwrap_or(0))
            .map(|l| Scalar::from(j as u64).pow(l as u64))
            .collect();
        commitments
            .iter()
            .map(|c| Point::multi_mul(&powers[..c.len()], c))
            .sum()
    }

    fn check(&self, report: &mut Report, section: &str) -> Result<(), Error> {
        let n = self.size();
        let shape_ok = self.threshold >= 1
            && self.threshold <= n
            && self.certs.len() == n
            && self.coefexps.len() == n;
        if !report.check(section, "Valid threshold parameters", shape_ok) {
            return Ok(());
        }

        let certs: Vec<CertKeys> = self
            .certs
            .iter()
            .map(SignedMessage::content)
            .collect::<Result<_, _>>()?;
        let certs_ok = self
            .certs
            .iter()
            .zip(&certs)
            .all(|(m, c)| m.verify(&c.verification));
        report.check(section, "Valid certificates", certs_ok);

        let commitments = self.commitments()?;
        let coefexps_ok = self
            .coefexps
            .iter()
            .zip(&certs)
            .all(|(m, c)| m.verify(&c.verification))
            && commitments
                .iter()
                .all(|c| c.len() == self.threshold && c.iter().all(Point::is_valid));
        report.check(section, "Valid polynomial commitments", coefexps_ok);

        let keys_ok = self.verification_keys.iter().all(TrusteePublicKey::verify);
        report.check(section, "Valid verification key proofs", keys_ok);

        if coefexps_ok {
            let consistent = self.verification_keys.iter().enumerate().all(|(i, vk)| {
                PedersenTrustee::expected_verification_key(&commitments, i + 1) == vk.public_key
            });
            report.check(section, "Verification keys match commitments", consistent);
        }
        Ok(())
    }
}

fn evaluate(coefficients: &[Scalar], x: usize) -> Scalar {
    let x = Scalar::from(x as u64);
    coefficients
        .iter()
        .rev()
        .fold(Scalar::zero(), |acc, c| acc * x + *c)
}

impl Trustee {
    /// Number of decryption owners this trustee accounts for.
    pub fn owner_count(&self) -> usize {
        match self {
            Trustee::Single(_) => 1,
            Trustee::Pedersen(p) => p.size(),
        }
    }

    pub fn contribution(&self) -> Result<Point, Error> {
        match self {
            Trustee::Single(k) => Ok(k.public_key),
            Trustee::Pedersen(p) => p.contribution(),
        }
    }

    /// Public key used to check partial decryptions of the `local`-th owner (0-based).
    pub fn owner_key(&self, local: usize) -> Option<Point> {
        match self {
            Trustee::Single(k) if local == 0 => Some(k.public_key),
            Trustee::Single(_) => None,
            Trustee::Pedersen(p) => p.verification_keys.get(local).map(|k| k.public_key),
        }
    }

    /// Record the checks on this trustee's published keys.
    pub fn check(&self, report: &mut Report, section: &str) -> Result<(), Error> {
        match self {
            Trustee::Single(k) => {
                report.check(section, "Valid proof of knowledge", k.verify());
                Ok(())
            }
            Trustee::Pedersen(p) => p.check(report, section),
        }
    }
}

/// The election public key implied by the trustees.
pub fn combine_public_key(trustees: &[Trustee]) -> Result<Point, Error> {
    trustees.iter().map(Trustee::contribution).sum()
}

/// Owner indexes (1-based, global) assigned to each trustee, as `(first, count)`.
pub fn owner_ranges(trustees: &[Trustee]) -> Vec<(usize, usize)> {
    let mut next = 1;
    trustees
        .iter()
        .map(|t| {
            let range = (next, t.owner_count());
            next += t.owner_count();
            range
        })
        .collect()
}

/// Locate the trustee and local position of a global owner index.
pub fn find_owner(trustees: &[Trustee], owner: usize) -> Result<(usize, usize), Error> {
    owner_ranges(trustees)
        .into_iter()
        .enumerate()
        .find(|(_, (first, count))| owner >= *first && owner < first + count)
        .map(|(t, (first, _))| (t, owner - first))
        .ok_or(Error::UnknownOwner(owner))
}
