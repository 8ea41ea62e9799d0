//! Sigma-protocol proofs made non-interactive with Fiat-Shamir.
//!
//! Every proof is checked by recomputing its commitments from `(challenge, response)` and
//! hashing them under the same prefix as the prover. A proof is therefore only meaningful
//! relative to that prefix, which carries the domain tag and the surrounding context.

use crate::{hash_to_scalar, Ciphertext, Error, Point, Scalar};
use rand_core::{CryptoRng, RngCore};

/// A Schnorr transcript.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proof {
    pub challenge: Scalar,
    pub response: Scalar,
}

impl Proof {
    /// Prove knowledge of `x` such that `y = base^x`.
    pub fn prove_dlog<R: RngCore + CryptoRng>(
        rng: &mut R,
        prefix: &str,
        base: &Point,
        x: &Scalar,
    ) -> Proof {
        let w = Scalar::random(rng);
        let commitment = *base * w;
        let challenge = hash_to_scalar(prefix, &[commitment]);
        Proof {
            challenge,
            response: w - *x * challenge,
        }
    }

    pub fn verify_dlog(&self, prefix: &str, base: &Point, y: &Point) -> bool {
        let commitment = *base * self.response + *y * self.challenge;
        hash_to_scalar(prefix, &[commitment]) == self.challenge
    }

    /// Prove `log_{g1} y1 = log_{g2} y2 = x` (Chaum-Pedersen).
    pub fn prove_dleq<R: RngCore + CryptoRng>(
        rng: &mut R,
        prefix: &str,
        g1: &Point,
        g2: &Point,
        x: &Scalar,
    ) -> Proof {
        let w = Scalar::random(rng);
        let a = *g1 * w;
        let b = *g2 * w;
        let challenge = hash_to_scalar(prefix, &[a, b]);
        Proof {
            challenge,
            response: w - *x * challenge,
        }
    }

    pub fn verify_dleq(&self, prefix: &str, g1: &Point, y1: &Point, g2: &Point, y2: &Point) -> bool {
        let a = *g1 * self.response + *y1 * self.challenge;
        let b = *g2 * self.response + *y2 * self.challenge;
        hash_to_scalar(prefix, &[a, b]) == self.challenge
    }
}

/// One alternative of a disjunctive proof: "`ciphertext` encrypts `g^plaintext`".
#[derive(Clone, Copy, Debug)]
pub struct Branch {
    pub ciphertext: Ciphertext,
    pub plaintext: u64,
}

impl Branch {
    pub fn new(ciphertext: Ciphertext, plaintext: u64) -> Self {
        Branch {
            ciphertext,
            plaintext,
        }
    }

    /// Commitments implied by the relation for a given transcript.
    fn commitments(&self, y: &Point, proof: &Proof) -> [Point; 2] {
        let Ciphertext { alpha, beta } = self.ciphertext;
        let shifted = beta - Point::from_int(self.plaintext);
        [
            Point::mul_base(&proof.response) + alpha * proof.challenge,
            *y * proof.response + shifted * proof.challenge,
        ]
    }
}

/// Prove that one of `branches` holds without revealing which.
///
/// `real` is the index of the true branch and `r` the randomness of its ciphertext. The
/// returned proofs are in branch order. `prefix` must already contain the ciphertexts.
pub fn prove_disjunction<R: RngCore + CryptoRng>(
    rng: &mut R,
    prefix: &str,
    y: &Point,
    branches: &[Branch],
    real: usize,
    r: &Scalar,
) -> Result<Vec<Proof>, Error> {
    if real >= branches.len() {
        return Err(Error::InvalidPlaintext(format!(
            "true branch {} out of {}",
            real,
            branches.len()
        )));
    }

    let w = Scalar::random(rng);
    let mut proofs = Vec::with_capacity(branches.len());
    let mut commitments = Vec::with_capacity(2 * branches.len());
    for (i, branch) in branches.iter().enumerate() {
        if i == real {
            proofs.push(Proof {
                challenge: Scalar::zero(),
                response: Scalar::zero(),
            });
            commitments.push(Point::mul_base(&w));
            commitments.push(*y * w);
        } else {
            let simulated = Proof {
                challenge: Scalar::random(rng),
                response: Scalar::random(rng),
            };
            commitments.extend_from_slice(&branch.commitments(y, &simulated));
            proofs.push(simulated);
        }
    }

    let h = hash_to_scalar(prefix, &commitments);
    let others: Scalar = proofs.iter().map(|p| p.challenge).sum();
    let challenge = h - others;
    proofs[real] = Proof {
        challenge,
        response: w - *r * challenge,
    };
    Ok(proofs)
}

pub fn verify_disjunction(prefix: &str, y: &Point, branches: &[Branch], proofs: &[Proof]) -> bool {
    if branches.is_empty() || proofs.len() != branches.len() {
        return false;
    }
    let commitments: Vec<Point> = branches
        .iter()
        .zip(proofs)
        .flat_map(|(b, p)| b.commitments(y, p).to_vec())
        .collect();
    let total: Scalar = proofs.iter().map(|p| p.challenge).sum();
    hash_to_scalar(prefix, &commitments) == total
}

fn interval_prefix(prefix: &str, ciphertext: &Ciphertext) -> String {
    format!("{}|{},{}", prefix, ciphertext.alpha, ciphertext.beta)
}

/// Prove that `ciphertext` encrypts `m ∈ [min, max]`.
pub fn prove_interval<R: RngCore + CryptoRng>(
    rng: &mut R,
    prefix: &str,
    y: &Point,
    ciphertext: &Ciphertext,
    r: &Scalar,
    m: u64,
    min: u64,
    max: u64,
) -> Result<Vec<Proof>, Error> {
    if m < min || m > max {
        return Err(Error::InvalidPlaintext(format!(
            "{} is outside [{}, {}]",
            m, min, max
        )));
    }
    let branches: Vec<Branch> = (min..=max).map(|i| Branch::new(*ciphertext, i)).collect();
    prove_disjunction(
        rng,
        &interval_prefix(prefix, ciphertext),
        y,
        &branches,
        (m - min) as usize,
        r,
    )
}

pub fn verify_interval(
    prefix: &str,
    y: &Point,
    proofs: &[Proof],
    ciphertext: &Ciphertext,
    min: u64,
    max: u64,
) -> bool {
    if min > max || proofs.len() as u64 != max - min + 1 {
        return false;
    }
    let branches: Vec<Branch> = (min..=max).map(|i| Branch::new(*ciphertext, i)).collect();
    verify_disjunction(&interval_prefix(prefix, ciphertext), y, &branches, proofs)
}

/// Proof that a ciphertext does not encrypt zero.
///
/// For `(alpha, beta) = (g^r, y^r g^m)` with `m ≠ 0`, the prover shows knowledge of
/// `(u, v) = (1/m, -r/m)` with `g = beta^u y^v` and `1 = alpha^u g^v`. An encryption of zero
/// cannot satisfy both equations.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonZeroProof {
    pub challenge: Scalar,
    pub response: [Scalar; 2],
}

impl NonZeroProof {
    pub fn prove<R: RngCore + CryptoRng>(
        rng: &mut R,
        prefix: &str,
        y: &Point,
        ciphertext: &Ciphertext,
        r: &Scalar,
        m: u64,
    ) -> Result<Self, Error> {
        if m == 0 {
            return Err(Error::InvalidPlaintext("zero has no non-zero proof".into()));
        }
        let u = Scalar::from(m).invert();
        let v = -(*r * u);
        let w = [Scalar::random(rng), Scalar::random(rng)];
        let t1 = ciphertext.beta * w[0] + *y * w[1];
        let t2 = ciphertext.alpha * w[0] + Point::mul_base(&w[1]);
        let challenge = hash_to_scalar(&interval_prefix(prefix, ciphertext), &[t1, t2]);
        Ok(NonZeroProof {
            challenge,
            response: [w[0] - challenge * u, w[1] - challenge * v],
        })
    }

    pub fn verify(&self, prefix: &str, y: &Point, ciphertext: &Ciphertext) -> bool {
        let [s1, s2] = self.response;
        let t1 = ciphertext.beta * s1 + *y * s2 + Point::mul_base(&self.challenge);
        let t2 = ciphertext.alpha * s1 + Point::mul_base(&s2);
        hash_to_scalar(&interval_prefix(prefix, ciphertext), &[t1, t2]) == self.challenge
    }
}
