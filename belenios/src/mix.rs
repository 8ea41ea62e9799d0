use crate::*;
use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng};

/// One trustee's mix of the non-homomorphic answers.
///
/// Both vectors are indexed by question; homomorphic questions are `None`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Shuffle {
    pub owner: usize,
    pub ciphertexts: Vec<Option<Vec<Ciphertext>>>,
    pub proofs: Vec<Option<ShuffleProof>>,
}

/// Proof that a list of ciphertexts is a re-encrypted permutation of another.
///
/// `cc` commits to the permutation, `cc_hat` is the chain of commitments to the permuted
/// challenges. The challenge itself is not carried: the verifier rehashes `t`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShuffleProof {
    pub t: ShuffleCommitments,
    pub s: ShuffleResponses,
    pub cc: Vec<Point>,
    pub cc_hat: Vec<Point>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShuffleCommitments {
    pub t1: Point,
    pub t2: Point,
    pub t3: Point,
    pub t41: Point,
    pub t42: Point,
    pub t_hat: Vec<Point>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShuffleResponses {
    pub s1: Scalar,
    pub s2: Scalar,
    pub s3: Scalar,
    pub s4: Scalar,
    pub s_hat: Vec<Scalar>,
    pub s_prime: Vec<Scalar>,
}

impl ShuffleCommitments {
    fn points(&self) -> Vec<Point> {
        let mut points = vec![self.t1, self.t2, self.t3, self.t41, self.t42];
        points.extend_from_slice(&self.t_hat);
        points
    }
}

/// The secondary generator and `n` primary generators, checked pairwise distinct.
fn generators(n: usize) -> Result<(Point, Vec<Point>), Error> {
    let all = (0..=n)
        .map(Point::derive_generator)
        .collect::<Result<Vec<_>, _>>()?;
    check_distinct(&all)?;
    Ok((all[0], all[1..].to_vec()))
}

fn all_points(ciphertexts: &[Ciphertext]) -> impl Iterator<Item = &Point> {
    ciphertexts.iter().flat_map(|c| vec![&c.alpha, &c.beta])
}

/// Seed binding the key, both ciphertext lists and the permutation commitment.
fn challenge_seed(y: &Point, inputs: &[Ciphertext], outputs: &[Ciphertext], cc: &[Point]) -> Scalar {
    let elements: Vec<Point> = all_points(inputs)
        .chain(all_points(outputs))
        .chain(cc.iter())
        .copied()
        .collect();
    hash_to_scalar(&format!("shuffle-challenges|{}", y), &elements)
}

fn position_challenges(seed: &Scalar, n: usize) -> Vec<Scalar> {
    (0..n)
        .map(|i| hash_to_scalar(&format!("shuffle-challenges|{}|{}", seed, i), &[]))
        .collect()
}

fn shuffle_challenge(seed: &Scalar, cc_hat: &[Point], t: &ShuffleCommitments) -> Scalar {
    hash_to_scalar(
        &format!("shuffle-challenge|{}|{}", seed, join_points(cc_hat)),
        &t.points(),
    )
}

fn random_scalars<R: Rng + CryptoRng>(rng: &mut R, n: usize) -> Vec<Scalar> {
    (0..n).map(|_| Scalar::random(rng)).collect()
}

/// Permute and re-encrypt `inputs` under `y`, proving it was done correctly.
pub fn shuffle_ciphertexts<R: Rng + CryptoRng>(
    rng: &mut R,
    y: &Point,
    inputs: &[Ciphertext],
) -> Result<(Vec<Ciphertext>, ShuffleProof), Error> {
    let n = inputs.len();
    let (h, hs) = generators(n)?;

    // Output i is input psi[i], re-encrypted with rho[psi[i]].
    let mut psi: Vec<usize> = (0..n).collect();
    psi.shuffle(rng);
    let rho = random_scalars(rng, n);
    let outputs: Vec<Ciphertext> = psi.iter().map(|&j| inputs[j].reencrypt(y, &rho[j])).collect();

    let r = random_scalars(rng, n);
    let mut cc = vec![Point::identity(); n];
    for (i, &j) in psi.iter().enumerate() {
        cc[j] = Point::mul_base(&r[j]) + hs[i];
    }

    let seed = challenge_seed(y, inputs, &outputs, &cc);
    let u = position_challenges(&seed, n);
    let u_prime: Vec<Scalar> = psi.iter().map(|&j| u[j]).collect();

    let r_hat = random_scalars(rng, n);
    let mut cc_hat = Vec::with_capacity(n);
    let mut previous = h;
    for i in 0..n {
        previous = Point::mul_base(&r_hat[i]) + previous * u_prime[i];
        cc_hat.push(previous);
    }

    let w = random_scalars(rng, 4);
    let w_hat = random_scalars(rng, n);
    let w_prime = random_scalars(rng, n);
    let alphas: Vec<Point> = outputs.iter().map(|c| c.alpha).collect();
    let betas: Vec<Point> = outputs.iter().map(|c| c.beta).collect();

    let t_hat = (0..n)
        .map(|i| {
            let previous = if i == 0 { h } else { cc_hat[i - 1] };
            Point::mul_base(&w_hat[i]) + previous * w_prime[i]
        })
        .collect();
    let t = ShuffleCommitments {
        t1: Point::mul_base(&w[0]),
        t2: Point::mul_base(&w[1]),
        t3: Point::mul_base(&w[2]) + Point::multi_mul(&w_prime, &hs),
        t41: Point::multi_mul(&w_prime, &betas) - *y * w[3],
        t42: Point::multi_mul(&w_prime, &alphas) - Point::mul_base(&w[3]),
        t_hat,
    };
    let c = shuffle_challenge(&seed, &cc_hat, &t);

    // v[i] is the product of u_prime over the positions after i.
    let mut v = vec![Scalar::one(); n];
    for i in (0..n.saturating_sub(1)).rev() {
        v[i] = u_prime[i + 1] * v[i + 1];
    }
    let r_bar: Scalar = r.iter().copied().sum();
    let r_hat_sum: Scalar = r_hat.iter().zip(&v).map(|(a, b)| *a * *b).sum();
    let r_tilde: Scalar = r.iter().zip(&u).map(|(a, b)| *a * *b).sum();
    let r_prime: Scalar = rho.iter().zip(&u).map(|(a, b)| *a * *b).sum();

    let s = ShuffleResponses {
        s1: w[0] - c * r_bar,
        s2: w[1] - c * r_hat_sum,
        s3: w[2] - c * r_tilde,
        s4: w[3] - c * r_prime,
        s_hat: w_hat.iter().zip(&r_hat).map(|(w, r)| *w - c * *r).collect(),
        s_prime: w_prime.iter().zip(&u_prime).map(|(w, u)| *w - c * *u).collect(),
    };

    Ok((outputs, ShuffleProof { t, s, cc, cc_hat }))
}

/// Check a shuffle proof.
///
/// Returns `Ok(false)` when the proof does not hold and an error when the proof does not
/// have the shape implied by the number of inputs.
pub fn verify_shuffle(
    y: &Point,
    inputs: &[Ciphertext],
    outputs: &[Ciphertext],
    proof: &ShuffleProof,
) -> Result<bool, Error> {
    let n = inputs.len();
    for &(what, found) in [
        ("shuffled ciphertexts", outputs.len()),
        ("permutation commitments", proof.cc.len()),
        ("chained commitments", proof.cc_hat.len()),
        ("chain commitments", proof.t.t_hat.len()),
        ("chain responses", proof.s.s_hat.len()),
        ("permutation responses", proof.s.s_prime.len()),
    ]
    .iter()
    {
        if found != n {
            return Err(Error::WrongLength {
                what,
                expected: n,
                found,
            });
        }
    }

    let points_valid = outputs.iter().all(Ciphertext::is_valid)
        && proof.cc.iter().chain(&proof.cc_hat).all(Point::is_in_group)
        && proof.t.points().iter().all(Point::is_in_group);
    if !points_valid {
        return Ok(false);
    }

    let (h, hs) = generators(n)?;
    let seed = challenge_seed(y, inputs, outputs, &proof.cc);
    let u = position_challenges(&seed, n);
    let c = shuffle_challenge(&seed, &proof.cc_hat, &proof.t);
    let s = &proof.s;

    let u_product: Scalar = u.iter().copied().product();
    let c_bar: Point = proof.cc.iter().copied().sum::<Point>() - hs.iter().copied().sum::<Point>();
    let last = proof.cc_hat.last().copied().unwrap_or(h);
    let c_hat = last - h * u_product;
    let c_tilde = Point::multi_mul(&u, &proof.cc);
    let in_alphas: Vec<Point> = inputs.iter().map(|e| e.alpha).collect();
    let in_betas: Vec<Point> = inputs.iter().map(|e| e.beta).collect();
    let out_alphas: Vec<Point> = outputs.iter().map(|e| e.alpha).collect();
    let out_betas: Vec<Point> = outputs.iter().map(|e| e.beta).collect();
    let a_tilde = Point::multi_mul(&u, &in_betas);
    let b_tilde = Point::multi_mul(&u, &in_alphas);

    let t1 = c_bar * c + Point::mul_base(&s.s1);
    let t2 = c_hat * c + Point::mul_base(&s.s2);
    let t3 = c_tilde * c + Point::mul_base(&s.s3) + Point::multi_mul(&s.s_prime, &hs);
    let t41 = a_tilde * c - *y * s.s4 + Point::multi_mul(&s.s_prime, &out_betas);
    let t42 = b_tilde * c - Point::mul_base(&s.s4) + Point::multi_mul(&s.s_prime, &out_alphas);
    let t_hat_ok = (0..n).all(|i| {
        let previous = if i == 0 { h } else { proof.cc_hat[i - 1] };
        let t_hat = proof.cc_hat[i] * c + Point::mul_base(&s.s_hat[i]) + previous * s.s_prime[i];
        t_hat == proof.t.t_hat[i]
    });

    Ok(t1 == proof.t.t1
        && t2 == proof.t.t2
        && t3 == proof.t.t3
        && t41 == proof.t.t41
        && t42 == proof.t.t42
        && t_hat_ok)
}

impl Shuffle {
    /// Mix every non-homomorphic question of `inputs` (indexed by question).
    pub fn generate<R: Rng + CryptoRng>(
        rng: &mut R,
        y: &Point,
        owner: usize,
        inputs: &[Option<Vec<Ciphertext>>],
    ) -> Result<Self, Error> {
        let mut ciphertexts = Vec::with_capacity(inputs.len());
        let mut proofs = Vec::with_capacity(inputs.len());
        for input in inputs {
            match input {
                Some(input) => {
                    let (output, proof) = shuffle_ciphertexts(rng, y, input)?;
                    ciphertexts.push(Some(output));
                    proofs.push(Some(proof));
                }
                None => {
                    ciphertexts.push(None);
                    proofs.push(None);
                }
            }
        }
        Ok(Shuffle {
            owner,
            ciphertexts,
            proofs,
        })
    }

    /// Check every question of this shuffle against its inputs, recording into `report`.
    pub fn verify(
        &self,
        y: &Point,
        inputs: &[Option<Vec<Ciphertext>>],
        report: &mut Report,
        section: &str,
    ) -> Result<(), Error> {
        if self.ciphertexts.len() != inputs.len() || self.proofs.len() != inputs.len() {
            return Err(Error::WrongLength {
                what: "shuffled questions",
                expected: inputs.len(),
                found: self.ciphertexts.len(),
            });
        }
        for (q, ((input, output), proof)) in inputs
            .iter()
            .zip(&self.ciphertexts)
            .zip(&self.proofs)
            .enumerate()
        {
            let detail = format!("owner {} question {}", self.owner, q);
            match (input, output, proof) {
                (None, None, None) => {}
                (Some(input), Some(output), Some(proof)) => {
                    let valid = verify_shuffle(y, input, output, proof)?;
                    report.check_detail(section, "Valid shuffle proof", valid, detail);
                }
                _ => return Err(Error::QuestionMismatch(q)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn inputs(rng: &mut ChaCha20Rng, y: &Point, n: usize) -> Vec<Ciphertext> {
        (0..n)
            .map(|i| {
                let m = Point::encode_small_int(&[i as u8 + 1]).unwrap();
                Ciphertext::encrypt_point(y, &m, &Scalar::random(rng))
            })
            .collect()
    }

    #[test]
    fn shuffle_proof_verifies_and_preserves_plaintexts() {
        let mut rng = ChaCha20Rng::seed_from_u64(70);
        let x = Scalar::random(&mut rng);
        let y = Point::mul_base(&x);
        let input = inputs(&mut rng, &y, 5);

        let (output, proof) = shuffle_ciphertexts(&mut rng, &y, &input).unwrap();
        assert!(verify_shuffle(&y, &input, &output, &proof).unwrap());

        let decrypt = |c: &Ciphertext| c.decrypt_with_factor(&(c.alpha * x)).decode_small_int();
        let mut before: Vec<Vec<u8>> = input.iter().map(decrypt).collect();
        let mut after: Vec<Vec<u8>> = output.iter().map(decrypt).collect();
        assert_ne!(input, output);
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn tampered_shuffles_fail() {
        let mut rng = ChaCha20Rng::seed_from_u64(71);
        let y = Point::mul_base(&Scalar::random(&mut rng));
        let input = inputs(&mut rng, &y, 4);
        let (output, proof) = shuffle_ciphertexts(&mut rng, &y, &input).unwrap();

        // Replace one output with an unrelated encryption
        let mut forged = output.clone();
        forged[2] = Ciphertext::encrypt(&mut rng, &y, 7).0;
        assert!(!verify_shuffle(&y, &input, &forged, &proof).unwrap());

        let mut bad = proof.clone();
        bad.s.s_prime[0] = bad.s.s_prime[0] + Scalar::one();
        assert!(!verify_shuffle(&y, &input, &output, &bad).unwrap());

        let mut bad = proof.clone();
        bad.cc_hat.swap(0, 1);
        assert!(!verify_shuffle(&y, &input, &output, &bad).unwrap());

        let mut short = proof;
        short.cc.pop();
        assert!(verify_shuffle(&y, &input, &output, &short).is_err());
    }

    #[test]
    fn trivial_shuffles() {
        let mut rng = ChaCha20Rng::seed_from_u64(72);
        let y = Point::mul_base(&Scalar::random(&mut rng));
        for n in 0..2 {
            let input = inputs(&mut rng, &y, n);
            let (output, proof) = shuffle_ciphertexts(&mut rng, &y, &input).unwrap();
            assert!(verify_shuffle(&y, &input, &output, &proof).unwrap());
        }
    }

    #[test]
    fn shuffles_cover_only_non_homomorphic_questions() {
        let mut rng = ChaCha20Rng::seed_from_u64(73);
        let y = Point::mul_base(&Scalar::random(&mut rng));
        let questions = vec![None, Some(inputs(&mut rng, &y, 3))];
        let shuffle = Shuffle::generate(&mut rng, &y, 1, &questions).unwrap();
        assert!(shuffle.ciphertexts[0].is_none());

        let mut report = Report::new();
        shuffle.verify(&y, &questions, &mut report, "shuffles").unwrap();
        assert!(report.is_success());
        assert_eq!(report.count(Outcome::Passed), 1);

        // A second shuffle consumes the first one's output
        let next_inputs = shuffle.ciphertexts.clone();
        let next = Shuffle::generate(&mut rng, &y, 2, &next_inputs).unwrap();
        next.verify(&y, &next_inputs, &mut report, "shuffles").unwrap();
        assert!(report.is_success());

        let mut wrong = Report::new();
        next.verify(&y, &questions, &mut wrong, "shuffles").unwrap();
        assert!(!wrong.is_success());
    }
}
