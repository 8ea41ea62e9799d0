use crate::*;
use rand_core::{CryptoRng, RngCore};

/// One owner's decryption factors for every tally cell, with proofs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PartialDecryption {
    pub owner: usize,
    pub decryption_factors: Vec<Cells<Point>>,
    pub decryption_proofs: Vec<Cells<Proof>>,
}

fn decrypt_prefix(fingerprint: &str, public_key: &Point) -> String {
    format!("decrypt|{}|{}", fingerprint, public_key)
}

impl PartialDecryption {
    /// Compute `alpha^x` for every cell of `input`, proving it uses the same `x` as `g^x`.
    pub fn compute<R: RngCore + CryptoRng>(
        rng: &mut R,
        fingerprint: &str,
        owner: usize,
        secret: &Scalar,
        input: &[Cells<Ciphertext>],
    ) -> Self {
        let g = Point::generator();
        let prefix = decrypt_prefix(fingerprint, &Point::mul_base(secret));
        let decryption_factors = input.iter().map(|cells| cells.map(|c| c.alpha * *secret)).collect();
        let decryption_proofs = input
            .iter()
            .map(|cells| cells.map(|c| Proof::prove_dleq(rng, &prefix, &g, &c.alpha, secret)))
            .collect();
        PartialDecryption {
            owner,
            decryption_factors,
            decryption_proofs,
        }
    }

    /// Check every factor against the owner's public key.
    pub fn verify(
        &self,
        fingerprint: &str,
        public_key: &Point,
        input: &[Cells<Ciphertext>],
        report: &mut Report,
        section: &str,
    ) -> Result<(), Error> {
        if self.decryption_factors.len() != input.len() || self.decryption_proofs.len() != input.len() {
            return Err(Error::WrongLength {
                what: "decryption factors",
                expected: input.len(),
                found: self.decryption_factors.len(),
            });
        }
        let g = Point::generator();
        let prefix = decrypt_prefix(fingerprint, public_key);

        let mut valid = true;
        for ((cells, factors), proofs) in input
            .iter()
            .zip(&self.decryption_factors)
            .zip(&self.decryption_proofs)
        {
            let with_factors = cells.zip_with(factors, |c, f| (*c, *f))?;
            let checked = with_factors.zip_with(proofs, |(c, f), p| {
                f.is_in_group() && p.verify_dleq(&prefix, &g, public_key, &c.alpha, f)
            })?;
            valid &= checked.iter().all(|ok| *ok);
        }
        report.check_detail(
            section,
            "Valid partial decryption",
            valid,
            format!("owner {}", self.owner),
        );
        Ok(())
    }
}

/// Check each partial decryption against its owner's key and return those that passed.
///
/// Unknown owners and malformed partial decryptions are recorded as failed checks in `report`.
pub fn check_partial_decryptions<'a>(
    trustees: &[Trustee],
    fingerprint: &str,
    input: &[Cells<Ciphertext>],
    partials: &'a [PartialDecryption],
    parallel: bool,
    report: &mut Report,
    section: &str,
) -> Vec<&'a PartialDecryption> {
    let checked = crate::verify::map_units(partials, parallel, |partial| {
        let mut r = Report::new();
        let key = find_owner(trustees, partial.owner)
            .ok()
            .and_then(|(t, local)| trustees[t].owner_key(local));
        let key = match key {
            Some(key) => key,
            None => {
                r.check_detail(section, "Known owner", false, format!("owner {}", partial.owner));
                return r;
            }
        };
        if let Err(e) = partial.verify(fingerprint, &key, input, &mut r, section) {
            tracing::warn!(owner = partial.owner, error = %e, "malformed partial decryption");
            r.check_detail(
                section,
                "Well-formed partial decryption",
                false,
                format!("owner {}: {}", partial.owner, e),
            );
        }
        r
    });

    let mut valid = Vec::new();
    for (partial, r) in partials.iter().zip(checked) {
        if r.is_success() {
            valid.push(partial);
        }
        report.merge(r);
    }
    valid
}

/// Combine partial decryptions into the full decryption factor of every cell.
///
/// Single trustees contribute their factors as they are. For a Pedersen trustee the first
/// `threshold` distinct owners are interpolated at zero; fewer than that is fatal.
pub fn combine_factors<'a, I: IntoIterator<Item = &'a PartialDecryption>>(
    trustees: &[Trustee],
    input: &[Cells<Ciphertext>],
    partials: I,
) -> Result<Vec<Cells<Point>>, Error> {
    let mut by_trustee: Vec<Vec<(usize, &PartialDecryption)>> = vec![Vec::new(); trustees.len()];
    for partial in partials {
        let (t, local) = find_owner(trustees, partial.owner)?;
        if by_trustee[t].iter().all(|(l, _)| *l != local) {
            by_trustee[t].push((local, partial));
        }
    }

    let mut combined: Vec<Cells<Point>> = input.iter().map(|c| c.map(|_| Point::identity())).collect();
    let ranges = owner_ranges(trustees);
    for (t, (trustee, shares)) in trustees.iter().zip(&by_trustee).enumerate() {
        let weighted: Vec<(Scalar, &PartialDecryption)> = match trustee {
            Trustee::Single(_) => {
                let (_, partial) = shares
                    .first()
                    .ok_or(Error::MissingPartialDecryption(ranges[t].0))?;
                vec![(Scalar::one(), *partial)]
            }
            Trustee::Pedersen(p) => {
                if shares.len() < p.threshold {
                    return Err(Error::NotEnoughShares {
                        trustee: t,
                        need: p.threshold,
                        found: shares.len(),
                    });
                }
                let chosen = &shares[..p.threshold];
                let indexes: Vec<usize> = chosen.iter().map(|(l, _)| l + 1).collect();
                chosen
                    .iter()
                    .enumerate()
                    .map(|(pos, (_, partial))| (lagrange_coefficient(&indexes, pos), *partial))
                    .collect()
            }
        };

        for (lambda, partial) in weighted {
            if partial.decryption_factors.len() != combined.len() {
                return Err(Error::WrongLength {
                    what: "decryption factors",
                    expected: combined.len(),
                    found: partial.decryption_factors.len(),
                });
            }
            for (acc, factors) in combined.iter_mut().zip(&partial.decryption_factors) {
                *acc = acc.zip_with(factors, |a, f| *a + *f * lambda)?;
            }
        }
    }
    Ok(combined)
}
