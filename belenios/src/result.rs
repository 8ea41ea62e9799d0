use crate::*;

/// Plaintext result per question.
///
/// Homomorphic and list questions hold one count per cell. A non-homomorphic question holds
/// one row of bytes per decrypted answer, in mix-net output order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ElectionResult {
    pub result: Vec<Cells<u64>>,
}

fn check_questions(election: &Election, input: &[Cells<Ciphertext>], factors: &[Cells<Point>]) -> Result<(), Error> {
    for &(what, found) in &[("decryption input", input.len()), ("decryption factors", factors.len())] {
        if found != election.questions.len() {
            return Err(Error::WrongLength {
                what,
                expected: election.questions.len(),
                found,
            });
        }
    }
    Ok(())
}

impl ElectionResult {
    /// Recover the plaintexts from the combined decryption factors.
    ///
    /// Counts are found by a discrete-log search up to `total_weight`.
    pub fn compute(
        election: &Election,
        input: &[Cells<Ciphertext>],
        factors: &[Cells<Point>],
        total_weight: u64,
    ) -> Result<Self, Error> {
        check_questions(election, input, factors)?;
        let mut result = Vec::with_capacity(input.len());
        for ((question, cells), factors) in election.questions.iter().zip(input).zip(factors) {
            let plaintexts = cells.zip_with(factors, |c, f| c.decrypt_with_factor(f))?;
            let decrypted = if question.is_homomorphic() {
                plaintexts.try_map(|p| p.discrete_log(total_weight))?
            } else {
                Cells::Nested(
                    plaintexts
                        .iter()
                        .map(|p| p.decode_small_int().into_iter().map(u64::from).collect())
                        .collect(),
                )
            };
            result.push(decrypted);
        }
        Ok(ElectionResult { result })
    }

    /// Check each claimed value by re-encoding it, never by searching.
    pub fn verify(
        &self,
        election: &Election,
        input: &[Cells<Ciphertext>],
        factors: &[Cells<Point>],
        report: &mut Report,
        section: &str,
    ) -> Result<(), Error> {
        check_questions(election, input, factors)?;
        if self.result.len() != input.len() {
            return Err(Error::WrongLength {
                what: "results",
                expected: input.len(),
                found: self.result.len(),
            });
        }

        for (i, (((question, cells), factors), claimed)) in election
            .questions
            .iter()
            .zip(input)
            .zip(factors)
            .zip(&self.result)
            .enumerate()
        {
            let plaintexts = cells.zip_with(factors, |c, f| c.decrypt_with_factor(f))?;
            let valid = if question.is_homomorphic() {
                plaintexts
                    .zip_with(claimed, |p, r| *p == Point::from_int(*r))?
                    .iter()
                    .all(|ok| *ok)
            } else {
                let rows: Vec<Vec<u64>> = match claimed {
                    Cells::Nested(rows) => rows.clone(),
                    Cells::Flat(rows) if rows.is_empty() => vec![],
                    Cells::Flat(_) => return Err(Error::QuestionMismatch(i)),
                };
                if rows.len() != plaintexts.len() {
                    return Err(Error::WrongLength {
                        what: "non-homomorphic results",
                        expected: plaintexts.len(),
                        found: rows.len(),
                    });
                }
                plaintexts.iter().zip(&rows).all(|(p, row)| {
                    row.iter().all(|b| *b <= 0xff)
                        && Point::encode_small_int(&row.iter().map(|b| *b as u8).collect::<Vec<_>>())
                            .map(|encoded| encoded == *p)
                            .unwrap_or(false)
                })
            };
            report.check_detail(section, "Valid result", valid, format!("question {}", i));
        }
        Ok(())
    }
}
