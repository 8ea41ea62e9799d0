use crate::*;
use indexmap::IndexMap;

/// Per-question aggregate of the accepted ballots.
///
/// Homomorphic and list questions hold the weighted sum of every accepted answer. Non-homomorphic
/// questions hold the accepted ciphertexts themselves, in acceptance order, for the mix-net.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EncryptedTally {
    pub num_tallied: usize,
    pub total_weight: u64,
    pub encrypted_tally: Vec<Cells<Ciphertext>>,
}

/// Keep the last ballot cast with each credential.
///
/// The result is ordered by the first appearance of each credential.
pub fn latest_per_credential<'a, I: IntoIterator<Item = &'a Ballot>>(ballots: I) -> Vec<&'a Ballot> {
    let mut latest: IndexMap<String, &Ballot> = IndexMap::new();
    for ballot in ballots {
        latest.insert(ballot.credential.to_hex(), ballot);
    }
    latest.into_iter().map(|(_, b)| b).collect()
}

impl EncryptedTally {
    /// Aggregate `ballots`, superseding earlier ballots by later ones with the same credential.
    pub fn compute<'a, I: IntoIterator<Item = &'a Ballot>>(
        election: &Election,
        roll: &Roll,
        ballots: I,
    ) -> Result<Self, Error> {
        let accepted = latest_per_credential(ballots);

        let mut encrypted_tally: Vec<Cells<Ciphertext>> = election
            .questions
            .iter()
            .map(|q| q.cells(Ciphertext::zero()))
            .collect();
        let mut total_weight = 0u64;

        for ballot in &accepted {
            let weight = roll
                .weight(&ballot.credential)
                .ok_or_else(|| Error::InvalidCredential(ballot.credential.to_hex()))?;
            if ballot.answers.len() != election.questions.len() {
                return Err(Error::WrongLength {
                    what: "answers",
                    expected: election.questions.len(),
                    found: ballot.answers.len(),
                });
            }
            total_weight = total_weight.checked_add(weight).ok_or(Error::WeightOverflow)?;
            let scale = Scalar::from(weight);

            for (i, (question, answer)) in election.questions.iter().zip(&ballot.answers).enumerate() {
                match (question, answer, &mut encrypted_tally[i]) {
                    (Question::NonHomomorphic(_), Answer::NonHomomorphic(a), Cells::Flat(cells)) => {
                        cells.push(a.choices)
                    }
                    (Question::Homomorphic(_), Answer::Homomorphic(_), cells)
                    | (Question::List(_), Answer::List(_), cells) => {
                        *cells = cells.zip_with(&answer.cells(), |sum, c| *sum + c.scale(&scale))?;
                    }
                    _ => return Err(Error::QuestionMismatch(i)),
                }
            }
        }

        tracing::info!(
            num_tallied = accepted.len(),
            total_weight,
            "computed encrypted tally"
        );
        Ok(EncryptedTally {
            num_tallied: accepted.len(),
            total_weight,
            encrypted_tally,
        })
    }

    /// Compare a published tally against one recomputed from the ballots.
    pub fn check(&self, expected: &EncryptedTally, report: &mut Report, section: &str) {
        report.check_detail(
            section,
            "Matching number of ballots",
            self.num_tallied == expected.num_tallied,
            format!("{} published, {} recomputed", self.num_tallied, expected.num_tallied),
        );
        report.check(
            section,
            "Matching total weight",
            self.total_weight == expected.total_weight,
        );
        report.check(
            section,
            "Matching encrypted tally",
            self.encrypted_tally == expected.encrypted_tally,
        );
    }

    /// Non-homomorphic ciphertexts by question, the input of the first shuffle.
    pub fn mix_inputs(&self, election: &Election) -> Vec<Option<Vec<Ciphertext>>> {
        election
            .questions
            .iter()
            .zip(&self.encrypted_tally)
            .map(|(q, cells)| match (q, cells) {
                (Question::NonHomomorphic(_), Cells::Flat(c)) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    /// The ciphertexts the trustees decrypt: the tally, with every non-homomorphic question
    /// replaced by the output of the last shuffle.
    ///
    /// Non-homomorphic ciphertexts are never decrypted in casting order, so an election with such
    /// a question needs at least one shuffle.
    pub fn decryption_input(
        &self,
        election: &Election,
        shuffles: &[Shuffle],
    ) -> Result<Vec<Cells<Ciphertext>>, Error> {
        if self.encrypted_tally.len() != election.questions.len() {
            return Err(Error::WrongLength {
                what: "tally questions",
                expected: election.questions.len(),
                found: self.encrypted_tally.len(),
            });
        }
        let mut input = self.encrypted_tally.clone();
        for (i, question) in election.questions.iter().enumerate() {
            if question.is_homomorphic() {
                continue;
            }
            let last = shuffles.last().ok_or(Error::NotShuffled(i))?;
            let mixed = last
                .ciphertexts
                .get(i)
                .cloned()
                .flatten()
                .ok_or(Error::QuestionMismatch(i))?;
            input[i] = Cells::Flat(mixed);
        }
        Ok(input)
    }
}
