use crate::*;
use rand_core::{CryptoRng, RngCore};

/// A signed, encrypted ballot.
///
/// Field order is part of the format: the content hash is computed over the serialized text
/// of the ballot without its `signature`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Ballot {
    pub election_uuid: String,
    pub election_hash: String,
    pub credential: Point,
    pub answers: Vec<Answer>,
    pub signature: Signature,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub hash: String,
    pub proof: Proof,
}

/// The signed part of a ballot.
#[derive(Serialize)]
struct BallotContent<'a> {
    election_uuid: &'a str,
    election_hash: &'a str,
    credential: &'a Point,
    answers: &'a [Answer],
}

/// An encrypted answer. The variant is decided by the JSON shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Answer {
    NonHomomorphic(NonHomomorphicAnswer),
    List(ListAnswer),
    Homomorphic(HomomorphicAnswer),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HomomorphicAnswer {
    pub choices: Vec<Ciphertext>,
    pub individual_proofs: Vec<Vec<Proof>>,
    pub overall_proof: Vec<Proof>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_proof: Option<Vec<Proof>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ListAnswer {
    pub choices: Vec<Vec<Ciphertext>>,
    pub individual_proofs: Vec<Vec<Vec<Proof>>>,
    pub overall_proof: Vec<Proof>,
    pub list_proofs: Vec<Vec<Proof>>,
    pub nonzero_proof: NonZeroProof,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NonHomomorphicAnswer {
    pub choices: Ciphertext,
    pub proof: Proof,
}

/// Plaintext choices for one question, used to build a ballot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Choice {
    /// One 0/1 value per answer, preceded by the blank flag when the question allows blank.
    Homomorphic(Vec<u64>),
    /// One 0/1 row per list, the list selector first.
    List(Vec<Vec<u64>>),
    NonHomomorphic(Vec<u8>),
}

fn join_ciphertexts<'a, I: IntoIterator<Item = &'a Ciphertext>>(ciphertexts: I) -> String {
    join_points(
        ciphertexts
            .into_iter()
            .flat_map(|c| vec![&c.alpha, &c.beta]),
    )
}

fn proof_context(fingerprint: &str, credential: &Point) -> String {
    format!("{}|{}", fingerprint, credential)
}

fn raw_prefix(context: &str, ciphertext: &Ciphertext) -> String {
    format!("raweg|{}|{},{}", context, ciphertext.alpha, ciphertext.beta)
}

fn bad_plaintext(question: usize, why: &str) -> Error {
    Error::InvalidPlaintext(format!("question {}: {}", question, why))
}

fn zero_one(values: &[u64], question: usize) -> Result<(), Error> {
    if values.iter().all(|v| *v <= 1) {
        Ok(())
    } else {
        Err(bad_plaintext(question, "choices must be 0 or 1"))
    }
}

/// Encrypt each value and prove it is 0 or 1.
fn encrypt_bits<R: RngCore + CryptoRng>(
    rng: &mut R,
    y: &Point,
    context: &str,
    values: &[u64],
) -> Result<(Vec<Ciphertext>, Vec<Scalar>, Vec<Vec<Proof>>), Error> {
    let prefix = format!("prove|{}", context);
    let mut choices = Vec::with_capacity(values.len());
    let mut randomness = Vec::with_capacity(values.len());
    let mut proofs = Vec::with_capacity(values.len());
    for m in values {
        let (c, r) = Ciphertext::encrypt(rng, y, *m);
        proofs.push(prove_interval(rng, &prefix, y, &c, &r, *m, 0, 1)?);
        choices.push(c);
        randomness.push(r);
    }
    Ok((choices, randomness, proofs))
}

impl HomomorphicAnswer {
    fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        y: &Point,
        context: &str,
        question: &HomomorphicQuestion,
        index: usize,
        values: &[u64],
    ) -> Result<Self, Error> {
        let expected = question.answers.len() + question.blank as usize;
        if values.len() != expected {
            return Err(Error::WrongLength {
                what: "choices",
                expected,
                found: values.len(),
            });
        }
        zero_one(values, index)?;

        let (choices, randomness, individual_proofs) = encrypt_bits(rng, y, context, values)?;
        let joined = join_ciphertexts(&choices);

        if !question.blank {
            let sum: Ciphertext = choices.iter().sum();
            let r: Scalar = randomness.iter().copied().sum();
            let total: u64 = values.iter().sum();
            let overall_proof = prove_interval(
                rng,
                &format!("prove|{}|{}", context, joined),
                y,
                &sum,
                &r,
                total,
                question.min,
                question.max,
            )?;
            return Ok(HomomorphicAnswer {
                choices,
                individual_proofs,
                overall_proof,
                blank_proof: None,
            });
        }

        let is_blank = values[0] == 1;
        let total: u64 = values[1..].iter().sum();
        if is_blank && total != 0 {
            return Err(bad_plaintext(index, "a blank vote selects nothing else"));
        }
        if !is_blank && (total < question.min || total > question.max) {
            return Err(bad_plaintext(index, "number of selections out of range"));
        }

        let sum: Ciphertext = choices[1..].iter().sum();
        let r_sum: Scalar = randomness[1..].iter().copied().sum();
        let r_blank = randomness[0];

        let zero_branches = [Branch::new(choices[0], 0), Branch::new(sum, 0)];
        let (real, r) = if is_blank { (1, &r_sum) } else { (0, &r_blank) };
        let blank_proof = prove_disjunction(
            rng,
            &format!("bproof0|{}|{}", context, joined),
            y,
            &zero_branches,
            real,
            r,
        )?;

        let overall_branches = blank_overall_branches(&choices[0], &sum, question);
        let (real, r) = if is_blank {
            (0, &r_blank)
        } else {
            (1 + (total - question.min) as usize, &r_sum)
        };
        let overall_proof = prove_disjunction(
            rng,
            &format!("bproof1|{}|{}", context, joined),
            y,
            &overall_branches,
            real,
            r,
        )?;

        Ok(HomomorphicAnswer {
            choices,
            individual_proofs,
            overall_proof,
            blank_proof: Some(blank_proof),
        })
    }

    fn verify(
        &self,
        y: &Point,
        context: &str,
        question: &HomomorphicQuestion,
        index: usize,
        report: &mut Report,
        section: &str,
    ) -> Result<(), Error> {
        let expected = question.answers.len() + question.blank as usize;
        check_length("choices", expected, self.choices.len())?;
        check_length("individual proofs", expected, self.individual_proofs.len())?;
        if question.blank != self.blank_proof.is_some() {
            return Err(Error::QuestionMismatch(index));
        }
        let detail = || format!("question {}", index);

        let valid = self.choices.iter().all(Ciphertext::is_valid);
        report.check_detail(section, "Valid ciphertexts", valid, detail());

        let prefix = format!("prove|{}", context);
        let individual = self
            .choices
            .iter()
            .zip(&self.individual_proofs)
            .all(|(c, p)| verify_interval(&prefix, y, p, c, 0, 1));
        report.check_detail(section, "Valid individual proofs", individual, detail());

        let joined = join_ciphertexts(&self.choices);
        match &self.blank_proof {
            None => {
                let sum: Ciphertext = self.choices.iter().sum();
                let overall = verify_interval(
                    &format!("prove|{}|{}", context, joined),
                    y,
                    &self.overall_proof,
                    &sum,
                    question.min,
                    question.max,
                );
                report.check_detail(section, "Valid overall proof", overall, detail());
            }
            Some(blank_proof) => {
                let sum: Ciphertext = self.choices[1..].iter().sum();
                let zero_branches = [Branch::new(self.choices[0], 0), Branch::new(sum, 0)];
                let blank = verify_disjunction(
                    &format!("bproof0|{}|{}", context, joined),
                    y,
                    &zero_branches,
                    blank_proof,
                );
                report.check_detail(section, "Valid blank proof", blank, detail());

                let overall_branches = blank_overall_branches(&self.choices[0], &sum, question);
                let overall = verify_disjunction(
                    &format!("bproof1|{}|{}", context, joined),
                    y,
                    &overall_branches,
                    &self.overall_proof,
                );
                report.check_detail(section, "Valid overall proof", overall, detail());
            }
        }
        Ok(())
    }
}

/// "Blank was chosen" or "the other choices sum to a value in `[min, max]`".
fn blank_overall_branches(
    blank: &Ciphertext,
    sum: &Ciphertext,
    question: &HomomorphicQuestion,
) -> Vec<Branch> {
    std::iter::once(Branch::new(*blank, 1))
        .chain((question.min..=question.max).map(|m| Branch::new(*sum, m)))
        .collect()
}

fn check_length(what: &'static str, expected: usize, found: usize) -> Result<(), Error> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::WrongLength {
            what,
            expected,
            found,
        })
    }
}

/// Split a list into its selector and the sum of its candidates.
fn split_list(row: &[Ciphertext]) -> Result<(Ciphertext, Ciphertext), Error> {
    let (selector, candidates) = row.split_first().ok_or(Error::Missing("list selector"))?;
    Ok((*selector, candidates.iter().sum()))
}

impl ListAnswer {
    fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        y: &Point,
        context: &str,
        question: &ListQuestion,
        index: usize,
        values: &[Vec<u64>],
    ) -> Result<Self, Error> {
        check_length("lists", question.lists.len(), values.len())?;
        for (list, row) in question.lists.iter().zip(values) {
            check_length("list choices", list.len(), row.len())?;
            if row.is_empty() {
                return Err(Error::Missing("list selector"));
            }
            zero_one(row, index)?;
            if row[0] == 0 && row[1..].iter().any(|v| *v != 0) {
                return Err(bad_plaintext(index, "candidates chosen outside the selected list"));
            }
        }
        let selected: u64 = values.iter().map(|row| row[0]).sum();
        let total: u64 = values.iter().flatten().sum();
        if selected > 1 || total == 0 {
            return Err(bad_plaintext(index, "exactly one list must be selected"));
        }

        let mut choices = Vec::with_capacity(values.len());
        let mut randomness = Vec::with_capacity(values.len());
        let mut individual_proofs = Vec::with_capacity(values.len());
        for row in values {
            let (c, r, p) = encrypt_bits(rng, y, context, row)?;
            choices.push(c);
            randomness.push(r);
            individual_proofs.push(p);
        }
        let joined = join_ciphertexts(choices.iter().flatten());

        let selectors: Ciphertext = choices.iter().map(|row| row[0]).sum();
        let r_selectors: Scalar = randomness.iter().map(|row| row[0]).sum();
        let overall_proof = prove_interval(
            rng,
            &format!("prove|{}|{}", context, joined),
            y,
            &selectors,
            &r_selectors,
            selected,
            0,
            1,
        )?;

        let mut list_proofs = Vec::with_capacity(values.len());
        for ((row, r), m) in choices.iter().zip(&randomness).zip(values) {
            let (selector, rest) = split_list(row)?;
            let r_rest: Scalar = r[1..].iter().copied().sum();
            let branches = [Branch::new(selector, 1), Branch::new(rest, 0)];
            let (real, witness) = if m[0] == 1 { (0, &r[0]) } else { (1, &r_rest) };
            list_proofs.push(prove_disjunction(
                rng,
                &format!("lproof|{}|{}", context, join_ciphertexts(row)),
                y,
                &branches,
                real,
                witness,
            )?);
        }

        let everything: Ciphertext = choices.iter().flatten().sum();
        let r_everything: Scalar = randomness.iter().flatten().copied().sum();
        let nonzero_proof = NonZeroProof::prove(
            rng,
            &format!("nonzero|{}", context),
            y,
            &everything,
            &r_everything,
            total,
        )?;

        Ok(ListAnswer {
            choices,
            individual_proofs,
            overall_proof,
            list_proofs,
            nonzero_proof,
        })
    }

    fn verify(
        &self,
        y: &Point,
        context: &str,
        question: &ListQuestion,
        index: usize,
        report: &mut Report,
        section: &str,
    ) -> Result<(), Error> {
        check_length("lists", question.lists.len(), self.choices.len())?;
        check_length("list proofs", question.lists.len(), self.list_proofs.len())?;
        check_length("individual proofs", question.lists.len(), self.individual_proofs.len())?;
        for ((list, row), proofs) in question.lists.iter().zip(&self.choices).zip(&self.individual_proofs) {
            check_length("list choices", list.len(), row.len())?;
            check_length("individual proofs", list.len(), proofs.len())?;
        }
        let detail = || format!("question {}", index);

        let valid = self.choices.iter().flatten().all(Ciphertext::is_valid);
        report.check_detail(section, "Valid ciphertexts", valid, detail());

        let prefix = format!("prove|{}", context);
        let individual = self
            .choices
            .iter()
            .flatten()
            .zip(self.individual_proofs.iter().flatten())
            .all(|(c, p)| verify_interval(&prefix, y, p, c, 0, 1));
        report.check_detail(section, "Valid individual proofs", individual, detail());

        let joined = join_ciphertexts(self.choices.iter().flatten());
        let mut selectors = Ciphertext::zero();
        let mut lists = true;
        for (row, proof) in self.choices.iter().zip(&self.list_proofs) {
            let (selector, rest) = split_list(row)?;
            selectors = selectors + selector;
            let branches = [Branch::new(selector, 1), Branch::new(rest, 0)];
            lists &= verify_disjunction(
                &format!("lproof|{}|{}", context, join_ciphertexts(row)),
                y,
                &branches,
                proof,
            );
        }
        let overall = verify_interval(
            &format!("prove|{}|{}", context, joined),
            y,
            &self.overall_proof,
            &selectors,
            0,
            1,
        );
        report.check_detail(section, "Valid overall proof", overall, detail());
        report.check_detail(section, "Valid list proofs", lists, detail());

        let everything: Ciphertext = self.choices.iter().flatten().sum();
        let nonzero = self
            .nonzero_proof
            .verify(&format!("nonzero|{}", context), y, &everything);
        report.check_detail(section, "Valid non-zero proof", nonzero, detail());
        Ok(())
    }
}

impl NonHomomorphicAnswer {
    fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        y: &Point,
        context: &str,
        plaintext: &[u8],
    ) -> Result<Self, Error> {
        let m = Point::encode_small_int(plaintext)?;
        let r = Scalar::random(rng);
        let choices = Ciphertext::encrypt_point(y, &m, &r);
        let proof = Proof::prove_dlog(rng, &raw_prefix(context, &choices), &Point::generator(), &r);
        Ok(NonHomomorphicAnswer { choices, proof })
    }

    fn verify(&self, context: &str, index: usize, report: &mut Report, section: &str) {
        let detail = || format!("question {}", index);
        report.check_detail(section, "Valid ciphertexts", self.choices.is_valid(), detail());
        let proof = self.proof.verify_dlog(
            &raw_prefix(context, &self.choices),
            &Point::generator(),
            &self.choices.alpha,
        );
        report.check_detail(section, "Valid raw proof", proof, detail());
    }
}

impl Answer {
    /// The ciphertexts of this answer in tally-cell shape.
    pub fn cells(&self) -> Cells<Ciphertext> {
        match self {
            Answer::Homomorphic(a) => Cells::Flat(a.choices.clone()),
            Answer::List(a) => Cells::Nested(a.choices.clone()),
            Answer::NonHomomorphic(a) => Cells::Flat(vec![a.choices]),
        }
    }
}

impl Ballot {
    /// Encrypt `choices` for `election` and sign the result with `credential`.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        election: &Election,
        credential: &Credential,
        choices: &[Choice],
    ) -> Result<Self, Error> {
        check_length("answers", election.questions.len(), choices.len())?;
        let fingerprint = election.fingerprint()?;
        let context = proof_context(&fingerprint, &credential.public);
        let y = &election.public_key;

        let mut answers = Vec::with_capacity(choices.len());
        for (i, (question, choice)) in election.questions.iter().zip(choices).enumerate() {
            if !question.is_well_formed() {
                return Err(Error::MalformedQuestion(i));
            }
            let answer = match (question, choice) {
                (Question::Homomorphic(q), Choice::Homomorphic(v)) => {
                    Answer::Homomorphic(HomomorphicAnswer::generate(rng, y, &context, q, i, v)?)
                }
                (Question::List(q), Choice::List(v)) => {
                    Answer::List(ListAnswer::generate(rng, y, &context, q, i, v)?)
                }
                (Question::NonHomomorphic(_), Choice::NonHomomorphic(v)) => {
                    Answer::NonHomomorphic(NonHomomorphicAnswer::generate(rng, y, &context, v)?)
                }
                _ => return Err(Error::QuestionMismatch(i)),
            };
            answers.push(answer);
        }

        let mut ballot = Ballot {
            election_uuid: election.uuid.clone(),
            election_hash: fingerprint,
            credential: credential.public,
            answers,
            signature: Signature {
                hash: String::new(),
                proof: Proof {
                    challenge: Scalar::zero(),
                    response: Scalar::zero(),
                },
            },
        };
        let hash = ballot.content_hash()?;
        let proof = Proof::prove_dlog(
            rng,
            &format!("sig|{}", hash),
            &Point::generator(),
            &credential.private,
        );
        ballot.signature = Signature { hash, proof };
        Ok(ballot)
    }

    /// Hash of the ballot with its signature removed.
    pub fn content_hash(&self) -> Result<String, Error> {
        let content = BallotContent {
            election_uuid: &self.election_uuid,
            election_hash: &self.election_hash,
            credential: &self.credential,
            answers: &self.answers,
        };
        Ok(sha256_b64(&serde_json::to_string(&content)?))
    }

    /// Public identifier of the ballot: the hash of its full serialization.
    pub fn tracker(&self) -> Result<String, Error> {
        Ok(sha256_b64(&serde_json::to_string(self)?))
    }

    /// Check the ballot against the election and credential roll.
    ///
    /// Failed checks are recorded in the returned report under `"ballot <tracker>"`. A ballot
    /// whose shape does not match the questions is malformed and returns an error instead.
    pub fn verify(&self, election: &Election, fingerprint: &str, roll: &Roll) -> Result<Report, Error> {
        let section = format!("ballot {}", self.tracker()?);
        let mut report = Report::new();

        report.check(&section, "Matching election uuid", self.election_uuid == election.uuid);
        report.check(&section, "Matching election hash", self.election_hash == fingerprint);

        let hash = self.content_hash()?;
        report.check(&section, "Valid ballot hash", hash == self.signature.hash);

        let signed = self.credential.is_valid()
            && self.signature.proof.verify_dlog(
                &format!("sig|{}", self.signature.hash),
                &Point::generator(),
                &self.credential,
            );
        report.check(&section, "Valid signature", signed);
        report.check(&section, "Credential in roll", roll.weight(&self.credential).is_some());

        check_length("answers", election.questions.len(), self.answers.len())?;
        let context = proof_context(fingerprint, &self.credential);
        let y = &election.public_key;
        for (i, (question, answer)) in election.questions.iter().zip(&self.answers).enumerate() {
            if !question.is_well_formed() {
                return Err(Error::MalformedQuestion(i));
            }
            match (question, answer) {
                (Question::Homomorphic(q), Answer::Homomorphic(a)) => {
                    a.verify(y, &context, q, i, &mut report, &section)?
                }
                (Question::List(q), Answer::List(a)) => {
                    a.verify(y, &context, q, i, &mut report, &section)?
                }
                (Question::NonHomomorphic(_), Answer::NonHomomorphic(a)) => {
                    a.verify(&context, i, &mut report, &section)
                }
                _ => return Err(Error::QuestionMismatch(i)),
            }
        }
        Ok(report)
    }
}
