use crate::*;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// What to do with a second ballot cast with the same credential.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevotePolicy {
    /// The later ballot (by event height, i.e. input order) replaces the earlier one.
    LastByHeight,
    /// Only the first ballot counts; later ones fail.
    Reject,
}

impl Default for RevotePolicy {
    fn default() -> Self {
        RevotePolicy::LastByHeight
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyConfig {
    pub revote_policy: RevotePolicy,

    /// Verify ballots, shuffles and partial decryptions on the rayon thread pool.
    pub parallel: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        VerifyConfig {
            revote_policy: RevotePolicy::default(),
            parallel: true,
        }
    }
}

/// Everything published about an election, in event order.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ElectionRecord {
    pub election: Election,
    pub trustees: Vec<Trustee>,
    pub credentials: Vec<CredentialEntry>,

    #[serde(default)]
    pub ballots: Vec<Ballot>,

    #[serde(default)]
    pub shuffles: Vec<Shuffle>,

    #[serde(default)]
    pub encrypted_tally: Option<EncryptedTally>,

    #[serde(default)]
    pub partial_decryptions: Vec<PartialDecryption>,

    #[serde(default)]
    pub result: Option<ElectionResult>,
}

/// Credentials already used in one verification run, with the ballot that holds each.
#[derive(Clone, Debug, Default)]
pub struct SeenCredentials {
    ballots: HashMap<String, usize>,
}

impl SeenCredentials {
    pub fn new() -> Self {
        SeenCredentials::default()
    }

    /// Index of the ballot currently holding `credential`.
    pub fn get(&self, credential: &Point) -> Option<usize> {
        self.ballots.get(&credential.to_hex()).copied()
    }

    /// Record that ballot `index` holds `credential`, returning the previous holder.
    pub fn insert(&mut self, credential: &Point, index: usize) -> Option<usize> {
        self.ballots.insert(credential.to_hex(), index)
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }
}

const SETUP: &str = "setup";
const TRUSTEES: &str = "trustees";
const SHUFFLES: &str = "shuffles";
const TALLY: &str = "tally";
const PARTIAL_DECRYPTIONS: &str = "partial decryptions";
const RESULT: &str = "result";

pub(crate) fn map_units<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

/// Verify a whole election record.
///
/// Every check is recorded in the returned report; the run continues past failed checks. An
/// error means a stage could not be carried out at all, for instance too few partial
/// decryptions to combine.
pub fn verify_election(record: &ElectionRecord, config: &VerifyConfig) -> Result<Report, Error> {
    let election = &record.election;
    let fingerprint = election.fingerprint()?;
    let roll = Roll::new(&record.credentials);
    let mut report = Report::new();

    tracing::info!(uuid = %election.uuid, fingerprint = %fingerprint, "verifying setup");
    verify_setup(record, &mut report)?;

    tracing::info!(ballots = record.ballots.len(), "verifying ballots");
    let (accepted, seen) =
        verify_ballots(record, &fingerprint, &roll, config, SeenCredentials::new(), &mut report)?;
    tracing::debug!(voters = seen.len(), "distinct credentials used");

    let tally = match &record.encrypted_tally {
        Some(tally) => tally,
        None => {
            tracing::info!("no encrypted tally published, stopping after ballots");
            return Ok(report);
        }
    };

    tracing::info!(shuffles = record.shuffles.len(), "verifying shuffles");
    verify_shuffles(record, tally, config, &mut report);

    tracing::info!(accepted = accepted.len(), "verifying encrypted tally");
    let computed = EncryptedTally::compute(election, &roll, accepted.iter().copied())?;
    tally.check(&computed, &mut report, TALLY);

    tracing::info!(
        partial_decryptions = record.partial_decryptions.len(),
        "verifying partial decryptions"
    );
    let input = match tally.decryption_input(election, &record.shuffles) {
        Ok(input) => input,
        Err(Error::NotShuffled(_)) if record.partial_decryptions.is_empty() && record.result.is_none() => {
            tracing::info!("no shuffle published yet, stopping after tally");
            return Ok(report);
        }
        Err(Error::NotShuffled(q)) => {
            report.check_detail(
                PARTIAL_DECRYPTIONS,
                "Shuffled before decryption",
                false,
                format!("question {}", q),
            );
            return Ok(report);
        }
        Err(e) => {
            report.check_detail(PARTIAL_DECRYPTIONS, "Well-formed decryption input", false, e.to_string());
            return Ok(report);
        }
    };
    let valid_partials = check_partial_decryptions(
        &record.trustees,
        &fingerprint,
        &input,
        &record.partial_decryptions,
        config.parallel,
        &mut report,
        PARTIAL_DECRYPTIONS,
    );

    if let Some(result) = &record.result {
        tracing::info!("verifying result");
        let factors = combine_factors(&record.trustees, &input, valid_partials)?;
        result.verify(election, &input, &factors, &mut report, RESULT)?;
    }

    tracing::info!(
        passed = report.count(Outcome::Passed),
        failed = report.count(Outcome::Failed),
        flagged = report.count(Outcome::Flagged),
        "verification finished"
    );
    Ok(report)
}

fn verify_setup(record: &ElectionRecord, report: &mut Report) -> Result<(), Error> {
    let election = &record.election;
    report.check(SETUP, "Supported group", election.group == GROUP_NAME);
    report.check(SETUP, "Valid election public key", election.public_key.is_valid());

    let combined = combine_public_key(&record.trustees)?;
    report.check(SETUP, "Public key matches trustees", combined == election.public_key);

    let valid_credentials = record
        .credentials
        .iter()
        .all(|e| e.credential.is_valid() && e.weight > 0);
    report.check(SETUP, "Valid credentials", valid_credentials);
    let distinct: HashSet<String> = record.credentials.iter().map(|e| e.credential.to_hex()).collect();
    report.check(SETUP, "Unique credentials", distinct.len() == record.credentials.len());

    for (i, question) in election.questions.iter().enumerate() {
        report.check_detail(
            SETUP,
            "Well-formed question",
            question.is_well_formed(),
            format!("question {}", i),
        );
    }

    for trustee in &record.trustees {
        trustee.check(report, TRUSTEES)?;
    }
    Ok(())
}

/// Verify every ballot and return the ones that count towards the tally, in input order.
///
/// Only ballots that pass their own checks take a credential in `seen`, so an invalid ballot can
/// never displace or block a valid one.
fn verify_ballots<'a>(
    record: &'a ElectionRecord,
    fingerprint: &str,
    roll: &Roll,
    config: &VerifyConfig,
    mut seen: SeenCredentials,
    report: &mut Report,
) -> Result<(Vec<&'a Ballot>, SeenCredentials), Error> {
    let trackers = record
        .ballots
        .iter()
        .map(Ballot::tracker)
        .collect::<Result<Vec<_>, _>>()?;

    let election = &record.election;
    let checked = map_units(&record.ballots, config.parallel, |ballot| {
        match ballot.verify(election, fingerprint, roll) {
            Ok(r) => r,
            Err(e) => {
                let mut r = Report::new();
                let tracker = ballot.tracker().unwrap_or_default();
                tracing::warn!(tracker = %tracker, error = %e, "malformed ballot");
                r.check_detail(&format!("ballot {}", tracker), "Well-formed ballot", false, e.to_string());
                r
            }
        }
    });

    // Credential uniqueness depends on order, so it runs after the parallel pass.
    let mut accepted = Vec::new();
    for (i, ballot_report) in checked.into_iter().enumerate() {
        let valid = ballot_report.is_success();
        report.merge(ballot_report);
        if !valid {
            continue;
        }

        let ballot = &record.ballots[i];
        if let Some(previous) = seen.get(&ballot.credential) {
            let section = format!("ballot {}", trackers[i]);
            let detail = format!("credential already used by ballot {}", trackers[previous]);
            if config.revote_policy == RevotePolicy::Reject {
                report.check_detail(&section, "Unique credential", false, detail);
                continue;
            }
            report.flag(&section, "Unique credential", detail);
        }
        seen.insert(&ballot.credential, i);
        accepted.push(ballot);
    }

    tracing::info!(
        ballots = record.ballots.len(),
        accepted = accepted.len(),
        "ballots verified"
    );
    Ok((accepted, seen))
}

fn verify_shuffles(
    record: &ElectionRecord,
    tally: &EncryptedTally,
    config: &VerifyConfig,
    report: &mut Report,
) {
    let first = tally.mix_inputs(&record.election);
    let jobs: Vec<(&Shuffle, &[Option<Vec<Ciphertext>>])> = record
        .shuffles
        .iter()
        .enumerate()
        .map(|(k, shuffle)| {
            let input = if k == 0 {
                &first[..]
            } else {
                &record.shuffles[k - 1].ciphertexts[..]
            };
            (shuffle, input)
        })
        .collect();

    let y = &record.election.public_key;
    let trustees = &record.trustees;
    let checked = map_units(&jobs, config.parallel, |(shuffle, input)| {
        let mut r = Report::new();
        let known = find_owner(trustees, shuffle.owner).is_ok();
        r.check_detail(SHUFFLES, "Known shuffle owner", known, format!("owner {}", shuffle.owner));
        if let Err(e) = shuffle.verify(y, input, &mut r, SHUFFLES) {
            tracing::warn!(owner = shuffle.owner, error = %e, "malformed shuffle");
            r.check_detail(SHUFFLES, "Well-formed shuffle", false, e.to_string());
        }
        r
    });
    for r in checked {
        report.merge(r);
    }
}
