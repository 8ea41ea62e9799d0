use super::*;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Trustee records plus the secret behind each owner index.
struct Authorities {
    trustees: Vec<Trustee>,
    secrets: Vec<(usize, Scalar)>,
}

fn single_trustees(rng: &mut ChaCha20Rng, n: usize) -> Authorities {
    let mut trustees = Vec::new();
    let mut secrets = Vec::new();
    for owner in 1..=n {
        let (key, secret) = TrusteePublicKey::generate(rng);
        trustees.push(Trustee::Single(key));
        secrets.push((owner, secret));
    }
    Authorities { trustees, secrets }
}

fn pedersen_trustee(rng: &mut ChaCha20Rng, threshold: usize, n: usize) -> Authorities {
    let (trustee, shares) = PedersenTrustee::generate(rng, threshold, n).unwrap();
    Authorities {
        trustees: vec![Trustee::Pedersen(trustee)],
        secrets: shares.into_iter().enumerate().map(|(i, s)| (i + 1, s)).collect(),
    }
}

fn plurality() -> Question {
    Question::Homomorphic(HomomorphicQuestion {
        answers: vec!["Alice".into(), "Bob".into(), "Carol".into()],
        blank: false,
        min: 1,
        max: 1,
        question: "Who should chair?".into(),
    })
}

/// Run an election from setup to result.
///
/// `votes` lists `(voter, choices)` in casting order, `shufflers` the owners that mix, and
/// `decrypting` the owners that publish a partial decryption. Returns the record and the
/// voters' credentials.
fn run_election(
    rng: &mut ChaCha20Rng,
    authorities: &Authorities,
    questions: Vec<Question>,
    voters: usize,
    votes: &[(usize, Vec<Choice>)],
    shufflers: &[usize],
    decrypting: &[usize],
) -> (ElectionRecord, Vec<Credential>) {
    let public_key = combine_public_key(&authorities.trustees).unwrap();
    let election = Election::new("9G4XiPdFNf7a7t", "Test election", public_key, questions);
    let fingerprint = election.fingerprint().unwrap();

    let credentials: Vec<Credential> = (0..voters)
        .map(|_| Credential::derive(&election.uuid, &Credential::generate_seed(rng)).unwrap())
        .collect();
    let entries: Vec<CredentialEntry> = credentials
        .iter()
        .map(|c| CredentialEntry {
            credential: c.public,
            weight: 1,
        })
        .collect();
    let roll = Roll::new(&entries);

    let ballots: Vec<Ballot> = votes
        .iter()
        .map(|(voter, choices)| Ballot::generate(rng, &election, &credentials[*voter], choices).unwrap())
        .collect();
    let tally = EncryptedTally::compute(&election, &roll, &ballots).unwrap();

    let mut shuffles: Vec<Shuffle> = Vec::new();
    for owner in shufflers {
        let inputs = match shuffles.last() {
            Some(previous) => previous.ciphertexts.clone(),
            None => tally.mix_inputs(&election),
        };
        shuffles.push(Shuffle::generate(rng, &public_key, *owner, &inputs).unwrap());
    }

    // With no shuffle the trustees decrypt the raw tally, which verification must refuse
    let input = tally
        .decryption_input(&election, &shuffles)
        .unwrap_or_else(|_| tally.encrypted_tally.clone());
    let partial_decryptions: Vec<PartialDecryption> = decrypting
        .iter()
        .map(|owner| {
            let (_, secret) = authorities.secrets.iter().find(|(o, _)| o == owner).unwrap();
            PartialDecryption::compute(rng, &fingerprint, *owner, secret, &input)
        })
        .collect();

    let result = combine_factors(&authorities.trustees, &input, &partial_decryptions)
        .ok()
        .map(|factors| ElectionResult::compute(&election, &input, &factors, tally.total_weight).unwrap());

    let record = ElectionRecord {
        election,
        trustees: authorities.trustees.clone(),
        credentials: entries,
        ballots,
        shuffles,
        encrypted_tally: Some(tally),
        partial_decryptions,
        result,
    };
    (record, credentials)
}

fn h(values: &[u64]) -> Vec<Choice> {
    vec![Choice::Homomorphic(values.to_vec())]
}

#[test]
fn end_to_end_election() {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let authorities = single_trustees(&mut rng, 1);
    let votes = vec![(0, h(&[1, 0, 0])), (1, h(&[0, 1, 0])), (2, h(&[1, 0, 0]))];
    let (record, _) = run_election(&mut rng, &authorities, vec![plurality()], 3, &votes, &[], &[1]);

    let result = record.result.as_ref().unwrap();
    assert_eq!(result.result, vec![Cells::Flat(vec![2, 1, 0])]);

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    assert!(report.is_success(), "{}", report);
    assert_eq!(report.count(Outcome::Failed), 0);
    for section in &["setup", "trustees", "tally", "partial decryptions", "result"] {
        assert!(report.sections.contains_key(*section), "missing {}", section);
    }
    assert_eq!(report.sections.keys().filter(|s| s.starts_with("ballot ")).count(), 3);

    // The record survives a JSON round trip unchanged
    let json = serde_json::to_string(&record).unwrap();
    let back: ElectionRecord = serde_json::from_str(&json).unwrap();
    let again = verify_election(&back, &VerifyConfig::default()).unwrap();
    assert_eq!(again, report);
}

#[test]
fn bad_overall_proof_fails_one_check_only() {
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let authorities = single_trustees(&mut rng, 1);
    let votes = vec![(0, h(&[1, 0, 0])), (1, h(&[0, 1, 0])), (2, h(&[0, 0, 1]))];
    let (mut record, credentials) = run_election(&mut rng, &authorities, vec![plurality()], 3, &votes, &[], &[1]);
    record.encrypted_tally = None;

    // Corrupt the second ballot's overall proof and re-sign it with its own credential
    let ballot = &mut record.ballots[1];
    if let Answer::Homomorphic(a) = &mut ballot.answers[0] {
        a.overall_proof[0].response = a.overall_proof[0].response + Scalar::one();
    }
    ballot.signature.hash = ballot.content_hash().unwrap();
    ballot.signature.proof = Proof::prove_dlog(
        &mut rng,
        &format!("sig|{}", ballot.signature.hash),
        &Point::generator(),
        &credentials[1].private,
    );

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].1.name, "Valid overall proof");
    assert_eq!(failures[0].0, format!("ballot {}", record.ballots[1].tracker().unwrap()));

    // Sibling ballots were still fully checked
    for i in &[0, 2] {
        let section = format!("ballot {}", record.ballots[*i].tracker().unwrap());
        let checks = &report.sections[&section];
        assert!(checks.iter().any(|c| c.name == "Valid overall proof" && c.outcome == Outcome::Passed));
    }
}

#[test]
fn pedersen_threshold_needs_enough_shares() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let authorities = pedersen_trustee(&mut rng, 2, 3);
    let votes = vec![(0, h(&[0, 0, 1])), (1, h(&[0, 0, 1]))];

    let (record, _) = run_election(&mut rng, &authorities, vec![plurality()], 2, &votes, &[], &[1, 3]);
    assert_eq!(record.result.as_ref().unwrap().result, vec![Cells::Flat(vec![0, 0, 2])]);
    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    assert!(report.is_success(), "{}", report);

    let mut short = record.clone();
    short.partial_decryptions.truncate(1);
    let err = verify_election(&short, &VerifyConfig::default()).unwrap_err();
    assert!(matches!(err, Error::NotEnoughShares { need: 2, found: 1, .. }));
}

#[test]
fn invalid_partial_decryption_does_not_count() {
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let authorities = pedersen_trustee(&mut rng, 2, 3);
    let votes = vec![(0, h(&[1, 0, 0]))];
    let (mut record, _) = run_election(&mut rng, &authorities, vec![plurality()], 1, &votes, &[], &[1, 2, 3]);

    // One bad share out of three still leaves a threshold of good ones
    let bad = &mut record.partial_decryptions[0];
    bad.decryption_factors[0] = bad.decryption_factors[0].map(|f| *f + Point::generator());
    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.name, "Valid partial decryption");
    assert!(report.sections["result"].iter().all(|c| c.outcome == Outcome::Passed));
}

#[test]
fn revotes_follow_the_configured_policy() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let authorities = single_trustees(&mut rng, 1);
    let votes = vec![(0, h(&[1, 0, 0])), (1, h(&[0, 1, 0])), (0, h(&[0, 0, 1]))];
    let (record, _) = run_election(&mut rng, &authorities, vec![plurality()], 2, &votes, &[], &[1]);
    assert_eq!(record.result.as_ref().unwrap().result, vec![Cells::Flat(vec![0, 1, 1])]);

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    assert!(report.is_success(), "{}", report);
    assert_eq!(report.count(Outcome::Flagged), 1);

    let reject = VerifyConfig {
        revote_policy: RevotePolicy::Reject,
        parallel: true,
    };
    let report = verify_election(&record, &reject).unwrap();
    let names: Vec<&str> = report.failures().iter().map(|(_, c)| c.name.as_str()).collect();
    // The second ballot is refused, so the published tally no longer matches either
    assert!(names.contains(&"Unique credential"));
    assert!(names.contains(&"Matching encrypted tally"));
}

#[test]
fn non_homomorphic_answers_go_through_the_mix_net() {
    let mut rng = ChaCha20Rng::seed_from_u64(6);
    let authorities = single_trustees(&mut rng, 2);
    let questions = vec![
        Question::NonHomomorphic(NonHomomorphicQuestion {
            question: "Motto?".into(),
        }),
        plurality(),
    ];
    let nh = |text: &str, choice: &[u64]| {
        vec![
            Choice::NonHomomorphic(text.as_bytes().to_vec()),
            Choice::Homomorphic(choice.to_vec()),
        ]
    };
    let votes = vec![
        (0, nh("liberty", &[1, 0, 0])),
        (1, nh("equality", &[1, 0, 0])),
        (2, nh("fraternity", &[0, 1, 0])),
    ];
    let (record, _) = run_election(&mut rng, &authorities, questions, 3, &votes, &[1, 2], &[1, 2]);

    let result = record.result.as_ref().unwrap();
    assert_eq!(result.result[1], Cells::Flat(vec![2, 1, 0]));
    let mut mottos: Vec<String> = match &result.result[0] {
        Cells::Nested(rows) => rows
            .iter()
            .map(|r| r.iter().map(|b| *b as u8 as char).collect())
            .collect(),
        other => panic!("unexpected shape {:?}", other),
    };
    mottos.sort();
    assert_eq!(mottos, vec!["equality", "fraternity", "liberty"]);

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    assert!(report.is_success(), "{}", report);
    assert_eq!(report.sections["shuffles"].len(), 4);

    // A forged response invalidates the shuffle it belongs to
    let mut broken = record.clone();
    if let Some(proof) = broken.shuffles[0].proofs[0].as_mut() {
        proof.s.s1 = proof.s.s1 + Scalar::one();
    }
    let report = verify_election(&broken, &VerifyConfig::default()).unwrap();
    assert!(report
        .failures()
        .iter()
        .any(|(s, c)| *s == "shuffles" && c.name == "Valid shuffle proof"));
}

#[test]
fn lists_and_blank_votes() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let authorities = single_trustees(&mut rng, 1);
    let questions = vec![
        Question::List(ListQuestion {
            question: "Pick a list".into(),
            lists: vec![
                vec!["Greens".into(), "Ann".into(), "Ben".into()],
                vec!["Blues".into(), "Cat".into()],
            ],
        }),
        Question::Homomorphic(HomomorphicQuestion {
            answers: vec!["Yes".into(), "No".into()],
            blank: true,
            min: 1,
            max: 1,
            question: "Agree?".into(),
        }),
    ];
    let ballot = |list: Vec<Vec<u64>>, agree: &[u64]| vec![Choice::List(list), Choice::Homomorphic(agree.to_vec())];
    let votes = vec![
        (0, ballot(vec![vec![1, 1, 0], vec![0, 0]], &[0, 1, 0])),
        (1, ballot(vec![vec![0, 0, 0], vec![1, 1]], &[1, 0, 0])),
        (2, ballot(vec![vec![1, 0, 1], vec![0, 0]], &[0, 0, 1])),
    ];
    let (record, _) = run_election(&mut rng, &authorities, questions, 3, &votes, &[], &[1]);

    let result = &record.result.as_ref().unwrap().result;
    assert_eq!(result[0], Cells::Nested(vec![vec![2, 1, 1], vec![1, 1]]));
    assert_eq!(result[1], Cells::Flat(vec![1, 1, 1]));

    let sequential = VerifyConfig {
        revote_policy: RevotePolicy::LastByHeight,
        parallel: false,
    };
    let report = verify_election(&record, &sequential).unwrap();
    assert!(report.is_success(), "{}", report);
    assert_eq!(report, verify_election(&record, &VerifyConfig::default()).unwrap());
}

#[test]
fn wrong_public_key_is_reported() {
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    let authorities = single_trustees(&mut rng, 1);
    let (mut record, _) = run_election(&mut rng, &authorities, vec![plurality()], 1, &[(0, h(&[1, 0, 0]))], &[], &[]);
    record.encrypted_tally = None;
    let (other, _) = TrusteePublicKey::generate(&mut rng);
    record.trustees = vec![Trustee::Single(other)];

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].1.name, "Public key matches trustees");
}

fn motto(text: &str) -> Vec<Choice> {
    vec![Choice::NonHomomorphic(text.as_bytes().to_vec())]
}

fn nh_question() -> Question {
    Question::NonHomomorphic(NonHomomorphicQuestion {
        question: "Motto?".into(),
    })
}

#[test]
fn non_homomorphic_result_requires_a_shuffle() {
    let mut rng = ChaCha20Rng::seed_from_u64(9);
    let authorities = single_trustees(&mut rng, 1);
    let votes = vec![(0, motto("alice-secret")), (1, motto("bob-secret"))];
    let (record, _) = run_election(&mut rng, &authorities, vec![nh_question()], 2, &votes, &[], &[1]);
    assert!(record.result.is_some());

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].0, "partial decryptions");
    assert_eq!(failures[0].1.name, "Shuffled before decryption");
    assert!(!report.sections.contains_key("result"));

    // Before anything is decrypted, a missing shuffle only means mixing has not happened yet
    let mut pending = record.clone();
    pending.partial_decryptions.clear();
    pending.result = None;
    let report = verify_election(&pending, &VerifyConfig::default()).unwrap();
    assert!(report.is_success(), "{}", report);
}

#[test]
fn malformed_artifacts_are_failed_checks() {
    let mut rng = ChaCha20Rng::seed_from_u64(10);
    let authorities = pedersen_trustee(&mut rng, 2, 3);
    let votes = vec![(0, h(&[0, 1, 0])), (1, h(&[0, 1, 0]))];
    let (mut record, _) = run_election(&mut rng, &authorities, vec![plurality()], 2, &votes, &[], &[1, 2, 3]);

    // The remaining two shares still reach the threshold
    record.partial_decryptions[0].decryption_factors.clear();
    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].1.name, "Well-formed partial decryption");
    assert!(!report.sections["result"].is_empty());
    assert!(report.sections["result"].iter().all(|c| c.outcome == Outcome::Passed));
}

#[test]
fn malformed_shuffle_is_a_failed_check() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let authorities = single_trustees(&mut rng, 2);
    let votes = vec![(0, motto("north")), (1, motto("south"))];
    let (mut record, _) = run_election(&mut rng, &authorities, vec![nh_question()], 2, &votes, &[1, 2], &[1, 2]);

    record.shuffles[0].proofs.clear();
    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    let names: Vec<&str> = report.failures().iter().map(|(_, c)| c.name.as_str()).collect();
    assert_eq!(names, vec!["Well-formed shuffle"], "{}", report);
    // The later shuffle and the decryption were still checked
    assert!(report.sections["shuffles"]
        .iter()
        .any(|c| c.name == "Valid shuffle proof" && c.outcome == Outcome::Passed));
    assert!(report.sections.contains_key("result"));
}

#[test]
fn invalid_ballot_cannot_claim_a_credential() {
    let mut rng = ChaCha20Rng::seed_from_u64(12);
    let authorities = single_trustees(&mut rng, 1);
    let votes = vec![(0, h(&[1, 0, 0])), (1, h(&[0, 1, 0]))];
    let (mut record, _) = run_election(&mut rng, &authorities, vec![plurality()], 2, &votes, &[], &[1]);

    let mut forged = record.ballots[0].clone();
    forged.signature.proof.response = forged.signature.proof.response + Scalar::one();
    record.ballots.insert(0, forged);

    for policy in &[RevotePolicy::Reject, RevotePolicy::LastByHeight] {
        let config = VerifyConfig {
            revote_policy: *policy,
            parallel: true,
        };
        let report = verify_election(&record, &config).unwrap();
        let failures = report.failures();
        assert_eq!(failures.len(), 1, "{:?}: {}", policy, report);
        assert_eq!(failures[0].1.name, "Valid signature");
        assert_eq!(failures[0].0, format!("ballot {}", record.ballots[0].tracker().unwrap()));
        assert_eq!(report.count(Outcome::Flagged), 0);
    }
}

#[test]
fn malformed_question_is_reported_at_setup() {
    let mut rng = ChaCha20Rng::seed_from_u64(13);
    let authorities = single_trustees(&mut rng, 1);
    let (mut record, _) = run_election(&mut rng, &authorities, vec![plurality()], 1, &[(0, h(&[1, 0, 0]))], &[], &[]);
    record.encrypted_tally = None;
    if let Question::Homomorphic(q) = &mut record.election.questions[0] {
        q.min = 2;
        q.max = 1;
    }

    let report = verify_election(&record, &VerifyConfig::default()).unwrap();
    let failures: Vec<(&str, &str)> = report
        .failures()
        .iter()
        .map(|(s, c)| (*s, c.name.as_str()))
        .collect();
    assert!(failures.contains(&("setup", "Well-formed question")), "{}", report);
    assert!(failures.iter().any(|(_, name)| *name == "Well-formed ballot"));
}
