use thiserror::Error;

/// Error types
///
/// These are the fatal conditions: malformed input that aborts the enclosing unit, and
/// structural failures that abort a whole stage. Cryptographic check failures that leave the
/// run able to continue are recorded in a [`crate::Report`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("belenios: malformed scalar: {0}")]
    MalformedScalar(String),

    #[error("belenios: malformed group element: {0}")]
    MalformedPoint(String),

    #[error("belenios: group element {0} is not canonically encoded")]
    NonCanonicalPoint(String),

    #[error("belenios: wrong length for {what}: expected {expected}, found {found}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("belenios: answer shape does not match question {0}")]
    QuestionMismatch(usize),

    #[error("belenios: unknown question type {0}")]
    UnknownQuestionType(String),

    #[error("belenios: question {0} is malformed")]
    MalformedQuestion(usize),

    #[error("belenios: non-homomorphic question {0} was not shuffled before decryption")]
    NotShuffled(usize),

    #[error("belenios: total ballot weight overflows")]
    WeightOverflow,

    #[error("belenios: no valid point found after {0} attempts")]
    NoValidPoint(usize),

    #[error("belenios: derived generators {0} and {1} collide")]
    GeneratorCollision(usize, usize),

    #[error("belenios: not enough shares for trustee {trustee}: need {need}, found {found}")]
    NotEnoughShares {
        trustee: usize,
        need: usize,
        found: usize,
    },

    #[error("belenios: no trustee owns decryption index {0}")]
    UnknownOwner(usize),

    #[error("belenios: missing partial decryption for owner {0}")]
    MissingPartialDecryption(usize),

    #[error("belenios: invalid threshold {threshold} for {size} participants")]
    InvalidThreshold { threshold: usize, size: usize },

    #[error("belenios: discrete log not found below {0}")]
    DiscreteLogNotFound(u64),

    #[error("belenios: invalid plaintext: {0}")]
    InvalidPlaintext(String),

    #[error("belenios: invalid credential: {0}")]
    InvalidCredential(String),

    #[error("belenios: key derivation failed")]
    KeyDerivation,

    #[error("belenios: missing {0}")]
    Missing(&'static str),

    #[error("belenios: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("belenios: invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}
