use thiserror::Error;

/// StarkNet chain operation errors.
#[derive(Debug, Error)]
pub enum StarkError {
    #[error("malformed call: {0}")]
    MalformedCall(String),

    #[error("invalid call shape: {0}")]
    InvalidCallShape(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("not a number: {0}")]
    NotANumber(String),

    #[error("invalid short string: {0}")]
    InvalidShortString(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
