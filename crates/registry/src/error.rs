use std::path::PathBuf;

use thiserror::Error;

/// Registry store errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("alias {alias} already exists in {file}")]
    DuplicateAlias { alias: String, file: String },

    #[error("{key} already exists in {file}")]
    DuplicateKey { key: String, file: String },

    #[error("invalid alias: {0}")]
    InvalidAlias(String),

    #[error("invalid abi path: {0}")]
    InvalidAbiPath(String),

    #[error("malformed record in {file} line {line}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("timed out waiting for lock {} (remove it if no other process is writing)", .0.display())]
    LockTimeout(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
