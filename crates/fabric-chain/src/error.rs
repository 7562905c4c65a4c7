//! Input errors that abort a ledger command.
//!
//! Verification findings are not errors; see [`crate::verify::Defect`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort building, co-signing, or loading a ledger.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Ledger not found: {}", .0.display())]
    MissingLedger(PathBuf),

    #[error("Secret key for signer '{signer}' not found: {}", path.display())]
    MissingKey { signer: String, path: PathBuf },

    #[error("Secret key for signer '{signer}' is malformed: {reason}")]
    MalformedKey { signer: String, reason: String },

    #[error("Malformed ledger record on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed policy {}: {reason}", path.display())]
    MalformedPolicy { path: PathBuf, reason: String },

    #[error("Malformed pubkey registry {}: {reason}", path.display())]
    MalformedRegistry { path: PathBuf, reason: String },

    #[error("Invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("A block must record at least one file")]
    NoFiles,

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Ledger has no blocks")]
    EmptyLedger,

    #[error("Block {0} not found")]
    BlockNotFound(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChainError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChainError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ChainError> = std::result::Result<T, E>;
