//! Output-subsystem error type.

use thiserror::Error;

/// Errors produced by `agv-output` backends.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;
