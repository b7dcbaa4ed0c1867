//! Routing-subsystem error type.

use thiserror::Error;

/// Errors produced by `agv-routing`.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing table has {0} records, exceeding the 32-bit count field")]
    TooManyRecords(usize),

    #[error("sampled build needs at least 2 entry/exit points, network has {0}")]
    NotEnoughDestinations(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RoutingResult<T> = Result<T, RoutingError>;
