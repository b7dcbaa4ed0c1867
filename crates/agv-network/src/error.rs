//! Network-subsystem error type.

use thiserror::Error;

use agv_core::PointId;

/// Errors produced by `agv-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no segment from {from} to {to}")]
    NoSuchSegment { from: PointId, to: PointId },

    #[error("control point {0} not found")]
    PointNotFound(PointId),

    #[error("unknown control point name {0:?}")]
    UnknownPointName(String),

    #[error("layout references undefined point {referenced:?} from {from_point:?}")]
    UnknownNeighbor { from_point: String, referenced: String },

    #[error("layout has {0} points, exceeding the 16-bit id space")]
    TooManyPoints(usize),

    #[error("duplicate point id {0:?} in layout")]
    DuplicatePoint(String),

    #[error("segment {what}: {detail}")]
    InvalidSegment { what: String, detail: String },

    #[error("layout parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
