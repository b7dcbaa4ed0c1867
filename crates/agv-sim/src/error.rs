//! Engine error type.
//!
//! Routing misses are deliberately *not* errors: they are reported through
//! the observer bus and stall only the affected vehicle.  The variants here
//! are either caller mistakes (unknown ids, invalid vehicle parameters) or
//! fatal invariant violations that abort the run.

use thiserror::Error;

use agv_core::{PointId, SegmentId, VehicleId};

/// Errors produced by `agv-sim`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),

    #[error("unknown control point {0}")]
    UnknownPoint(PointId),

    #[error("vehicle {name:?}: {detail}")]
    InvalidVehicle { name: String, detail: String },

    #[error("capacity invariant violated on segment {segment} during {event}: {detail}")]
    CapacityInvariant {
        segment: SegmentId,
        event: &'static str,
        detail: String,
    },

    #[error("in-pending invariant violated on segment {segment}: {detail}")]
    PendingInvariant { segment: SegmentId, detail: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
