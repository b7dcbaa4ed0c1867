//! `agv-core` — foundational types for the `agvflow` traffic simulation.
//!
//! This crate is a dependency of every other `agv-*` crate.  It intentionally
//! has no `agv-*` dependencies and minimal external ones (only `rand`).
//!
//! # What lives here
//!
//! | Module   | Contents                                          |
//! |----------|---------------------------------------------------|
//! | [`ids`]  | `PointId`, `SegmentId`, `VehicleId`               |
//! | [`pos`]  | `Position`, Euclidean distance                    |
//! | [`time`] | `SimTime`, `MIN_TICK_MS`, traversal-delay helper  |
//! | [`rng`]  | `SimRng` (seeded, deterministic)                  |

pub mod ids;
pub mod pos;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{PointId, SegmentId, VehicleId};
pub use pos::Position;
pub use rng::SimRng;
pub use time::{traversal_ms, SimTime, MIN_TICK_MS};
