//! `agv-sim` — the discrete-event movement engine for agvflow.
//!
//! # The state machine
//!
//! ```text
//! Pending-Entry ──enter──▶ Traversing ──complete──▶ Out-Pending
//!      ▲                        ▲                       │
//!      │                        │ depart (room ahead)   │ blocked (head)
//!   request_to_enter            └───────────────────────┼──▶ In-Pending
//!                                                       │        │
//!                                     no next segment   │        │ capacity freed
//!                                                       ▼        ▼
//!                                                Ready-To-Exit ──exit──▶ Gone
//! ```
//!
//! Every transition is an event under a single-threaded discrete-event
//! scheduler: no two transitions interleave, and all waiting is expressed as
//! scheduled future events on the simulated clock.  Capacity releases
//! propagate backward through the `in_pending` chains so an upstream vehicle
//! is only woken when the downstream segment actually has room.
//!
//! # Crate layout
//!
//! | Module       | Contents                                            |
//! |--------------|-----------------------------------------------------|
//! | [`schedule`] | `EventQueue`, `EngineAction`                        |
//! | [`vehicle`]  | `Vehicle`, `NextSegment`                            |
//! | [`engine`]   | `TrafficEngine`, `EngineConfig`                     |
//! | [`observer`] | `EngineObserver`, `ExitQueue`, provided observers   |
//! | [`error`]    | `EngineError`, `EngineResult<T>`                    |

pub mod engine;
pub mod error;
pub mod observer;
pub mod schedule;
pub mod vehicle;

#[cfg(test)]
mod tests;

pub use engine::{EngineConfig, TrafficEngine};
pub use error::{EngineError, EngineResult};
pub use observer::{EngineObserver, ExitOnReady, ExitQueue, FlowCounters, FlowStats, NoopObserver};
pub use schedule::{EngineAction, EventQueue};
pub use vehicle::{NextSegment, Vehicle};
