//! `agv-routing` — next-hop routing tables for agvflow.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`table`]   | `RoutingTable`, binary on-disk codec                        |
//! | [`builder`] | `build_complete_table` (reverse SSSP), `build_sampled_table` (seeded A*) |
//! | [`error`]   | `RoutingError`, `RoutingResult<T>`                          |
//!
//! The table is pure data keyed `(from, destination) → next hop` and is
//! consumed by the movement engine at every hop decision.  Builders run
//! offline; nothing here is called on the simulation hot path except
//! [`RoutingTable::next_hop`].

pub mod builder;
pub mod error;
pub mod table;


pub use builder::{build_complete_table, build_sampled_table, SampleStats};
pub use error::{RoutingError, RoutingResult};
pub use table::RoutingTable;
