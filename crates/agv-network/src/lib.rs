//! `agv-network` — directed control-point network for agvflow.
//!
//! # Crate layout
//!
//! | Module     | Contents                                             |
//! |------------|------------------------------------------------------|
//! | [`model`]  | `ControlPoint`, `Segment`, `Network`                 |
//! | [`loader`] | JSON layout loader (`load_network`, `from_reader`)   |
//! | [`error`]  | `NetworkError`, `NetworkResult<T>`                   |

pub mod error;
pub mod loader;
pub mod model;


pub use error::{NetworkError, NetworkResult};
pub use loader::{load_network, load_network_reader, LoaderDefaults};
pub use model::{ControlPoint, Network, Segment};
