//! `agv-output` — trajectory logging for agvflow simulation runs.
//!
//! A [`TrajectoryObserver`] subscribes to the engine's event hooks and feeds
//! one [`TrajectoryRow`] per event to a [`TrajectoryWriter`] backend.  CSV is
//! the provided backend; the trait keeps the seam open for others.
//!
//! # Usage
//!
//! ```rust,ignore
//! use agv_output::{CsvTrajectoryWriter, TrajectoryObserver};
//!
//! let writer = CsvTrajectoryWriter::new(Path::new("./output"))?;
//! let log = TrajectoryObserver::new(writer);
//! let errors = log.error_slot();
//! engine.register_observer(Box::new(log));
//! engine.run_until(horizon)?;
//! if let Some(e) = errors.lock().unwrap().take() {
//!     eprintln!("trajectory log error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use crate::csv::CsvTrajectoryWriter;
pub use error::{OutputError, OutputResult};
pub use observer::TrajectoryObserver;
pub use row::{TrajectoryEvent, TrajectoryRow, NO_POINT};
pub use writer::TrajectoryWriter;
