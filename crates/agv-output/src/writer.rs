//! The `TrajectoryWriter` trait implemented by backend writers.

use crate::{OutputResult, TrajectoryRow};

/// Sink for trajectory rows.
///
/// All methods are infallible from the observer's perspective — errors are
/// stored by [`TrajectoryObserver`][crate::TrajectoryObserver] and surfaced
/// after the run.
pub trait TrajectoryWriter {
    /// Append one row.
    fn write_row(&mut self, row: &TrajectoryRow) -> OutputResult<()>;

    /// Flush and close the underlying sink.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
