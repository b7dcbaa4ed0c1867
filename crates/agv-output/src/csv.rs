//! CSV trajectory backend.
//!
//! Creates `trajectory.csv` in the configured output directory with one row
//! per engine event:
//!
//! ```csv
//! time_ms,vehicle,event,from,to
//! 1,agv-1,enter,0,65535
//! 1,agv-1,arrive,0,1
//! ```

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::TrajectoryWriter;
use crate::{OutputResult, TrajectoryRow};

/// Writes trajectory rows to `trajectory.csv`.
pub struct CsvTrajectoryWriter {
    writer: Writer<File>,
    finished: bool,
}

impl CsvTrajectoryWriter {
    /// Open (or create) `trajectory.csv` in `dir` and write the header row.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut writer = Writer::from_path(dir.join("trajectory.csv"))?;
        writer.write_record(["time_ms", "vehicle", "event", "from", "to"])?;
        Ok(Self { writer, finished: false })
    }
}

impl TrajectoryWriter for CsvTrajectoryWriter {
    fn write_row(&mut self, row: &TrajectoryRow) -> OutputResult<()> {
        self.writer.write_record(&[
            row.time_ms.to_string(),
            row.vehicle.clone(),
            row.event.as_str().to_string(),
            row.from.to_string(),
            row.to.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.writer.flush()?;
        Ok(())
    }
}
