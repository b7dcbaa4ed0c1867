//! `TrajectoryObserver<W>` — bridges `EngineObserver` to a `TrajectoryWriter`.

use std::sync::{Arc, Mutex};

use agv_core::{PointId, SimTime};
use agv_network::Segment;
use agv_sim::{EngineObserver, ExitQueue, Vehicle};

use crate::row::{TrajectoryEvent, TrajectoryRow, NO_POINT};
use crate::writer::TrajectoryWriter;
use crate::OutputError;

/// An [`EngineObserver`] that logs every engine event through a
/// [`TrajectoryWriter`] backend.
///
/// Observer hooks have no return value, so the first write error is parked
/// in a shared slot; grab a handle with [`error_slot`](Self::error_slot)
/// before registering the observer and check it after the run.  The writer
/// is finished when the observer is dropped (normally when the engine is).
pub struct TrajectoryObserver<W: TrajectoryWriter> {
    writer: W,
    error: Arc<Mutex<Option<OutputError>>>,
}

impl<W: TrajectoryWriter> TrajectoryObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared slot holding the first write error, if any occurred.
    pub fn error_slot(&self) -> Arc<Mutex<Option<OutputError>>> {
        Arc::clone(&self.error)
    }

    fn record(&mut self, time: SimTime, vehicle: &Vehicle, event: TrajectoryEvent, from: u16, to: u16) {
        let row = TrajectoryRow {
            time_ms: time.as_millis(),
            vehicle: vehicle.name.clone(),
            event,
            from,
            to,
        };
        if let Err(e) = self.writer.write_row(&row) {
            let mut slot = self.error.lock().unwrap_or_else(|p| p.into_inner());
            if slot.is_none() {
                *slot = Some(e);
            }
        }
    }
}

impl<W: TrajectoryWriter> EngineObserver for TrajectoryObserver<W> {
    fn on_enter(&mut self, now: SimTime, vehicle: &Vehicle, point: PointId) {
        self.record(now, vehicle, TrajectoryEvent::Enter, point.0, NO_POINT);
    }

    fn on_arrive(&mut self, now: SimTime, vehicle: &Vehicle, segment: &Segment) {
        self.record(now, vehicle, TrajectoryEvent::Arrive, segment.start.0, segment.end.0);
    }

    fn on_complete(&mut self, now: SimTime, vehicle: &Vehicle, segment: &Segment) {
        self.record(now, vehicle, TrajectoryEvent::Complete, segment.start.0, segment.end.0);
    }

    fn on_depart(&mut self, now: SimTime, vehicle: &Vehicle, segment: &Segment) {
        self.record(now, vehicle, TrajectoryEvent::Depart, segment.start.0, segment.end.0);
    }

    fn on_ready_to_exit(
        &mut self,
        now: SimTime,
        vehicle: &Vehicle,
        point: PointId,
        _exits: &mut ExitQueue,
    ) {
        self.record(now, vehicle, TrajectoryEvent::ReadyToExit, point.0, NO_POINT);
    }

    fn on_route_failed(&mut self, now: SimTime, vehicle: &Vehicle, from: PointId, dest: PointId) {
        self.record(now, vehicle, TrajectoryEvent::RouteMiss, from.0, dest.0);
    }
}

impl<W: TrajectoryWriter> Drop for TrajectoryObserver<W> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.finish() {
            let mut slot = self.error.lock().unwrap_or_else(|p| p.into_inner());
            if slot.is_none() {
                *slot = Some(e);
            }
        }
    }
}
