//! Plain data rows written by trajectory backends.

/// Placeholder for the `to` column on events tied to a single control point.
pub const NO_POINT: u16 = u16::MAX;

/// The engine transition a row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryEvent {
    Enter,
    Arrive,
    Complete,
    Depart,
    ReadyToExit,
    RouteMiss,
}

impl TrajectoryEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TrajectoryEvent::Enter => "enter",
            TrajectoryEvent::Arrive => "arrive",
            TrajectoryEvent::Complete => "complete",
            TrajectoryEvent::Depart => "depart",
            TrajectoryEvent::ReadyToExit => "ready_to_exit",
            TrajectoryEvent::RouteMiss => "route_miss",
        }
    }
}

/// One engine event.
///
/// `from`/`to` are compact point ids.  Segment events carry both endpoints;
/// point events carry the point in `from` and [`NO_POINT`] in `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryRow {
    pub time_ms: u64,
    pub vehicle: String,
    pub event: TrajectoryEvent,
    pub from: u16,
    pub to: u16,
}
