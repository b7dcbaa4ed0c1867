//! Vehicle state and next-segment resolution.

use std::collections::VecDeque;

use agv_core::{PointId, SegmentId, VehicleId};
use agv_network::Network;
use agv_routing::RoutingTable;

/// Outcome of asking a vehicle for its next segment at a control point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextSegment {
    /// The target list is exhausted — the vehicle is at its destination.
    Arrived,
    /// The routing table has no hop toward `dest`, or it nominated a hop
    /// with no matching segment in the network.
    NoRoute { dest: PointId },
    /// The segment to take next.
    Segment(SegmentId),
}

/// An automated guided vehicle.
///
/// Holds the ordered target list and the transient occupancy state the
/// engine maintains while the vehicle moves through the network.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// Arena id, assigned by [`TrafficEngine::add_vehicle`][crate::TrafficEngine::add_vehicle].
    pub id: VehicleId,
    pub name: String,
    /// Distance units per second.  Must be positive and finite.
    pub speed: f32,
    /// Capacity units consumed while occupying a segment.
    pub capacity_needed: u32,

    /// The segment currently occupied (traversing, staged, or ready to exit).
    pub current_segment: Option<SegmentId>,
    /// The downstream segment in whose `in_pending` queue this vehicle waits.
    pub pending_segment: Option<SegmentId>,
    /// `true` when the vehicle is at rest; its next traversal pays the
    /// cold-start delay.
    pub is_stopped: bool,

    /// Remaining route targets, front first.  Empty means "destination reached".
    pub targets: VecDeque<PointId>,

    /// One routing-miss diagnostic per stall; reset on re-dispatch.
    pub(crate) route_miss_reported: bool,
    /// Set once the vehicle has exited the network.
    pub(crate) gone: bool,
}

impl Vehicle {
    /// A vehicle with unit capacity.  The id is assigned at registration.
    pub fn new(name: impl Into<String>, speed: f32, targets: impl IntoIterator<Item = PointId>) -> Self {
        Self {
            id: VehicleId::INVALID,
            name: name.into(),
            speed,
            capacity_needed: 1,
            current_segment: None,
            pending_segment: None,
            is_stopped: true,
            targets: targets.into_iter().collect(),
            route_miss_reported: false,
            gone: false,
        }
    }

    pub fn with_capacity_needed(mut self, capacity: u32) -> Self {
        self.capacity_needed = capacity;
        self
    }

    /// `true` once the vehicle has exited the network.
    pub fn is_gone(&self) -> bool {
        self.gone
    }

    /// Resolve the segment to take from `at`.
    ///
    /// Collapses stale targets first: any run of leading targets equal to
    /// `at` is consumed, so a vehicle standing on a target advances without
    /// choosing a segment.  Then the head target is looked up in the routing
    /// table and the nominated hop resolved against the network.
    pub fn next_segment(
        &mut self,
        at: PointId,
        routing: &RoutingTable,
        network: &Network,
    ) -> NextSegment {
        while self.targets.front() == Some(&at) {
            self.targets.pop_front();
        }
        let Some(&dest) = self.targets.front() else {
            return NextSegment::Arrived;
        };
        match routing.next_hop(at, dest) {
            Some(hop) => match network.segment_between(at, hop) {
                Some(segment) => NextSegment::Segment(segment),
                None => NextSegment::NoRoute { dest },
            },
            None => NextSegment::NoRoute { dest },
        }
    }

    /// Consume the head target if it equals `point`.  Only the head is ever
    /// removed; intermediate targets are never skipped.
    pub fn remove_target(&mut self, point: PointId) {
        if self.targets.front() == Some(&point) {
            self.targets.pop_front();
        }
    }
}
