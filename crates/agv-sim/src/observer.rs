//! Engine observers.
//!
//! Observers are registered with the engine and invoked synchronously, in
//! registration order, at each state-machine transition.  They receive
//! immutable views of the payloads; the single sanctioned way back into the
//! engine is [`ExitQueue::request`] from `on_ready_to_exit`, which the engine
//! drains (calling [`exit`][crate::TrafficEngine::exit]) as soon as the hook
//! returns.

use std::sync::{Arc, Mutex};

use agv_core::{PointId, SimTime, VehicleId};
use agv_network::Segment;

use crate::vehicle::Vehicle;

// ── ExitQueue ─────────────────────────────────────────────────────────────────

/// Exit requests collected during `on_ready_to_exit`.
#[derive(Debug, Default)]
pub struct ExitQueue {
    requests: Vec<(VehicleId, PointId)>,
}

impl ExitQueue {
    /// Ask the engine to exit `vehicle` at `point` once the hook returns.
    pub fn request(&mut self, vehicle: VehicleId, point: PointId) {
        self.requests.push((vehicle, point));
    }

    pub(crate) fn take(&mut self) -> Vec<(VehicleId, PointId)> {
        std::mem::take(&mut self.requests)
    }
}

// ── EngineObserver ────────────────────────────────────────────────────────────

/// Callbacks fired by the engine at each transition.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Handlers must not block; they run
/// inside the event being processed.
pub trait EngineObserver {
    /// A vehicle was admitted into the network at `point`.
    fn on_enter(&mut self, _now: SimTime, _vehicle: &Vehicle, _point: PointId) {}

    /// A vehicle started occupying `segment` (fresh entry or hop).
    fn on_arrive(&mut self, _now: SimTime, _vehicle: &Vehicle, _segment: &Segment) {}

    /// A vehicle finished traversing `segment` and joined its `out_pending`.
    fn on_complete(&mut self, _now: SimTime, _vehicle: &Vehicle, _segment: &Segment) {}

    /// A vehicle left `segment` toward its next segment.
    fn on_depart(&mut self, _now: SimTime, _vehicle: &Vehicle, _segment: &Segment) {}

    /// A vehicle reached its destination at `point` and waits for the host
    /// to confirm removal via `exits`.
    fn on_ready_to_exit(
        &mut self,
        _now: SimTime,
        _vehicle: &Vehicle,
        _point: PointId,
        _exits: &mut ExitQueue,
    ) {
    }

    /// The routing table has no usable hop from `from` toward `dest` for
    /// this vehicle.  Fired once per stall.
    fn on_route_failed(&mut self, _now: SimTime, _vehicle: &Vehicle, _from: PointId, _dest: PointId) {
    }
}

/// An [`EngineObserver`] that does nothing.
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

// ── ExitOnReady ───────────────────────────────────────────────────────────────

/// Confirms every `ready_to_exit` immediately: the host behavior for runs
/// where nothing holds vehicles at their destination.
pub struct ExitOnReady;

impl EngineObserver for ExitOnReady {
    fn on_ready_to_exit(
        &mut self,
        _now: SimTime,
        vehicle: &Vehicle,
        point: PointId,
        exits: &mut ExitQueue,
    ) {
        exits.request(vehicle.id, point);
    }
}

// ── FlowStats ─────────────────────────────────────────────────────────────────

/// Counters accumulated by [`FlowStats`].
#[derive(Debug, Default, Clone)]
pub struct FlowCounters {
    pub entered: u64,
    pub arrivals: u64,
    pub completions: u64,
    pub departures: u64,
    pub route_misses: u64,
    /// `(vehicle, destination point, clock)` per `ready_to_exit` event, in
    /// firing order.
    pub ready: Vec<(VehicleId, PointId, SimTime)>,
}

/// Shared-handle metrics observer.
///
/// Clone it, register one clone with the engine, and read the counters from
/// the other after the run.
#[derive(Default, Clone)]
pub struct FlowStats {
    inner: Arc<Mutex<FlowCounters>>,
}

impl FlowStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counters.
    pub fn counters(&self) -> FlowCounters {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FlowCounters> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EngineObserver for FlowStats {
    fn on_enter(&mut self, _now: SimTime, _vehicle: &Vehicle, _point: PointId) {
        self.lock().entered += 1;
    }

    fn on_arrive(&mut self, _now: SimTime, _vehicle: &Vehicle, _segment: &Segment) {
        self.lock().arrivals += 1;
    }

    fn on_complete(&mut self, _now: SimTime, _vehicle: &Vehicle, _segment: &Segment) {
        self.lock().completions += 1;
    }

    fn on_depart(&mut self, _now: SimTime, _vehicle: &Vehicle, _segment: &Segment) {
        self.lock().departures += 1;
    }

    fn on_ready_to_exit(
        &mut self,
        now: SimTime,
        vehicle: &Vehicle,
        point: PointId,
        _exits: &mut ExitQueue,
    ) {
        self.lock().ready.push((vehicle.id, point, now));
    }

    fn on_route_failed(&mut self, _now: SimTime, _vehicle: &Vehicle, _from: PointId, _dest: PointId) {
        self.lock().route_misses += 1;
    }
}
