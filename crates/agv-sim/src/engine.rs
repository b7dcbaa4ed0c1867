//! The `TrafficEngine` and its transition rules.
//!
//! # Ownership
//!
//! The engine owns the network (and with it every segment's dynamic state),
//! the routing table, the vehicle arena, and the event queue.  Observers are
//! boxed handles invoked in registration order.  All transitions run to
//! completion before the next event is popped, so state is quiescent between
//! events.
//!
//! # Admission and smoothing
//!
//! A segment admits a vehicle when it has capacity *and* the previous
//! admission of the same kind (entry or departure) is at least
//! `smooth_factor_ms` in the past.  A too-early attempt is rescheduled for
//! the instant the gap closes.  Admission stamps start unset, so the first
//! admission into a segment is never delayed.
//!
//! # Backward propagation
//!
//! A blocked `out_pending` head is parked in the downstream segment's
//! `in_pending`.  Whenever that segment frees capacity (a vehicle departs
//! from it or exits on it), the parked head's own segment is woken with a
//! targeted `AttemptDepart`, and the chain repeats upstream.

use std::collections::{HashMap, VecDeque};

use agv_core::{traversal_ms, PointId, SegmentId, SimTime, VehicleId, MIN_TICK_MS};
use agv_network::Network;
use agv_routing::RoutingTable;

use crate::observer::{EngineObserver, ExitQueue};
use crate::schedule::{EngineAction, EventQueue};
use crate::vehicle::{NextSegment, Vehicle};
use crate::{EngineError, EngineResult};

// ── Config ────────────────────────────────────────────────────────────────────

/// Timing parameters of the movement engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Minimum simulated gap between consecutive admissions into the same
    /// segment, applied at entry and at departure.  Zero disables smoothing.
    pub smooth_factor_ms: u64,
    /// Extra traversal delay the first time a stopped vehicle moves again.
    pub cold_start_delay_ms: u64,
}

// ── Ready list entry ──────────────────────────────────────────────────────────

/// A vehicle waiting for the host to confirm its removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyVehicle {
    vehicle: VehicleId,
    /// The segment the vehicle is exiting from; `None` when the vehicle was
    /// ready at its entry point and never occupied a segment.
    segment: Option<SegmentId>,
    point: PointId,
}

// ── TrafficEngine ─────────────────────────────────────────────────────────────

/// The discrete-event movement engine.
pub struct TrafficEngine {
    network: Network,
    routing: RoutingTable,
    config: EngineConfig,

    vehicles: Vec<Vehicle>,
    /// Vehicles awaiting admission, FIFO per entry control point.
    entry_pending: HashMap<PointId, VecDeque<VehicleId>>,
    /// Vehicle-path pairs awaiting the matching `exit` call.
    ready_to_exit: Vec<ReadyVehicle>,

    clock: SimTime,
    queue: EventQueue,
    observers: Vec<Box<dyn EngineObserver>>,
}

impl TrafficEngine {
    pub fn new(network: Network, routing: RoutingTable, config: EngineConfig) -> Self {
        Self {
            network,
            routing,
            config,
            vehicles: Vec::new(),
            entry_pending: HashMap::new(),
            ready_to_exit: Vec::new(),
            clock: SimTime::ZERO,
            queue: EventQueue::new(),
            observers: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn vehicle(&self, id: VehicleId) -> EngineResult<&Vehicle> {
        self.vehicles
            .get(id.index())
            .ok_or(EngineError::UnknownVehicle(id))
    }

    /// Number of vehicles still waiting for admission, across all points.
    pub fn entry_pending_count(&self) -> usize {
        self.entry_pending.values().map(VecDeque::len).sum()
    }

    /// Vehicles currently awaiting an `exit` confirmation.
    pub fn ready_vehicles(&self) -> impl Iterator<Item = (VehicleId, PointId)> + '_ {
        self.ready_to_exit.iter().map(|r| (r.vehicle, r.point))
    }

    // ── Registration ──────────────────────────────────────────────────────

    /// Register an observer.  Observers fire in registration order.
    pub fn register_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    /// Validate and register a vehicle, assigning its arena id.
    pub fn add_vehicle(&mut self, mut vehicle: Vehicle) -> EngineResult<VehicleId> {
        if !(vehicle.speed.is_finite() && vehicle.speed > 0.0) {
            return Err(EngineError::InvalidVehicle {
                name: vehicle.name,
                detail: format!("speed must be positive and finite, got {}", vehicle.speed),
            });
        }
        if vehicle.capacity_needed == 0 {
            return Err(EngineError::InvalidVehicle {
                name: vehicle.name,
                detail: "capacity_needed must be at least 1".into(),
            });
        }
        if let Some(&bad) = vehicle
            .targets
            .iter()
            .find(|t| t.index() >= self.network.point_count())
        {
            return Err(EngineError::UnknownPoint(bad));
        }

        let id = VehicleId(self.vehicles.len() as u32);
        vehicle.id = id;
        self.vehicles.push(vehicle);
        Ok(id)
    }

    // ── Public operations ─────────────────────────────────────────────────

    /// Submit `vehicle` for admission at control point `point`.
    ///
    /// If the vehicle's targets collapse onto `point` itself it is ready to
    /// exit immediately and is never enqueued.
    pub fn request_to_enter(&mut self, vehicle: VehicleId, point: PointId) -> EngineResult<()> {
        self.check_vehicle(vehicle)?;
        self.check_point(point)?;

        let v = &mut self.vehicles[vehicle.index()];
        v.gone = false;
        v.route_miss_reported = false;

        if v.targets.iter().all(|&t| t == point) {
            return self.ready_at(vehicle, None, point);
        }

        self.entry_pending.entry(point).or_default().push_back(vehicle);
        self.queue
            .schedule_at(self.clock.offset(MIN_TICK_MS), EngineAction::AttemptEnter(point));
        Ok(())
    }

    /// Confirm removal of `vehicle` at `point`.
    ///
    /// Consumes the matching ready-to-exit pair, releases the capacity the
    /// vehicle still holds, and wakes whatever that release unblocks.  A call
    /// with no matching pair is a no-op.
    pub fn exit(&mut self, vehicle: VehicleId, point: PointId) -> EngineResult<()> {
        let Some(idx) = self
            .ready_to_exit
            .iter()
            .position(|r| r.vehicle == vehicle && r.point == point)
        else {
            return Ok(());
        };
        let ready = self.ready_to_exit.remove(idx);

        let v = &mut self.vehicles[vehicle.index()];
        v.gone = true;
        let released = v.current_segment.take();

        if let Some(segment) = released {
            let needed = self.vehicles[vehicle.index()].capacity_needed;
            self.release_capacity(segment, needed, "exit")?;

            if let Some(&(waiter, upstream)) = self.network.segment(segment).in_pending.front() {
                self.queue.schedule_at(
                    self.clock.offset(MIN_TICK_MS),
                    EngineAction::AttemptDepart(upstream, Some(waiter)),
                );
            }
            let entry_point = self.network.segment(segment).start;
            self.queue
                .schedule_at(self.clock.offset(MIN_TICK_MS), EngineAction::AttemptEnter(entry_point));
        }
        debug_assert_eq!(ready.segment, released);
        Ok(())
    }

    // ── Event loop ────────────────────────────────────────────────────────

    /// Pop and execute the next event.  Returns `false` once the queue is
    /// drained.
    pub fn step(&mut self) -> EngineResult<bool> {
        let Some((time, action)) = self.queue.pop() else {
            return Ok(false);
        };
        debug_assert!(time >= self.clock, "event queue went backwards");
        self.clock = time;
        match action {
            EngineAction::AttemptEnter(point) => self.attempt_to_enter(point)?,
            EngineAction::Complete(vehicle, segment) => self.complete(vehicle, segment)?,
            EngineAction::AttemptDepart(segment, vehicle) => {
                self.attempt_to_depart(segment, vehicle)?
            }
        }
        Ok(true)
    }

    /// Execute events up to and including `horizon`, then park the clock
    /// there.
    pub fn run_until(&mut self, horizon: SimTime) -> EngineResult<()> {
        while self.queue.next_time().is_some_and(|t| t <= horizon) {
            self.step()?;
        }
        if self.clock < horizon {
            self.clock = horizon;
        }
        Ok(())
    }

    /// Execute events until the queue drains.
    pub fn run_to_idle(&mut self) -> EngineResult<()> {
        while self.step()? {}
        Ok(())
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Scan the entry-pending list at `point` in FIFO order and admit the
    /// first vehicle whose next segment has room.  Admitting (or hitting the
    /// smoothing window) stops the scan; a full segment moves it to the next
    /// pending vehicle.
    fn attempt_to_enter(&mut self, point: PointId) -> EngineResult<()> {
        let mut i = 0;
        loop {
            let Some(&vehicle) = self.entry_pending.get(&point).and_then(|q| q.get(i)) else {
                return Ok(());
            };

            let outcome =
                self.vehicles[vehicle.index()].next_segment(point, &self.routing, &self.network);
            match outcome {
                NextSegment::Arrived => {
                    self.remove_entry_pending(point, vehicle);
                    self.ready_at(vehicle, None, point)?;
                    // Same index now holds the next vehicle.
                }
                NextSegment::NoRoute { dest } => {
                    self.report_route_miss(vehicle, point, dest);
                    i += 1;
                }
                NextSegment::Segment(segment) => {
                    let needed = self.vehicles[vehicle.index()].capacity_needed;
                    let seg = self.network.segment(segment);
                    if !seg.has_room(needed) {
                        i += 1;
                        continue;
                    }
                    if let Some(wait) = self.smoothing_wait(seg.enter_stamp) {
                        self.queue
                            .schedule_at(self.clock.offset(wait), EngineAction::AttemptEnter(point));
                        return Ok(());
                    }
                    return self.enter(vehicle, segment, point);
                }
            }
        }
    }

    /// Admit `vehicle` from `point` into `segment`.
    fn enter(&mut self, vehicle: VehicleId, segment: SegmentId, point: PointId) -> EngineResult<()> {
        self.network.segment_mut(segment).enter_stamp = Some(self.clock);
        for obs in self.observers.iter_mut() {
            obs.on_enter(self.clock, &self.vehicles[vehicle.index()], point);
        }
        self.remove_entry_pending(point, vehicle);
        self.vehicles[vehicle.index()].is_stopped = true;
        self.arrive(vehicle, segment)
    }

    /// Begin occupying `segment`: consume capacity and schedule traversal
    /// completion.
    fn arrive(&mut self, vehicle: VehicleId, segment: SegmentId) -> EngineResult<()> {
        for obs in self.observers.iter_mut() {
            obs.on_arrive(
                self.clock,
                &self.vehicles[vehicle.index()],
                self.network.segment(segment),
            );
        }

        let start = self.network.segment(segment).start;
        let v = &mut self.vehicles[vehicle.index()];
        v.current_segment = Some(segment);
        v.remove_target(start);

        let needed = v.capacity_needed;
        self.take_capacity(segment, needed, "arrive")?;

        let v = &mut self.vehicles[vehicle.index()];
        let mut delay = traversal_ms(self.network.segment(segment).length, v.speed);
        if v.is_stopped {
            delay += self.config.cold_start_delay_ms;
            v.is_stopped = false;
        }
        self.queue
            .schedule_at(self.clock.offset(delay), EngineAction::Complete(vehicle, segment));
        Ok(())
    }

    /// Traversal finished: stage the vehicle at the downstream end.
    fn complete(&mut self, vehicle: VehicleId, segment: SegmentId) -> EngineResult<()> {
        self.network
            .segment_mut(segment)
            .out_pending
            .push_back(vehicle);
        for obs in self.observers.iter_mut() {
            obs.on_complete(
                self.clock,
                &self.vehicles[vehicle.index()],
                self.network.segment(segment),
            );
        }
        self.queue.schedule_at(
            self.clock.offset(MIN_TICK_MS),
            EngineAction::AttemptDepart(segment, None),
        );
        Ok(())
    }

    /// Try to discharge `segment`'s `out_pending` head into its next segment.
    ///
    /// `target` is a wake-up for a specific vehicle; it is ignored when that
    /// vehicle already left the queue.
    fn attempt_to_depart(
        &mut self,
        segment: SegmentId,
        target: Option<VehicleId>,
    ) -> EngineResult<()> {
        let seg = self.network.segment(segment);
        let Some(&head) = seg.out_pending.front() else {
            return Ok(());
        };
        let vehicle = match target {
            Some(v) if !seg.out_pending.contains(&v) => return Ok(()),
            Some(v) => v,
            None => head,
        };

        let congested = self.network.segment(segment).congested;
        self.vehicles[vehicle.index()].is_stopped = congested;

        let end = self.network.segment(segment).end;
        let outcome = self.vehicles[vehicle.index()].next_segment(end, &self.routing, &self.network);
        match outcome {
            NextSegment::Arrived => {
                self.remove_out_pending(segment, vehicle);
                self.ready_at(vehicle, Some(segment), end)
            }
            NextSegment::NoRoute { dest } => {
                // The head stalls in place and keeps blocking the queue;
                // progress resumes only if the table is fixed offline.
                self.report_route_miss(vehicle, end, dest);
                Ok(())
            }
            NextSegment::Segment(next) => self.try_depart_into(segment, vehicle, next),
        }
    }

    /// The departure half of `attempt_to_depart`: capacity check, departure
    /// smoothing, no-overtake promotion, and the blocked-head parking rule.
    fn try_depart_into(
        &mut self,
        segment: SegmentId,
        vehicle: VehicleId,
        next: SegmentId,
    ) -> EngineResult<()> {
        let needed = self.vehicles[vehicle.index()].capacity_needed;

        if self.network.segment(next).has_room(needed) {
            if let Some(wait) = self.smoothing_wait(self.network.segment(next).depart_stamp) {
                self.network.segment_mut(segment).congested = true;
                self.queue.schedule_at(
                    self.clock.offset(wait),
                    EngineAction::AttemptDepart(segment, Some(vehicle)),
                );
                return Ok(());
            }

            self.network.segment_mut(segment).congested = false;
            self.remove_out_pending(segment, vehicle);

            // No-overtake promotion: the new head takes the vacated claim on
            // its own next segment.
            let next_head = self.network.segment(segment).out_pending.front().copied();
            if let Some(next_head) = next_head {
                let end = self.network.segment(segment).end;
                let head_outcome =
                    self.vehicles[next_head.index()].next_segment(end, &self.routing, &self.network);
                if let NextSegment::Segment(claim) = head_outcome {
                    self.network
                        .segment_mut(claim)
                        .in_pending
                        .push_back((next_head, segment));
                    self.vehicles[next_head.index()].pending_segment = Some(claim);
                }
            }

            // The departing vehicle's own parked claim (if any) must be the
            // head of its pending segment's queue.
            let parked = self.vehicles[vehicle.index()].pending_segment.take();
            if let Some(parked) = parked {
                match self.network.segment_mut(parked).in_pending.pop_front() {
                    Some((v, _)) if v == vehicle => {}
                    other => {
                        return Err(EngineError::PendingInvariant {
                            segment: parked,
                            detail: format!(
                                "expected head ({vehicle}, _), found {other:?} while departing"
                            ),
                        });
                    }
                }
            }

            self.depart(vehicle, segment, next)?;
            self.network.segment_mut(next).depart_stamp = Some(self.clock);
            Ok(())
        } else {
            // Park the blocked head in the downstream queue, once.  A head
            // promoted earlier already holds its claim.
            let only_waiter = self.network.segment(segment).out_pending.len() == 1;
            if only_waiter && self.vehicles[vehicle.index()].pending_segment.is_none() {
                self.network
                    .segment_mut(next)
                    .in_pending
                    .push_back((vehicle, segment));
                self.vehicles[vehicle.index()].pending_segment = Some(next);
            }
            Ok(())
        }
    }

    /// Leave `segment`, release its capacity, occupy `next` inline, and wake
    /// everything the release may unblock.
    fn depart(&mut self, vehicle: VehicleId, segment: SegmentId, next: SegmentId) -> EngineResult<()> {
        for obs in self.observers.iter_mut() {
            obs.on_depart(
                self.clock,
                &self.vehicles[vehicle.index()],
                self.network.segment(segment),
            );
        }

        let needed = self.vehicles[vehicle.index()].capacity_needed;
        self.release_capacity(segment, needed, "depart")?;

        self.arrive(vehicle, next)?;

        self.queue.schedule_at(
            self.clock.offset(MIN_TICK_MS),
            EngineAction::AttemptDepart(segment, None),
        );
        if let Some(&(waiter, upstream)) = self.network.segment(segment).in_pending.front() {
            self.queue.schedule_at(
                self.clock.offset(MIN_TICK_MS),
                EngineAction::AttemptDepart(upstream, Some(waiter)),
            );
        }
        let entry_point = self.network.segment(segment).start;
        self.queue
            .schedule_at(self.clock.offset(MIN_TICK_MS), EngineAction::AttemptEnter(entry_point));
        Ok(())
    }

    /// Record the vehicle-path pair, fire `on_ready_to_exit`, and process any
    /// exit requests the observers queued.
    fn ready_at(
        &mut self,
        vehicle: VehicleId,
        segment: Option<SegmentId>,
        point: PointId,
    ) -> EngineResult<()> {
        self.ready_to_exit.push(ReadyVehicle { vehicle, segment, point });

        let mut exits = ExitQueue::default();
        for obs in self.observers.iter_mut() {
            obs.on_ready_to_exit(self.clock, &self.vehicles[vehicle.index()], point, &mut exits);
        }
        for (v, p) in exits.take() {
            self.exit(v, p)?;
        }
        Ok(())
    }

    // ── Small helpers ─────────────────────────────────────────────────────

    /// Milliseconds still to wait before the smoothing gap since `stamp`
    /// closes, or `None` if admission may proceed now.
    fn smoothing_wait(&self, stamp: Option<SimTime>) -> Option<u64> {
        let stamp = stamp?;
        let elapsed = self.clock.since(stamp);
        (elapsed < self.config.smooth_factor_ms).then(|| self.config.smooth_factor_ms - elapsed)
    }

    fn report_route_miss(&mut self, vehicle: VehicleId, from: PointId, dest: PointId) {
        if self.vehicles[vehicle.index()].route_miss_reported {
            return;
        }
        self.vehicles[vehicle.index()].route_miss_reported = true;
        for obs in self.observers.iter_mut() {
            obs.on_route_failed(self.clock, &self.vehicles[vehicle.index()], from, dest);
        }
    }

    fn remove_entry_pending(&mut self, point: PointId, vehicle: VehicleId) {
        if let Some(queue) = self.entry_pending.get_mut(&point) {
            queue.retain(|&v| v != vehicle);
        }
    }

    fn remove_out_pending(&mut self, segment: SegmentId, vehicle: VehicleId) {
        self.network
            .segment_mut(segment)
            .out_pending
            .retain(|&v| v != vehicle);
    }

    fn take_capacity(&mut self, segment: SegmentId, needed: u32, event: &'static str) -> EngineResult<()> {
        let seg = self.network.segment_mut(segment);
        match seg.remaining_capacity.checked_sub(needed) {
            Some(left) => {
                seg.remaining_capacity = left;
                Ok(())
            }
            None => Err(EngineError::CapacityInvariant {
                segment,
                event,
                detail: format!(
                    "remaining {} cannot cover {needed}",
                    seg.remaining_capacity
                ),
            }),
        }
    }

    fn release_capacity(&mut self, segment: SegmentId, released: u32, event: &'static str) -> EngineResult<()> {
        let seg = self.network.segment_mut(segment);
        let raised = seg.remaining_capacity + released;
        if raised > seg.total_capacity {
            return Err(EngineError::CapacityInvariant {
                segment,
                event,
                detail: format!(
                    "remaining {} + released {released} exceeds total {}",
                    seg.remaining_capacity, seg.total_capacity
                ),
            });
        }
        seg.remaining_capacity = raised;
        Ok(())
    }

    fn check_vehicle(&self, vehicle: VehicleId) -> EngineResult<()> {
        if vehicle.index() >= self.vehicles.len() {
            return Err(EngineError::UnknownVehicle(vehicle));
        }
        Ok(())
    }

    fn check_point(&self, point: PointId) -> EngineResult<()> {
        if point.index() >= self.network.point_count() {
            return Err(EngineError::UnknownPoint(point));
        }
        Ok(())
    }
}
