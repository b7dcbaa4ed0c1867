//! Integration tests for agv-sim.

use std::sync::{Arc, Mutex};

use agv_core::{PointId, Position, SimTime, VehicleId};
use agv_network::{ControlPoint, Network, Segment};
use agv_routing::{build_complete_table, RoutingTable};

use crate::{
    EngineAction, EngineConfig, EngineError, EngineObserver, EventQueue, ExitOnReady, ExitQueue,
    FlowStats, NextSegment, TrafficEngine, Vehicle,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn pt(name: &str, x: f32, y: f32) -> ControlPoint {
    ControlPoint::new(name, Position::new(x, y)).with_inout(true)
}

fn seg(net: &Network, from: &str, to: &str, capacity: u32, length: f32) -> Segment {
    let from = net.point_id(from).unwrap();
    let to = net.point_id(to).unwrap();
    Segment::new(from, to, capacity, length)
}

fn config(smooth_ms: u64, cold_ms: u64) -> EngineConfig {
    EngineConfig {
        smooth_factor_ms: smooth_ms,
        cold_start_delay_ms: cold_ms,
    }
}

/// Engine over `net` with a complete routing table and an `ExitOnReady` host.
fn engine_with(net: Network, cfg: EngineConfig) -> TrafficEngine {
    let table = build_complete_table(&net);
    let mut engine = TrafficEngine::new(net, table, cfg);
    engine.register_observer(Box::new(ExitOnReady));
    engine
}

fn id_of(engine: &TrafficEngine, name: &str) -> PointId {
    engine.network().point_id(name).unwrap()
}

/// Single segment A→B.
fn line_network(capacity: u32, length: f32) -> Network {
    let mut net = Network::new();
    net.add_point(pt("A", 0.0, 0.0)).unwrap();
    net.add_point(pt("B", length, 0.0)).unwrap();
    let ab = seg(&net, "A", "B", capacity, length);
    net.add_segment(ab).unwrap();
    net
}

/// The diamond layout: A→B→C→F across the top, A→D→E with cross links
/// D→C, D→F, E→C, E→D underneath.  Every segment has capacity 1 and
/// length 100.
fn diamond_network() -> Network {
    let mut net = Network::new();
    for (name, x, y) in [
        ("A", 0.0, 0.0),
        ("B", 1.0, 0.0),
        ("C", 2.0, 0.0),
        ("D", 1.0, 1.0),
        ("E", 2.0, 1.0),
        ("F", 3.0, 0.0),
    ] {
        net.add_point(pt(name, x, y)).unwrap();
    }
    for (from, to) in [
        ("A", "B"),
        ("B", "C"),
        ("C", "F"),
        ("A", "D"),
        ("D", "E"),
        ("E", "D"),
        ("D", "C"),
        ("D", "F"),
        ("E", "C"),
    ] {
        let s = seg(&net, from, to, 1, 100.0);
        net.add_segment(s).unwrap();
    }
    net
}

fn vehicle(net: &Network, name: &str, targets: &[&str]) -> Vehicle {
    let targets: Vec<PointId> = targets.iter().map(|t| net.point_id(t).unwrap()).collect();
    Vehicle::new(name, 1.0, targets)
}

/// Every segment back at full capacity with empty queues.
fn assert_quiescent(engine: &TrafficEngine) {
    for (id, s) in engine.network().segments() {
        assert_eq!(
            s.remaining_capacity, s.total_capacity,
            "segment {id} still holds capacity"
        );
        assert!(s.out_pending.is_empty(), "segment {id} has staged vehicles");
        assert!(s.in_pending.is_empty(), "segment {id} has queued vehicles");
    }
    assert_eq!(engine.entry_pending_count(), 0);
}

// ── Event recorder ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoggedEvent {
    kind: &'static str,
    vehicle: VehicleId,
    time: SimTime,
}

#[derive(Default, Clone)]
struct Recorder(Arc<Mutex<Vec<LoggedEvent>>>);

impl Recorder {
    fn log(&self, kind: &'static str, vehicle: VehicleId, time: SimTime) {
        self.0.lock().unwrap().push(LoggedEvent { kind, vehicle, time });
    }

    fn events(&self) -> Vec<LoggedEvent> {
        self.0.lock().unwrap().clone()
    }

    fn time_of(&self, kind: &str, vehicle: VehicleId) -> Option<SimTime> {
        self.events()
            .iter()
            .find(|e| e.kind == kind && e.vehicle == vehicle)
            .map(|e| e.time)
    }
}

impl EngineObserver for Recorder {
    fn on_enter(&mut self, now: SimTime, v: &Vehicle, _point: PointId) {
        self.log("enter", v.id, now);
    }
    fn on_arrive(&mut self, now: SimTime, v: &Vehicle, _segment: &Segment) {
        self.log("arrive", v.id, now);
    }
    fn on_complete(&mut self, now: SimTime, v: &Vehicle, _segment: &Segment) {
        self.log("complete", v.id, now);
    }
    fn on_depart(&mut self, now: SimTime, v: &Vehicle, _segment: &Segment) {
        self.log("depart", v.id, now);
    }
    fn on_ready_to_exit(&mut self, now: SimTime, v: &Vehicle, _point: PointId, _exits: &mut ExitQueue) {
        self.log("ready", v.id, now);
    }
    fn on_route_failed(&mut self, now: SimTime, v: &Vehicle, _from: PointId, _dest: PointId) {
        self.log("route_miss", v.id, now);
    }
}

// ── Event queue ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod queue_tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.schedule_at(SimTime(30), EngineAction::AttemptEnter(PointId(3)));
        q.schedule_at(SimTime(10), EngineAction::AttemptEnter(PointId(1)));
        q.schedule_at(SimTime(20), EngineAction::AttemptEnter(PointId(2)));

        let order: Vec<SimTime> = std::iter::from_fn(|| q.pop().map(|(t, _)| t)).collect();
        assert_eq!(order, vec![SimTime(10), SimTime(20), SimTime(30)]);
    }

    #[test]
    fn same_instant_is_fifo() {
        let mut q = EventQueue::new();
        for i in 0..5 {
            q.schedule_at(SimTime(7), EngineAction::AttemptEnter(PointId(i)));
        }
        for i in 0..5 {
            let (_, action) = q.pop().unwrap();
            assert_eq!(action, EngineAction::AttemptEnter(PointId(i)));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn len_tracks_across_buckets() {
        let mut q = EventQueue::new();
        q.schedule_at(SimTime(1), EngineAction::AttemptDepart(agv_core::SegmentId(0), None));
        q.schedule_at(SimTime(1), EngineAction::AttemptEnter(PointId(0)));
        q.schedule_at(SimTime(2), EngineAction::AttemptEnter(PointId(0)));
        assert_eq!(q.len(), 3);
        q.pop();
        assert_eq!(q.len(), 2);
        assert_eq!(q.next_time(), Some(SimTime(1)));
    }
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod vehicle_tests {
    use super::*;

    #[test]
    fn stale_targets_collapse() {
        let net = line_network(1, 10.0);
        let table = build_complete_table(&net);
        let a = net.point_id("A").unwrap();
        let b = net.point_id("B").unwrap();

        // Leading duplicates of the current point are consumed in one call.
        let mut v = Vehicle::new("agv", 1.0, [a, a, b]);
        let ab = net.segment_between(a, b).unwrap();
        assert_eq!(v.next_segment(a, &table, &net), NextSegment::Segment(ab));
        assert_eq!(v.targets.len(), 1);
    }

    #[test]
    fn empty_targets_mean_arrived() {
        let net = line_network(1, 10.0);
        let table = build_complete_table(&net);
        let b = net.point_id("B").unwrap();

        let mut v = Vehicle::new("agv", 1.0, [b]);
        assert_eq!(v.next_segment(b, &table, &net), NextSegment::Arrived);
        assert_eq!(v.next_segment(b, &table, &net), NextSegment::Arrived);
    }

    #[test]
    fn missing_route_is_reported() {
        let net = line_network(1, 10.0);
        let a = net.point_id("A").unwrap();
        let b = net.point_id("B").unwrap();

        let mut v = Vehicle::new("agv", 1.0, [b]);
        let empty = RoutingTable::new();
        assert_eq!(
            v.next_segment(a, &empty, &net),
            NextSegment::NoRoute { dest: b }
        );
    }

    #[test]
    fn remove_target_pops_head_only() {
        let a = PointId(0);
        let b = PointId(1);
        let mut v = Vehicle::new("agv", 1.0, [a, b, a]);
        v.remove_target(b); // not the head, untouched
        assert_eq!(v.targets.len(), 3);
        v.remove_target(a);
        assert_eq!(v.targets.len(), 2);
    }
}

// ── Engine basics ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn add_vehicle_validates() {
        let mut engine = engine_with(line_network(1, 10.0), config(0, 0));
        let a = id_of(&engine, "A");

        assert!(matches!(
            engine.add_vehicle(Vehicle::new("bad", 0.0, [a])),
            Err(EngineError::InvalidVehicle { .. })
        ));
        assert!(matches!(
            engine.add_vehicle(Vehicle::new("bad", 1.0, [a]).with_capacity_needed(0)),
            Err(EngineError::InvalidVehicle { .. })
        ));
        assert!(matches!(
            engine.add_vehicle(Vehicle::new("bad", 1.0, [PointId(77)])),
            Err(EngineError::UnknownPoint(_))
        ));
    }

    #[test]
    fn entry_at_sole_target_is_ready_immediately() {
        let stats = FlowStats::new();
        let mut engine = engine_with(line_network(1, 10.0), config(0, 0));
        engine.register_observer(Box::new(stats.clone()));
        let a = id_of(&engine, "A");

        let v = engine.add_vehicle(Vehicle::new("agv", 1.0, [a])).unwrap();
        engine.request_to_enter(v, a).unwrap();

        let counters = stats.counters();
        assert_eq!(counters.ready.len(), 1);
        assert_eq!(counters.ready[0].1, a);
        assert_eq!(counters.entered, 0, "vehicle never occupied a segment");
        assert!(engine.vehicle(v).unwrap().is_gone());
        assert_quiescent(&engine);
    }

    #[test]
    fn single_vehicle_crosses_one_segment() {
        let recorder = Recorder::default();
        let mut engine = engine_with(line_network(1, 100.0), config(0, 5_000));
        engine.register_observer(Box::new(recorder.clone()));
        let a = id_of(&engine, "A");

        let v = engine
            .add_vehicle(vehicle(engine.network(), "agv", &["B"]))
            .unwrap();
        engine.request_to_enter(v, a).unwrap();
        engine.run_to_idle().unwrap();

        let enter = recorder.time_of("enter", v).unwrap();
        let ready = recorder.time_of("ready", v).unwrap();
        // 100 units at 1 unit/s plus the cold start, plus the discharge tick.
        assert_eq!(ready.since(enter), 105_001);
        assert!(engine.vehicle(v).unwrap().is_gone());
        assert_eq!(engine.vehicle(v).unwrap().current_segment, None);
        assert_quiescent(&engine);
    }

    #[test]
    fn bad_exit_is_a_silent_noop() {
        let mut engine = engine_with(line_network(1, 10.0), config(0, 0));
        let a = id_of(&engine, "A");
        let v = engine
            .add_vehicle(vehicle(engine.network(), "agv", &["B"]))
            .unwrap();
        engine.request_to_enter(v, a).unwrap();

        // No ready pair exists yet; the call must not disturb anything.
        engine.exit(v, a).unwrap();
        assert_eq!(engine.entry_pending_count(), 1);
        assert!(!engine.vehicle(v).unwrap().is_gone());
    }
}

// ── Capacity gating (scenario: two vehicles, one slot) ────────────────────────

#[cfg(test)]
mod gating_tests {
    use super::*;

    #[test]
    fn second_vehicle_waits_for_first_exit() {
        let recorder = Recorder::default();
        let mut engine = engine_with(line_network(1, 10.0), config(2_000, 0));
        engine.register_observer(Box::new(recorder.clone()));
        let a = id_of(&engine, "A");

        let v1 = engine
            .add_vehicle(vehicle(engine.network(), "agv-1", &["B"]))
            .unwrap();
        let v2 = engine
            .add_vehicle(vehicle(engine.network(), "agv-2", &["B"]))
            .unwrap();
        engine.request_to_enter(v1, a).unwrap();
        engine.request_to_enter(v2, a).unwrap();
        engine.run_to_idle().unwrap();

        let enter1 = recorder.time_of("enter", v1).unwrap();
        let ready1 = recorder.time_of("ready", v1).unwrap();
        let enter2 = recorder.time_of("enter", v2).unwrap();

        // The slot frees only on the first vehicle's exit, and admissions at
        // the same segment stay one smoothing interval apart.
        assert!(enter2 > ready1, "enter2 {enter2} vs ready1 {ready1}");
        assert!(enter2.since(enter1) >= 2_000);
        assert_quiescent(&engine);
    }
}

// ── No overtaking (scenario: two vehicles through a 1-slot bottleneck) ────────

#[cfg(test)]
mod overtake_tests {
    use super::*;

    fn bottleneck_network() -> Network {
        let mut net = Network::new();
        net.add_point(pt("A", 0.0, 0.0)).unwrap();
        net.add_point(pt("B", 100.0, 0.0)).unwrap();
        net.add_point(pt("C", 200.0, 0.0)).unwrap();
        let ab = seg(&net, "A", "B", 2, 100.0);
        let bc = seg(&net, "B", "C", 1, 100.0);
        net.add_segment(ab).unwrap();
        net.add_segment(bc).unwrap();
        net
    }

    #[test]
    fn blocked_follower_is_parked_then_promoted() {
        let stats = FlowStats::new();
        let mut engine = engine_with(bottleneck_network(), config(0, 0));
        engine.register_observer(Box::new(stats.clone()));
        let a = id_of(&engine, "A");
        let b = id_of(&engine, "B");
        let c = id_of(&engine, "C");
        let ab = engine.network().segment_between(a, b).unwrap();
        let bc = engine.network().segment_between(b, c).unwrap();

        let v1 = engine
            .add_vehicle(vehicle(engine.network(), "agv-1", &["C"]))
            .unwrap();
        let v2 = engine
            .add_vehicle(vehicle(engine.network(), "agv-2", &["C"]))
            .unwrap();
        let v3 = engine
            .add_vehicle(vehicle(engine.network(), "agv-3", &["C"]))
            .unwrap();
        engine.request_to_enter(v1, a).unwrap();
        engine.request_to_enter(v2, a).unwrap();

        // Both traverse A→B; the first moves on into B→C, the second is
        // parked behind it.
        engine.run_until(SimTime::from_millis(150_000)).unwrap();
        assert_eq!(
            engine.vehicle(v1).unwrap().current_segment,
            Some(bc),
            "first vehicle should hold the bottleneck"
        );
        let staged = &engine.network().segment(ab).out_pending;
        assert_eq!(staged.front(), Some(&v2), "second vehicle staged on A→B");
        assert_eq!(engine.vehicle(v2).unwrap().pending_segment, Some(bc));
        assert_eq!(
            engine.network().segment(bc).in_pending.front(),
            Some(&(v2, ab))
        );

        // A third vehicle arriving later must not jump the queue.
        engine.request_to_enter(v3, a).unwrap();
        engine.run_to_idle().unwrap();

        let ready_order: Vec<VehicleId> =
            stats.counters().ready.iter().map(|&(v, _, _)| v).collect();
        assert_eq!(ready_order, vec![v1, v2, v3]);
        assert_quiescent(&engine);
    }
}

// ── Routing miss (scenario: unreachable destination) ──────────────────────────

#[cfg(test)]
mod routing_miss_tests {
    use super::*;

    #[test]
    fn stalled_vehicle_does_not_block_others() {
        // A→B connected; X is an island destination.
        let mut net = line_network(1, 10.0);
        net.add_point(pt("X", 500.0, 500.0)).unwrap();

        let stats = FlowStats::new();
        let mut engine = engine_with(net, config(0, 0));
        engine.register_observer(Box::new(stats.clone()));
        let a = id_of(&engine, "A");

        let stuck = engine
            .add_vehicle(vehicle(engine.network(), "stuck", &["X"]))
            .unwrap();
        let mover = engine
            .add_vehicle(vehicle(engine.network(), "mover", &["B"]))
            .unwrap();
        engine.request_to_enter(stuck, a).unwrap();
        engine.request_to_enter(mover, a).unwrap();
        engine.run_to_idle().unwrap();

        let counters = stats.counters();
        assert_eq!(counters.route_misses, 1, "one diagnostic per stall");
        assert_eq!(counters.ready.len(), 1);
        assert_eq!(counters.ready[0].0, mover);

        assert!(!engine.vehicle(stuck).unwrap().is_gone());
        assert_eq!(engine.vehicle(stuck).unwrap().current_segment, None);
        assert_eq!(engine.entry_pending_count(), 1, "stalled vehicle stays queued");
    }
}

// ── Smoothing (scenario: enforced headway) ────────────────────────────────────

#[cfg(test)]
mod smoothing_tests {
    use super::*;

    #[test]
    fn admissions_stay_one_interval_apart() {
        let recorder = Recorder::default();
        // Capacity 2 so only the smoothing rule separates the admissions.
        let mut engine = engine_with(line_network(2, 100.0), config(2_000, 0));
        engine.register_observer(Box::new(recorder.clone()));
        let a = id_of(&engine, "A");

        let v1 = engine
            .add_vehicle(vehicle(engine.network(), "agv-1", &["B"]))
            .unwrap();
        let v2 = engine
            .add_vehicle(vehicle(engine.network(), "agv-2", &["B"]))
            .unwrap();
        engine.request_to_enter(v1, a).unwrap();
        engine.request_to_enter(v2, a).unwrap();
        engine.run_to_idle().unwrap();

        let enter1 = recorder.time_of("enter", v1).unwrap();
        let enter2 = recorder.time_of("enter", v2).unwrap();
        assert!(
            enter2.since(enter1) >= 2_000,
            "headway violated: {enter1} then {enter2}"
        );
        assert_quiescent(&engine);
    }

    #[test]
    fn zero_smoothing_stays_deterministic() {
        let run = || {
            let recorder = Recorder::default();
            let mut engine = engine_with(diamond_network(), config(0, 0));
            engine.register_observer(Box::new(recorder.clone()));
            let targets: [&[&str]; 5] = [
                &["A", "E", "F"],
                &["B", "C", "F"],
                &["D", "C", "F"],
                &["D", "C", "F"],
                &["E", "C", "F"],
            ];
            for (i, t) in targets.iter().enumerate() {
                let v = engine
                    .add_vehicle(vehicle(engine.network(), &format!("agv-{i}"), t))
                    .unwrap();
                let entry = id_of(&engine, t[0]);
                engine.request_to_enter(v, entry).unwrap();
            }
            engine.run_to_idle().unwrap();
            recorder.events()
        };

        assert_eq!(run(), run());
    }
}

// ── Diamond drain (scenario: five vehicles reach F) ───────────────────────────

#[cfg(test)]
mod diamond_tests {
    use super::*;

    #[test]
    fn all_vehicles_reach_the_exit() {
        let stats = FlowStats::new();
        let mut engine = engine_with(diamond_network(), config(1_000, 2_000));
        engine.register_observer(Box::new(stats.clone()));
        let f = id_of(&engine, "F");

        let targets: [&[&str]; 5] = [
            &["A", "E", "F"],
            &["B", "C", "F"],
            &["D", "C", "F"],
            &["D", "C", "F"],
            &["E", "C", "F"],
        ];
        for (i, t) in targets.iter().enumerate() {
            let v = engine
                .add_vehicle(vehicle(engine.network(), &format!("agv-{i}"), t))
                .unwrap();
            let entry = id_of(&engine, t[0]);
            engine.request_to_enter(v, entry).unwrap();
        }

        engine.run_until(SimTime::from_minutes(1_000)).unwrap();

        let counters = stats.counters();
        assert_eq!(counters.ready.len(), 5, "every vehicle must finish");
        assert!(counters.ready.iter().all(|&(_, point, _)| point == f));
        assert_eq!(counters.route_misses, 0);
        assert_quiescent(&engine);
    }
}
