//! Unit tests for agv-core.

use crate::{traversal_ms, PointId, Position, SegmentId, SimRng, SimTime, VehicleId};

// ── IDs ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod id_tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        let p = PointId(42);
        assert_eq!(p.index(), 42);
        assert_eq!(PointId::try_from(42usize).unwrap(), p);
    }

    #[test]
    fn invalid_is_max() {
        assert_eq!(PointId::INVALID.0, u16::MAX);
        assert_eq!(SegmentId::INVALID.0, u32::MAX);
        assert_eq!(VehicleId::default(), VehicleId::INVALID);
    }

    #[test]
    fn try_from_rejects_overflow() {
        assert!(PointId::try_from(70_000usize).is_err());
    }

    #[test]
    fn display_names_the_type() {
        assert_eq!(PointId(7).to_string(), "PointId(7)");
        assert_eq!(VehicleId(3).to_string(), "VehicleId(3)");
    }
}

// ── Time ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod time_tests {
    use super::*;

    #[test]
    fn constructors_scale() {
        assert_eq!(SimTime::from_secs(2), SimTime(2_000));
        assert_eq!(SimTime::from_minutes(3), SimTime(180_000));
    }

    #[test]
    fn since_saturates() {
        assert_eq!(SimTime(500).since(SimTime(200)), 300);
        assert_eq!(SimTime(200).since(SimTime(500)), 0);
    }

    #[test]
    fn offset_adds() {
        assert_eq!(SimTime(10).offset(5), SimTime(15));
        assert_eq!(SimTime(10) + 5, SimTime(15));
    }

    #[test]
    fn traversal_rounds_up() {
        // 100 units at 1 unit/s = exactly 100 s.
        assert_eq!(traversal_ms(100.0, 1.0), 100_000);
        // 1 unit at 3 units/s = 333.33… ms → 334 ms.
        assert_eq!(traversal_ms(1.0, 3.0), 334);
        assert_eq!(traversal_ms(0.0, 2.0), 0);
    }
}

// ── Position ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod pos_tests {
    use super::*;

    #[test]
    fn euclidean_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert_eq!(a.distance_mm(b), 5_000);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Position::new(1.5, -2.0);
        let b = Position::new(-4.0, 7.25);
        assert_eq!(a.distance_mm(b), b.distance_mm(a));
    }
}

// ── RNG ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rng_tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SimRng::new(7);
        let mut b = SimRng::new(7);
        for _ in 0..32 {
            assert_eq!(a.gen_range(0..1000u32), b.gen_range(0..1000u32));
        }
    }

    #[test]
    fn choose_on_empty_is_none() {
        let mut rng = SimRng::new(1);
        let empty: &[u32] = &[];
        assert!(rng.choose(empty).is_none());
    }
}
