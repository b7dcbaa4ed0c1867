//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing millisecond counter, `SimTime(u64)`.
//! Using an integer as the canonical unit keeps schedule arithmetic exact
//! (no floating-point drift), and two events scheduled for the same instant
//! compare equal so queue insertion order decides.
//!
//! Millisecond resolution is three orders of magnitude below the shortest
//! physical delay in the model (traversal of the shortest segment), so the
//! quantization never changes which vehicle wins a race.

use std::fmt;

/// The token delay used to chain engine events without executing them in the
/// same instant.  Any strictly positive value below the smoothing interval
/// works; the value itself carries no physical meaning.
pub const MIN_TICK_MS: u64 = 1;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// An absolute simulation clock value in milliseconds since the run started.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    #[inline]
    pub const fn from_millis(ms: u64) -> SimTime {
        SimTime(ms)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> SimTime {
        SimTime(secs * 1_000)
    }

    #[inline]
    pub const fn from_minutes(minutes: u64) -> SimTime {
        SimTime(minutes * 60_000)
    }

    /// The instant `ms` milliseconds after `self`.
    #[inline]
    pub fn offset(self, ms: u64) -> SimTime {
        SimTime(self.0 + ms)
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is
    /// in the future.
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Elapsed time as fractional seconds, for display and logging only.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl std::ops::Add<u64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: u64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: SimTime) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// ── Traversal delay ───────────────────────────────────────────────────────────

/// Time to traverse `length` distance units at `speed` units per second, in
/// whole milliseconds.  Rounds up so a vehicle never completes a segment
/// before the exact physical instant.
///
/// Callers must guarantee `speed > 0`; vehicle constructors enforce it.
#[inline]
pub fn traversal_ms(length: f32, speed: f32) -> u64 {
    let ms = (length as f64 / speed as f64) * 1_000.0;
    ms.ceil().max(0.0) as u64
}
