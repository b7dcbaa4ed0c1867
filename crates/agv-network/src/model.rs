//! Control-point network model.
//!
//! # Data layout
//!
//! Control points and segments live in arena `Vec`s indexed by `PointId` /
//! `SegmentId`.  Nothing in the model holds a reference to anything else:
//! vehicles and engine tables store ids and resolve them through [`Network`],
//! which keeps the graph free of reference cycles and lets the engine mutate
//! per-segment state through a single owner.
//!
//! A `(from, to)` pair index answers next-hop lookups, and a name index maps
//! the layout's human-readable point names to compact ids both ways.

use std::collections::{HashMap, VecDeque};

use agv_core::{PointId, Position, SegmentId, SimTime, VehicleId};

use crate::{NetworkError, NetworkResult};

// ── ControlPoint ──────────────────────────────────────────────────────────────

/// A node of the traffic network.  Admission, handoff, and termination all
/// happen at control points.
#[derive(Debug, Clone)]
pub struct ControlPoint {
    /// Human-readable layout name (e.g. `"AIS120"`).
    pub name: String,
    /// Planar layout coordinate.
    pub pos: Position,
    /// Layout region tag (informational).
    pub region: String,
    /// Layout point kind from the generator metadata, when present.
    pub kind: Option<String>,
    /// `true` if the point may serve as a route endpoint (entry/exit).
    pub inout: bool,
}

impl ControlPoint {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Self {
            name: name.into(),
            pos,
            region: String::new(),
            kind: None,
            inout: false,
        }
    }

    pub fn with_inout(mut self, inout: bool) -> Self {
        self.inout = inout;
        self
    }
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// A directed, capacity-limited path between two control points.
///
/// The dynamic fields (`remaining_capacity`, the stamps, `congested`, and the
/// two queues) are mutated only by the movement engine; everything else is
/// fixed at construction.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: PointId,
    pub end: PointId,

    /// Maximum total `capacity_needed` of vehicles occupying this segment.
    pub total_capacity: u32,
    /// Capacity still available.  Kept in `0..=total_capacity` by the engine;
    /// a step outside that range is a fatal invariant violation.
    pub remaining_capacity: u32,

    /// Physical length in layout units.
    pub length: f32,
    /// Lane count (informational; the model is single-file per segment).
    pub lanes: u32,

    /// Clock value of the last admission into this segment, `None` before the
    /// first.  Input to the entry smoothing rule.
    pub enter_stamp: Option<SimTime>,
    /// Clock value of the last departure into this segment, `None` before the
    /// first.  Input to the departure smoothing rule.
    pub depart_stamp: Option<SimTime>,

    /// `true` while a vehicle staged on this segment is blocked downstream.
    pub congested: bool,

    /// Vehicles that finished traversal and wait at the downstream end, in
    /// completion order.  Only the front may leave (no overtaking).
    pub out_pending: VecDeque<VehicleId>,

    /// Vehicles queued on an upstream segment waiting to enter this one, as
    /// `(vehicle, upstream segment)` pairs in arrival order.
    pub in_pending: VecDeque<(VehicleId, SegmentId)>,
}

impl Segment {
    /// A segment with the given geometry, full capacity available, and one
    /// lane.  Dynamic state starts quiescent.
    pub fn new(start: PointId, end: PointId, total_capacity: u32, length: f32) -> Self {
        Self {
            start,
            end,
            total_capacity,
            remaining_capacity: total_capacity,
            length,
            lanes: 1,
            enter_stamp: None,
            depart_stamp: None,
            congested: false,
            out_pending: VecDeque::new(),
            in_pending: VecDeque::new(),
        }
    }

    pub fn with_lanes(mut self, lanes: u32) -> Self {
        self.lanes = lanes;
        self
    }

    /// `true` if `needed` capacity units are currently free.
    #[inline]
    pub fn has_room(&self, needed: u32) -> bool {
        self.remaining_capacity >= needed
    }

    /// Capacity units currently consumed by occupying vehicles.
    #[inline]
    pub fn occupied(&self) -> u32 {
        self.total_capacity - self.remaining_capacity
    }
}

// ── Network ───────────────────────────────────────────────────────────────────

/// The directed network of control points and segments.
///
/// Owns all graph state.  The engine mutates segment dynamics exclusively
/// through [`segment_mut`](Network::segment_mut).
#[derive(Debug, Default)]
pub struct Network {
    points: Vec<ControlPoint>,
    segments: Vec<Segment>,
    /// `(from, to)` → segment, for next-hop resolution.
    pair_index: HashMap<(PointId, PointId), SegmentId>,
    /// Point name → id; the reverse direction is `points[id].name`.
    name_index: HashMap<String, PointId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    // ── Points ────────────────────────────────────────────────────────────

    /// Register a control point and return its id (sequential from 0).
    ///
    /// Fails if the name is already taken or the 16-bit id space is full.
    pub fn add_point(&mut self, point: ControlPoint) -> NetworkResult<PointId> {
        if self.name_index.contains_key(&point.name) {
            return Err(NetworkError::DuplicatePoint(point.name));
        }
        let id = PointId::try_from(self.points.len())
            .map_err(|_| NetworkError::TooManyPoints(self.points.len() + 1))?;
        self.name_index.insert(point.name.clone(), id);
        self.points.push(point);
        Ok(id)
    }

    /// The point for `id`.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this network's `add_point`.
    #[inline]
    pub fn point(&self, id: PointId) -> &ControlPoint {
        &self.points[id.index()]
    }

    /// Resolve a layout name to its compact id.
    pub fn point_id(&self, name: &str) -> Option<PointId> {
        self.name_index.get(name).copied()
    }

    /// The layout name for `id`.
    pub fn point_name(&self, id: PointId) -> &str {
        &self.points[id.index()].name
    }

    /// Iterate all points as `(id, &point)`.
    pub fn points(&self) -> impl Iterator<Item = (PointId, &ControlPoint)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (PointId(i as u16), p))
    }

    /// Ids of all entry/exit-capable points, ascending.
    pub fn inout_points(&self) -> Vec<PointId> {
        self.points()
            .filter(|(_, p)| p.inout)
            .map(|(id, _)| id)
            .collect()
    }

    // ── Segments ──────────────────────────────────────────────────────────

    /// Register a directed segment.
    ///
    /// Idempotent per `(start, end)` pair: if a segment already exists for
    /// the pair, the existing one is retained, the new one is discarded, and
    /// the retained id is returned.
    ///
    /// Fails if either endpoint is unknown or the geometry is invalid
    /// (`total_capacity == 0`, `lanes == 0`, or a negative/non-finite length).
    pub fn add_segment(&mut self, segment: Segment) -> NetworkResult<SegmentId> {
        for endpoint in [segment.start, segment.end] {
            if endpoint.index() >= self.points.len() {
                return Err(NetworkError::PointNotFound(endpoint));
            }
        }
        if segment.total_capacity == 0 {
            return Err(self.invalid(&segment, "total_capacity must be at least 1"));
        }
        if segment.lanes == 0 {
            return Err(self.invalid(&segment, "lanes must be at least 1"));
        }
        if !segment.length.is_finite() || segment.length < 0.0 {
            return Err(self.invalid(&segment, "length must be finite and non-negative"));
        }

        let key = (segment.start, segment.end);
        if let Some(&existing) = self.pair_index.get(&key) {
            return Ok(existing);
        }
        let id = SegmentId(self.segments.len() as u32);
        self.pair_index.insert(key, id);
        self.segments.push(segment);
        Ok(id)
    }

    /// The segment id for the directed pair, if one exists.
    #[inline]
    pub fn segment_between(&self, from: PointId, to: PointId) -> Option<SegmentId> {
        self.pair_index.get(&(from, to)).copied()
    }

    /// `true` if a segment exists for the directed pair.
    #[inline]
    pub fn segment_exists(&self, from: PointId, to: PointId) -> bool {
        self.pair_index.contains_key(&(from, to))
    }

    /// The segment for the directed pair, or a no-such-segment error.
    pub fn get_segment(&self, from: PointId, to: PointId) -> NetworkResult<&Segment> {
        self.segment_between(from, to)
            .map(|id| &self.segments[id.index()])
            .ok_or(NetworkError::NoSuchSegment { from, to })
    }

    /// The segment for `id`.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this network's `add_segment`.
    #[inline]
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    /// Mutable access for the engine's dynamic-state updates.
    #[inline]
    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.index()]
    }

    /// Iterate all segments as `(id, &segment)`.
    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, s)| (SegmentId(i as u32), s))
    }

    fn invalid(&self, segment: &Segment, detail: &str) -> NetworkError {
        NetworkError::InvalidSegment {
            what: format!(
                "{} -> {}",
                self.point_name(segment.start),
                self.point_name(segment.end)
            ),
            detail: detail.to_string(),
        }
    }
}
