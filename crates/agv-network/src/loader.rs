//! JSON layout loader.
//!
//! # File format
//!
//! The layout generator emits a document with a top-level `points` array.
//! Each entry carries:
//!
//! ```json
//! {
//!   "id": "AIS120",
//!   "x": 910.0, "y": 120.0,
//!   "region": "grey",
//!   "meta": { "kind": "h" },
//!   "inout": true,
//!   "next": ["AIS121", "AIT120"]
//! }
//! ```
//!
//! Additional fields (generator bookkeeping under `meta`, the top-level
//! `meta` block) are ignored.  `meta`, `inout`, and `next` are optional per
//! point.
//!
//! # Loading
//!
//! Two passes: register every point first (edges reference points by name in
//! arbitrary order), then add one directed segment per `next` entry.  Segment
//! length is the Euclidean distance between the endpoints; capacity and lane
//! count come from [`LoaderDefaults`] because the layout file does not carry
//! them.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use agv_core::Position;

use crate::model::{ControlPoint, Network, Segment};
use crate::{NetworkError, NetworkResult};

// ── JSON records ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LayoutFile {
    points: Vec<PointRecord>,
}

#[derive(Deserialize)]
struct PointRecord {
    id: String,
    x: f32,
    y: f32,
    #[serde(default)]
    region: String,
    #[serde(default)]
    meta: Option<MetaRecord>,
    #[serde(default)]
    inout: bool,
    #[serde(default)]
    next: Vec<String>,
}

#[derive(Deserialize)]
struct MetaRecord {
    #[serde(default)]
    kind: Option<String>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Per-segment parameters the layout file does not specify.
#[derive(Debug, Clone, Copy)]
pub struct LoaderDefaults {
    /// Capacity of every loaded segment.
    pub capacity: u32,
    /// Lane count of every loaded segment.
    pub lanes: u32,
}

impl Default for LoaderDefaults {
    fn default() -> Self {
        Self { capacity: 1, lanes: 1 }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a network from a layout JSON file on disk.
pub fn load_network(path: &Path, defaults: LoaderDefaults) -> NetworkResult<Network> {
    let file = std::fs::File::open(path)?;
    load_network_reader(std::io::BufReader::new(file), defaults)
}

/// Like [`load_network`] but accepts any `Read` source (e.g. an in-memory
/// `Cursor` in tests).
pub fn load_network_reader<R: Read>(reader: R, defaults: LoaderDefaults) -> NetworkResult<Network> {
    let layout: LayoutFile =
        serde_json::from_reader(reader).map_err(|e| NetworkError::Parse(e.to_string()))?;

    if layout.points.len() >= u16::MAX as usize {
        return Err(NetworkError::TooManyPoints(layout.points.len()));
    }

    let mut network = Network::new();

    // ── Pass 1: points ────────────────────────────────────────────────────
    let mut ids = Vec::with_capacity(layout.points.len());
    for record in &layout.points {
        let mut point = ControlPoint::new(record.id.clone(), Position::new(record.x, record.y));
        point.region = record.region.clone();
        point.kind = record.meta.as_ref().and_then(|m| m.kind.clone());
        point.inout = record.inout;
        ids.push(network.add_point(point)?);
    }

    // ── Pass 2: segments ──────────────────────────────────────────────────
    for (record, &from) in layout.points.iter().zip(&ids) {
        for neighbor in &record.next {
            let to = network.point_id(neighbor).ok_or_else(|| {
                NetworkError::UnknownNeighbor {
                    from_point: record.id.clone(),
                    referenced: neighbor.clone(),
                }
            })?;
            let length = network.point(from).pos.distance(network.point(to).pos);
            let segment =
                Segment::new(from, to, defaults.capacity, length).with_lanes(defaults.lanes);
            network.add_segment(segment)?;
        }
    }

    Ok(network)
}
