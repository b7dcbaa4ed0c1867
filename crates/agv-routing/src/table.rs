//! The routing table and its binary on-disk codec.
//!
//! # On-disk format
//!
//! Little-endian throughout: a `u32` record count followed by that many
//! 6-byte records, each `from: u16 | dest: u16 | next_hop: u16`.  File size
//! is exactly `4 + 6·N` bytes; there is no magic and no checksum.
//!
//! Records are written sorted by `(from, dest)` so that equal mappings
//! always produce byte-identical files, and read back one record at a time
//! so tables in the 10^6–10^7 range stream through a fixed-size buffer.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use agv_core::PointId;

use crate::{RoutingError, RoutingResult};

/// Immutable next-hop mapping `(from, destination) → next hop`.
///
/// Built once (offline builder or file load), read-only at simulation time.
/// Absence of a key means "no route"; the engine reports that through its
/// diagnostic hook rather than treating it as fatal.
#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    next_hops: HashMap<(u16, u16), u16>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(from, dest)` entries.
    pub fn len(&self) -> usize {
        self.next_hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_hops.is_empty()
    }

    /// Record `next_hop` for `(from, dest)`.
    ///
    /// First write wins: once a pair has a hop it never changes, so
    /// overlapping sampled paths cannot make a vehicle's route flap.
    pub fn insert(&mut self, from: PointId, dest: PointId, next_hop: PointId) {
        self.next_hops.entry((from.0, dest.0)).or_insert(next_hop.0);
    }

    /// The next control point on the path from `from` to `dest`, if known.
    #[inline]
    pub fn next_hop(&self, from: PointId, dest: PointId) -> Option<PointId> {
        self.next_hops.get(&(from.0, dest.0)).copied().map(PointId)
    }

    /// Iterate all entries as `(from, dest, next_hop)` in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, PointId, PointId)> + '_ {
        self.next_hops
            .iter()
            .map(|(&(f, d), &h)| (PointId(f), PointId(d), PointId(h)))
    }

    // ── Binary codec ──────────────────────────────────────────────────────

    /// Write the table in the binary format described in the module docs.
    pub fn write_to<W: Write>(&self, mut writer: W) -> RoutingResult<()> {
        let count = u32::try_from(self.next_hops.len())
            .map_err(|_| RoutingError::TooManyRecords(self.next_hops.len()))?;

        let mut records: Vec<((u16, u16), u16)> =
            self.next_hops.iter().map(|(&k, &v)| (k, v)).collect();
        records.sort_unstable_by_key(|&(key, _)| key);

        writer.write_all(&count.to_le_bytes())?;
        for ((from, dest), hop) in records {
            let mut record = [0u8; 6];
            record[0..2].copy_from_slice(&from.to_le_bytes());
            record[2..4].copy_from_slice(&dest.to_le_bytes());
            record[4..6].copy_from_slice(&hop.to_le_bytes());
            writer.write_all(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Stream-decode a table from any `Read` source.
    pub fn read_from<R: Read>(mut reader: R) -> RoutingResult<Self> {
        let mut count_buf = [0u8; 4];
        reader.read_exact(&mut count_buf)?;
        let count = u32::from_le_bytes(count_buf);

        let mut next_hops = HashMap::with_capacity(count as usize);
        let mut record = [0u8; 6];
        for _ in 0..count {
            reader.read_exact(&mut record)?;
            let from = u16::from_le_bytes([record[0], record[1]]);
            let dest = u16::from_le_bytes([record[2], record[3]]);
            let hop = u16::from_le_bytes([record[4], record[5]]);
            next_hops.insert((from, dest), hop);
        }
        Ok(Self { next_hops })
    }

    /// Write to a file path via a buffered writer.
    pub fn save_to_path(&self, path: &Path) -> RoutingResult<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Load from a file path via a buffered reader.
    pub fn load_from_path(path: &Path) -> RoutingResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}
