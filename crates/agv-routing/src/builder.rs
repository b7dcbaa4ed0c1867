//! Offline routing-table builders.
//!
//! # Complete mode — reverse SSSP per destination
//!
//! For every destination `d` in the entry/exit set, run Dijkstra on the
//! *reversed* edge set starting at `d`.  When node `n` is relaxed through
//! reverse-neighbor `m`, the forward edge `n → m` lies on a shortest forward
//! path to `d`, so `m` is recorded as `next_hop(n, d)`.  One reverse run
//! yields the next hop from every reachable node toward `d`.
//!
//! Complexity: O(D · (V + E) · log V) with the binary heap — minutes for the
//! ~5,500-destination, ~15,000-node target layout.
//!
//! # Sampled mode — seeded A*
//!
//! Draws `num_routes` random (origin, destination) pairs from the entry/exit
//! set and solves each by forward A* with the straight-line distance as the
//! admissible heuristic.  Every node along a solved path contributes one
//! next-hop entry toward that destination.
//!
//! # Determinism
//!
//! Edge costs are straight-line distances between endpoint coordinates,
//! quantized to integer millimetres, so relaxation never depends on float
//! rounding.  The heap orders by `(cost, node id)` and relaxation is
//! strict-less-than: among equal-cost candidates the lowest node id settles
//! first and claims the relaxation, which resolves ties by ascending id.
//! The same network and seed therefore always produce the same table bytes.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use agv_core::{PointId, Position, SimRng};
use agv_network::Network;

use crate::{RoutingError, RoutingResult, RoutingTable};

// ── Graph scratch ─────────────────────────────────────────────────────────────

/// Forward and reverse adjacency with integer edge costs, extracted from the
/// network once and shared by every search.
struct CostGraph {
    pos: Vec<Position>,
    /// `forward[n]` = (successor, cost) for every edge n → successor.
    forward: Vec<Vec<(PointId, u64)>>,
    /// `reverse[n]` = (predecessor, cost) for every edge predecessor → n.
    reverse: Vec<Vec<(PointId, u64)>>,
}

impl CostGraph {
    fn build(network: &Network) -> Self {
        let n = network.point_count();
        let pos: Vec<Position> = (0..n).map(|i| network.point(PointId(i as u16)).pos).collect();
        let mut forward: Vec<Vec<(PointId, u64)>> = vec![Vec::new(); n];
        let mut reverse: Vec<Vec<(PointId, u64)>> = vec![Vec::new(); n];

        for (_, segment) in network.segments() {
            let cost = pos[segment.start.index()].distance_mm(pos[segment.end.index()]);
            forward[segment.start.index()].push((segment.end, cost));
            reverse[segment.end.index()].push((segment.start, cost));
        }
        // Sorted neighbor lists make the relaxation order independent of
        // segment registration order.
        for list in forward.iter_mut().chain(reverse.iter_mut()) {
            list.sort_unstable();
        }
        Self { pos, forward, reverse }
    }

    fn node_count(&self) -> usize {
        self.pos.len()
    }
}

// ── Complete mode ─────────────────────────────────────────────────────────────

/// Build the all-destinations table: one reverse SSSP run per entry/exit
/// point.  Nodes that cannot reach a destination simply get no entry for
/// that pair.
pub fn build_complete_table(network: &Network) -> RoutingTable {
    let graph = CostGraph::build(network);
    let mut table = RoutingTable::new();
    for dest in network.inout_points() {
        reverse_sssp_into(&graph, dest, &mut table);
    }
    table
}

/// One reverse Dijkstra run from `dest`, recording `(n, dest) → next_hop`
/// for every node that reaches `dest`.
fn reverse_sssp_into(graph: &CostGraph, dest: PointId, table: &mut RoutingTable) {
    let n = graph.node_count();
    let mut dist = vec![u64::MAX; n];
    // Forward next hop toward `dest` for each settled node.
    let mut next_hop = vec![PointId::INVALID; n];

    dist[dest.index()] = 0;

    let mut heap: BinaryHeap<Reverse<(u64, PointId)>> = BinaryHeap::new();
    heap.push(Reverse((0, dest)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if cost > dist[node.index()] {
            continue; // stale heap entry
        }
        for &(pred, weight) in &graph.reverse[node.index()] {
            let new_cost = cost.saturating_add(weight);
            if new_cost < dist[pred.index()] {
                dist[pred.index()] = new_cost;
                // Forward edge pred → node is on a shortest path to dest.
                next_hop[pred.index()] = node;
                heap.push(Reverse((new_cost, pred)));
            }
        }
    }

    for (i, &hop) in next_hop.iter().enumerate() {
        if hop != PointId::INVALID {
            table.insert(PointId(i as u16), dest, hop);
        }
    }
}

// ── Sampled mode ──────────────────────────────────────────────────────────────

/// Outcome counters for a sampled build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleStats {
    pub requested: u32,
    pub solved: u32,
    pub unreachable: u32,
}

/// Build a partial table from `num_routes` randomly sampled origin/destination
/// pairs, solved by A*.  Unreachable pairs are counted and skipped.
///
/// The same `seed` over the same network always yields the same table.
pub fn build_sampled_table(
    network: &Network,
    num_routes: u32,
    seed: u64,
) -> RoutingResult<(RoutingTable, SampleStats)> {
    let endpoints = network.inout_points();
    if endpoints.len() < 2 {
        return Err(RoutingError::NotEnoughDestinations(endpoints.len()));
    }

    let graph = CostGraph::build(network);
    let mut rng = SimRng::new(seed);
    let mut table = RoutingTable::new();
    let mut stats = SampleStats { requested: num_routes, solved: 0, unreachable: 0 };

    for _ in 0..num_routes {
        let from = endpoints[rng.gen_range(0..endpoints.len())];
        let dest = loop {
            let candidate = endpoints[rng.gen_range(0..endpoints.len())];
            if candidate != from {
                break candidate;
            }
        };

        match astar_path(&graph, from, dest) {
            Some(path) => {
                for pair in path.windows(2) {
                    table.insert(pair[0], dest, pair[1]);
                }
                stats.solved += 1;
            }
            None => stats.unreachable += 1,
        }
    }

    Ok((table, stats))
}

/// Forward A* from `from` to `dest` over the cost graph.  Returns the node
/// sequence `from .. dest`, or `None` if `dest` is unreachable.
fn astar_path(graph: &CostGraph, from: PointId, dest: PointId) -> Option<Vec<PointId>> {
    let n = graph.node_count();
    let goal = graph.pos[dest.index()];

    let mut g_score = vec![u64::MAX; n];
    let mut came_from = vec![PointId::INVALID; n];
    g_score[from.index()] = 0;

    // Heap entries are (f = g + h, node); h is the straight-line distance,
    // admissible because every edge costs at least its straight-line length.
    let mut heap: BinaryHeap<Reverse<(u64, PointId)>> = BinaryHeap::new();
    heap.push(Reverse((graph.pos[from.index()].distance_mm(goal), from)));

    while let Some(Reverse((_, node))) = heap.pop() {
        if node == dest {
            return Some(reconstruct(&came_from, from, dest));
        }
        let node_g = g_score[node.index()];
        for &(succ, weight) in &graph.forward[node.index()] {
            let tentative = node_g.saturating_add(weight);
            if tentative < g_score[succ.index()] {
                g_score[succ.index()] = tentative;
                came_from[succ.index()] = node;
                let f = tentative.saturating_add(graph.pos[succ.index()].distance_mm(goal));
                heap.push(Reverse((f, succ)));
            }
        }
    }
    None
}

fn reconstruct(came_from: &[PointId], from: PointId, dest: PointId) -> Vec<PointId> {
    let mut path = vec![dest];
    let mut cur = dest;
    while cur != from {
        cur = came_from[cur.index()];
        path.push(cur);
    }
    path.reverse();
    path
}
