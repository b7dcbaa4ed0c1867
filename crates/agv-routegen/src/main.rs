//! `agv-routegen` — build a binary next-hop routing table from a layout JSON.
//!
//! Two modes:
//!
//! - default (sampled): solve `NUM_ROUTES` random entry/exit pairs with A*
//!   and record the next hops along each solved path.
//! - `--complete`: one reverse shortest-path run per entry/exit destination,
//!   producing the next hop from every reachable node toward every
//!   destination.
//!
//! Run with:
//!   agv-routegen layout.json routes.bin 5000 42
//!   agv-routegen layout.json routes.bin --complete

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use agv_network::{load_network, LoaderDefaults};
use agv_routing::{build_complete_table, build_sampled_table, RoutingTable};

const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Parser)]
#[command(name = "agv-routegen", about = "Offline routing-table builder for AGV layouts.")]
struct Opt {
    /// Layout JSON with control points and their directed links.
    #[arg(default_value = "control_points.json")]
    input: PathBuf,

    /// Output path for the binary routing table.
    #[arg(default_value = "routes.bin")]
    output: PathBuf,

    /// Number of random origin/destination pairs to solve in sampled mode.
    #[arg(default_value_t = 1_000)]
    num_routes: u32,

    /// RNG seed for the pair sampler.
    seed: Option<u64>,

    /// Build the full all-destinations table via reverse shortest paths
    /// instead of sampling.
    #[arg(short, long)]
    complete: bool,

    /// Seed the random sampler (overrides the positional seed).
    #[arg(long = "seed", value_name = "N")]
    seed_flag: Option<u64>,
}

fn main() -> Result<()> {
    let opt = Opt::parse();

    let t_load = Instant::now();
    let network = load_network(&opt.input, LoaderDefaults::default())
        .with_context(|| format!("loading layout {}", opt.input.display()))?;
    println!(
        "Layout: {} points, {} segments, {} entry/exit points  ({:.2}s)",
        network.point_count(),
        network.segment_count(),
        network.inout_points().len(),
        t_load.elapsed().as_secs_f64(),
    );

    let t_build = Instant::now();
    let table: RoutingTable = if opt.complete {
        let table = build_complete_table(&network);
        println!(
            "Complete table: {} entries over {} destinations  ({:.2}s)",
            table.len(),
            network.inout_points().len(),
            t_build.elapsed().as_secs_f64(),
        );
        table
    } else {
        let seed = opt.seed_flag.or(opt.seed).unwrap_or(DEFAULT_SEED);
        let (table, stats) = build_sampled_table(&network, opt.num_routes, seed)
            .context("sampled build failed")?;
        println!(
            "Sampled table: {} entries from {} routes ({} unreachable, seed {seed})  ({:.2}s)",
            table.len(),
            stats.solved,
            stats.unreachable,
            t_build.elapsed().as_secs_f64(),
        );
        table
    };

    table
        .save_to_path(&opt.output)
        .with_context(|| format!("writing {}", opt.output.display()))?;
    println!("Wrote {} ({} bytes)", opt.output.display(), 4 + 6 * table.len());

    Ok(())
}
