//! Headless LOD simulation.
//!
//! Runs one voxel body on the CPU compute backend for a number of ticks while
//! the camera walks a path and scripted sculpt strokes land, then prints LOD
//! and dispatch statistics.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use voxel_lod::{CpuComputeBackend, TickSummary, VoxelBody};

use config::SimConfig;

/// Voxel body LOD simulator.
#[derive(Parser, Debug)]
#[command(name = "lod_sim")]
#[command(about = "Runs a deformable voxel body along a camera path and reports LOD statistics")]
struct Args {
	/// Path to configuration TOML file (built-in defaults when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Override the number of ticks.
	#[arg(short, long)]
	ticks: Option<u64>,

	/// Print a report every N ticks (0 = final report only).
	#[arg(long, default_value_t = 30)]
	report_every: u64,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => {
			println!("Loading config from: {}", path.display());
			SimConfig::load(path)?
		}
		None => SimConfig::default(),
	};
	let ticks = args.ticks.unwrap_or(config.simulation.ticks);
	let terrain = &config.terrain;

	println!(
		"Body: scale {}, {} voxels per node, depth {} ({}^3 finest)",
		terrain.scale,
		terrain.voxels_per_axis,
		terrain.max_depth,
		terrain.finest_voxels_per_axis()
	);

	let backend = Arc::new(CpuComputeBackend::new());
	println!("Compute threads: {}", backend.executor().num_threads());
	let mut body =
		VoxelBody::new(terrain.clone(), backend).context("Failed to build voxel body")?;

	let interval = Duration::from_millis(config.simulation.tick_interval_ms);
	let mut last = TickSummary::default();
	for tick in 0..ticks {
		for stroke in config.strokes.iter().filter(|s| s.tick == tick) {
			body.queue(stroke.command());
		}
		let viewpoint = config.simulation.camera_at(tick, ticks);
		last = body.tick(viewpoint);

		if args.report_every > 0 && (tick + 1) % args.report_every == 0 {
			print_report(&body, &last, viewpoint);
		}
		if !interval.is_zero() {
			std::thread::sleep(interval);
		}
	}

	// Let outstanding requests land from the final viewpoint.
	let viewpoint = config.simulation.camera_at(ticks, ticks);
	let mut settle = 0;
	while settle < config.simulation.settle_ticks
		&& (body.pending_requests() > 0 || !body.has_base())
	{
		last = body.tick(viewpoint);
		settle += 1;
		std::thread::sleep(Duration::from_millis(1));
	}
	if body.pending_requests() > 0 {
		log::warn!(
			"{} requests still outstanding after {} settle ticks",
			body.pending_requests(),
			settle
		);
	}

	println!("\nFinal state after {} ticks ({} settle):", ticks, settle);
	print_report(&body, &last, viewpoint);

	match body.raycast(viewpoint, terrain.world_position) {
		Some(hit) => println!(
			"  raycast to center: hit at {:.2?} after {:.2}",
			hit.position, hit.distance
		),
		None => println!("  raycast to center: no hit"),
	}

	Ok(())
}

fn print_report(body: &VoxelBody, summary: &TickSummary, viewpoint: Vec3) {
	let metrics = body.metrics();
	let lod = body.current_lod_set();
	let meshed = lod.iter().filter(|node| node.mesh.is_some()).count();
	let triangles: usize = lod
		.iter()
		.filter_map(|node| node.mesh.as_ref())
		.map(|mesh| mesh.triangle_count())
		.sum();
	let depths: Vec<String> = metrics
		.nodes_per_depth
		.iter()
		.enumerate()
		.filter(|(_, count)| **count > 0)
		.map(|(depth, count)| format!("d{}:{}", depth, count))
		.collect();

	println!(
		"[frame {:>4}] camera {:.1?} | visible {} ({}) | meshed {} | triangles {}",
		summary.frame,
		viewpoint,
		metrics.visible_nodes,
		depths.join(" "),
		meshed,
		triangles
	);
	println!(
		"    transitions {} (incomplete {}) | rebalanced {} | select {}us | balance {}us",
		metrics.transition_cells,
		metrics.incomplete_cells,
		metrics.rebalanced_nodes,
		metrics.last_select_us,
		metrics.last_balance_us
	);
	println!(
		"    pending {} | delivered {} | stale {} | dropped {} | degenerate {} | latency {:.1} ticks",
		metrics.pending_requests,
		metrics.delivered,
		metrics.stale,
		metrics.dropped_submissions,
		metrics.degenerate_triangles,
		metrics.delivery_latency_ticks.average()
	);
}
