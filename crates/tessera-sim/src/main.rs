//! Headless flight over a tessera body.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p tessera-sim -- --frames 400 --body terrain`.

mod scene;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tessera_config::{CliArgs, Config};
use tessera_coords::SectorPos;
use tessera_lod::{Body, Drawlist, FrameStats, TileVertex};
use tracing::{debug, error, info, warn};

use crate::scene::{Flight, build_body};

/// Totals accumulated over the whole run.
#[derive(Debug, Default)]
struct RunSummary {
    frames: u32,
    splits: usize,
    pruned: usize,
    starved_frames: u32,
    peak_tiles: usize,
    peak_vertex_bytes: usize,
}

impl RunSummary {
    fn record(&mut self, stats: &FrameStats, list: &Drawlist<'_>) {
        self.frames += 1;
        self.splits += stats.splits;
        self.pruned += stats.pruned;
        if stats.budget_exhausted {
            self.starved_frames += 1;
        }
        self.peak_tiles = self.peak_tiles.max(list.len());
        self.peak_vertex_bytes = self.peak_vertex_bytes.max(vertex_bytes(list));
    }
}

/// Bytes a renderer would upload for the drawlist's vertex buffers.
fn vertex_bytes(list: &Drawlist<'_>) -> usize {
    list.iter()
        .map(|tile| bytemuck::cast_slice::<TileVertex, u8>(&tile.vertices()).len())
        .sum()
}

fn config_dir(args: &CliArgs) -> PathBuf {
    if let Some(dir) = &args.config {
        return dir.clone();
    }
    match dirs::config_dir() {
        Some(dir) => dir.join("tessera"),
        None => {
            eprintln!("No user config directory, using ./tessera");
            PathBuf::from("tessera")
        }
    }
}

fn run(config: &Config) -> Result<RunSummary, tessera_lod::LodError> {
    let mut body = build_body(config)?;
    let flight = Flight::new(config);
    let mut summary = RunSummary::default();

    for frame in 0..config.sim.frames {
        let camera = flight.camera(frame);
        let (stats, list) = body.frame(&camera, config.lod.max_drawlist_tiles)?;
        summary.record(&stats, &list);
        debug!(
            frame,
            visited = stats.visited,
            splits = stats.splits,
            pruned = stats.pruned,
            tiles = list.len(),
            dropped = list.dropped(),
            "Frame"
        );
        drop(list);

        if stats.splits == 0 && frame % 30 == 0 {
            log_ground(&body, frame, flight.altitude(frame), &camera);
        }
    }

    info!(
        nodes = body.node_count(),
        leaves = body.leaf_count(),
        max_depth = body.max_depth(),
        "Final tree"
    );
    let released = body.teardown(&mut |_tile| {});
    debug!(released, "Released tiles");
    Ok(summary)
}

fn log_ground(body: &Body, frame: u32, nominal: f64, camera: &SectorPos) {
    match body.altitude(camera) {
        Some(ground) => info!(
            frame,
            nominal,
            altitude = ground.distance,
            height = ground.height,
            depth = ground.depth,
            "Ground below camera"
        ),
        None => warn!(frame, "Camera is not above any tile"),
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = config_dir(&args);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    tessera_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::from(2);
    }

    info!(
        body = ?config.sim.body,
        frames = config.sim.frames,
        split_budget = config.lod.split_budget,
        "Starting flight"
    );
    match run(&config) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                splits = summary.splits,
                pruned = summary.pruned,
                starved_frames = summary.starved_frames,
                peak_tiles = summary.peak_tiles,
                peak_vertex_bytes = summary.peak_vertex_bytes,
                "Flight complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Flight aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
