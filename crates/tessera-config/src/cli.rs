//! Command-line argument parsing for the tessera simulation.

use std::path::PathBuf;

use clap::Parser;

use crate::{BodyKind, Config};

/// Tessera command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tessera", about = "Headless LOD subdivision run")]
pub struct CliArgs {
    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Starting camera altitude in meters.
    #[arg(long)]
    pub altitude: Option<f64>,

    /// Planet radius in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Splits allowed per root tree per frame.
    #[arg(long)]
    pub split_budget: Option<u32>,

    /// Maximum subdivision depth.
    #[arg(long)]
    pub max_subdivisions: Option<u32>,

    /// Body to fly over.
    #[arg(long, value_enum)]
    pub body: Option<BodyKind>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Tint tiles by subdivision depth.
    #[arg(long)]
    pub depth_colors: Option<bool>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(frames) = args.frames {
            self.sim.frames = frames;
        }
        if let Some(altitude) = args.altitude {
            self.sim.start_altitude = altitude;
        }
        if let Some(radius) = args.radius {
            self.planet.radius = radius;
        }
        if let Some(budget) = args.split_budget {
            self.lod.split_budget = budget;
        }
        if let Some(max) = args.max_subdivisions {
            self.lod.max_subdivisions = max;
        }
        if let Some(body) = args.body {
            self.sim.body = body;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(tint) = args.depth_colors {
            self.debug.depth_colors = tint;
        }
    }
}
