//! Configuration sections, their defaults, and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Subdivision policy and per-frame budgets.
    pub lod: LodConfig,
    /// Spherical body parameters.
    pub planet: PlanetConfig,
    /// Flat terrain grid parameters.
    pub terrain: TerrainConfig,
    /// Headless flight driven by the simulation binary.
    pub sim: SimConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Level-of-detail policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Width of the target viewport in pixels.
    pub viewport_width: f64,
    /// On-screen edge length grid triangles should settle at.
    pub pixels_per_triangle_edge: f64,
    /// Grid rows per tile.
    pub tile_rows: u32,
    /// Maximum subdivision depth.
    pub max_subdivisions: u32,
    /// Splits allowed per root tree per frame.
    pub split_budget: u32,
    /// Drawlist capacity; extra tiles are dropped for the frame.
    pub max_drawlist_tiles: usize,
    /// Frames before unwanted subtrees are freed (0 = never prune).
    pub prune_after_frames: u32,
}

/// A named surface material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialConfig {
    pub name: String,
    /// Linear RGB in `[0, 1]`.
    pub color: [f32; 3],
}

/// Planet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Radius in meters.
    pub radius: f64,
    /// Maximum terrain displacement in meters.
    pub amplitude: f64,
    /// Noise seed.
    pub seed: u32,
    /// Noise frequency per meter.
    pub noise_scale: f64,
    /// Noise octaves.
    pub octaves: u32,
    /// Palette from low to high ground.
    pub materials: Vec<MaterialConfig>,
}

/// Flat terrain grid configuration.
///
/// Shares the planet's seed and materials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    pub cells_x: u32,
    pub cells_z: u32,
    /// Edge length of one square cell in meters.
    pub cell_size: f64,
    /// Maximum terrain displacement in meters.
    pub amplitude: f64,
    /// Noise frequency per meter.
    pub noise_scale: f64,
}

/// Which body the simulation flies over.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum BodyKind {
    #[default]
    Planet,
    Terrain,
}

/// Simulated camera flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Frames to simulate.
    pub frames: u32,
    /// Camera altitude above the nominal surface at frame 0, in meters.
    pub start_altitude: f64,
    /// Meters the camera descends each frame.
    pub descent_per_frame: f64,
    /// Lowest altitude the camera descends to, in meters.
    pub min_altitude: f64,
    pub body: BodyKind,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. "debug", "info,tessera_lod=trace").
    pub log_level: String,
    /// Tint tiles by subdivision depth.
    pub depth_colors: bool,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920.0,
            pixels_per_triangle_edge: 2.0,
            tile_rows: 32,
            max_subdivisions: 10,
            split_budget: 50,
            max_drawlist_tiles: 3000,
            prune_after_frames: 60,
        }
    }
}

impl MaterialConfig {
    pub fn new(name: &str, color: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            radius: 6_000_000.0,
            amplitude: 8_000.0,
            seed: 0,
            noise_scale: 2.0e-6,
            octaves: 5,
            materials: vec![
                MaterialConfig::new("sand", [0.30, 0.27, 0.21]),
                MaterialConfig::new("rock", [0.45, 0.40, 0.36]),
                MaterialConfig::new("snow", [0.96, 0.94, 0.96]),
            ],
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            cells_x: 8,
            cells_z: 8,
            cell_size: 4096.0,
            amplitude: 300.0,
            noise_scale: 1.0e-4,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frames: 240,
            start_altitude: 20_000.0,
            descent_per_frame: 80.0,
            min_altitude: 50.0,
            body: BodyKind::Planet,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            depth_colors: false,
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Path of the config file inside `config_dir`.
    pub fn path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = Self::path_in(config_dir);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = Self::path_in(config_dir);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&Self::path_in(config_dir))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        if self.lod.tile_rows == 0 {
            return invalid("lod.tile_rows", "must be at least 1");
        }
        if !(self.lod.viewport_width > 0.0) {
            return invalid("lod.viewport_width", "must be positive");
        }
        if !(self.lod.pixels_per_triangle_edge > 0.0) {
            return invalid("lod.pixels_per_triangle_edge", "must be positive");
        }
        if !(self.planet.radius.is_finite() && self.planet.radius > 0.0) {
            return invalid("planet.radius", "must be positive and finite");
        }
        if self.planet.amplitude < 0.0 || self.terrain.amplitude < 0.0 {
            return invalid("amplitude", "must not be negative");
        }
        if self.terrain.cells_x == 0 || self.terrain.cells_z == 0 {
            return invalid("terrain.cells", "grid must have at least one cell");
        }
        if !(self.terrain.cell_size > 0.0) {
            return invalid("terrain.cell_size", "must be positive");
        }
        Ok(())
    }

    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })?;
        ron::from_str(&contents).map_err(ConfigError::Parse)
    }
}
