//! Configuration for the tessera LOD engine and its simulation driver.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Every section falls back to defaults for missing fields, so
//! old files keep loading as new settings appear.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BodyKind, Config, DebugConfig, LodConfig, MaterialConfig, PlanetConfig, SimConfig,
    TerrainConfig,
};
pub use error::ConfigError;
