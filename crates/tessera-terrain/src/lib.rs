//! Procedural surface synthesis consumed by the LOD engine: height, material variety and color per vertex.

mod generator;
mod noise_surface;

pub use generator::{FlatSurface, SurfaceGenerator, SurfaceSample};
pub use noise_surface::{Material, NoiseSurface, NoiseSurfaceParams};
