//! The height/color interface the tile builder samples once per vertex.

use glam::{DVec3, Vec3};

/// Result of sampling the surface at one position.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SurfaceSample {
    /// Displacement along the local "up" direction, in world units.
    pub height: f64,
    /// Material blend vector. Components are roughly in `[-1.5, 1.5]`.
    pub variety: Vec3,
}

/// A pure, deterministic surface function.
///
/// `position` is measured from the body center (spherical bodies) or the
/// body origin (flat terrain), on the nominal undisplaced surface.
pub trait SurfaceGenerator: Send + Sync {
    /// Height and material variety at `position`.
    fn sample(&self, position: DVec3) -> SurfaceSample;

    /// Vertex color for a sample already taken at `position`, each channel
    /// in `[0, 1]`.
    fn color_of(&self, position: DVec3, sample: &SurfaceSample) -> Vec3;

    /// Vertex color at `position`.
    fn color(&self, position: DVec3) -> Vec3 {
        self.color_of(position, &self.sample(position))
    }

    /// Upper bound on `|sample(p).height|` over all positions.
    fn amplitude(&self) -> f64;
}

/// A surface with constant height and color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatSurface {
    height: f64,
    color: Vec3,
}

impl FlatSurface {
    pub fn new() -> Self {
        Self {
            height: 0.0,
            color: Vec3::new(0.5, 0.5, 0.5),
        }
    }

    /// A flat surface raised (or lowered) by `height` everywhere.
    pub fn with_height(height: f64) -> Self {
        Self {
            height,
            ..Self::new()
        }
    }
}

impl Default for FlatSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceGenerator for FlatSurface {
    fn sample(&self, _position: DVec3) -> SurfaceSample {
        SurfaceSample {
            height: self.height,
            variety: Vec3::ZERO,
        }
    }

    fn color_of(&self, _position: DVec3, _sample: &SurfaceSample) -> Vec3 {
        self.color
    }

    fn amplitude(&self) -> f64 {
        self.height.abs()
    }
}
