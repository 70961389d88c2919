//! Domain-warped fractal simplex noise with a material palette.
//!
//! The height is the average of two domain-warped fBm lookups at one and two
//! times the base frequency. The intermediate warp vectors double as the
//! material "variety" signal that drives vertex color.

use glam::{DVec3, Vec3};
use noise::{NoiseFn, Simplex};

use crate::generator::{SurfaceGenerator, SurfaceSample};

const WARP_A: DVec3 = DVec3::new(1.4, 1.08, 1.3);
const WARP_B: DVec3 = DVec3::new(3.8, 7.9, 2.1);

/// A named surface material.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGB, each channel in `[0, 1]`.
    pub color: Vec3,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Vec3) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// Configuration for [`NoiseSurface`].
#[derive(Clone, Debug)]
pub struct NoiseSurfaceParams {
    /// Seed for deterministic generation.
    pub seed: u32,
    /// Maximum absolute displacement in world units.
    pub amplitude: f64,
    /// Frequency applied to body-relative positions before sampling.
    pub frequency: f64,
    /// Number of fBm octaves.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Palette ordered from low ground to high ground.
    pub materials: Vec<Material>,
}

impl Default for NoiseSurfaceParams {
    fn default() -> Self {
        Self {
            seed: 0,
            amplitude: 8_000.0,
            frequency: 2.0e-6,
            octaves: 5,
            lacunarity: 2.0,
            persistence: 0.5,
            materials: vec![
                Material::new("sand", Vec3::new(0.30, 0.27, 0.21)),
                Material::new("rock", Vec3::new(0.45, 0.40, 0.36)),
                Material::new("snow", Vec3::new(0.96, 0.94, 0.96)),
            ],
        }
    }
}

/// Seeded noise-based surface.
pub struct NoiseSurface {
    noise: Simplex,
    params: NoiseSurfaceParams,
    norm: f64,
}

impl NoiseSurface {
    pub fn new(params: NoiseSurfaceParams) -> Self {
        let mut norm = 0.0;
        let mut amp = 1.0;
        for _ in 0..params.octaves.max(1) {
            norm += amp;
            amp *= params.persistence;
        }
        Self {
            noise: Simplex::new(params.seed),
            params,
            norm,
        }
    }

    pub fn params(&self) -> &NoiseSurfaceParams {
        &self.params
    }

    /// Normalised fBm in `[-1, 1]`.
    fn fbm(&self, p: DVec3) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        for _ in 0..self.params.octaves.max(1) {
            let q = p * frequency;
            total += self.noise.get([q.x, q.y, q.z]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }
        (total / self.norm).clamp(-1.0, 1.0)
    }

    fn distorted(&self, p: DVec3) -> (f64, DVec3) {
        let h1 = DVec3::new(self.fbm(p), self.fbm(p + WARP_A), self.fbm(p + WARP_B));
        let h2 = DVec3::new(
            self.fbm(p + 2.4 * h1),
            self.fbm(p + 2.0 * h1 + WARP_A),
            self.fbm(p + h1 + WARP_B),
        );
        (self.fbm(p + 0.65 * h2), h1 + h2 / 2.0)
    }
}

impl SurfaceGenerator for NoiseSurface {
    fn sample(&self, position: DVec3) -> SurfaceSample {
        let p = position * self.params.frequency;
        let (h1, v1) = self.distorted(p);
        let (h2, v2) = self.distorted(p * 2.0);
        SurfaceSample {
            height: self.params.amplitude * (h1 + h2) / 2.0,
            variety: ((v1 + v2) / 2.0).as_vec3(),
        }
    }

    fn color_of(&self, _position: DVec3, sample: &SurfaceSample) -> Vec3 {
        let materials = &self.params.materials;
        match materials.len() {
            0 => return Vec3::splat(0.5),
            1 => return materials[0].color,
            _ => {}
        }

        let relative = if self.params.amplitude > 0.0 {
            sample.height / self.params.amplitude
        } else {
            0.0
        };
        let s = ((relative + 1.0) * 0.5 + 0.15 * sample.variety.x as f64).clamp(0.0, 1.0);

        let scaled = s * (materials.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(materials.len() - 2);
        let t = (scaled - lower as f64) as f32;
        let base = materials[lower].color.lerp(materials[lower + 1].color, t);

        let shade = 1.0 + 0.1 * sample.variety.y.clamp(-1.0, 1.0);
        (base * shade).clamp(Vec3::ZERO, Vec3::ONE)
    }

    fn amplitude(&self) -> f64 {
        self.params.amplitude
    }
}
