//! Per-body surface parameters shared by every tile of one body.

use std::fmt;

use glam::{DVec3, Vec3};
use tessera_coords::SectorPos;
use tessera_terrain::SurfaceGenerator;

/// Fraction of the root edge length used as the finite-difference step
/// when estimating normals.
const NORMAL_EPSILON_FRACTION: f64 = 1.0 / 100_000.0;

/// Geometry of the nominal (undisplaced) surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// A sphere of the given radius around the body center.
    Sphere { radius: f64 },
    /// The `y = 0` plane through the body origin, up = +Y.
    Plane,
}

/// One displaced grid vertex, relative to the body center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceVertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub color: Vec3,
    pub height: f64,
    /// Material blend vector reported by the generator.
    pub variety: Vec3,
}

/// Surface-generation parameters of one body.
///
/// Held behind an `Arc` by every tile so that a split can rebuild children
/// without reaching back into the body.
pub struct BodySurface {
    center: SectorPos,
    shape: Shape,
    edge_length: f64,
    rows: u32,
    generator: Box<dyn SurfaceGenerator>,
}

impl BodySurface {
    /// `edge_length` is the edge of a depth-0 tile; `rows` the tile grid resolution.
    pub fn new(
        center: SectorPos,
        shape: Shape,
        edge_length: f64,
        rows: u32,
        generator: Box<dyn SurfaceGenerator>,
    ) -> Self {
        Self {
            center,
            shape,
            edge_length,
            rows,
            generator,
        }
    }

    pub fn center(&self) -> &SectorPos {
        &self.center
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn edge_length(&self) -> f64 {
        self.edge_length
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn generator(&self) -> &dyn SurfaceGenerator {
        self.generator.as_ref()
    }

    /// Finite-difference step for normal estimation.
    pub fn epsilon(&self) -> f64 {
        self.edge_length * NORMAL_EPSILON_FRACTION
    }

    /// Project a body-relative point onto the nominal surface.
    pub fn project(&self, relative: DVec3) -> DVec3 {
        match self.shape {
            Shape::Sphere { radius } => relative.try_normalize().unwrap_or(DVec3::Y) * radius,
            Shape::Plane => DVec3::new(relative.x, 0.0, relative.z),
        }
    }

    /// Local "up" at a body-relative point.
    pub fn up_at(&self, relative: DVec3) -> DVec3 {
        match self.shape {
            Shape::Sphere { .. } => relative.try_normalize().unwrap_or(DVec3::Y),
            Shape::Plane => DVec3::Y,
        }
    }

    /// A second point on the line from `from` straight down to the ground:
    /// the body center of a sphere, or one unit below `from` on a plane.
    pub fn down_target(&self, from: &SectorPos) -> SectorPos {
        match self.shape {
            Shape::Sphere { .. } => self.center,
            Shape::Plane => *from + DVec3::NEG_Y,
        }
    }

    /// Sample the generator around a body-relative point and build a vertex.
    ///
    /// Two extra samples one epsilon away along the local tangents give the
    /// displaced neighbours used for the normal. The color comes from the
    /// center sample, so the generator runs exactly three times.
    pub fn sample_vertex(&self, relative: DVec3) -> SurfaceVertex {
        let nominal = self.project(relative);
        let up = self.up_at(nominal);
        let (tangent, bitangent) = up.any_orthonormal_pair();
        let eps = self.epsilon();

        let p1 = self.project(nominal + tangent * eps);
        let p2 = self.project(nominal + bitangent * eps);

        let s0 = self.generator.sample(nominal);
        let s1 = self.generator.sample(p1);
        let s2 = self.generator.sample(p2);

        let q0 = nominal + up * s0.height;
        let q1 = p1 + up * s1.height;
        let q2 = p2 + up * s2.height;

        let mut normal = (q1 - q0).cross(q2 - q0).try_normalize().unwrap_or(up);
        if normal.dot(up) < 0.0 {
            normal = -normal;
        }

        SurfaceVertex {
            position: q0,
            normal,
            color: self.generator.color_of(nominal, &s0),
            height: s0.height,
            variety: s0.variety,
        }
    }
}

impl fmt::Debug for BodySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodySurface")
            .field("center", &self.center)
            .field("shape", &self.shape)
            .field("edge_length", &self.edge_length)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
