//! Camera-distance LOD policy: how deep should a tile be subdivided?
//!
//! The controlling distance for a tile is the larger of the camera altitude
//! and the distance from the camera's ground point to the tile. Each halving
//! of that distance buys one more subdivision level, until the pixel size of
//! a grid triangle reaches the target on screen. Tiles past the horizon of a
//! spherical body never ask for subdivision.

use tessera_coords::SectorPos;

use crate::surface::{BodySurface, Shape};
use crate::tile::Tile;

/// Parameters of the desired-depth function.
#[derive(Clone, Debug, PartialEq)]
pub struct LodPolicy {
    /// Width of the target viewport in pixels.
    pub viewport_width: f64,
    /// On-screen edge length a grid triangle should settle at.
    pub pixels_per_triangle_edge: f64,
    /// Hard cap on tree depth.
    pub max_subdivisions: u32,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            viewport_width: 1920.0,
            pixels_per_triangle_edge: 2.0,
            max_subdivisions: 10,
        }
    }
}

impl LodPolicy {
    /// Distance at which a root tile's grid triangles reach the pixel target.
    pub fn scale_factor(&self, surface: &BodySurface) -> f64 {
        (self.viewport_width * surface.edge_length())
            / (2.0 * self.pixels_per_triangle_edge * surface.rows() as f64)
    }

    /// Desired subdivision depth of `tile` (currently at `depth`) as seen
    /// from `camera`. Always in `[0, max_subdivisions]`.
    pub fn desired_depth(
        &self,
        surface: &BodySurface,
        tile: &Tile,
        depth: u32,
        camera: &SectorPos,
    ) -> u32 {
        // Work in the tile's sector so every vector stays small.
        let sector = tile.sector();
        let camera_local = camera.remap(sector);
        let center = surface.center().remap(sector);
        let tile_pos = tile.centroid().remap(sector);

        let relative = camera_local - center;
        let altitude = match surface.shape() {
            Shape::Sphere { radius } => relative.length() - radius,
            Shape::Plane => relative.y,
        };
        let ground = center + surface.project(relative);

        let radius = tile_radius(surface.edge_length(), depth);
        let tile_dist = ground.distance(tile_pos) - radius;
        let subdiv_dist = altitude.max(tile_dist);

        if let Shape::Sphere { radius: body_radius } = surface.shape()
            && horizon_distance(body_radius, altitude.max(0.0))
                < camera_local.distance(tile_pos) - radius
        {
            return 0;
        }

        splits_per_distance(subdiv_dist, self.scale_factor(surface), self.max_subdivisions)
    }
}

/// `floor(log2(scale / distance))` clamped to `[0, max]`.
///
/// A non-positive distance means the camera is inside the tile footprint
/// and yields `max`; NaN yields 0.
pub fn splits_per_distance(distance: f64, scale: f64, max: u32) -> u32 {
    if distance.is_nan() {
        return 0;
    }
    if distance <= 0.0 {
        return max;
    }
    let raw = (scale / distance).log2();
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, max as f64).floor() as u32
}

/// Half-width used for a tile at `depth`: the root edge halved per level.
pub fn tile_radius(edge_length: f64, depth: u32) -> f64 {
    edge_length / 2f64.powi(depth as i32)
}

/// Great-circle distance along the surface from the point below the camera
/// to its horizon, for a camera `altitude` above a sphere of `radius`.
pub fn horizon_distance(radius: f64, altitude: f64) -> f64 {
    if altitude <= 0.0 || radius <= 0.0 {
        return 0.0;
    }
    radius * (radius / (radius + altitude)).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use glam::DVec3;
    use tessera_coords::Sector;
    use tessera_terrain::FlatSurface;

    const RADIUS: f64 = 6_000_000.0;

    fn sphere() -> Arc<BodySurface> {
        Arc::new(BodySurface::new(
            SectorPos::default(),
            Shape::Sphere { radius: RADIUS },
            RADIUS,
            8,
            Box::new(FlatSurface::new()),
        ))
    }

    /// A small tile centred on `dir` at the given depth.
    fn tile_at(surface: &Arc<BodySurface>, dir: DVec3, depth: u32) -> Tile {
        let (t, b) = dir.any_orthonormal_pair();
        let size = tile_radius(RADIUS, depth) * 0.5;
        let c = dir * RADIUS;
        let corners = [c + t * size, c - t * size + b * size, c - t * size - b * size];
        Tile::new(corners, Sector::ORIGIN, depth, Arc::clone(surface)).unwrap()
    }

    /// Non-positive distances ask for the maximum depth.
    #[test]
    fn test_inside_footprint_returns_max() {
        assert_eq!(splits_per_distance(0.0, 1000.0, 10), 10);
        assert_eq!(splits_per_distance(-5.0, 1000.0, 7), 7);
    }

    #[test]
    fn test_degenerate_distances_stay_in_bounds() {
        assert_eq!(splits_per_distance(f64::INFINITY, 1000.0, 10), 0);
        assert_eq!(splits_per_distance(f64::NAN, 1000.0, 10), 0);
        assert_eq!(splits_per_distance(1e-300, 1e300, 10), 10);
        assert_eq!(splits_per_distance(1.0, 0.0, 10), 0);
    }

    /// Depth is floored, never rounded.
    #[test]
    fn test_depth_is_floored() {
        let scale = 1024.0;
        // log2(1024 / 140) ~= 2.87
        assert_eq!(splits_per_distance(140.0, scale, 10), 2);
        assert_eq!(splits_per_distance(128.0, scale, 10), 3);
    }

    #[test]
    fn test_monotonically_non_increasing_with_distance() {
        let scale = 5.0e7;
        let mut prev = u32::MAX;
        for i in 0..2000 {
            let d = 1.0 + i as f64 * 997.0;
            let depth = splits_per_distance(d, scale, 12);
            assert!(
                depth <= prev,
                "depth increased from {prev} to {depth} at distance {d}"
            );
            prev = depth;
        }
    }

    #[test]
    fn test_horizon_distance_increases_with_altitude() {
        let low = horizon_distance(RADIUS, 100.0);
        let high = horizon_distance(RADIUS, 10_000.0);
        assert!(
            high > low,
            "higher altitude ({high}) should see farther than lower ({low})"
        );
        assert_eq!(horizon_distance(RADIUS, 0.0), 0.0);
        assert_eq!(horizon_distance(RADIUS, -50.0), 0.0);
    }

    /// For small altitudes the arc matches the tangent length sqrt(2rh).
    #[test]
    fn test_horizon_distance_near_surface() {
        let h = 1000.0;
        let arc = horizon_distance(RADIUS, h);
        let tangent = (2.0 * RADIUS * h).sqrt();
        assert!((arc - tangent).abs() / tangent < 1e-3, "{arc} vs {tangent}");
    }

    #[test]
    fn test_tile_below_camera_wants_max_depth() {
        let surface = sphere();
        let tile = tile_at(&surface, DVec3::Y, 3);
        let camera = SectorPos::from_origin(DVec3::Y * (RADIUS + 1000.0));
        let policy = LodPolicy::default();
        assert_eq!(
            policy.desired_depth(&surface, &tile, 3, &camera),
            policy.max_subdivisions
        );
    }

    #[test]
    fn test_far_side_tile_is_never_split() {
        let surface = sphere();
        let tile = tile_at(&surface, -DVec3::Y, 0);
        let camera = SectorPos::from_origin(DVec3::Y * (RADIUS + 1000.0));
        let policy = LodPolicy::default();
        assert_eq!(policy.desired_depth(&surface, &tile, 0, &camera), 0);
    }

    /// High above the surface, altitude controls the depth everywhere.
    #[test]
    fn test_altitude_limits_depth() {
        let surface = sphere();
        let tile = tile_at(&surface, DVec3::Y, 0);
        let policy = LodPolicy::default();
        let low = SectorPos::from_origin(DVec3::Y * (RADIUS + 1_000.0));
        let high = SectorPos::from_origin(DVec3::Y * (RADIUS + 1_000_000.0));
        let d_low = policy.desired_depth(&surface, &tile, 0, &low);
        let d_high = policy.desired_depth(&surface, &tile, 0, &high);
        assert!(d_high < d_low, "high {d_high} should be below low {d_low}");
        let expected = splits_per_distance(1_000_000.0, policy.scale_factor(&surface), 10);
        assert_eq!(d_high, expected);
    }

    #[test]
    fn test_plane_uses_height_as_altitude() {
        let surface = Arc::new(BodySurface::new(
            SectorPos::default(),
            Shape::Plane,
            1000.0,
            8,
            Box::new(FlatSurface::new()),
        ));
        let corners = [DVec3::ZERO, DVec3::Z * 1000.0, DVec3::new(1000.0, 0.0, 1000.0)];
        let tile = Tile::new(corners, Sector::ORIGIN, 0, surface.clone()).unwrap();
        let policy = LodPolicy::default();
        let scale = policy.scale_factor(&surface);
        let camera = SectorPos::from_origin(DVec3::new(300.0, 50.0, 700.0));
        assert_eq!(
            policy.desired_depth(&surface, &tile, 0, &camera),
            splits_per_distance(50.0, scale, 10)
        );
    }
}
