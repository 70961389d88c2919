//! Bodies: a planet (20 icosahedral roots) or a flat terrain grid.

use std::f64::consts::PI;
use std::sync::Arc;

use glam::{DQuat, DVec3};
use tessera_coords::SectorPos;
use tessera_terrain::SurfaceGenerator;
use tracing::{info, trace, warn};

use crate::error::LodError;
use crate::policy::LodPolicy;
use crate::raycast::RayHit;
use crate::surface::{BodySurface, Shape};
use crate::tile::Tile;
use crate::traversal::{
    DrawContext, Drawlist, FrameInputs, FrameStats, PruneContext, SplitContext,
    TraversalSettings, drawlist_visit, prune_visit, split_order, split_visit,
};
use crate::tree::TileNode;

const ICO_X: f64 = 0.525_731_112_119_133_6;
const ICO_Z: f64 = 0.850_650_808_352_039_9;

/// Unit icosahedron vertices.
const ICOSAHEDRON_VERTICES: [DVec3; 12] = [
    DVec3::new(-ICO_X, 0.0, ICO_Z),
    DVec3::new(ICO_X, 0.0, ICO_Z),
    DVec3::new(-ICO_X, 0.0, -ICO_Z),
    DVec3::new(ICO_X, 0.0, -ICO_Z),
    DVec3::new(0.0, ICO_Z, ICO_X),
    DVec3::new(0.0, ICO_Z, -ICO_X),
    DVec3::new(0.0, -ICO_Z, ICO_X),
    DVec3::new(0.0, -ICO_Z, -ICO_X),
    DVec3::new(ICO_Z, ICO_X, 0.0),
    DVec3::new(-ICO_Z, ICO_X, 0.0),
    DVec3::new(ICO_Z, -ICO_X, 0.0),
    DVec3::new(-ICO_Z, -ICO_X, 0.0),
];

/// The 20 faces, as indices into [`ICOSAHEDRON_VERTICES`].
const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 4, 1],
    [0, 9, 4],
    [9, 5, 4],
    [4, 5, 8],
    [4, 8, 1],
    [8, 10, 1],
    [8, 3, 10],
    [5, 3, 8],
    [5, 2, 3],
    [2, 7, 3],
    [7, 10, 3],
    [7, 6, 10],
    [7, 11, 6],
    [11, 0, 6],
    [0, 1, 6],
    [6, 1, 10],
    [9, 0, 11],
    [9, 11, 2],
    [9, 2, 5],
    [7, 2, 11],
];

/// Face whose centroid is turned to +Y, so the poles sit on face centers.
const POLAR_FACE: usize = 3;

/// Number of root tiles of a planet.
pub const PLANET_ROOTS: usize = ICOSAHEDRON_FACES.len();

/// Parameters of a spherical body.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanetDesc {
    pub center: SectorPos,
    pub radius: f64,
    /// Grid rows per tile.
    pub rows: u32,
}

/// Parameters of a flat terrain grid.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainDesc {
    /// Corner of cell `(0, 0)`; the surface is the `y = origin.y` plane.
    pub origin: SectorPos,
    pub cells_x: u32,
    pub cells_z: u32,
    pub cell_size: f64,
    /// Grid rows per tile.
    pub rows: u32,
}

/// Ground measured below a query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AltitudeSample {
    /// Signed distance from the query point to the ground along the local
    /// up direction. Negative below ground.
    pub distance: f64,
    /// Displaced surface point under the query point.
    pub ground: SectorPos,
    /// Interpolated displacement of the ground from the nominal surface.
    pub height: f64,
    /// Depth of the tile the ground was measured in.
    pub depth: u32,
}

/// One body and its root trees.
#[derive(Debug)]
pub struct Body {
    surface: Arc<BodySurface>,
    roots: Vec<TileNode>,
    policy: LodPolicy,
    settings: TraversalSettings,
}

impl Body {
    /// A planet built from a rotated icosahedron scaled to `desc.radius`.
    pub fn planet(
        desc: &PlanetDesc,
        generator: Box<dyn SurfaceGenerator>,
        policy: LodPolicy,
        settings: TraversalSettings,
    ) -> Result<Self, LodError> {
        if !(desc.radius.is_finite() && desc.radius > 0.0) {
            return Err(LodError::InvalidBody(format!(
                "planet radius must be positive, got {}",
                desc.radius
            )));
        }
        validate_rows(desc.rows)?;

        let edge_length = desc.radius / (2.0 * PI / 5.0).sin();
        let surface = Arc::new(BodySurface::new(
            desc.center,
            Shape::Sphere {
                radius: desc.radius,
            },
            edge_length,
            desc.rows,
            generator,
        ));

        let [a, b, c] = ICOSAHEDRON_FACES[POLAR_FACE].map(|i| ICOSAHEDRON_VERTICES[i]);
        let tilt = DQuat::from_rotation_arc(((a + b + c) / 3.0).normalize(), DVec3::Y);

        let center = desc.center;
        let mut roots = Vec::new();
        roots.try_reserve_exact(PLANET_ROOTS)?;
        for face in ICOSAHEDRON_FACES {
            let corners =
                face.map(|i| center.offset + tilt * ICOSAHEDRON_VERTICES[i] * desc.radius);
            let tile = Tile::new(corners, center.sector, 0, Arc::clone(&surface))?;
            roots.push(TileNode::new(tile));
        }

        info!(
            radius = desc.radius,
            edge_length,
            rows = desc.rows,
            center = %desc.center,
            "Created planet body"
        );
        Ok(Self {
            surface,
            roots,
            policy,
            settings,
        })
    }

    /// A flat grid of `cells_x * cells_z` square cells, two root tiles each.
    pub fn terrain(
        desc: &TerrainDesc,
        generator: Box<dyn SurfaceGenerator>,
        policy: LodPolicy,
        settings: TraversalSettings,
    ) -> Result<Self, LodError> {
        if desc.cells_x == 0 || desc.cells_z == 0 {
            return Err(LodError::InvalidBody(format!(
                "terrain grid must have cells, got {}x{}",
                desc.cells_x, desc.cells_z
            )));
        }
        if !(desc.cell_size.is_finite() && desc.cell_size > 0.0) {
            return Err(LodError::InvalidBody(format!(
                "cell size must be positive, got {}",
                desc.cell_size
            )));
        }
        validate_rows(desc.rows)?;

        let surface = Arc::new(BodySurface::new(
            desc.origin,
            Shape::Plane,
            desc.cell_size,
            desc.rows,
            generator,
        ));

        let base = desc.origin.offset;
        let s = desc.cell_size;
        let mut roots = Vec::new();
        roots.try_reserve_exact(desc.cells_x as usize * desc.cells_z as usize * 2)?;
        for cx in 0..desc.cells_x {
            for cz in 0..desc.cells_z {
                let (x0, z0) = (cx as f64 * s, cz as f64 * s);
                let p00 = base + DVec3::new(x0, 0.0, z0);
                let p01 = base + DVec3::new(x0, 0.0, z0 + s);
                let p11 = base + DVec3::new(x0 + s, 0.0, z0 + s);
                let p10 = base + DVec3::new(x0 + s, 0.0, z0);
                for corners in [[p00, p01, p11], [p00, p11, p10]] {
                    let tile = Tile::new(corners, desc.origin.sector, 0, Arc::clone(&surface))?;
                    roots.push(TileNode::new(tile));
                }
            }
        }

        info!(
            cells_x = desc.cells_x,
            cells_z = desc.cells_z,
            cell_size = desc.cell_size,
            rows = desc.rows,
            "Created terrain body"
        );
        Ok(Self {
            surface,
            roots,
            policy,
            settings,
        })
    }

    pub fn surface(&self) -> &BodySurface {
        &self.surface
    }

    pub fn roots(&self) -> &[TileNode] {
        &self.roots
    }

    pub fn policy(&self) -> &LodPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: LodPolicy) {
        self.policy = policy;
    }

    pub fn settings(&self) -> &TraversalSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TraversalSettings) {
        self.settings = settings;
    }

    /// Desired depth of `tile` at `depth` for this body's policy.
    pub fn desired_depth(&self, tile: &Tile, depth: u32, camera: &SectorPos) -> u32 {
        self.policy
            .desired_depth(&self.surface, tile, depth, camera)
    }

    /// Split and prune for one frame, discarding pruned tiles.
    pub fn update(&mut self, camera: &SectorPos) -> Result<FrameStats, LodError> {
        self.update_with(camera, &mut |_| {})
    }

    /// Split and prune for one frame, handing each pruned tile to `on_free`.
    ///
    /// An allocation failure while splitting stops the frame and is returned;
    /// splits already attached stay in place.
    pub fn update_with(
        &mut self,
        camera: &SectorPos,
        on_free: &mut dyn FnMut(Tile),
    ) -> Result<FrameStats, LodError> {
        let inputs = FrameInputs {
            policy: &self.policy,
            surface: self.surface.as_ref(),
            camera: *camera,
        };

        let mut split = SplitContext::new(inputs, &self.settings);
        for root in &mut self.roots {
            root.preorder_visit_mut_ordered(&mut split, &mut split_visit, &mut split_order);
            if let Some(err) = split.error.take() {
                return Err(err);
            }
        }
        let mut stats = split.stats;

        if self.settings.prune_after_frames > 0 {
            let mut prune = PruneContext {
                inputs,
                after_frames: self.settings.prune_after_frames,
                pruned: 0,
                on_free,
            };
            for root in &mut self.roots {
                root.preorder_visit_mut(&mut prune, &mut prune_visit);
            }
            stats.pruned = prune.pruned;
        }

        trace!(
            visited = stats.visited,
            splits = stats.splits,
            pruned = stats.pruned,
            budget_exhausted = stats.budget_exhausted,
            "Updated body"
        );
        Ok(stats)
    }

    /// Tiles to draw from `camera`, at most `max_tiles` of them.
    pub fn drawlist(&self, camera: &SectorPos, max_tiles: usize) -> Drawlist<'_> {
        let mut ctx = DrawContext {
            inputs: FrameInputs {
                policy: &self.policy,
                surface: self.surface.as_ref(),
                camera: *camera,
            },
            list: Drawlist::new(max_tiles),
        };
        for root in &self.roots {
            root.preorder_visit(&mut ctx, &mut drawlist_visit);
        }
        if ctx.list.dropped() > 0 {
            warn!(
                dropped = ctx.list.dropped(),
                max_tiles, "Drawlist full, tiles dropped"
            );
        }
        ctx.list
    }

    /// Update, then build the drawlist from the same camera.
    pub fn frame(
        &mut self,
        camera: &SectorPos,
        max_tiles: usize,
    ) -> Result<(FrameStats, Drawlist<'_>), LodError> {
        let stats = self.update(camera)?;
        Ok((stats, self.drawlist(camera, max_tiles)))
    }

    /// The deepest tile of every root crossed by the line `from -> toward`.
    pub fn intersecting_leaves(
        &self,
        from: &SectorPos,
        toward: &SectorPos,
    ) -> Vec<(&Tile, RayHit)> {
        self.roots
            .iter()
            .filter_map(|root| root.find_intersecting_leaf(from, toward))
            .collect()
    }

    /// Ground below `from`: toward the center of a planet, straight down on
    /// a terrain grid.
    ///
    /// A planet is crossed twice; the crossing nearest to `from` wins.
    /// Returns `None` when the line misses every root (e.g. `from` beyond the
    /// edge of a terrain grid, or at a planet's center).
    pub fn altitude(&self, from: &SectorPos) -> Option<AltitudeSample> {
        let toward = self.surface.down_target(from);
        self.intersecting_leaves(from, &toward)
            .into_iter()
            .map(|(tile, hit)| self.measure(tile, &hit, from))
            .min_by(|a, b| a.distance.abs().total_cmp(&b.distance.abs()))
    }

    fn measure(&self, tile: &Tile, hit: &RayHit, from: &SectorPos) -> AltitudeSample {
        let sector = tile.sector();
        let center = self.surface.center().remap(sector);
        let nominal = center + self.surface.project(hit.point - center);
        let up = self.surface.up_at(nominal - center);
        let height = tile.interpolate_height(hit.u, hit.v);
        let ground = nominal + up * height;
        AltitudeSample {
            distance: (from.remap(sector) - ground).dot(up),
            ground: SectorPos::new(sector, ground).normalized(),
            height,
            depth: tile.depth(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.roots.iter().map(TileNode::node_count).sum()
    }

    pub fn leaf_count(&self) -> usize {
        self.roots.iter().map(TileNode::leaf_count).sum()
    }

    pub fn max_depth(&self) -> u32 {
        self.roots.iter().map(TileNode::max_depth).max().unwrap_or(0)
    }

    /// Destroy the body, handing every tile to `on_free` children-first.
    /// Returns the number of tiles released.
    pub fn teardown(self, on_free: &mut dyn FnMut(Tile)) -> usize {
        let mut freed = 0;
        for root in self.roots {
            freed += root.free(on_free);
        }
        info!(freed, "Tore down body");
        freed
    }
}

fn validate_rows(rows: u32) -> Result<(), LodError> {
    if rows == 0 {
        return Err(LodError::InvalidBody("tile rows must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_terrain::FlatSurface;

    fn planet(radius: f64) -> Body {
        Body::planet(
            &PlanetDesc {
                center: SectorPos::default(),
                radius,
                rows: 2,
            },
            Box::new(FlatSurface::new()),
            LodPolicy::default(),
            TraversalSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_planet_has_twenty_roots_on_sphere() {
        let body = planet(1000.0);
        assert_eq!(body.roots().len(), PLANET_ROOTS);
        for root in body.roots() {
            let tile = root.tile();
            let center = body.surface().center().remap(tile.sector());
            for corner in tile.corners() {
                assert!(((*corner - center).length() - 1000.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_planet_edge_length_matches_icosahedron() {
        let body = planet(1000.0);
        let [a, b, _] = *body.roots()[0].tile().corners();
        assert!(
            ((a - b).length() - body.surface().edge_length()).abs() < 1e-6,
            "edge {} vs {}",
            (a - b).length(),
            body.surface().edge_length()
        );
    }

    #[test]
    fn test_pole_is_a_face_centroid() {
        let body = planet(1000.0);
        let top = body
            .roots()
            .iter()
            .map(|r| r.tile().centroid().remap(tessera_coords::Sector::ORIGIN))
            .max_by(|a, b| a.y.total_cmp(&b.y))
            .unwrap();
        assert!((top - DVec3::Y * 1000.0).length() < 1e-6, "top centroid {top}");
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let err = Body::planet(
            &PlanetDesc {
                center: SectorPos::default(),
                radius: -1.0,
                rows: 4,
            },
            Box::new(FlatSurface::new()),
            LodPolicy::default(),
            TraversalSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LodError::InvalidBody(_)));

        let err = Body::terrain(
            &TerrainDesc {
                origin: SectorPos::default(),
                cells_x: 0,
                cells_z: 2,
                cell_size: 10.0,
                rows: 4,
            },
            Box::new(FlatSurface::new()),
            LodPolicy::default(),
            TraversalSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LodError::InvalidBody(_)));
    }

    #[test]
    fn test_terrain_roots_cover_grid() {
        let body = Body::terrain(
            &TerrainDesc {
                origin: SectorPos::default(),
                cells_x: 3,
                cells_z: 2,
                cell_size: 50.0,
                rows: 2,
            },
            Box::new(FlatSurface::new()),
            LodPolicy::default(),
            TraversalSettings::default(),
        )
        .unwrap();
        assert_eq!(body.roots().len(), 12);
        let area: f64 = body.roots().iter().map(|r| r.tile().area()).sum();
        assert!((area - 6.0 * 2500.0).abs() < 1e-6);
    }

    #[test]
    fn test_teardown_releases_every_tile() {
        let mut body = planet(6_000_000.0);
        let camera = SectorPos::from_origin(DVec3::Y * 6_001_000.0);
        body.update(&camera).unwrap();
        let nodes = body.node_count();
        let mut released = 0;
        let freed = body.teardown(&mut |_| released += 1);
        assert_eq!(freed, nodes);
        assert_eq!(released, nodes);
    }
}
