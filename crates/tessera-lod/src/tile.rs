//! Triangular surface tiles: a fixed-resolution vertex grid spanning three corners.
//!
//! A tile with `rows` rows stores `(rows + 1)(rows + 2) / 2` vertices. Vertex
//! `(i, j)` with `0 <= j <= i <= rows` sits at barycentric weights
//! `(1 - i/rows, (i - j)/rows, j/rows)` over corners `(c0, c1, c2)`, so row 0
//! is the single vertex at `c0` and row `rows` is the edge `c1..c2`.

use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Vec3};
use tessera_coords::{Sector, SectorPos, remap};

use crate::error::LodError;
use crate::surface::BodySurface;

/// GPU-ready vertex layout for one tile vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    /// Position relative to the tile's sector origin.
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Number of grid vertices in a tile with `rows` rows.
pub const fn vertex_count(rows: u32) -> usize {
    let r = rows as usize;
    (r + 1) * (r + 2) / 2
}

#[inline]
fn grid_index(i: u32, j: u32) -> usize {
    (i as usize) * (i as usize + 1) / 2 + j as usize
}

/// One triangular surface patch.
///
/// Always fully built: construction either produces a complete grid or fails.
pub struct Tile {
    corners: [DVec3; 3],
    sector: Sector,
    centroid: DVec3,
    depth: u32,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    colors: Vec<Vec3>,
    heights: Vec<f32>,
    variety: Vec<Vec3>,
    tint: Vec3,
    surface: Arc<BodySurface>,
}

impl Tile {
    /// Build a tile from three corners given relative to `sector`.
    ///
    /// The tile re-homes itself to the sector containing its corner centroid
    /// and samples the body's generator once per grid vertex.
    pub fn new(
        corners: [DVec3; 3],
        sector: Sector,
        depth: u32,
        surface: Arc<BodySurface>,
    ) -> Result<Self, LodError> {
        let flat_centroid = (corners[0] + corners[1] + corners[2]) / 3.0;
        let home = SectorPos::new(sector, flat_centroid).normalized().sector;
        let corners = corners.map(|c| remap(c, sector, home));

        let center = surface.center().remap(home);
        let flat_centroid = (corners[0] + corners[1] + corners[2]) / 3.0;
        let centroid = center + surface.project(flat_centroid - center);

        let rows = surface.rows();
        let count = vertex_count(rows);
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut colors = Vec::new();
        let mut heights = Vec::new();
        let mut variety = Vec::new();
        positions.try_reserve_exact(count)?;
        normals.try_reserve_exact(count)?;
        colors.try_reserve_exact(count)?;
        heights.try_reserve_exact(count)?;
        variety.try_reserve_exact(count)?;

        let n = rows as f64;
        for i in 0..=rows {
            for j in 0..=i {
                let a = i as f64 / n;
                let b = j as f64 / n;
                let flat = corners[0] * (1.0 - a) + corners[1] * (a - b) + corners[2] * b;
                let v = surface.sample_vertex(flat - center);
                positions.push((center + v.position).as_vec3());
                normals.push(v.normal.as_vec3());
                colors.push(v.color);
                heights.push(v.height as f32);
                variety.push(v.variety);
            }
        }

        Ok(Self {
            corners,
            sector: home,
            centroid,
            depth,
            positions,
            normals,
            colors,
            heights,
            variety,
            tint: Vec3::ONE,
            surface,
        })
    }

    /// Corner vertices relative to [`Tile::sector`].
    pub fn corners(&self) -> &[DVec3; 3] {
        &self.corners
    }

    pub fn sector(&self) -> Sector {
        self.sector
    }

    /// Centroid projected onto the nominal surface, in world coordinates.
    pub fn centroid(&self) -> SectorPos {
        SectorPos::new(self.sector, self.centroid)
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn rows(&self) -> u32 {
        self.surface.rows()
    }

    pub fn surface(&self) -> &BodySurface {
        &self.surface
    }

    pub(crate) fn surface_arc(&self) -> &Arc<BodySurface> {
        &self.surface
    }

    /// Displaced grid positions relative to the tile's sector.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    /// Per-vertex displacement along the local up direction.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Mutable heights for external passes such as erosion.
    /// Positions and normals are not recomputed.
    pub fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    /// Per-vertex material blend vector from the generator.
    pub fn variety(&self) -> &[Vec3] {
        &self.variety
    }

    /// Debug tint multiplied into vertex colors; white when unused.
    pub fn tint(&self) -> Vec3 {
        self.tint
    }

    pub fn set_tint(&mut self, tint: Vec3) {
        self.tint = tint;
    }

    /// Area of the flat corner triangle.
    pub fn area(&self) -> f64 {
        let [a, b, c] = self.corners;
        0.5 * (b - a).cross(c - a).length()
    }

    /// Height interpolated at barycentric `(u, v)`, where the point is
    /// `c0 + u (c1 - c0) + v (c2 - c0)`.
    ///
    /// Interpolation is linear over the grid cell containing the point.
    pub fn interpolate_height(&self, u: f64, v: f64) -> f64 {
        let rows = self.rows();
        let n = rows as f64;
        let fi = ((u + v) * n).clamp(0.0, n);
        let fj = (v * n).clamp(0.0, fi);

        let i = (fi.floor() as u32).min(rows.saturating_sub(1));
        let j = (fj.floor() as u32).min(i);
        let a = fi - i as f64;
        let mut b = fj - j as f64;
        if j == i {
            b = b.min(a);
        }

        let h = |i: u32, j: u32| self.heights[grid_index(i, j)] as f64;
        if rows == 0 {
            return h(0, 0);
        }
        if b <= a {
            h(i, j) + a * (h(i + 1, j) - h(i, j)) + b * (h(i + 1, j + 1) - h(i + 1, j))
        } else {
            h(i, j) + b * (h(i, j + 1) - h(i, j)) + a * (h(i + 1, j + 1) - h(i, j + 1))
        }
    }

    /// Packed vertices with the tint applied.
    pub fn vertices(&self) -> Vec<TileVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.colors)
            .map(|((p, n), c)| TileVertex {
                position: p.to_array(),
                normal: n.to_array(),
                color: (*c * self.tint).to_array(),
            })
            .collect()
    }

    /// Triangle-list indices for a grid with `rows` rows (`rows²` triangles).
    pub fn indices(rows: u32) -> Vec<u32> {
        let idx = |i: u32, j: u32| grid_index(i, j) as u32;
        let mut out = Vec::with_capacity(rows as usize * rows as usize * 3);
        for i in 0..rows {
            for j in 0..=i {
                out.extend_from_slice(&[idx(i, j), idx(i + 1, j), idx(i + 1, j + 1)]);
                if j < i {
                    out.extend_from_slice(&[idx(i, j), idx(i + 1, j + 1), idx(i, j + 1)]);
                }
            }
        }
        out
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("depth", &self.depth)
            .field("sector", &self.sector)
            .field("centroid", &self.centroid)
            .field("vertices", &self.positions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Shape;
    use tessera_coords::SECTOR_SIZE;
    use tessera_terrain::{FlatSurface, SurfaceGenerator, SurfaceSample};

    /// Height equal to the x coordinate: linear, so interpolation is exact.
    struct Ramp;

    impl SurfaceGenerator for Ramp {
        fn sample(&self, position: DVec3) -> SurfaceSample {
            SurfaceSample {
                height: position.x,
                variety: Vec3::new(position.z as f32, 0.0, 0.0),
            }
        }

        fn color_of(&self, _position: DVec3, _sample: &SurfaceSample) -> Vec3 {
            Vec3::ONE
        }

        fn amplitude(&self) -> f64 {
            f64::INFINITY
        }
    }

    fn plane(rows: u32, generator: Box<dyn SurfaceGenerator>) -> Arc<BodySurface> {
        Arc::new(BodySurface::new(SectorPos::default(), Shape::Plane, 100.0, rows, generator))
    }

    fn flat_tile(rows: u32) -> Tile {
        let corners = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 100.0),
            DVec3::new(100.0, 0.0, 100.0),
        ];
        Tile::new(corners, Sector::ORIGIN, 0, plane(rows, Box::new(FlatSurface::new()))).unwrap()
    }

    #[test]
    fn test_vertex_count_matches_grid() {
        for rows in [1, 2, 4, 8, 32] {
            let tile = flat_tile(rows);
            assert_eq!(tile.positions().len(), vertex_count(rows));
            assert_eq!(tile.normals().len(), vertex_count(rows));
            assert_eq!(tile.colors().len(), vertex_count(rows));
            assert_eq!(tile.heights().len(), vertex_count(rows));
            assert_eq!(tile.variety().len(), vertex_count(rows));
        }
    }

    #[test]
    fn test_grid_corners_match_tile_corners() {
        let rows = 4;
        let tile = flat_tile(rows);
        let p = tile.positions();
        assert!((p[grid_index(0, 0)].as_dvec3() - tile.corners()[0]).length() < 1e-3);
        assert!((p[grid_index(rows, 0)].as_dvec3() - tile.corners()[1]).length() < 1e-3);
        assert!((p[grid_index(rows, rows)].as_dvec3() - tile.corners()[2]).length() < 1e-3);
    }

    #[test]
    fn test_indices_count_and_range() {
        for rows in [1, 3, 16] {
            let indices = Tile::indices(rows);
            assert_eq!(indices.len(), (rows * rows * 3) as usize);
            let max = vertex_count(rows) as u32;
            assert!(indices.iter().all(|&i| i < max));
        }
    }

    #[test]
    fn test_area_of_flat_tile() {
        let tile = flat_tile(2);
        assert!((tile.area() - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_rehomes_to_centroid_sector() {
        let offset = DVec3::new(SECTOR_SIZE * 3.0 + 10.0, 0.0, 5.0);
        let corners = [offset, offset + DVec3::Z * 50.0, offset + DVec3::X * 50.0];
        let tile = Tile::new(
            corners,
            Sector::ORIGIN,
            2,
            plane(2, Box::new(FlatSurface::new())),
        )
        .unwrap();
        assert_eq!(tile.sector(), Sector::new(3, 0, 0));
        assert!(tile.corners()[0].x < 100.0, "corners should be small after re-homing");
        assert_eq!(tile.depth(), 2);
    }

    #[test]
    fn test_interpolate_height_exact_for_linear_field() {
        let corners = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 80.0),
            DVec3::new(80.0, 0.0, 80.0),
        ];
        let tile = Tile::new(corners, Sector::ORIGIN, 0, plane(4, Box::new(Ramp))).unwrap();
        for (u, v) in [(0.0, 0.0), (0.3, 0.2), (0.1, 0.7), (0.5, 0.5), (0.0, 1.0), (0.9, 0.05)] {
            let x = corners[0].x + u * (corners[1].x - corners[0].x) + v * (corners[2].x - corners[0].x);
            let h = tile.interpolate_height(u, v);
            assert!((h - x).abs() < 1e-3, "at ({u}, {v}) expected {x}, got {h}");
        }
    }

    #[test]
    fn test_vertices_apply_tint() {
        let mut tile = flat_tile(1);
        tile.set_tint(Vec3::new(1.0, 0.0, 0.0));
        let vertices = tile.vertices();
        assert_eq!(vertices.len(), 3);
        assert!(vertices.iter().all(|v| v.color[1] == 0.0 && v.color[2] == 0.0));
        assert_eq!(bytemuck::cast_slice::<TileVertex, u8>(&vertices).len(), 3 * 36);
    }

    #[test]
    fn test_variety_follows_grid_layout() {
        let corners = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 80.0),
            DVec3::new(80.0, 0.0, 80.0),
        ];
        let tile = Tile::new(corners, Sector::ORIGIN, 0, plane(4, Box::new(Ramp))).unwrap();
        // Row i lies at z = 80 * i / 4.
        for i in 0..=4 {
            for j in 0..=i {
                let z = tile.variety()[grid_index(i, j)].x;
                assert!((z - 20.0 * i as f32).abs() < 1e-4, "row {i} col {j}: {z}");
            }
        }
    }
}
