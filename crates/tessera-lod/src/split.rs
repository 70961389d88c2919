//! Four-way tile subdivision.

use std::sync::Arc;

use glam::DVec3;

use crate::error::LodError;
use crate::tile::Tile;

/// Split `parent` into four children one level deeper.
///
/// Edge midpoints are pushed back onto the nominal surface, so children of a
/// spherical tile bulge outward to follow the curvature. Children are ordered
/// `[c0, m01, m02]`, `[m01, c1, m12]`, `[m01, m12, m02]`, `[m02, m12, c2]`;
/// the third one is the inverted middle triangle.
pub fn split_tile(parent: &Tile) -> Result<[Tile; 4], LodError> {
    let surface = parent.surface_arc();
    let sector = parent.sector();
    let center = surface.center().remap(sector);
    let midpoint = |a: DVec3, b: DVec3| center + surface.project((a + b) * 0.5 - center);

    let [c0, c1, c2] = *parent.corners();
    let m01 = midpoint(c0, c1);
    let m02 = midpoint(c0, c2);
    let m12 = midpoint(c1, c2);

    let depth = parent.depth() + 1;
    let child = |corners: [DVec3; 3]| Tile::new(corners, sector, depth, Arc::clone(surface));

    Ok([
        child([c0, m01, m02])?,
        child([m01, c1, m12])?,
        child([m01, m12, m02])?,
        child([m02, m12, c2])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{BodySurface, Shape};
    use tessera_coords::{Sector, SectorPos};
    use tessera_terrain::FlatSurface;

    fn sphere_tile(radius: f64) -> Tile {
        let surface = Arc::new(BodySurface::new(
            SectorPos::default(),
            Shape::Sphere { radius },
            radius,
            4,
            Box::new(FlatSurface::new()),
        ));
        let corners = [DVec3::X * radius, DVec3::Y * radius, DVec3::Z * radius];
        Tile::new(corners, Sector::ORIGIN, 0, surface).unwrap()
    }

    #[test]
    fn test_children_are_one_level_deeper() {
        let parent = sphere_tile(1000.0);
        let children = split_tile(&parent).unwrap();
        assert!(children.iter().all(|c| c.depth() == 1));
    }

    #[test]
    fn test_midpoints_lie_on_sphere() {
        let parent = sphere_tile(1000.0);
        let children = split_tile(&parent).unwrap();
        for child in &children {
            let center = SectorPos::default().remap(child.sector());
            for corner in child.corners() {
                assert!(((*corner - center).length() - 1000.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_children_share_parent_corners() {
        let parent = sphere_tile(1000.0);
        let [a, b, _, d] = split_tile(&parent).unwrap();
        let world = |t: &Tile, k: usize| SectorPos::new(t.sector(), t.corners()[k]);
        let parent_corner = |k: usize| SectorPos::new(parent.sector(), parent.corners()[k]);
        assert!(world(&a, 0).distance(&parent_corner(0)) < 1e-6);
        assert!(world(&b, 1).distance(&parent_corner(1)) < 1e-6);
        assert!(world(&d, 2).distance(&parent_corner(2)) < 1e-6);
    }
}
