//! Ray queries against the tile tree.

use glam::DVec3;
use tessera_coords::SectorPos;

use crate::tile::Tile;
use crate::tree::TileNode;

/// Slack on the barycentric bounds so rays through shared edges still hit.
const BARYCENTRIC_TOLERANCE: f64 = 1e-9;

/// Rays closer than this (relative) to the triangle plane count as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Intersection of a line with a triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Line parameter: `point = origin + t * direction`. May be negative.
    pub t: f64,
    /// Barycentric weight of the second corner.
    pub u: f64,
    /// Barycentric weight of the third corner.
    pub v: f64,
    /// The intersection point, in the triangle's frame.
    pub point: DVec3,
}

/// Möller–Trumbore intersection of the infinite line `origin + t * direction`
/// with `triangle`.
///
/// Both directions along the line are accepted so that a query starting
/// below the surface still finds the triangle above it.
pub fn ray_triangle(origin: DVec3, direction: DVec3, triangle: &[DVec3; 3]) -> Option<RayHit> {
    let [v0, v1, v2] = *triangle;
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = direction.cross(edge2);
    let a = edge1.dot(h);

    let scale = edge1.length() * edge2.length() * direction.length();
    if !(a.abs() > PARALLEL_EPSILON * scale) {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(-BARYCENTRIC_TOLERANCE..=1.0 + BARYCENTRIC_TOLERANCE).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < -BARYCENTRIC_TOLERANCE || u + v > 1.0 + BARYCENTRIC_TOLERANCE {
        return None;
    }

    let t = f * edge2.dot(q);
    Some(RayHit {
        t,
        u: u.clamp(0.0, 1.0),
        v: v.clamp(0.0, 1.0 - u.clamp(0.0, 1.0)),
        point: origin + direction * t,
    })
}

struct RayQuery<'a> {
    from: SectorPos,
    toward: SectorPos,
    best: Option<(&'a Tile, RayHit)>,
}

fn ray_visit<'a>(node: &'a TileNode, query: &mut RayQuery<'a>) -> bool {
    if let Some((best, _)) = query.best
        && best.depth() >= node.depth()
    {
        return false;
    }
    let tile = node.tile();
    let origin = query.from.remap(tile.sector());
    let direction = query.toward.remap(tile.sector()) - origin;
    match ray_triangle(origin, direction, tile.corners()) {
        Some(hit) => {
            query.best = Some((tile, hit));
            true
        }
        None => false,
    }
}

impl TileNode {
    /// Deepest tile under this node whose corner triangle is crossed by the
    /// line from `from` through `toward`.
    ///
    /// Descends only into nodes that are hit, so the cost is proportional to
    /// tree depth. The returned hit is expressed in the tile's sector.
    pub fn find_intersecting_leaf(
        &self,
        from: &SectorPos,
        toward: &SectorPos,
    ) -> Option<(&Tile, RayHit)> {
        let mut query = RayQuery {
            from: *from,
            toward: *toward,
            best: None,
        };
        self.preorder_visit(&mut query, &mut ray_visit);
        query.best
    }
}
