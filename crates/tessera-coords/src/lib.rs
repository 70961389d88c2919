//! Large-world coordinates: integer sector index plus a small floating-point offset.
//!
//! Planet-scale positions lose precision when stored as a single floating-point
//! vector far from the world origin. Every position here is split into a
//! [`Sector`] (a coarse integer cell) and an offset inside (or near) that sector.
//! All comparisons between positions go through [`SectorPos::delta`] or
//! [`SectorPos::remap`], which subtract sector indices as integers first and
//! only then fold the (small) difference into floating point.
//!
//! # Coordinate frames
//!
//! 1. **World** — `(Sector, DVec3)` pair, unbounded extent
//! 2. **Sector-local** — a plain `DVec3` measured from one sector's origin,
//!    obtained by remapping a world position into that sector
//!
//! ```rust
//! use glam::DVec3;
//! use tessera_coords::{Sector, SectorPos, SECTOR_SIZE};
//!
//! let a = SectorPos::new(Sector::new(10, 0, 0), DVec3::new(1.0, 0.0, 0.0));
//! let b = SectorPos::new(Sector::new(11, 0, 0), DVec3::new(1.0, 0.0, 0.0));
//! assert_eq!(b.delta(&a), DVec3::new(SECTOR_SIZE, 0.0, 0.0));
//! ```

use std::fmt;
use std::ops::{Add, Sub};

use glam::DVec3;

const SECTOR_BITS: u32 = 20;

/// Edge length of one sector in world units (2^20).
pub const SECTOR_SIZE: f64 = (1u64 << SECTOR_BITS) as f64;

/// The index of a sector in the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Sector {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Sector {
    /// The sector whose origin is the world origin.
    pub const ORIGIN: Sector = Sector { x: 0, y: 0, z: 0 };

    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Position of this sector's origin as seen from `other`'s origin.
    ///
    /// The index difference is taken in integers, so the result is exact
    /// as long as it fits in an f64 mantissa (about 2^33 sectors apart).
    pub fn offset_from(self, other: Sector) -> DVec3 {
        DVec3::new(
            (self.x - other.x) as f64 * SECTOR_SIZE,
            (self.y - other.y) as f64 * SECTOR_SIZE,
            (self.z - other.z) as f64 * SECTOR_SIZE,
        )
    }

    /// Split an offset into whole sectors and the remainder in `[0, SECTOR_SIZE)`.
    pub fn split_offset(offset: DVec3) -> (Sector, DVec3) {
        let cells = (offset / SECTOR_SIZE).floor();
        let sector = Sector::new(cells.x as i64, cells.y as i64, cells.z as i64);
        (sector, offset - cells * SECTOR_SIZE)
    }
}

impl Add for Sector {
    type Output = Sector;

    fn add(self, rhs: Sector) -> Sector {
        Sector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sector({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Re-express `offset`, measured from `from`'s origin, relative to `to`'s origin.
pub fn remap(offset: DVec3, from: Sector, to: Sector) -> DVec3 {
    offset + from.offset_from(to)
}

/// A world position decomposed into sector index + local offset.
///
/// The offset is not required to lie inside its sector: tiles keep the
/// sector of their centroid and store corner offsets that may reach into
/// neighbouring sectors. Call [`SectorPos::normalized`] to canonicalise.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SectorPos {
    pub sector: Sector,
    pub offset: DVec3,
}

impl SectorPos {
    pub fn new(sector: Sector, offset: DVec3) -> Self {
        Self { sector, offset }
    }

    /// A position given as an offset from the world origin.
    pub fn from_origin(offset: DVec3) -> Self {
        Self::new(Sector::ORIGIN, offset).normalized()
    }

    /// Move whole sectors out of the offset so that it lies in `[0, SECTOR_SIZE)`.
    pub fn normalized(self) -> Self {
        let (carry, offset) = Sector::split_offset(self.offset);
        Self::new(self.sector + carry, offset)
    }

    /// This position as a local vector relative to `to`'s origin.
    pub fn remap(&self, to: Sector) -> DVec3 {
        remap(self.offset, self.sector, to)
    }

    /// The same position, expressed against another sector.
    pub fn rehome(self, to: Sector) -> Self {
        Self::new(to, self.remap(to))
    }

    /// Displacement `self - other`, exact in the sector component.
    pub fn delta(&self, other: &SectorPos) -> DVec3 {
        self.sector.offset_from(other.sector) + (self.offset - other.offset)
    }

    /// Euclidean distance between two positions.
    pub fn distance(&self, other: &SectorPos) -> f64 {
        self.delta(other).length()
    }

    /// Shift by a displacement and re-normalise.
    pub fn translated(self, by: DVec3) -> Self {
        Self::new(self.sector, self.offset + by).normalized()
    }
}

impl Add<DVec3> for SectorPos {
    type Output = SectorPos;

    fn add(self, rhs: DVec3) -> SectorPos {
        self.translated(rhs)
    }
}

impl Sub for SectorPos {
    type Output = DVec3;

    fn sub(self, rhs: SectorPos) -> DVec3 {
        self.delta(&rhs)
    }
}

impl fmt::Display for SectorPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + ({:.3}, {:.3}, {:.3})",
            self.sector, self.offset.x, self.offset.y, self.offset.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_offset_positive() {
        let (sector, rest) = Sector::split_offset(DVec3::new(SECTOR_SIZE * 2.5, 10.0, 0.0));
        assert_eq!(sector, Sector::new(2, 0, 0));
        assert!((rest.x - SECTOR_SIZE * 0.5).abs() < 1e-9);
        assert_eq!(rest.y, 10.0);
    }

    #[test]
    fn test_split_offset_negative_gives_positive_remainder() {
        // -1 unit lands in sector -1 with an offset just below SECTOR_SIZE.
        let (sector, rest) = Sector::split_offset(DVec3::new(-1.0, 0.0, 0.0));
        assert_eq!(sector, Sector::new(-1, 0, 0));
        assert!((rest.x - (SECTOR_SIZE - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_remap_between_sectors() {
        let local = remap(DVec3::new(5.0, 0.0, 0.0), Sector::new(3, 0, 0), Sector::new(1, 0, 0));
        assert_eq!(local, DVec3::new(2.0 * SECTOR_SIZE + 5.0, 0.0, 0.0));
    }

    #[test]
    fn test_rehome_preserves_world_position() {
        let p = SectorPos::new(Sector::new(7, -2, 4), DVec3::new(12.5, 3.0, -8.0));
        let q = p.rehome(Sector::new(6, -1, 4));
        assert!(p.delta(&q).length() < 1e-9);
        assert_eq!(q.sector, Sector::new(6, -1, 4));
    }

    #[test]
    fn test_delta_is_exact_far_from_origin() {
        // Sectors ~10^12 units from the origin: a raw f64 subtraction of the
        // absolute coordinates would lose the 0.25 unit difference.
        let far = 1_000_000i64;
        let a = SectorPos::new(Sector::new(far, far, far), DVec3::new(0.25, 0.0, 0.0));
        let b = SectorPos::new(Sector::new(far, far, far), DVec3::ZERO);
        assert_eq!(a.delta(&b), DVec3::new(0.25, 0.0, 0.0));
    }

    #[test]
    fn test_distance_across_sector_boundary() {
        let a = SectorPos::new(Sector::new(0, 0, 0), DVec3::new(SECTOR_SIZE - 3.0, 0.0, 0.0));
        let b = SectorPos::new(Sector::new(1, 0, 0), DVec3::new(1.0, 0.0, 0.0));
        assert!((a.distance(&b) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_moves_carry_into_sector() {
        let p = SectorPos::new(Sector::new(1, 1, 1), DVec3::new(SECTOR_SIZE + 2.0, -3.0, 0.0));
        let n = p.normalized();
        assert_eq!(n.sector, Sector::new(2, 0, 1));
        assert!((n.offset.x - 2.0).abs() < 1e-9);
        assert!((n.offset.y - (SECTOR_SIZE - 3.0)).abs() < 1e-9);
        assert!(p.delta(&n).length() < 1e-6);
    }

    #[test]
    fn test_add_and_sub_operators() {
        let p = SectorPos::from_origin(DVec3::new(100.0, 200.0, 300.0));
        let q = p + DVec3::new(SECTOR_SIZE, 0.0, 0.0);
        assert_eq!(q.sector, Sector::new(1, 0, 0));
        let d = q - p;
        assert!((d - DVec3::new(SECTOR_SIZE, 0.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_display() {
        let p = SectorPos::new(Sector::new(1, 2, 3), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(format!("{p}"), "Sector(1, 2, 3) + (1.000, 2.000, 3.000)");
    }
}
