//! Adaptive level-of-detail subdivision for planets and open terrain.
//!
//! A [`Body`] owns a handful of root [`TileNode`]s. Every frame,
//! [`Body::update`] splits leaves the camera wants finer (bounded by a
//! per-root split budget) and prunes subtrees it has stopped wanting;
//! [`Body::drawlist`] then collects exactly one tile per screen region.
//! [`Body::altitude`] reuses the same trees to find the ground below a point.

mod body;
mod error;
mod policy;
mod raycast;
mod split;
mod surface;
mod tile;
mod traversal;
mod tree;

pub use body::{AltitudeSample, Body, PLANET_ROOTS, PlanetDesc, TerrainDesc};
pub use error::LodError;
pub use policy::{LodPolicy, horizon_distance, splits_per_distance, tile_radius};
pub use raycast::{RayHit, ray_triangle};
pub use split::split_tile;
pub use surface::{BodySurface, Shape, SurfaceVertex};
pub use tile::{Tile, TileVertex, vertex_count};
pub use traversal::{
    DEPTH_PALETTE, Drawlist, FrameStats, TraversalSettings, depth_color,
};
pub use tree::TileNode;
