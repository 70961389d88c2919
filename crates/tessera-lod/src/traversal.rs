//! The per-frame traversals: split, prune and drawlist.
//!
//! Each traversal is a visitor passed to [`TileNode::preorder_visit`] or
//! [`TileNode::preorder_visit_mut`] together with a context that lives for one
//! call. Nothing here is kept between frames except what the tree itself holds.

use glam::Vec3;
use tessera_coords::SectorPos;
use tracing::{debug, trace};

use crate::error::LodError;
use crate::policy::LodPolicy;
use crate::raycast::ray_triangle;
use crate::split::split_tile;
use crate::surface::BodySurface;
use crate::tile::Tile;
use crate::tree::TileNode;

/// Debug tint per subdivision depth, cycled.
pub const DEPTH_PALETTE: [Vec3; 6] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.5, 0.5, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, 0.5, 0.5),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.5, 0.0, 0.5),
];

pub fn depth_color(depth: u32) -> Vec3 {
    DEPTH_PALETTE[depth as usize % DEPTH_PALETTE.len()]
}

/// Knobs for one body's per-frame update.
#[derive(Clone, Debug, PartialEq)]
pub struct TraversalSettings {
    /// Splits allowed per root tree per frame.
    pub split_budget: u32,
    /// Frames a node must go without wanting its children before they are
    /// freed. Zero disables pruning.
    pub prune_after_frames: u32,
    /// Tint tiles by desired depth.
    pub debug_depth_colors: bool,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            split_budget: 50,
            prune_after_frames: 60,
            debug_depth_colors: false,
        }
    }
}

/// Counters collected during one update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Nodes visited by the split traversal.
    pub visited: usize,
    /// Nodes that gained children.
    pub splits: usize,
    /// Tiles released by the prune traversal.
    pub pruned: usize,
    /// Whether some root ran out of split budget with work left.
    pub budget_exhausted: bool,
}

/// Read-only inputs shared by all traversals of one frame.
#[derive(Clone, Copy)]
pub(crate) struct FrameInputs<'a> {
    pub policy: &'a LodPolicy,
    pub surface: &'a BodySurface,
    pub camera: SectorPos,
}

impl FrameInputs<'_> {
    fn desired_depth(&self, node: &TileNode) -> u32 {
        self.policy
            .desired_depth(self.surface, node.tile(), node.depth(), &self.camera)
    }
}

pub(crate) struct SplitContext<'a> {
    pub inputs: FrameInputs<'a>,
    pub splits_max: u32,
    pub splits_left: u32,
    pub debug_colors: bool,
    pub stats: FrameStats,
    /// First failure; stops all further splitting this frame.
    pub error: Option<LodError>,
}

impl<'a> SplitContext<'a> {
    pub fn new(inputs: FrameInputs<'a>, settings: &TraversalSettings) -> Self {
        Self {
            inputs,
            splits_max: settings.split_budget,
            splits_left: settings.split_budget,
            debug_colors: settings.debug_depth_colors,
            stats: FrameStats::default(),
            error: None,
        }
    }
}

/// Split a leaf that wants more detail, if the budget allows.
///
/// Freshly attached children are not visited until the next frame, so each
/// leaf grows by at most one level per frame.
pub(crate) fn split_visit(node: &mut TileNode, ctx: &mut SplitContext<'_>) -> bool {
    if ctx.error.is_some() {
        return false;
    }
    ctx.stats.visited += 1;
    if node.depth() == 0 {
        ctx.splits_left = ctx.splits_max;
    }

    let desired = ctx.inputs.desired_depth(node);
    let tint = if ctx.debug_colors {
        depth_color(desired)
    } else {
        Vec3::ONE
    };
    node.tile_mut().set_tint(tint);

    let wants_more = desired > node.depth();
    if !wants_more || node.has_children() {
        return wants_more;
    }
    if ctx.splits_left == 0 {
        ctx.stats.budget_exhausted = true;
        return false;
    }

    match split_tile(node.tile()).and_then(|children| node.add_children(children)) {
        Ok(()) => {
            ctx.splits_left -= 1;
            ctx.stats.splits += 1;
            debug!(depth = node.depth(), desired, "Split tile");
        }
        Err(err) => ctx.error = Some(err),
    }
    false
}

/// Order in which the split traversal enters a node's children: the child
/// straight below the camera first, the others nearest first. The budget is
/// spent depth-first, so the ground under the camera always refines.
pub(crate) fn split_order(children: &[TileNode; 4], ctx: &SplitContext<'_>) -> [usize; 4] {
    let camera = ctx.inputs.camera;
    let below = ctx.inputs.surface.down_target(&camera);
    let keys = children.each_ref().map(|child| {
        let tile = child.tile();
        let origin = camera.remap(tile.sector());
        let direction = below.remap(tile.sector()) - origin;
        let under = ray_triangle(origin, direction, tile.corners()).is_some();
        (!under, camera.distance(&tile.centroid()))
    });

    let mut order = [0, 1, 2, 3];
    order.sort_by(|&a, &b| {
        keys[a]
            .0
            .cmp(&keys[b].0)
            .then(keys[a].1.total_cmp(&keys[b].1))
    });
    order
}

pub(crate) struct PruneContext<'a, 'f> {
    pub inputs: FrameInputs<'a>,
    pub after_frames: u32,
    pub pruned: usize,
    pub on_free: &'f mut dyn FnMut(Tile),
}

/// Count frames in which a node's children are unwanted and free them once
/// the count reaches the threshold. Any frame that wants them resets it,
/// together with the counters of descendants skipped in the meantime.
pub(crate) fn prune_visit(node: &mut TileNode, ctx: &mut PruneContext<'_, '_>) -> bool {
    if !node.has_children() {
        node.surplus_frames = 0;
        return false;
    }
    if ctx.inputs.desired_depth(node) > node.depth() {
        if node.surplus_frames > 0 {
            node.reset_surplus();
        }
        return true;
    }

    node.surplus_frames += 1;
    if ctx.after_frames > 0 && node.surplus_frames >= ctx.after_frames {
        let freed = node.free_children(ctx.on_free);
        ctx.pruned += freed;
        debug!(depth = node.depth(), freed, "Pruned subtree");
    }
    false
}

/// The tiles to draw this frame.
///
/// Holds at most `max_tiles` tiles; anything beyond is counted in
/// [`Drawlist::dropped`] and otherwise ignored.
#[derive(Debug, Default)]
pub struct Drawlist<'a> {
    tiles: Vec<&'a Tile>,
    max_tiles: usize,
    dropped: usize,
}

impl<'a> Drawlist<'a> {
    pub fn new(max_tiles: usize) -> Self {
        Self {
            tiles: Vec::new(),
            max_tiles,
            dropped: 0,
        }
    }

    fn push(&mut self, tile: &'a Tile) {
        if self.tiles.len() < self.max_tiles {
            self.tiles.push(tile);
        } else {
            self.dropped += 1;
        }
    }

    pub fn tiles(&self) -> &[&'a Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Tile> + '_ {
        self.tiles.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn max_tiles(&self) -> usize {
        self.max_tiles
    }

    /// Tiles that qualified but did not fit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

pub(crate) struct DrawContext<'a> {
    pub inputs: FrameInputs<'a>,
    pub list: Drawlist<'a>,
}

/// Emit a node's tile when it is at (or past) its wanted depth, or when it
/// has nothing finer to offer. Descend only while more detail is wanted.
///
/// The two conditions never both hold for a node with children, so no tile
/// is emitted alongside one of its ancestors.
pub(crate) fn drawlist_visit<'a>(node: &'a TileNode, ctx: &mut DrawContext<'a>) -> bool {
    let desired = ctx.inputs.desired_depth(node);
    if desired <= node.depth() || !node.has_children() {
        trace!(depth = node.depth(), desired, "Drawlist tile");
        ctx.list.push(node.tile());
    }
    desired > node.depth()
}
