//! The per-root tile tree.

use tracing::warn;

use crate::error::LodError;
use crate::tile::Tile;

/// A node in a root's tile tree.
///
/// A node either has no children or exactly four, produced by
/// [`split_tile`](crate::split_tile) on its own tile. Children are owned
/// exclusively by their parent.
#[derive(Debug)]
pub struct TileNode {
    tile: Tile,
    children: Option<Box<[TileNode; 4]>>,
    /// Consecutive frames this node has wanted no more detail than its own.
    pub(crate) surplus_frames: u32,
}

impl TileNode {
    #[must_use]
    pub fn new(tile: Tile) -> Self {
        Self {
            tile,
            children: None,
            surplus_frames: 0,
        }
    }

    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    pub fn tile_mut(&mut self) -> &mut Tile {
        &mut self.tile
    }

    pub fn depth(&self) -> u32 {
        self.tile.depth()
    }

    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> Option<&[TileNode; 4]> {
        self.children.as_deref()
    }

    /// Attach four freshly built children. Fails if children already exist.
    pub fn add_children(&mut self, tiles: [Tile; 4]) -> Result<(), LodError> {
        if self.children.is_some() {
            warn!(depth = self.depth(), "Refusing to attach children twice");
            return Err(LodError::AlreadySplit {
                depth: self.depth(),
            });
        }
        self.children = Some(Box::new(tiles.map(TileNode::new)));
        Ok(())
    }

    /// Visit this subtree in preorder.
    ///
    /// `visit` returns whether to descend into the node's children. The
    /// context is threaded explicitly through every call.
    pub fn preorder_visit<'a, C, F>(&'a self, ctx: &mut C, visit: &mut F)
    where
        F: FnMut(&'a TileNode, &mut C) -> bool,
    {
        if !visit(self, ctx) {
            return;
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.preorder_visit(ctx, visit);
            }
        }
    }

    /// Mutable preorder visit. The visitor may attach or free children of the
    /// node it is given; the traversal then follows whatever children exist
    /// once the visitor returns `true`.
    pub fn preorder_visit_mut<C, F>(&mut self, ctx: &mut C, visit: &mut F)
    where
        F: FnMut(&mut TileNode, &mut C) -> bool,
    {
        self.preorder_visit_mut_ordered(ctx, visit, &mut |_, _| [0, 1, 2, 3]);
    }

    /// Mutable preorder visit where `order` picks the sequence in which a
    /// node's children are entered. It must return a permutation of `0..4`.
    pub fn preorder_visit_mut_ordered<C, F, O>(
        &mut self,
        ctx: &mut C,
        visit: &mut F,
        order: &mut O,
    )
    where
        F: FnMut(&mut TileNode, &mut C) -> bool,
        O: FnMut(&[TileNode; 4], &C) -> [usize; 4],
    {
        if !visit(self, ctx) {
            return;
        }
        if let Some(children) = &mut self.children {
            for i in order(&**children, ctx) {
                children[i].preorder_visit_mut_ordered(ctx, visit, order);
            }
        }
    }

    /// Clear the surplus counters of this node and every descendant.
    pub(crate) fn reset_surplus(&mut self) {
        self.preorder_visit_mut(&mut (), &mut |node, _| {
            node.surplus_frames = 0;
            true
        });
    }

    /// Release every descendant, deepest first, handing each tile to
    /// `on_free`. Returns the number of tiles released.
    pub fn free_children(&mut self, on_free: &mut dyn FnMut(Tile)) -> usize {
        let Some(children) = self.children.take() else {
            return 0;
        };
        let mut freed = 0;
        for child in *children {
            freed += child.free(on_free);
        }
        self.surplus_frames = 0;
        freed
    }

    /// Release this node and its subtree, post-order.
    pub fn free(mut self, on_free: &mut dyn FnMut(Tile)) -> usize {
        let freed = self.free_children(on_free);
        on_free(self.tile);
        freed + 1
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |c| c.iter().map(TileNode::node_count).sum())
    }

    /// Number of childless nodes in this subtree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match &self.children {
            None => 1,
            Some(c) => c.iter().map(TileNode::leaf_count).sum(),
        }
    }

    /// Deepest tile depth in this subtree.
    #[must_use]
    pub fn max_depth(&self) -> u32 {
        match &self.children {
            None => self.depth(),
            Some(c) => c.iter().map(TileNode::max_depth).max().unwrap_or(self.depth()),
        }
    }
}
