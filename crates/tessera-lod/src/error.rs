//! LOD engine error types.

use std::collections::TryReserveError;

/// Errors surfaced by tile construction and tree mutation.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// A split was requested on a node that already owns children.
    #[error("node at depth {depth} already has children")]
    AlreadySplit { depth: u32 },

    /// Vertex storage for a new tile could not be allocated.
    #[error("failed to allocate tile storage: {0}")]
    Allocation(#[from] TryReserveError),

    /// Body construction parameters are unusable.
    #[error("invalid body: {0}")]
    InvalidBody(String),
}
