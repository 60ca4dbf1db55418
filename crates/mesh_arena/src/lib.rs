//! mesh_arena: buddy-allocated shared storage for chunk meshes.
//!
//! Scope
//! - `SectorAlloc`: binary buddy allocation of power-of-two sectors inside
//!   fixed-capacity slabs, growing by whole slabs so requests never fail.
//! - `MeshArena`: per-chunk (vertex sector, index sector) registry with
//!   in-place overwrite when size classes match, and batched draw-arg
//!   resolution (`slab * capacity + offset`).
//!
//! The crate is pure CPU bookkeeping. The render layer owns the actual
//! GPU buffers, applies `ChunkWrite` spans to them, and turns `DrawArgs`
//! into one multi-draw call.

#![forbid(unsafe_code)]

pub mod buddy;

mod arena;

pub use arena::{ArenaStats, ChunkWrite, DrawArgs, MeshArena};
pub use buddy::{level_elems, level_for, SectorRef, MIN_SECTOR_ELEMS};

/// Top sector level of vertex slabs. One slab must hold the worst-case
/// chunk mesh (checkerboard fill).
pub const VERTEX_TOP_LEVEL: u8 = 17;

/// Top sector level of index slabs.
pub const INDEX_TOP_LEVEL: u8 = 18;

const _: () = {
    assert!(level_elems_const(VERTEX_TOP_LEVEL) >= voxel_mesh::WORST_CASE_VERTICES);
    assert!(level_elems_const(INDEX_TOP_LEVEL) >= voxel_mesh::WORST_CASE_INDICES);
};

const fn level_elems_const(level: u8) -> u32 {
    MIN_SECTOR_ELEMS << level
}
