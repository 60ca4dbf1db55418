//! voxelworld: streaming voxel world around a moving viewpoint.
//!
//! The heavy lifting lives in the member crates; this crate re-exports
//! the pieces a frontend wires together:
//! - `chunk_stream::ChunkStreamer` decides what is resident and visible.
//! - `voxel_mesh` turns dirty chunks into merged, indexed meshes.
//! - `mesh_arena::MeshArena` places every mesh in shared slab storage.
//! - `render_wgpu::ArenaBuffers` mirrors the arena on the GPU and draws
//!   the whole visible set with one batched call.

#![forbid(unsafe_code)]

pub use chunk_stream::{AlwaysVisible, ChunkStreamer, FrustumCheck, StreamStats, TargetHit};
pub use data_runtime::{load_stream_config, load_world_config, StreamConfig, WorldConfig};
pub use mesh_arena::{ArenaStats, DrawArgs, MeshArena};
pub use render_wgpu::{ArenaBuffers, ViewCone, REQUIRED_FEATURES};
pub use voxel_grid::{terrain::TerrainGen, BlockId, Chunk, ChunkId, VoxelSource, CHUNK_SIZE};
pub use voxel_mesh::{IndexedMeshData, MeshScratch, Vertex};

/// Build the default terrain generator from a world config.
pub fn terrain_from_config(cfg: &WorldConfig) -> TerrainGen {
    TerrainGen::new(cfg.seed).with_height(cfg.base_height, cfg.amplitude, cfg.frequency)
}
