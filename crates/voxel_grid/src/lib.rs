//! voxel_grid: chunk-sized block storage and procedural fill.
//!
//! Scope
//! - `Chunk`: 32^3 block identifiers with loaded/dirty flags and a cached
//!   solid-block count.
//! - Chunk-space / block-space coordinate helpers.
//! - `VoxelSource`: the generation boundary, with `GenContext` passed
//!   explicitly so generators stay pure functions of (seed, context, coord).
//! - `TerrainGen`: default Perlin-heightmap generator.
//!
//! Extending
//! - Per-block light or orientation channels would widen `BlockId` into a
//!   packed cell struct.

#![forbid(unsafe_code)]

pub mod terrain;

use glam::{IVec3, Vec3};

/// Block identifier; `0` is empty air.
pub type BlockId = u8;

/// Empty cell marker.
pub const AIR: BlockId = 0;

/// Default solid block types used by the terrain generator.
pub const STONE: BlockId = 1;
pub const SOIL: BlockId = 2;
pub const GRASS: BlockId = 3;

/// Cubic chunk side length in blocks.
pub const CHUNK_SIZE: i32 = 32;

/// Blocks per chunk.
pub const CHUNK_VOLUME: usize = (CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Stable identity for a chunk across its loaded lifetime. Mesh storage in
/// the arena is keyed by this, never by the slot a chunk happens to occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u64);

/// Chunk coordinate owning a world-space block coordinate.
#[inline]
pub fn chunk_of_block(block: IVec3) -> IVec3 {
    IVec3::new(
        block.x.div_euclid(CHUNK_SIZE),
        block.y.div_euclid(CHUNK_SIZE),
        block.z.div_euclid(CHUNK_SIZE),
    )
}

/// Local coordinate of a world-space block within its chunk.
#[inline]
pub fn block_in_chunk(block: IVec3) -> IVec3 {
    IVec3::new(
        block.x.rem_euclid(CHUNK_SIZE),
        block.y.rem_euclid(CHUNK_SIZE),
        block.z.rem_euclid(CHUNK_SIZE),
    )
}

/// Chunk coordinate containing a world-space position.
#[inline]
pub fn chunk_of_pos(pos: Vec3) -> IVec3 {
    IVec3::new(
        (pos.x / CHUNK_SIZE as f32).floor() as i32,
        (pos.y / CHUNK_SIZE as f32).floor() as i32,
        (pos.z / CHUNK_SIZE as f32).floor() as i32,
    )
}

/// World-space center of a chunk's bounding cube.
#[inline]
pub fn chunk_center(pos: IVec3) -> Vec3 {
    (pos * CHUNK_SIZE).as_vec3() + Vec3::splat(CHUNK_SIZE as f32 * 0.5)
}

/// Radius of a chunk's bounding sphere.
#[inline]
pub fn chunk_radius() -> f32 {
    CHUNK_SIZE as f32 * 0.5 * 3.0_f32.sqrt()
}

/// Explicit generation context handed to every per-voxel query, replacing
/// any notion of a process-wide "current chunk" during generation.
#[derive(Clone, Copy, Debug)]
pub struct GenContext {
    /// Chunk coordinate in chunk space.
    pub chunk_pos: IVec3,
    /// World-space block coordinate of the chunk's (0,0,0) corner.
    pub origin: IVec3,
}

impl GenContext {
    pub fn for_chunk(chunk_pos: IVec3) -> Self {
        Self {
            chunk_pos,
            origin: chunk_pos * CHUNK_SIZE,
        }
    }
}

/// Fills a chunk's block grid. Must be deterministic for a given generator
/// value and context; called exactly once per chunk load.
pub trait VoxelSource {
    fn fill(&self, ctx: &GenContext, chunk: &mut Chunk);
}

/// One cube of the voxel world: dense block storage plus streaming state.
///
/// A chunk does not own mesh storage; that lives in the arena, keyed by
/// `id`.
pub struct Chunk {
    id: ChunkId,
    pos: IVec3,
    blocks: Box<[BlockId]>,
    solid_count: u32,
    loaded: bool,
    dirty: bool,
}

impl Chunk {
    /// Construct an empty, not-yet-loaded chunk at `pos`.
    pub fn new(id: ChunkId, pos: IVec3) -> Self {
        Self {
            id,
            pos,
            blocks: vec![AIR; CHUNK_VOLUME].into_boxed_slice(),
            solid_count: 0,
            loaded: false,
            dirty: false,
        }
    }

    #[inline]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    #[inline]
    pub fn pos(&self) -> IVec3 {
        self.pos
    }

    #[inline]
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Cached count of non-air blocks. A chunk with zero solid blocks is
    /// never rendered regardless of its load state.
    #[inline]
    pub fn solid_count(&self) -> u32 {
        self.solid_count
    }

    /// World-space center of the bounding cube.
    #[inline]
    pub fn center(&self) -> Vec3 {
        chunk_center(self.pos)
    }

    #[inline]
    fn index(x: i32, y: i32, z: i32) -> usize {
        debug_assert!(Self::in_bounds(x, y, z));
        (x + y * CHUNK_SIZE + z * CHUNK_SIZE * CHUNK_SIZE) as usize
    }

    /// Whether a local coordinate lies inside the chunk.
    #[inline]
    pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
        (0..CHUNK_SIZE).contains(&x) && (0..CHUNK_SIZE).contains(&y) && (0..CHUNK_SIZE).contains(&z)
    }

    /// Block at a local coordinate.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.blocks[Self::index(x, y, z)]
    }

    /// Write a block at a local coordinate, maintaining the solid count.
    /// Does not touch the dirty flag; streaming decides when a write is an
    /// edit versus part of the initial fill.
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockId) {
        let idx = Self::index(x, y, z);
        let old = self.blocks[idx];
        if old == block {
            return;
        }
        if old == AIR {
            self.solid_count += 1;
        } else if block == AIR {
            self.solid_count -= 1;
        }
        self.blocks[idx] = block;
    }

    #[inline]
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.get(x, y, z) != AIR
    }

    /// Mark the initial fill complete. The first mesh build is forced by
    /// marking dirty at the same time.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
        self.dirty = true;
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
