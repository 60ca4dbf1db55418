//! Chunk mesh registry over two buddy allocators (vertices and indices).

use std::collections::HashMap;

use voxel_grid::ChunkId;
use voxel_mesh::IndexedMeshData;

use crate::buddy::{level_for, SectorAlloc, SectorRef};
use crate::{INDEX_TOP_LEVEL, VERTEX_TOP_LEVEL};

/// Sectors owned by one chunk, plus the live element counts within them.
#[derive(Clone, Copy, Debug)]
struct ChunkSectors {
    vertex: SectorRef,
    index: SectorRef,
    vertex_count: u32,
    index_count: u32,
}

/// Where the GPU layer must place a freshly built mesh: global element
/// offsets (`slab * slab_capacity + sector_offset`) into the shared vertex
/// and index buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkWrite {
    pub vertex_offset: u64,
    pub vertex_count: u32,
    pub index_offset: u64,
    pub index_count: u32,
}

/// One entry of the batched draw list, in indirect-draw terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawArgs {
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ArenaStats {
    pub chunks: usize,
    pub vertex_slabs: usize,
    pub index_slabs: usize,
    pub resident_vertices: u64,
    pub resident_indices: u64,
}

/// Shared mesh storage for every loaded chunk.
///
/// Pure bookkeeping: it decides where data lives and what a batched draw
/// looks like; applying writes to actual GPU buffers is the render layer's
/// job.
pub struct MeshArena {
    vertices: SectorAlloc,
    indices: SectorAlloc,
    chunks: HashMap<ChunkId, ChunkSectors>,
}

impl Default for MeshArena {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshArena {
    pub fn new() -> Self {
        Self {
            vertices: SectorAlloc::new(VERTEX_TOP_LEVEL),
            indices: SectorAlloc::new(INDEX_TOP_LEVEL),
            chunks: HashMap::new(),
        }
    }

    /// Elements per vertex slab.
    #[inline]
    pub fn vertex_slab_capacity(&self) -> u32 {
        self.vertices.slab_capacity()
    }

    /// Elements per index slab.
    #[inline]
    pub fn index_slab_capacity(&self) -> u32 {
        self.indices.slab_capacity()
    }

    /// Store or update a chunk's mesh.
    ///
    /// When the required sector levels match the chunk's existing sectors
    /// the data is overwritten in place. Otherwise both sectors are
    /// reclaimed — even if only one size class changed — and fresh ones
    /// are allocated. An empty mesh erases the chunk instead.
    pub fn write_chunk(&mut self, id: ChunkId, mesh: &IndexedMeshData) -> Option<ChunkWrite> {
        if mesh.is_empty() {
            self.remove_chunk(id);
            return None;
        }
        let vertex_count = mesh.vertices.len() as u32;
        let index_count = mesh.indices.len() as u32;
        let vertex_level = level_for(vertex_count);
        let index_level = level_for(index_count);

        let sectors = match self.chunks.get_mut(&id) {
            Some(s) if s.vertex.level == vertex_level && s.index.level == index_level => {
                // Cheap path: same size classes, overwrite in place.
                s.vertex_count = vertex_count;
                s.index_count = index_count;
                *s
            }
            existing => {
                if let Some(s) = existing.copied() {
                    self.vertices.free(s.vertex);
                    self.indices.free(s.index);
                }
                let s = ChunkSectors {
                    vertex: self.vertices.alloc(vertex_level),
                    index: self.indices.alloc(index_level),
                    vertex_count,
                    index_count,
                };
                self.chunks.insert(id, s);
                s
            }
        };

        Some(ChunkWrite {
            vertex_offset: self.global_offset(&self.vertices, sectors.vertex),
            vertex_count,
            index_offset: self.global_offset(&self.indices, sectors.index),
            index_count,
        })
    }

    /// Erase a chunk and reclaim its sectors. Chunks that never produced a
    /// non-empty mesh are simply absent; erasing them is a no-op.
    pub fn remove_chunk(&mut self, id: ChunkId) {
        if let Some(s) = self.chunks.remove(&id) {
            self.vertices.free(s.vertex);
            self.indices.free(s.index);
        }
    }

    #[inline]
    pub fn contains(&self, id: ChunkId) -> bool {
        self.chunks.contains_key(&id)
    }

    fn global_offset(&self, alloc: &SectorAlloc, sector: SectorRef) -> u64 {
        sector.slab as u64 * alloc.slab_capacity() as u64 + sector.offset as u64
    }

    /// Resolve a set of chunks to one batched draw list. Chunks without
    /// resident meshes (empty or never written) are skipped.
    pub fn draw_args<I>(&self, ids: I) -> Vec<DrawArgs>
    where
        I: IntoIterator<Item = ChunkId>,
    {
        let mut out = Vec::new();
        for id in ids {
            let Some(s) = self.chunks.get(&id) else {
                continue;
            };
            out.push(DrawArgs {
                index_count: s.index_count,
                first_index: self.global_offset(&self.indices, s.index) as u32,
                base_vertex: self.global_offset(&self.vertices, s.vertex) as i32,
            });
        }
        out
    }

    pub fn stats(&self) -> ArenaStats {
        let mut resident_vertices = 0u64;
        let mut resident_indices = 0u64;
        for s in self.chunks.values() {
            resident_vertices += s.vertex_count as u64;
            resident_indices += s.index_count as u64;
        }
        ArenaStats {
            chunks: self.chunks.len(),
            vertex_slabs: self.vertices.slab_count(),
            index_slabs: self.indices.slab_count(),
            resident_vertices,
            resident_indices,
        }
    }
}
