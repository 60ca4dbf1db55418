//! voxel_mesh: greedy meshing for chunk block grids (CPU-only).
//!
//! Scope
//! - Extract candidate faces on solid→empty boundaries (chunk-edge faces
//!   count as exposed).
//! - Greedy-merge co-planar same-texture faces per slice into merged quads.
//! - Triangulate with UVs scaled to the merged extent so textures tile.
//! - Deduplicate vertices by exact field equality into `IndexedMeshData`.
//!
//! Extending
//! - Ambient-occlusion channels would break most merges; they belong in a
//!   separate vertex layout rather than flags on this one.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::IVec3;
use voxel_grid::{BlockId, Chunk, AIR, CHUNK_SIZE, CHUNK_VOLUME};

/// Worst-case merged quads for one chunk: a checkerboard fill exposes all
/// six faces of every second voxel and nothing merges.
pub const WORST_CASE_QUADS: u32 = (CHUNK_VOLUME as u32 / 2) * 6;

/// Worst-case vertex count per chunk before deduplication. Exceeds
/// `u16::MAX`, which is why indices are `u32` throughout.
pub const WORST_CASE_VERTICES: u32 = WORST_CASE_QUADS * 4;

/// Worst-case index count per chunk.
pub const WORST_CASE_INDICES: u32 = WORST_CASE_QUADS * 6;

/// One mesh vertex. Equality is exact field equality; deduplication relies
/// on it.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub tex: u32,
}

impl Vertex {
    /// Bit-exact key for the dedup table (f32 doesn't hash).
    fn key(&self) -> [u32; 9] {
        [
            self.position[0].to_bits(),
            self.position[1].to_bits(),
            self.position[2].to_bits(),
            self.uv[0].to_bits(),
            self.uv[1].to_bits(),
            self.normal[0].to_bits(),
            self.normal[1].to_bits(),
            self.normal[2].to_bits(),
            self.tex,
        ]
    }
}

/// The six axis-aligned face directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

pub const FACES: [Face; 6] = [
    Face::PosX,
    Face::NegX,
    Face::PosY,
    Face::NegY,
    Face::PosZ,
    Face::NegZ,
];

impl Face {
    #[inline]
    pub fn normal(self) -> [f32; 3] {
        match self {
            Face::PosX => [1.0, 0.0, 0.0],
            Face::NegX => [-1.0, 0.0, 0.0],
            Face::PosY => [0.0, 1.0, 0.0],
            Face::NegY => [0.0, -1.0, 0.0],
            Face::PosZ => [0.0, 0.0, 1.0],
            Face::NegZ => [0.0, 0.0, -1.0],
        }
    }

    /// Step from a voxel toward the neighbor this face looks at.
    #[inline]
    fn neighbor_offset(self) -> IVec3 {
        match self {
            Face::PosX => IVec3::new(1, 0, 0),
            Face::NegX => IVec3::new(-1, 0, 0),
            Face::PosY => IVec3::new(0, 1, 0),
            Face::NegY => IVec3::new(0, -1, 0),
            Face::PosZ => IVec3::new(0, 0, 1),
            Face::NegZ => IVec3::new(0, 0, -1),
        }
    }

    #[inline]
    fn is_positive(self) -> bool {
        matches!(self, Face::PosX | Face::PosY | Face::PosZ)
    }

    /// Local voxel coordinate for plane-space (layer, u, v).
    /// X slices use (u, v) = (z, y); Y slices (x, z); Z slices (x, y).
    #[inline]
    fn voxel(self, layer: i32, u: i32, v: i32) -> IVec3 {
        match self {
            Face::PosX | Face::NegX => IVec3::new(layer, v, u),
            Face::PosY | Face::NegY => IVec3::new(u, layer, v),
            Face::PosZ | Face::NegZ => IVec3::new(u, v, layer),
        }
    }

    /// Position of plane-space point (u, v) on the face plane of `layer`.
    #[inline]
    fn position(self, layer: i32, u: f32, v: f32) -> [f32; 3] {
        let w = layer as f32 + if self.is_positive() { 1.0 } else { 0.0 };
        match self {
            Face::PosX | Face::NegX => [w, v, u],
            Face::PosY | Face::NegY => [u, w, v],
            Face::PosZ | Face::NegZ => [u, v, w],
        }
    }

    /// Position component indices of the in-plane (u, v) axes.
    #[inline]
    fn uv_axes(self) -> (usize, usize) {
        match self {
            Face::PosX | Face::NegX => (2, 1),
            Face::PosY | Face::NegY => (0, 2),
            Face::PosZ | Face::NegZ => (0, 1),
        }
    }

    /// Corner emission order flips on half the faces so triangles wind
    /// counter-clockwise seen from outside the volume.
    #[inline]
    fn flip_winding(self) -> bool {
        matches!(self, Face::PosX | Face::PosY | Face::NegZ)
    }
}

/// A merged rectangle of same-texture faces, stored as its two extremal
/// corner vertices. The remaining corners follow from the face's fixed
/// winding (`corners`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergedQuad {
    pub face: Face,
    pub min: Vertex,
    pub max: Vertex,
}

impl MergedQuad {
    fn new(face: Face, layer: i32, u0: i32, v0: i32, w: i32, h: i32, tex: u32) -> Self {
        let normal = face.normal();
        let min = Vertex {
            position: face.position(layer, u0 as f32, v0 as f32),
            uv: [0.0, 0.0],
            normal,
            tex,
        };
        let max = Vertex {
            position: face.position(layer, (u0 + w) as f32, (v0 + h) as f32),
            // UVs scale with the merged extent so the texture tiles per
            // block across the whole rectangle.
            uv: [w as f32, h as f32],
            normal,
            tex,
        };
        Self { face, min, max }
    }

    /// All four corners in triangle-fan emission order.
    pub fn corners(&self) -> [Vertex; 4] {
        let (ua, va) = self.face.uv_axes();
        let mut c10 = self.min;
        c10.position[ua] = self.max.position[ua];
        c10.uv[0] = self.max.uv[0];
        let mut c01 = self.min;
        c01.position[va] = self.max.position[va];
        c01.uv[1] = self.max.uv[1];
        if self.face.flip_winding() {
            [self.min, c01, self.max, c10]
        } else {
            [self.min, c10, self.max, c01]
        }
    }

    /// Merged extent in blocks (width along u, height along v).
    pub fn extent(&self) -> (i32, i32) {
        (self.max.uv[0] as i32, self.max.uv[1] as i32)
    }
}

/// Deduplicated vertex and index lists for one chunk. Immutable between
/// rebuilds; consumed by the mesh arena.
#[derive(Default, Clone, Debug)]
pub struct IndexedMeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl IndexedMeshData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Reusable build context. Owned by a streaming slot and borrowed by a
/// chunk for the duration of one rebuild, never retained past it.
#[derive(Default)]
pub struct MeshScratch {
    mask: Vec<BlockId>,
    quads: Vec<MergedQuad>,
    lookup: HashMap<[u32; 9], u32>,
    mesh: IndexedMeshData,
}

impl MeshScratch {
    pub fn new() -> Self {
        Self {
            mask: vec![AIR; (CHUNK_SIZE * CHUNK_SIZE) as usize],
            ..Self::default()
        }
    }

    /// Merged quads from the most recent build.
    pub fn quads(&self) -> &[MergedQuad] {
        &self.quads
    }
}

/// Build the indexed mesh for a chunk.
///
/// Per face direction: cull to exposed faces, greedy-merge each slice,
/// triangulate, then index with exact-equality dedup. The returned mesh
/// borrows the scratch and is valid until the next build.
pub fn build_chunk_mesh<'s>(chunk: &Chunk, scratch: &'s mut MeshScratch) -> &'s IndexedMeshData {
    scratch.quads.clear();
    scratch.lookup.clear();
    scratch.mesh.vertices.clear();
    scratch.mesh.indices.clear();
    if scratch.mask.len() != (CHUNK_SIZE * CHUNK_SIZE) as usize {
        scratch.mask = vec![AIR; (CHUNK_SIZE * CHUNK_SIZE) as usize];
    }
    if chunk.solid_count() == 0 {
        return &scratch.mesh;
    }

    for face in FACES {
        for layer in 0..CHUNK_SIZE {
            fill_mask(chunk, face, layer, &mut scratch.mask);
            merge_mask(face, layer, &mut scratch.mask, &mut scratch.quads);
        }
    }

    for quad in &scratch.quads {
        let c = quad.corners();
        for tri in [[0, 1, 2], [0, 2, 3]] {
            for corner in tri {
                let idx = index_vertex(&mut scratch.mesh, &mut scratch.lookup, c[corner]);
                scratch.mesh.indices.push(idx);
            }
        }
    }
    &scratch.mesh
}

/// Candidate-face mask for one slice: texture id where the voxel is solid
/// and its neighbor across `face` is empty or outside the chunk, `AIR`
/// elsewhere.
fn fill_mask(chunk: &Chunk, face: Face, layer: i32, mask: &mut [BlockId]) {
    let off = face.neighbor_offset();
    for v in 0..CHUNK_SIZE {
        for u in 0..CHUNK_SIZE {
            let p = face.voxel(layer, u, v);
            let block = chunk.get(p.x, p.y, p.z);
            let cell = &mut mask[(u + v * CHUNK_SIZE) as usize];
            if block == AIR {
                *cell = AIR;
                continue;
            }
            let n = p + off;
            let exposed = !Chunk::in_bounds(n.x, n.y, n.z) || chunk.get(n.x, n.y, n.z) == AIR;
            *cell = if exposed { block } else { AIR };
        }
    }
}

/// Greedy rectangle cover of one mask slice. Raster scan; grow the run
/// along u while the texture matches, then along v while every cell in the
/// candidate row matches. Consumed cells are cleared. Ties go to scan
/// order; the cover is greedy, not minimal.
fn merge_mask(face: Face, layer: i32, mask: &mut [BlockId], quads: &mut Vec<MergedQuad>) {
    let s = CHUNK_SIZE;
    let at = |u: i32, v: i32| (u + v * s) as usize;
    for v0 in 0..s {
        let mut u0 = 0;
        while u0 < s {
            let tex = mask[at(u0, v0)];
            if tex == AIR {
                u0 += 1;
                continue;
            }
            let mut w = 1;
            while u0 + w < s && mask[at(u0 + w, v0)] == tex {
                w += 1;
            }
            let mut h = 1;
            'grow: while v0 + h < s {
                for u in u0..u0 + w {
                    if mask[at(u, v0 + h)] != tex {
                        break 'grow;
                    }
                }
                h += 1;
            }
            for v in v0..v0 + h {
                for u in u0..u0 + w {
                    mask[at(u, v)] = AIR;
                }
            }
            quads.push(MergedQuad::new(face, layer, u0, v0, w, h, tex as u32));
            u0 += w;
        }
    }
}

fn index_vertex(
    mesh: &mut IndexedMeshData,
    lookup: &mut HashMap<[u32; 9], u32>,
    vertex: Vertex,
) -> u32 {
    *lookup.entry(vertex.key()).or_insert_with(|| {
        let idx = mesh.vertices.len() as u32;
        mesh.vertices.push(vertex);
        idx
    })
}
