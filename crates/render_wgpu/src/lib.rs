//! render_wgpu: GPU boundary for the mesh arena.
//!
//! Scope
//! - `ArenaBuffers`: one shared vertex buffer and one shared index buffer
//!   sized in whole slabs, grown by buffer recreate + copy, written at the
//!   arena's sector offsets, and drawn with a single
//!   `multi_draw_indexed_indirect` per frame.
//! - `ViewCone`: the default `FrustumCheck` implementation.
//! - Outline line-buffer helper for the debug overlay.
//!
//! Pipelines, shaders, textures and the surface stay with the caller;
//! this crate stops at buffers and draw recording.

use chunk_stream::FrustumCheck;
use glam::Vec3;
use mesh_arena::{ChunkWrite, DrawArgs, MeshArena};
use voxel_mesh::{IndexedMeshData, Vertex};
use wgpu::util::DrawIndexedIndirectArgs;

/// Features the caller's device must request for `ArenaBuffers::record`.
pub const REQUIRED_FEATURES: wgpu::Features = wgpu::Features::MULTI_DRAW_INDIRECT;

const VERTEX_STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;
const INDEX_STRIDE: u64 = std::mem::size_of::<u32>() as u64;
const INDIRECT_STRIDE: u64 = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
    2 => Float32x3,
    3 => Uint32,
];

/// Vertex layout matching `voxel_mesh::Vertex`, for the caller's pipeline.
pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// Slabs required to address `offset + count` elements.
fn slabs_needed(offset: u64, count: u32, slab_capacity: u32) -> u32 {
    let end = offset + count as u64;
    end.div_ceil(slab_capacity as u64) as u32
}

/// GPU mirror of the mesh arena: the vertex/index buffers every chunk's
/// sectors live in, plus the indirect-args buffer for the batched draw.
pub struct ArenaBuffers {
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
    indirect_buf: wgpu::Buffer,
    vertex_slab_capacity: u32,
    index_slab_capacity: u32,
    vertex_slabs: u32,
    index_slabs: u32,
    indirect_capacity: u32,
    draw_count: u32,
}

impl ArenaBuffers {
    pub fn new(device: &wgpu::Device, arena: &MeshArena) -> Self {
        let vertex_slab_capacity = arena.vertex_slab_capacity();
        let index_slab_capacity = arena.index_slab_capacity();
        let vertex_buf = create_slab_buffer(
            device,
            "arena_vertex_buffer",
            vertex_slab_capacity as u64 * VERTEX_STRIDE,
            wgpu::BufferUsages::VERTEX,
        );
        let index_buf = create_slab_buffer(
            device,
            "arena_index_buffer",
            index_slab_capacity as u64 * INDEX_STRIDE,
            wgpu::BufferUsages::INDEX,
        );
        let indirect_capacity = 64;
        let indirect_buf = create_indirect_buffer(device, indirect_capacity);
        Self {
            vertex_buf,
            index_buf,
            indirect_buf,
            vertex_slab_capacity,
            index_slab_capacity,
            vertex_slabs: 1,
            index_slabs: 1,
            indirect_capacity,
            draw_count: 0,
        }
    }

    /// Upload one chunk's rebuilt mesh to its sectors, growing the shared
    /// buffers by whole slabs first if the arena outgrew them.
    pub fn apply_write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        write: ChunkWrite,
        mesh: &IndexedMeshData,
    ) {
        let need_v = slabs_needed(write.vertex_offset, write.vertex_count, self.vertex_slab_capacity);
        let need_i = slabs_needed(write.index_offset, write.index_count, self.index_slab_capacity);
        self.ensure_slabs(device, queue, need_v, need_i);

        queue.write_buffer(
            &self.vertex_buf,
            write.vertex_offset * VERTEX_STRIDE,
            bytemuck::cast_slice(&mesh.vertices),
        );
        queue.write_buffer(
            &self.index_buf,
            write.index_offset * INDEX_STRIDE,
            bytemuck::cast_slice(&mesh.indices),
        );
    }

    /// Grow the slab buffers, preserving resident contents with a
    /// buffer-to-buffer copy. Buffers never shrink.
    fn ensure_slabs(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertex_slabs: u32,
        index_slabs: u32,
    ) {
        if vertex_slabs <= self.vertex_slabs && index_slabs <= self.index_slabs {
            return;
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("arena_grow_encoder"),
        });
        if vertex_slabs > self.vertex_slabs {
            let new = create_slab_buffer(
                device,
                "arena_vertex_buffer",
                vertex_slabs as u64 * self.vertex_slab_capacity as u64 * VERTEX_STRIDE,
                wgpu::BufferUsages::VERTEX,
            );
            encoder.copy_buffer_to_buffer(&self.vertex_buf, 0, &new, 0, self.vertex_buf.size());
            self.vertex_buf = new;
            self.vertex_slabs = vertex_slabs;
        }
        if index_slabs > self.index_slabs {
            let new = create_slab_buffer(
                device,
                "arena_index_buffer",
                index_slabs as u64 * self.index_slab_capacity as u64 * INDEX_STRIDE,
                wgpu::BufferUsages::INDEX,
            );
            encoder.copy_buffer_to_buffer(&self.index_buf, 0, &new, 0, self.index_buf.size());
            self.index_buf = new;
            self.index_slabs = index_slabs;
        }
        queue.submit([encoder.finish()]);
        log::info!(
            "arena buffers grew to {} vertex / {} index slab(s)",
            self.vertex_slabs,
            self.index_slabs
        );
    }

    /// Upload this frame's batched draw list. Call before the render pass
    /// opens; returns the draw count.
    pub fn upload_draws(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        draws: &[DrawArgs],
    ) -> u32 {
        self.draw_count = draws.len() as u32;
        if draws.is_empty() {
            return 0;
        }
        if self.draw_count > self.indirect_capacity {
            self.indirect_capacity = self.draw_count.next_power_of_two();
            self.indirect_buf = create_indirect_buffer(device, self.indirect_capacity);
        }
        let mut bytes = Vec::with_capacity(draws.len() * INDIRECT_STRIDE as usize);
        for d in draws {
            let args = DrawIndexedIndirectArgs {
                index_count: d.index_count,
                instance_count: 1,
                first_index: d.first_index,
                base_vertex: d.base_vertex,
                first_instance: 0,
            };
            bytes.extend_from_slice(args.as_bytes());
        }
        queue.write_buffer(&self.indirect_buf, 0, &bytes);
        self.draw_count
    }

    /// Record the one batched draw covering every visible chunk. The
    /// pipeline and bind groups must already be set on the pass.
    pub fn record<'rp>(&'rp self, rpass: &mut wgpu::RenderPass<'rp>) {
        if self.draw_count == 0 {
            return;
        }
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        rpass.multi_draw_indexed_indirect(&self.indirect_buf, 0, self.draw_count);
    }
}

fn create_slab_buffer(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

fn create_indirect_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("arena_indirect_buffer"),
        size: capacity as u64 * INDIRECT_STRIDE,
        usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Upload a line list (chunk outlines, block selection) into a fresh
/// vertex buffer; returns the buffer and vertex count.
pub fn create_line_buffer(device: &wgpu::Device, lines: &[[f32; 3]]) -> (wgpu::Buffer, u32) {
    use wgpu::util::DeviceExt;
    let buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("outline_line_buffer"),
        contents: bytemuck::cast_slice(lines),
        usage: wgpu::BufferUsages::VERTEX,
    });
    (buf, lines.len() as u32)
}

/// Sphere-vs-view-cone visibility: cheap, slightly conservative stand-in
/// for a full plane frustum, computed from camera position, forward and
/// vertical field of view.
#[derive(Clone, Copy, Debug)]
pub struct ViewCone {
    pub position: Vec3,
    pub forward: Vec3,
    pub fov: f32,
}

impl ViewCone {
    pub fn new(position: Vec3, forward: Vec3, fov: f32) -> Self {
        Self {
            position,
            forward,
            fov,
        }
    }
}

impl FrustumCheck for ViewCone {
    fn is_visible(&self, center: Vec3, radius: f32) -> bool {
        let to_center = center - self.position;
        let dist_sq = to_center.length_squared();
        if dist_sq <= radius * radius {
            return true;
        }
        let dist = dist_sq.sqrt();
        let dot = self.forward.normalize().dot(to_center / dist);
        if dot <= 0.0 {
            return false;
        }
        let margin = (radius / dist).min(1.0).asin();
        dot >= (self.fov * 0.5 + margin).cos()
    }
}
