//! Headless streaming harness: flies a synthetic camera across the world
//! and reports streaming/arena behavior without a window or GPU device.
//!
//! Usage: `cargo run --bin stream_harness [ticks]`

use anyhow::Result;
use glam::Vec3;

use voxelworld::{
    load_stream_config, load_world_config, terrain_from_config, AlwaysVisible, ChunkStreamer,
    MeshArena,
};

fn main() -> Result<()> {
    env_logger::init();

    let ticks: u32 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(600);

    let stream_cfg = load_stream_config()?;
    let world_cfg = load_world_config()?;
    log::info!("harness: {ticks} ticks, stream={stream_cfg:?}, world={world_cfg:?}");

    let terrain = terrain_from_config(&world_cfg);
    let mut arena = MeshArena::new();
    let mut streamer = ChunkStreamer::new(stream_cfg);

    // Diagonal flight near the surface, fast enough to cross a chunk
    // boundary every couple of seconds at 60 ticks/s.
    let speed = Vec3::new(0.4, 0.0, 0.3);
    let start = Vec3::new(0.5, 24.0, 0.5);

    let mut uploaded_bytes = 0u64;
    for tick in 0..ticks {
        let camera = start + speed * tick as f32;
        streamer.tick(camera, &AlwaysVisible, &terrain, &mut arena);
        streamer.rebuild_dirty(&mut arena, |write, mesh| {
            uploaded_bytes += (mesh.vertices.len() * std::mem::size_of::<voxelworld::Vertex>()
                + mesh.indices.len() * 4) as u64;
            debug_assert_eq!(write.index_count as usize, mesh.indices.len());
        });
        let batch = streamer.draw_batch(&arena);

        if tick % 60 == 0 {
            let s = streamer.stats();
            let a = arena.stats();
            log::info!(
                "t={tick:>5} cam=({:>7.1},{:>5.1},{:>7.1}) bound={:>3} loaded={:>3} pending={:>3} \
                 visible={:>3} draws={:>3} rebuilt={:>2} filled={:>5} evicted={:>5} \
                 slabs={}v/{}i resident_tris={}",
                camera.x,
                camera.y,
                camera.z,
                s.bound,
                s.loaded,
                s.pending,
                s.visible,
                batch.len(),
                s.rebuilt_last,
                s.filled_total,
                s.evicted_total,
                a.vertex_slabs,
                a.index_slabs,
                a.resident_indices / 3,
            );
        }

        // Exercise the spatial query path: look straight down from the
        // camera and occasionally dig the targeted block out.
        if tick % 120 == 60 {
            if let Some(hit) = streamer.target_block(camera, Vec3::NEG_Y, 64.0) {
                log::info!("t={tick:>5} looking at block {:?} (id {})", hit.block, hit.id);
                streamer.update_block(hit.block, voxel_grid::AIR);
            }
        }
    }

    let s = streamer.stats();
    let a = arena.stats();
    log::info!(
        "done: filled={} evicted={} resident_chunks={} uploaded={:.1} MiB",
        s.filled_total,
        s.evicted_total,
        a.chunks,
        uploaded_bytes as f64 / (1024.0 * 1024.0),
    );
    Ok(())
}
