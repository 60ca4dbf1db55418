//! chunk_stream: keeps a bounded pool of chunks loaded around a moving
//! viewpoint.
//!
//! Scope
//! - Fixed slot pool with hysteresis: chunks load within radius `R` of the
//!   viewpoint's chunk coordinate and unload only past `R+G` per axis, so
//!   oscillating across a boundary never churns.
//! - Distance-sorted pending-load list with a per-tick fill budget.
//! - Per-tick visibility pass behind the `FrustumCheck` trait.
//! - Dirty-chunk rebuilds through `voxel_mesh` into the mesh arena.
//! - DDA block targeting and block edits against loaded chunks.
//!
//! Everything runs inline on the caller's thread; the load budget is the
//! only pacing mechanism.

#![forbid(unsafe_code)]

mod target;

use std::collections::HashMap;

use glam::{IVec3, Vec3};

use data_runtime::StreamConfig;
use mesh_arena::{ChunkWrite, DrawArgs, MeshArena};
use voxel_grid::{
    chunk_center, chunk_of_pos, chunk_radius, BlockId, Chunk, ChunkId, GenContext, VoxelSource,
    CHUNK_SIZE,
};
use voxel_mesh::{build_chunk_mesh, IndexedMeshData, MeshScratch};

pub use target::TargetHit;

/// Visibility test against the current camera, supplied by the renderer.
pub trait FrustumCheck {
    fn is_visible(&self, center: Vec3, radius: f32) -> bool;
}

/// Accepts everything; headless harnesses and tests.
pub struct AlwaysVisible;

impl FrustumCheck for AlwaysVisible {
    fn is_visible(&self, _center: Vec3, _radius: f32) -> bool {
        true
    }
}

/// A pre-allocated binding site for at most one chunk plus the mesh-build
/// scratch it lends to that chunk during rebuilds.
struct Slot {
    chunk: Option<Chunk>,
    scratch: MeshScratch,
}

impl Slot {
    fn new() -> Self {
        Self {
            chunk: None,
            scratch: MeshScratch::new(),
        }
    }

    fn bind(&mut self, chunk: Chunk) {
        assert!(
            self.chunk.is_none(),
            "binding chunk {:?} into an occupied slot",
            chunk.pos()
        );
        self.chunk = Some(chunk);
    }

    fn unbind(&mut self) -> Chunk {
        self.chunk.take().expect("unbinding an empty slot")
    }
}

/// Streaming counters for logs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamStats {
    pub bound: usize,
    pub loaded: usize,
    pub pending: usize,
    pub visible: usize,
    pub filled_total: u64,
    pub evicted_total: u64,
    pub rebuilt_last: usize,
}

/// Owns the slot pool and decides, once per frame, what is resident and
/// what is drawn.
pub struct ChunkStreamer {
    cfg: StreamConfig,
    slots: Vec<Slot>,
    by_pos: HashMap<IVec3, usize>,
    pending: Vec<IVec3>,
    last_center: Option<IVec3>,
    visible: Vec<usize>,
    next_id: u64,
    filled_total: u64,
    evicted_total: u64,
    rebuilt_last: usize,
}

impl ChunkStreamer {
    /// The pool is sized for the retention cube `(2(R+G)+1)^3`; hysteresis
    /// can keep that many chunks bound at once, which is more than the
    /// load window ever requests.
    pub fn new(cfg: StreamConfig) -> Self {
        let pool = cfg.slot_pool_size();
        let mut slots = Vec::with_capacity(pool);
        slots.resize_with(pool, Slot::new);
        log::info!(
            "chunk streamer: R={} G={} budget={} pool={}",
            cfg.render_radius,
            cfg.grace,
            cfg.load_budget,
            pool
        );
        Self {
            cfg,
            slots,
            by_pos: HashMap::with_capacity(pool),
            pending: Vec::new(),
            last_center: None,
            visible: Vec::new(),
            next_id: 0,
            filled_total: 0,
            evicted_total: 0,
            rebuilt_last: 0,
        }
    }

    /// One frame of streaming: slot maintenance (only when the viewpoint
    /// crossed a chunk boundary), budgeted loads, then the visibility
    /// pass (always, since the camera turns every frame).
    pub fn tick(
        &mut self,
        camera_pos: Vec3,
        frustum: &impl FrustumCheck,
        source: &impl VoxelSource,
        arena: &mut MeshArena,
    ) {
        let center = chunk_of_pos(camera_pos);
        if self.last_center != Some(center) {
            self.last_center = Some(center);
            self.maintain_slots(center, arena);
        }
        self.load_pending(camera_pos, source);
        self.update_visibility(frustum);
    }

    /// Unbind everything outside the retention radius, drop stale pending
    /// entries, then bind a chunk for every uncovered window position.
    fn maintain_slots(&mut self, center: IVec3, arena: &mut MeshArena) {
        let retain = self.cfg.retain_radius();
        let mut evicted = 0u64;
        for idx in 0..self.slots.len() {
            let Some(chunk) = self.slots[idx].chunk.as_ref() else {
                continue;
            };
            if axis_dist(chunk.pos(), center) <= retain {
                continue;
            }
            let chunk = self.slots[idx].unbind();
            self.by_pos.remove(&chunk.pos());
            arena.remove_chunk(chunk.id());
            evicted += 1;
        }
        self.evicted_total += evicted;

        self.pending.retain(|pos| axis_dist(*pos, center) <= retain);

        let r = self.cfg.render_radius;
        let mut requested = 0usize;
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    let pos = center + IVec3::new(dx, dy, dz);
                    if self.by_pos.contains_key(&pos) {
                        continue;
                    }
                    let id = ChunkId(self.next_id);
                    self.next_id += 1;
                    let slot = self
                        .slots
                        .iter()
                        .position(|s| s.chunk.is_none())
                        .expect("slot pool exhausted: pool must cover the retention cube");
                    self.slots[slot].bind(Chunk::new(id, pos));
                    self.by_pos.insert(pos, slot);
                    self.pending.push(pos);
                    requested += 1;
                }
            }
        }
        if evicted > 0 || requested > 0 {
            log::debug!(
                "stream maintain at {center}: +{requested} requested, -{evicted} evicted"
            );
        }
    }

    /// Fill the closest pending chunks, at most `load_budget` per tick.
    /// Entries that turn out to be loaded already drain for free.
    fn load_pending(&mut self, camera_pos: Vec3, source: &impl VoxelSource) {
        if self.pending.is_empty() {
            return;
        }
        self.pending.sort_by(|a, b| {
            let da = chunk_center(*a).distance_squared(camera_pos);
            let db = chunk_center(*b).distance_squared(camera_pos);
            da.total_cmp(&db)
        });

        let mut budget = self.cfg.load_budget;
        let mut taken = 0usize;
        while budget > 0 && taken < self.pending.len() {
            let pos = self.pending[taken];
            taken += 1;
            let slot = *self
                .by_pos
                .get(&pos)
                .expect("pending chunk lost its slot binding");
            let chunk = self.slots[slot]
                .chunk
                .as_mut()
                .expect("bound slot without a chunk");
            if chunk.loaded() {
                continue;
            }
            let ctx = GenContext::for_chunk(pos);
            source.fill(&ctx, chunk);
            chunk.mark_loaded();
            self.filled_total += 1;
            budget -= 1;
            log::debug!("filled chunk {pos} ({} solid)", chunk.solid_count());
        }
        self.pending.drain(..taken);
    }

    /// Recomputed every tick: bound, loaded, non-empty, and inside the
    /// frustum.
    fn update_visibility(&mut self, frustum: &impl FrustumCheck) {
        self.visible.clear();
        let radius = chunk_radius();
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(chunk) = slot.chunk.as_ref() else {
                continue;
            };
            if !chunk.loaded() || chunk.solid_count() == 0 {
                continue;
            }
            if !frustum.is_visible(chunk.center(), radius) {
                continue;
            }
            self.visible.push(idx);
        }
    }

    /// Rebuild every dirty chunk in the visible set and store the result
    /// in the arena. `apply` receives each placement plus the mesh data so
    /// the GPU layer can upload it before the scratch is reused.
    pub fn rebuild_dirty(
        &mut self,
        arena: &mut MeshArena,
        mut apply: impl FnMut(ChunkWrite, &IndexedMeshData),
    ) -> usize {
        let mut rebuilt = 0usize;
        for i in 0..self.visible.len() {
            let idx = self.visible[i];
            let slot = &mut self.slots[idx];
            let chunk = slot
                .chunk
                .as_mut()
                .expect("visible slot lost its chunk before rebuild");
            if !chunk.dirty() {
                continue;
            }
            let mesh = build_chunk_mesh(chunk, &mut slot.scratch);
            if let Some(write) = arena.write_chunk(chunk.id(), mesh) {
                apply(write, mesh);
            }
            chunk.clear_dirty();
            rebuilt += 1;
        }
        self.rebuilt_last = rebuilt;
        rebuilt
    }

    /// Visible chunks with their chunk-space positions, for per-chunk
    /// transforms at the renderer boundary.
    pub fn visible_chunks(&self) -> impl Iterator<Item = (ChunkId, IVec3)> + '_ {
        self.visible.iter().map(|&idx| {
            let chunk = self.slots[idx]
                .chunk
                .as_ref()
                .expect("visible slot lost its chunk");
            (chunk.id(), chunk.pos())
        })
    }

    /// Resolve the visible set to one batched draw list.
    pub fn draw_batch(&self, arena: &MeshArena) -> Vec<DrawArgs> {
        arena.draw_args(self.visible_chunks().map(|(id, _)| id))
    }

    /// Line-list wireframes of the visible chunks' bounds.
    pub fn outline_vertices(&self) -> Vec<[f32; 3]> {
        let mut out = Vec::with_capacity(self.visible.len() * 24);
        for (_, pos) in self.visible_chunks() {
            push_outline(&mut out, pos);
        }
        out
    }

    /// Block at a world coordinate; `None` when no loaded chunk owns it.
    pub fn block_at(&self, block: IVec3) -> Option<BlockId> {
        let slot = *self.by_pos.get(&voxel_grid::chunk_of_block(block))?;
        let chunk = self.slots[slot].chunk.as_ref()?;
        if !chunk.loaded() {
            return None;
        }
        let l = voxel_grid::block_in_chunk(block);
        Some(chunk.get(l.x, l.y, l.z))
    }

    /// Edit one block. A no-op (not an error) when no loaded chunk owns
    /// the coordinate; returns whether the edit applied.
    pub fn update_block(&mut self, block: IVec3, value: BlockId) -> bool {
        let Some(&slot) = self.by_pos.get(&voxel_grid::chunk_of_block(block)) else {
            return false;
        };
        let Some(chunk) = self.slots[slot].chunk.as_mut() else {
            return false;
        };
        if !chunk.loaded() {
            return false;
        }
        let l = voxel_grid::block_in_chunk(block);
        chunk.set(l.x, l.y, l.z, value);
        chunk.mark_dirty();
        true
    }

    /// First solid block along a ray, with the face-adjacent placement
    /// cell. Unloaded space reads as empty.
    pub fn target_block(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<TargetHit> {
        target::raycast(origin, dir, max_dist, |block| self.block_at(block))
    }

    pub fn is_loaded(&self, pos: IVec3) -> bool {
        self.by_pos
            .get(&pos)
            .and_then(|&slot| self.slots[slot].chunk.as_ref())
            .is_some_and(|c| c.loaded())
    }

    pub fn is_bound(&self, pos: IVec3) -> bool {
        self.by_pos.contains_key(&pos)
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            bound: self.by_pos.len(),
            loaded: self
                .slots
                .iter()
                .filter(|s| s.chunk.as_ref().is_some_and(|c| c.loaded()))
                .count(),
            pending: self.pending.len(),
            visible: self.visible.len(),
            filled_total: self.filled_total,
            evicted_total: self.evicted_total,
            rebuilt_last: self.rebuilt_last,
        }
    }
}

/// Per-axis (Chebyshev) distance between chunk coordinates; the hysteresis
/// band is a cube, not a sphere.
#[inline]
fn axis_dist(a: IVec3, b: IVec3) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y).max(d.z)
}

fn push_outline(out: &mut Vec<[f32; 3]>, pos: IVec3) {
    let min = (pos * CHUNK_SIZE).as_vec3();
    let max = min + Vec3::splat(CHUNK_SIZE as f32);
    let corners = [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(max.x, max.y, max.z),
        Vec3::new(min.x, max.y, max.z),
    ];
    let edges = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
    for (a, b) in edges {
        out.push(corners[a].to_array());
        out.push(corners[b].to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxel_grid::terrain::UniformSource;
    use voxel_grid::{AIR, STONE};

    fn cfg(r: i32, g: i32, budget: usize) -> StreamConfig {
        StreamConfig {
            render_radius: r,
            grace: g,
            load_budget: budget,
        }
    }

    /// Tick until the pending list drains; bounded so a regression can't
    /// spin forever.
    fn settle(
        streamer: &mut ChunkStreamer,
        pos: Vec3,
        source: &impl VoxelSource,
        arena: &mut MeshArena,
    ) {
        for _ in 0..10_000 {
            streamer.tick(pos, &AlwaysVisible, source, arena);
            if streamer.stats().pending == 0 {
                return;
            }
        }
        panic!("pending never drained");
    }

    fn center_of(chunk: IVec3) -> Vec3 {
        chunk_center(chunk)
    }

    #[test]
    #[should_panic(expected = "occupied slot")]
    fn slot_double_bind_is_fatal() {
        let mut slot = Slot::new();
        slot.bind(Chunk::new(ChunkId(1), IVec3::ZERO));
        slot.bind(Chunk::new(ChunkId(2), IVec3::ONE));
    }

    #[test]
    #[should_panic(expected = "unbinding an empty slot")]
    fn slot_double_unbind_is_fatal() {
        let mut slot = Slot::new();
        slot.bind(Chunk::new(ChunkId(1), IVec3::ZERO));
        slot.unbind();
        slot.unbind();
    }

    #[test]
    fn moves_within_a_chunk_change_nothing() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 1, 4));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        let before = s.stats();
        assert_eq!(before.bound, 27);
        assert_eq!(before.loaded, 27);

        // Wander anywhere inside chunk (0,0,0).
        for p in [
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(31.9, 0.1, 31.9),
            Vec3::new(16.0, 31.0, 2.0),
        ] {
            s.tick(p, &AlwaysVisible, &source, &mut arena);
            let now = s.stats();
            assert_eq!(now.bound, before.bound);
            assert_eq!(now.filled_total, before.filled_total);
            assert_eq!(now.evicted_total, 0);
        }
    }

    #[test]
    fn grace_band_retains_until_crossed() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 1, 8));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        let c = IVec3::new(-1, 0, 0);
        assert!(s.is_loaded(c));
        let filled_after_initial = s.stats().filled_total;

        // d = 2 = R+G: outside the load window, inside retention.
        settle(&mut s, center_of(IVec3::new(1, 0, 0)), &source, &mut arena);
        assert!(s.is_loaded(c), "grace band must retain the chunk");

        // Coming back must not reload it.
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        assert!(s.is_loaded(c));
        let reload_check = s.stats();
        // Chunks newly entering the window load, but c itself never
        // refilled: the walk out and back created exactly the columns at
        // x=2, which is 9 fills.
        assert_eq!(reload_check.filled_total, filled_after_initial + 9);
        assert_eq!(reload_check.evicted_total, 0);

        // d = 3 > R+G: unload fires.
        settle(&mut s, center_of(IVec3::new(2, 0, 0)), &source, &mut arena);
        assert!(!s.is_bound(c));
        assert!(s.stats().evicted_total > 0);
    }

    #[test]
    fn load_budget_caps_fills_per_tick() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let budget = 2;
        let mut s = ChunkStreamer::new(cfg(1, 0, budget));
        let pos = center_of(IVec3::ZERO);

        // First tick requests the whole 27-chunk window and fills budget.
        s.tick(pos, &AlwaysVisible, &source, &mut arena);
        assert_eq!(s.stats().pending, 27 - budget);
        assert_eq!(s.stats().loaded, budget);

        let mut ticks = 1;
        while s.stats().pending > 0 {
            let before = s.stats().loaded;
            s.tick(pos, &AlwaysVisible, &source, &mut arena);
            let loaded = s.stats().loaded - before;
            assert_eq!(loaded, budget.min(27 - before));
            ticks += 1;
        }
        assert_eq!(ticks, 27usize.div_ceil(budget));
        assert_eq!(s.stats().loaded, 27);
    }

    #[test]
    fn nearest_chunks_load_first() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(2, 0, 1));
        let pos = center_of(IVec3::ZERO);
        s.tick(pos, &AlwaysVisible, &source, &mut arena);
        // The very first fill must be the chunk under the viewpoint.
        assert!(s.is_loaded(IVec3::ZERO));
        assert_eq!(s.stats().loaded, 1);
    }

    #[test]
    fn empty_chunks_are_never_visible() {
        let source = UniformSource(AIR);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 0, 32));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        let stats = s.stats();
        assert_eq!(stats.loaded, 27);
        assert_eq!(stats.visible, 0);
        assert!(s.draw_batch(&arena).is_empty());
    }

    struct RejectAll;
    impl FrustumCheck for RejectAll {
        fn is_visible(&self, _c: Vec3, _r: f32) -> bool {
            false
        }
    }

    #[test]
    fn frustum_filters_the_visible_set() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 0, 32));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        assert_eq!(s.stats().visible, 27);
        s.tick(center_of(IVec3::ZERO), &RejectAll, &source, &mut arena);
        assert_eq!(s.stats().visible, 0);
    }

    #[test]
    fn rebuilds_run_once_per_dirty_chunk() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 0, 32));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);

        let mut writes = 0;
        let rebuilt = s.rebuild_dirty(&mut arena, |_, mesh| {
            assert!(!mesh.is_empty());
            writes += 1;
        });
        assert_eq!(rebuilt, 27);
        assert_eq!(writes, 27);
        assert_eq!(arena.stats().chunks, 27);
        assert_eq!(s.draw_batch(&arena).len(), 27);

        // Nothing is dirty anymore.
        assert_eq!(s.rebuild_dirty(&mut arena, |_, _| panic!("no writes")), 0);

        // One edit re-dirties exactly one chunk.
        assert!(s.update_block(IVec3::new(1, 2, 3), AIR));
        assert_eq!(s.rebuild_dirty(&mut arena, |_, _| {}), 1);
    }

    #[test]
    fn eviction_erases_arena_storage() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 0, 32));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        s.rebuild_dirty(&mut arena, |_, _| {});
        assert_eq!(arena.stats().chunks, 27);

        // Jump far away: everything old unloads and its sectors free.
        settle(&mut s, center_of(IVec3::new(100, 0, 0)), &source, &mut arena);
        s.rebuild_dirty(&mut arena, |_, _| {});
        assert_eq!(s.stats().bound, 27);
        assert_eq!(arena.stats().chunks, 27);
        assert_eq!(s.stats().evicted_total, 27);
    }

    #[test]
    fn edits_outside_loaded_space_are_noops() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 0, 32));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        assert!(!s.update_block(IVec3::new(1000, 0, 0), STONE));
        assert_eq!(s.block_at(IVec3::new(1000, 0, 0)), None);
        // In-range edit applies and reads back.
        assert!(s.update_block(IVec3::new(0, 0, 0), AIR));
        assert_eq!(s.block_at(IVec3::new(0, 0, 0)), Some(AIR));
    }

    #[test]
    fn diagonal_walk_never_exhausts_the_pool() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(2, 1, 64));
        let pool = cfg(2, 1, 64).slot_pool_size();
        for step in 0..12 {
            let chunk = IVec3::splat(step);
            settle(&mut s, center_of(chunk), &source, &mut arena);
            let stats = s.stats();
            assert!(stats.bound <= pool, "bound {} > pool {pool}", stats.bound);
            // Everything bound sits inside the retention cube.
            for dz in -2..=2 {
                for dy in -2..=2 {
                    for dx in -2..=2 {
                        assert!(s.is_loaded(chunk + IVec3::new(dx, dy, dz)));
                    }
                }
            }
        }
    }

    #[test]
    fn outlines_cover_visible_chunks() {
        let source = UniformSource(STONE);
        let mut arena = MeshArena::new();
        let mut s = ChunkStreamer::new(cfg(1, 0, 32));
        settle(&mut s, center_of(IVec3::ZERO), &source, &mut arena);
        let lines = s.outline_vertices();
        assert_eq!(lines.len(), 27 * 24);
    }
}
