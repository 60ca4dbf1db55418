//! Default heightmap terrain: Perlin base with an additive mountain band,
//! stratified into grass / soil / stone by depth below the surface.

use glam::IVec3;
use noise::{NoiseFn, Perlin};

use crate::{Chunk, GenContext, VoxelSource, CHUNK_SIZE, GRASS, SOIL, STONE};

/// Depth of the soil band under the grass surface.
const SOIL_DEPTH: i32 = 3;

/// Deterministic heightmap generator. A value of this type plus a
/// `GenContext` fully determines every block it produces.
#[derive(Clone)]
pub struct TerrainGen {
    seed: u32,
    base_height: i32,
    amplitude: f64,
    frequency: f64,
    perlin: Perlin,
    mountain_amp: f64,
    mountain_freq: f64,
    mountain_perlin: Perlin,
}

impl TerrainGen {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            base_height: 0,
            amplitude: 12.0,
            frequency: 0.04,
            perlin: Perlin::new(seed),
            mountain_amp: 24.0,
            mountain_freq: 0.015,
            mountain_perlin: Perlin::new(seed.wrapping_add(1)),
        }
    }

    pub fn with_height(mut self, base: i32, amplitude: f64, frequency: f64) -> Self {
        self.base_height = base;
        self.amplitude = amplitude;
        self.frequency = frequency;
        self
    }

    pub fn with_mountains(mut self, amplitude: f64, frequency: f64) -> Self {
        self.mountain_amp = amplitude;
        self.mountain_freq = frequency;
        self
    }

    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Surface height (inclusive top block y) of the column at world (x, z).
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let base = self
            .perlin
            .get([x as f64 * self.frequency, z as f64 * self.frequency]);
        let mountain = self
            .mountain_perlin
            .get([x as f64 * self.mountain_freq, z as f64 * self.mountain_freq]);
        let mountain = mountain.max(0.0) * self.mountain_amp;
        self.base_height + (base * self.amplitude + mountain) as i32
    }

    /// Block type at depth `height - y` below the column surface.
    #[inline]
    pub fn block_for(&self, y: i32, height: i32) -> Option<crate::BlockId> {
        if y > height {
            None
        } else if y == height {
            Some(GRASS)
        } else if y >= height - SOIL_DEPTH {
            Some(SOIL)
        } else {
            Some(STONE)
        }
    }
}

impl VoxelSource for TerrainGen {
    fn fill(&self, ctx: &GenContext, chunk: &mut Chunk) {
        let origin = ctx.origin;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let height = self.height_at(origin.x + x, origin.z + z);
                // Column is entirely above the surface; nothing to write.
                if height < origin.y {
                    continue;
                }
                let top = (height - origin.y).min(CHUNK_SIZE - 1);
                for y in 0..=top {
                    if let Some(block) = self.block_for(origin.y + y, height) {
                        chunk.set(x, y, z, block);
                    }
                }
            }
        }
    }
}

/// Source that fills every block with one id; test and harness helper.
#[derive(Clone, Copy)]
pub struct UniformSource(pub crate::BlockId);

impl VoxelSource for UniformSource {
    fn fill(&self, _ctx: &GenContext, chunk: &mut Chunk) {
        if self.0 == crate::AIR {
            return;
        }
        for z in 0..CHUNK_SIZE {
            for y in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    chunk.set(x, y, z, self.0);
                }
            }
        }
    }
}
