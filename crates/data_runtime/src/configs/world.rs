//! Terrain generator tuning loaded from data/world.json.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    pub base_height: i32,
    pub amplitude: f64,
    pub frequency: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0xC0FFEE,
            base_height: 0,
            amplitude: 12.0,
            frequency: 0.04,
        }
    }
}
