//! Streaming radii and budgets loaded from data/stream.json with sensible
//! defaults and clamping.

use serde::Deserialize;

/// Tuning for the chunk streaming manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Load radius `R` in chunks: chunks load inside the `(2R+1)^3` window
    /// around the viewpoint.
    pub render_radius: i32,
    /// Grace radius `G`: chunks unload only past `R+G` per axis, so the
    /// viewpoint can oscillate across a boundary without churn.
    pub grace: i32,
    /// Chunks filled per tick, bounding worst-case frame time.
    pub load_budget: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            render_radius: 3,
            grace: 1,
            load_budget: 2,
        }
    }
}

impl StreamConfig {
    /// Clamp out-of-range values instead of failing the load.
    pub fn clamped(mut self) -> Self {
        if self.render_radius < 1 {
            log::warn!("render_radius {} clamped to 1", self.render_radius);
            self.render_radius = 1;
        }
        if self.grace < 0 {
            log::warn!("grace {} clamped to 0", self.grace);
            self.grace = 0;
        }
        if self.load_budget == 0 {
            log::warn!("load_budget 0 clamped to 1");
            self.load_budget = 1;
        }
        self
    }

    /// Per-axis retention radius `R+G`.
    #[inline]
    pub fn retain_radius(&self) -> i32 {
        self.render_radius + self.grace
    }

    /// Slot pool size: the hysteresis band can keep chunks out to `R+G`
    /// on every axis, so the pool covers the retention cube, not just the
    /// load window.
    #[inline]
    pub fn slot_pool_size(&self) -> usize {
        let side = 2 * self.retain_radius() + 1;
        (side * side * side) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_repairs_bad_values() {
        let cfg = StreamConfig {
            render_radius: 0,
            grace: -3,
            load_budget: 0,
        }
        .clamped();
        assert_eq!(cfg.render_radius, 1);
        assert_eq!(cfg.grace, 0);
        assert_eq!(cfg.load_budget, 1);
    }

    #[test]
    fn pool_covers_retention_cube() {
        let cfg = StreamConfig {
            render_radius: 2,
            grace: 1,
            load_budget: 2,
        };
        assert_eq!(cfg.retain_radius(), 3);
        assert_eq!(cfg.slot_pool_size(), 7 * 7 * 7);
        // Strictly larger than the load window whenever grace > 0.
        assert!(cfg.slot_pool_size() > 5 * 5 * 5);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: StreamConfig = serde_json::from_str(r#"{ "grace": 2 }"#).expect("parse");
        assert_eq!(cfg.grace, 2);
        assert_eq!(cfg.render_radius, StreamConfig::default().render_radius);
        assert_eq!(cfg.load_budget, StreamConfig::default().load_budget);
    }
}
