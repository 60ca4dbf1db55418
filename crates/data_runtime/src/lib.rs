//! data_runtime: runtime configuration loaded from the workspace `data/`
//! directory.
//!
//! Scope
//! - Serde config structs with validated defaults (`configs`).
//! - JSON loading that resolves `data/` the same way from any crate, so
//!   tests and tools can run from wherever.
//!
//! Missing files fall back to defaults; malformed files are errors.

#![forbid(unsafe_code)]

pub mod configs;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use configs::stream::StreamConfig;
pub use configs::world::WorldConfig;

fn data_root() -> PathBuf {
    // Prefer the top-level workspace `data/` so tests and tools can run
    // from any crate.
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    let ws = here.join("../../data");
    if ws.is_dir() {
        ws
    } else {
        here.join("data")
    }
}

/// Read a raw JSON file under `data/` and return its string.
pub fn read_json(rel: impl AsRef<Path>) -> Result<String> {
    let path = data_root().join(rel);
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("read data: {}", path.display()))?;
    Ok(s)
}

fn load_or_default<T>(rel: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let path = data_root().join(rel);
    if !path.is_file() {
        log::debug!("{rel} missing, using defaults");
        return Ok(T::default());
    }
    let txt = std::fs::read_to_string(&path)
        .with_context(|| format!("read {}", path.display()))?;
    let parsed = serde_json::from_str(&txt).with_context(|| format!("parse {rel}"))?;
    Ok(parsed)
}

/// Load the streaming config, falling back to defaults when absent.
pub fn load_stream_config() -> Result<StreamConfig> {
    load_or_default::<StreamConfig>("stream.json").map(StreamConfig::clamped)
}

/// Load the world-generation config, falling back to defaults when absent.
pub fn load_world_config() -> Result<WorldConfig> {
    load_or_default("world.json")
}
