//! World snapshot load/save.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::config::write_atomic;
use crate::world::memory::{MemoryWorld, WorldSnapshot};

/// Load a world snapshot from disk.
pub fn load_world(path: &Path) -> Result<MemoryWorld> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read world {}", path.display()))?;
    let snapshot: WorldSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("parse world {}", path.display()))?;
    Ok(MemoryWorld::from_snapshot(snapshot))
}

/// Write the world as pretty JSON (temp file + rename).
pub fn write_world(path: &Path, world: &MemoryWorld) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(&world.to_snapshot()).context("serialize world")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
