//! Project scaffolding for `worldops init`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::config::{CONFIG_FILE, ProjectPaths, WorldopsConfig, load_config, write_config};
use super::world_store::write_world;
use crate::world::memory::MemoryWorld;

/// Options for `init_layout`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, rewrite the config and world snapshot even when present.
    pub force: bool,
}

/// Create the folder layout, config and world snapshot under `root`.
///
/// Existing files are kept unless `options.force` is set, in which case the
/// default config and an empty world are written over them. Folders are
/// resolved from the config that ends up on disk.
pub fn init_layout(root: &Path, options: &InitOptions) -> Result<ProjectPaths> {
    let config_path = root.join(CONFIG_FILE);
    let cfg = if options.force || !config_path.exists() {
        let cfg = WorldopsConfig::default();
        write_config(&config_path, &cfg)?;
        cfg
    } else {
        load_config(&config_path)?
    };

    let paths = ProjectPaths::resolve(root, &cfg);
    for dir in paths.folders() {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    if options.force || !paths.world_path.exists() {
        write_world(&paths.world_path, &MemoryWorld::new(""))?;
    }
    Ok(paths)
}
