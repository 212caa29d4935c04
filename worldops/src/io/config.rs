//! Project configuration stored in `worldops.toml`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "worldops.toml";

/// worldops configuration (TOML).
///
/// Relative paths resolve against the directory holding the config file.
/// Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorldopsConfig {
    /// World snapshot the commands run against.
    pub world_path: PathBuf,

    /// Session name used in QA artifact file names.
    pub session_name: String,

    pub folders: FolderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FolderConfig {
    /// Pending command files.
    pub incoming: PathBuf,
    pub processed: PathBuf,
    pub failed: PathBuf,
    /// Command run reports.
    pub reports: PathBuf,
    /// QA session artifacts.
    pub qa: PathBuf,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            incoming: PathBuf::from("commands/incoming"),
            processed: PathBuf::from("commands/processed"),
            failed: PathBuf::from("commands/failed"),
            reports: PathBuf::from("reports/commands"),
            qa: PathBuf::from("reports/qa"),
        }
    }
}

impl FolderConfig {
    pub fn all(&self) -> [(&'static str, &Path); 5] {
        [
            ("incoming", self.incoming.as_path()),
            ("processed", self.processed.as_path()),
            ("failed", self.failed.as_path()),
            ("reports", self.reports.as_path()),
            ("qa", self.qa.as_path()),
        ]
    }
}

impl Default for WorldopsConfig {
    fn default() -> Self {
        Self {
            world_path: PathBuf::from("world.json"),
            session_name: "CommandRun".to_string(),
            folders: FolderConfig::default(),
        }
    }
}

impl WorldopsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.world_path.as_os_str().is_empty() {
            return Err(anyhow!("world_path must be non-empty"));
        }
        if self.session_name.trim().is_empty() {
            return Err(anyhow!("session_name must be non-empty"));
        }
        let mut seen = BTreeSet::new();
        for (name, path) in self.folders.all() {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("folders.{name} must be non-empty"));
            }
            if !seen.insert(path) {
                return Err(anyhow!(
                    "folders.{name} duplicates another folder ({})",
                    path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Project paths resolved against a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub world_path: PathBuf,
    pub incoming: PathBuf,
    pub processed: PathBuf,
    pub failed: PathBuf,
    pub reports: PathBuf,
    pub qa: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(root: impl Into<PathBuf>, cfg: &WorldopsConfig) -> Self {
        let root = root.into();
        Self {
            config_path: root.join(CONFIG_FILE),
            world_path: root.join(&cfg.world_path),
            incoming: root.join(&cfg.folders.incoming),
            processed: root.join(&cfg.folders.processed),
            failed: root.join(&cfg.folders.failed),
            reports: root.join(&cfg.folders.reports),
            qa: root.join(&cfg.folders.qa),
            root,
        }
    }

    pub fn folders(&self) -> [&Path; 5] {
        [
            self.incoming.as_path(),
            self.processed.as_path(),
            self.failed.as_path(),
            self.reports.as_path(),
            self.qa.as_path(),
        ]
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WorldopsConfig::default()`.
pub fn load_config(path: &Path) -> Result<WorldopsConfig> {
    if !path.exists() {
        let cfg = WorldopsConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WorldopsConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WorldopsConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write `contents` next to `path` and rename it into place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
