//! Picking pending command files and moving them once handled.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, instrument};

/// Characters that are not valid in a file name on common platforms.
static INVALID_FILENAME_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());

/// Replace characters invalid in file names with `_`; blank becomes `_`.
pub fn sanitize(name: &str) -> String {
    if name.trim().is_empty() {
        return "_".to_string();
    }
    INVALID_FILENAME_RE.replace_all(name, "_").into_owned()
}

/// UTC timestamp used in artifact file names, e.g. `20260314_093000123`.
pub fn file_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S%3f").to_string()
}

/// Most recently modified `*.json` (case-insensitive) directly in `dir`.
///
/// A missing directory has no pending files.
pub fn newest_json(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json || !path.is_file() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .with_context(|| format!("stat {}", path.display()))?;
        if best.as_ref().is_none_or(|(time, _)| modified > *time) {
            best = Some((modified, path));
        }
    }
    Ok(best.map(|(_, path)| path))
}

/// Destination for `file_name` in `dest_dir` that does not overwrite anything.
///
/// Taken names get `_<timestamp>` before the extension, then a counter.
pub fn free_destination(dest_dir: &Path, file_name: &str) -> PathBuf {
    let direct = dest_dir.join(file_name);
    if !direct.exists() {
        return direct;
    }
    let path = Path::new(file_name);
    let stem = sanitize(&path.file_stem().unwrap_or_default().to_string_lossy());
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let stamped = format!("{stem}_{}", file_timestamp());
    let candidate = dest_dir.join(format!("{stamped}{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    let mut counter = 1u32;
    loop {
        let candidate = dest_dir.join(format!("{stamped}_{counter}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move `source` into `dest_dir`, never overwriting. Returns the new path.
#[instrument(skip_all, fields(source = %source.display(), dest = %dest_dir.display()))]
pub fn route_file(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("create directory {}", dest_dir.display()))?;
    let file_name = source
        .file_name()
        .with_context(|| format!("source has no file name {}", source.display()))?
        .to_string_lossy()
        .into_owned();
    let dest = free_destination(dest_dir, &file_name);
    fs::rename(source, &dest)
        .with_context(|| format!("move {} -> {}", source.display(), dest.display()))?;
    debug!(dest = %dest.display(), "routed command file");
    Ok(dest)
}
