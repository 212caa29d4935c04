//! Command run reports written after every file run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::routing::{file_timestamp, free_destination, sanitize};
use crate::core::types::{ExecutionMode, ExecutionResult};

/// Persisted outcome of one command file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRunReport {
    pub schema_version: String,
    pub timestamp_utc: String,
    pub source_file: String,
    pub mode: ExecutionMode,
    /// Envelope request id, or the file stem for bare lists.
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_exception: Option<String>,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
}

impl CommandRunReport {
    pub fn new(source_file: &Path, mode: ExecutionMode, request_id: &str) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            timestamp_utc: Utc::now().to_rfc3339(),
            source_file: source_file.display().to_string(),
            mode,
            request_id: request_id.to_string(),
            parse_error: None,
            execution_exception: None,
            result: None,
        }
    }

    /// A run counts as successful only with a successful result and no fault.
    pub fn succeeded(&self) -> bool {
        self.execution_exception.is_none()
            && self.parse_error.is_none()
            && self.result.as_ref().is_some_and(ExecutionResult::success)
    }
}

/// Write `<reports>/<timestamp>_<requestId>.json`, never overwriting an
/// earlier report. Returns the path.
pub fn write_report(reports_dir: &Path, report: &CommandRunReport) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("create directory {}", reports_dir.display()))?;
    let path = free_destination(
        reports_dir,
        &format!("{}_{}.json", file_timestamp(), sanitize(&report.request_id)),
    );
    let mut buf = serde_json::to_string_pretty(report).context("serialize command report")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write report {}", path.display()))?;
    Ok(path)
}
