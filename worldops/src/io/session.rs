//! QA session capture.
//!
//! [`SessionRecorder`] is a `tracing` layer. While a session is active it
//! copies every event it sees into a [`QaReport`]; with no active session it
//! drops them. At most one session is active at a time.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, debug};
use tracing_subscriber::layer::{Context, Layer};

use super::routing::{file_timestamp, free_destination, sanitize};
use crate::core::lint::{Diagnostic, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaLogEntry {
    pub timestamp_utc: String,
    /// `Error`, `Warning` or `Log`.
    pub log_type: String,
    pub message: String,
    /// Where the event came from (`file:line`, or the target).
    pub stack_trace: String,
}

/// A document diagnostic attached to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaCompilerMessage {
    pub timestamp_utc: String,
    /// Document the diagnostic belongs to.
    pub assembly_path: String,
    pub message_type: String,
    pub message: String,
    pub file: String,
    /// 1-based; 0 when unknown.
    pub line: usize,
    pub column: usize,
}

impl QaCompilerMessage {
    pub fn from_diagnostic(source: &Path, diagnostic: &Diagnostic) -> Self {
        let source = source.display().to_string();
        Self {
            timestamp_utc: Utc::now().to_rfc3339(),
            assembly_path: source.clone(),
            message_type: match diagnostic.severity {
                Severity::Warning => "Warning".to_string(),
                Severity::Error => "Error".to_string(),
            },
            message: diagnostic.message.clone(),
            file: source,
            line: diagnostic.line.unwrap_or_default(),
            column: diagnostic.column.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReport {
    pub schema_version: String,
    pub name: String,
    pub correlation_id: String,
    pub started_utc: String,
    pub ended_utc: Option<String>,
    pub logs: Vec<QaLogEntry>,
    pub compiler_messages: Vec<QaCompilerMessage>,
}

/// Names the session returned by [`SessionRecorder::start`].
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle {
    id: u64,
}

#[derive(Debug)]
struct ActiveSession {
    id: u64,
    report: QaReport,
}

/// Cloneable handle to the process-wide session slot.
#[derive(Debug, Clone, Default)]
pub struct SessionRecorder {
    active: Arc<Mutex<Option<ActiveSession>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a session, force-closing any active one without exporting it.
    ///
    /// Blank names become `Session`; a blank correlation id gets a fresh uuid.
    pub fn start(&self, name: &str, correlation_id: &str) -> SessionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let report = QaReport {
            schema_version: "1.0".to_string(),
            name: non_blank_or(name, || "Session".to_string()),
            correlation_id: non_blank_or(correlation_id, || {
                uuid::Uuid::new_v4().simple().to_string()
            }),
            started_utc: Utc::now().to_rfc3339(),
            ended_utc: None,
            logs: Vec::new(),
            compiler_messages: Vec::new(),
        };
        let replaced = self.slot().replace(ActiveSession { id, report });
        if let Some(old) = replaced {
            debug!(
                correlation_id = %old.report.correlation_id,
                "force-closed previous session without export"
            );
        }
        SessionHandle { id }
    }

    pub fn is_active(&self) -> bool {
        self.slot().is_some()
    }

    /// Attach a document diagnostic to the active session, if any.
    pub fn record_diagnostic(&self, message: QaCompilerMessage) {
        if let Some(active) = self.slot().as_mut() {
            active.report.compiler_messages.push(message);
        }
    }

    /// Close the session `handle` names and return its report. Returns `None`
    /// when that session was already replaced or closed.
    pub fn stop(&self, handle: SessionHandle) -> Option<QaReport> {
        let mut slot = self.slot();
        if slot.as_ref().is_none_or(|active| active.id != handle.id) {
            return None;
        }
        let mut report = slot.take()?.report;
        report.ended_utc = Some(Utc::now().to_rfc3339());
        Some(report)
    }
}

/// An open session that is stopped when the guard is dropped. Use
/// [`SessionGuard::finish`] to keep the report.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    recorder: &'a SessionRecorder,
    handle: Option<SessionHandle>,
}

impl SessionRecorder {
    /// [`SessionRecorder::start`], returning a guard instead of a bare handle.
    pub fn begin(&self, name: &str, correlation_id: &str) -> SessionGuard<'_> {
        SessionGuard {
            recorder: self,
            handle: Some(self.start(name, correlation_id)),
        }
    }
}

impl SessionGuard<'_> {
    /// Stop the session and return its report.
    pub fn finish(mut self) -> Option<QaReport> {
        let handle = self.handle.take()?;
        self.recorder.stop(handle)
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take()
            && self.recorder.stop(handle).is_some()
        {
            debug!("session closed without export");
        }
    }
}

fn non_blank_or(value: &str, fallback: impl FnOnce() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

/// Write `<qa>/<timestamp>_<name>_<correlationId>.json`. Returns the path.
pub fn export(qa_dir: &Path, report: &QaReport) -> Result<PathBuf> {
    fs::create_dir_all(qa_dir).with_context(|| format!("create directory {}", qa_dir.display()))?;
    let path = free_destination(
        qa_dir,
        &format!(
            "{}_{}_{}.json",
            file_timestamp(),
            sanitize(&report.name),
            sanitize(&report.correlation_id)
        ),
    );
    let mut buf = serde_json::to_string_pretty(report).context("serialize qa report")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write qa report {}", path.display()))?;
    Ok(path)
}

/// Flattens an event into `message key=value ...`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

fn log_type(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "Error",
        Level::WARN => "Warning",
        _ => "Log",
    }
}

impl<S: Subscriber> Layer<S> for SessionRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut slot = self.slot();
        let Some(active) = slot.as_mut() else {
            return;
        };
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let origin = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            _ => meta.target().to_string(),
        };
        active.report.logs.push(QaLogEntry {
            timestamp_utc: Utc::now().to_rfc3339(),
            log_type: log_type(meta.level()).to_string(),
            message: format!("{}{}", visitor.message, visitor.fields),
            stack_trace: origin,
        });
    }
}
