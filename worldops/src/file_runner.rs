//! Orchestration for `worldops run`: one pending command file, end to end.
//!
//! Locates the newest file in the incoming folder, parses it, executes it
//! inside a QA session, writes the command report, and routes the file to
//! `processed` or `failed`.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::core::lint::lint_document;
use crate::core::parser::{Parsed, parse};
use crate::core::types::{ExecutionMode, ExecutionResult};
use crate::engine::execute_parsed;
use crate::io::config::{ProjectPaths, WorldopsConfig};
use crate::io::report::{CommandRunReport, write_report};
use crate::io::routing::{newest_json, route_file};
use crate::io::session::{QaCompilerMessage, SessionRecorder, export};
use crate::io::world_store::{load_world, write_world};

/// Result of one `run_latest_incoming` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing pending in the incoming folder.
    Idle,
    Completed(CompletedRun),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    /// Where the command file was picked up.
    pub source: PathBuf,
    /// Where it was moved afterwards.
    pub routed_to: PathBuf,
    pub report_path: PathBuf,
    /// QA artifact; absent when the file never parsed.
    pub qa_path: Option<PathBuf>,
    pub report: CommandRunReport,
}

impl CompletedRun {
    pub fn succeeded(&self) -> bool {
        self.report.succeeded()
    }
}

/// Handle the newest pending command file.
///
/// `mode_override` wins over the envelope's mode; bare lists default to
/// DryRun. Only I/O failures (reading the file, writing artifacts, moving the
/// file) are returned as `Err`; everything else ends up in the report.
#[instrument(skip_all, fields(incoming = %paths.incoming.display()))]
pub fn run_latest_incoming(
    paths: &ProjectPaths,
    cfg: &WorldopsConfig,
    mode_override: Option<ExecutionMode>,
    recorder: &SessionRecorder,
) -> Result<RunOutcome> {
    let Some(source) = newest_json(&paths.incoming)? else {
        info!("no pending command files");
        return Ok(RunOutcome::Idle);
    };
    info!(source = %source.display(), "picked command file");

    let raw =
        fs::read_to_string(&source).with_context(|| format!("read {}", source.display()))?;
    let stem = file_stem(&source);

    let parsed = match parse(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(source = %source.display(), error = %err, "command file did not parse");
            let mut report =
                CommandRunReport::new(&source, mode_override.unwrap_or_default(), &stem);
            report.parse_error = Some(err.to_string());
            let report_path = write_report(&paths.reports, &report)?;
            let routed_to = route_file(&source, &paths.failed)?;
            return Ok(RunOutcome::Completed(CompletedRun {
                source,
                routed_to,
                report_path,
                qa_path: None,
                report,
            }));
        }
    };

    let request_id = parsed
        .request_id()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| stem.clone(), str::to_string);
    let mode = effective_mode(&parsed, mode_override);
    let mut report = CommandRunReport::new(&source, mode, &request_id);

    let session = recorder.begin(&cfg.session_name, &request_id);
    match lint_document(&raw) {
        Ok(diagnostics) => {
            for diagnostic in &diagnostics {
                recorder.record_diagnostic(QaCompilerMessage::from_diagnostic(&source, diagnostic));
            }
        }
        Err(err) => warn!(error = %format!("{err:#}"), "lint unavailable"),
    }
    let executed = execute_against_world(&paths.world_path, &parsed, mode_override);
    let qa_report = session.finish();

    match executed {
        Ok(result) => report.result = Some(result),
        Err(fault) => report.execution_exception = Some(fault),
    }
    let qa_path = qa_report
        .map(|qa| export(&paths.qa, &qa))
        .transpose()?;
    let report_path = write_report(&paths.reports, &report)?;
    let dest = if report.succeeded() {
        &paths.processed
    } else {
        &paths.failed
    };
    let routed_to = route_file(&source, dest)?;
    info!(
        routed_to = %routed_to.display(),
        success = report.succeeded(),
        "command file handled"
    );

    Ok(RunOutcome::Completed(CompletedRun {
        source,
        routed_to,
        report_path,
        qa_path,
        report,
    }))
}

/// Mode the batch will run in: override, then envelope, then DryRun.
fn effective_mode(parsed: &Parsed, mode_override: Option<ExecutionMode>) -> ExecutionMode {
    match (mode_override, parsed) {
        (Some(mode), _) => mode,
        (None, Parsed::Envelope(envelope)) => envelope.mode,
        (None, Parsed::List(_)) => ExecutionMode::DryRun,
    }
}

/// Load the world, run the batch, and save the world after an Apply run.
///
/// `Err` carries a fault description for the report.
fn execute_against_world(
    world_path: &Path,
    parsed: &Parsed,
    mode_override: Option<ExecutionMode>,
) -> std::result::Result<ExecutionResult, String> {
    let mut world = load_world(world_path).map_err(|err| format!("{err:#}"))?;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        execute_parsed(parsed, mode_override, &mut world)
    }))
    .map_err(|payload| format!("panic during execution: {}", panic_message(payload.as_ref())))?;
    trace_result(&result);
    if result.mode().is_apply() {
        write_world(world_path, &world).map_err(|err| format!("{err:#}"))?;
    }
    Ok(result)
}

/// Mirror result channels into tracing so the active session captures them.
fn trace_result(result: &ExecutionResult) {
    for line in result.logs() {
        info!("{line}");
    }
    for line in result.warnings() {
        warn!("{line}");
    }
    for line in result.errors() {
        error!("{line}");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
