//! Safety-scoped command runner for scene worlds.
//!
//! Reads command files (envelope or bare list), executes them against the
//! world snapshot named in `worldops.toml`, and reports every log, warning
//! and error the batch produced.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use worldops::core::lint::{Diagnostic, Severity, lint_document};
use worldops::core::parser::{Parsed, parse};
use worldops::core::schema::validate_batch;
use worldops::core::types::{ExecutionMode, ExecutionResult};
use worldops::engine::execute_parsed;
use worldops::exit_codes;
use worldops::file_runner::{RunOutcome, run_latest_incoming};
use worldops::io::config::{CONFIG_FILE, ProjectPaths, load_config};
use worldops::io::init::{InitOptions, init_layout};
use worldops::io::session::SessionRecorder;
use worldops::io::world_store::{load_world, write_world};
use worldops::logging;

#[derive(Parser)]
#[command(
    name = "worldops",
    version,
    about = "Safety-scoped command execution against scene worlds"
)]
struct Cli {
    /// Project root holding `worldops.toml`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the folder layout, config and an empty world if missing.
    Init {
        /// Overwrite the config and world snapshot.
        #[arg(short, long)]
        force: bool,
    },
    /// Execute one command file against the configured world.
    Exec {
        file: PathBuf,
        /// Overrides the envelope's mode (`dry-run` or `apply`).
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ExecutionMode>,
        /// Print the result as JSON instead of text lines.
        #[arg(long)]
        json: bool,
    },
    /// Run the newest command file in the incoming folder.
    Run {
        /// Overrides the envelope's mode (`dry-run` or `apply`).
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ExecutionMode>,
    },
    /// Parse, lint and schema-check a command file without executing it.
    Check { file: PathBuf },
}

fn main() {
    let recorder = SessionRecorder::new();
    logging::init(recorder.clone());
    match run(recorder) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(recorder: SessionRecorder) -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.root, force),
        Command::Exec { file, mode, json } => cmd_exec(&cli.root, &file, mode, json),
        Command::Run { mode } => cmd_run(&cli.root, mode, &recorder),
        Command::Check { file } => cmd_check(&file),
    }
}

fn parse_mode(label: &str) -> Result<ExecutionMode, String> {
    ExecutionMode::from_label(label)
        .ok_or_else(|| format!("unknown mode '{label}' (use dry-run or apply)"))
}

fn project(root: &Path) -> Result<ProjectPaths> {
    let cfg = load_config(&root.join(CONFIG_FILE))?;
    Ok(ProjectPaths::resolve(root, &cfg))
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_layout(root, &InitOptions { force })?;
    println!("initialized {}", paths.root.display());
    Ok(exit_codes::OK)
}

fn cmd_exec(root: &Path, file: &Path, mode: Option<ExecutionMode>, json: bool) -> Result<i32> {
    let paths = project(root)?;
    let raw = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let parsed = parse(&raw).with_context(|| format!("parse {}", file.display()))?;
    let mut world = load_world(&paths.world_path)?;

    let result = execute_parsed(&parsed, mode, &mut world);
    if result.mode().is_apply() {
        write_world(&paths.world_path, &world)?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serialize result")?
        );
    } else {
        print_result(&result);
    }
    Ok(result_code(&result))
}

fn cmd_run(root: &Path, mode: Option<ExecutionMode>, recorder: &SessionRecorder) -> Result<i32> {
    let cfg = load_config(&root.join(CONFIG_FILE))?;
    let paths = ProjectPaths::resolve(root, &cfg);
    match run_latest_incoming(&paths, &cfg, mode, recorder)? {
        RunOutcome::Idle => {
            println!("no pending command files in {}", paths.incoming.display());
            Ok(exit_codes::OK)
        }
        RunOutcome::Completed(run) => {
            if let Some(result) = &run.report.result {
                print_result(result);
            }
            if let Some(parse_error) = &run.report.parse_error {
                println!("parse error: {parse_error}");
            }
            if let Some(fault) = &run.report.execution_exception {
                println!("execution fault: {fault}");
            }
            println!("report: {}", run.report_path.display());
            if let Some(qa_path) = &run.qa_path {
                println!("qa session: {}", qa_path.display());
            }
            println!("routed: {}", run.routed_to.display());
            Ok(if run.succeeded() {
                exit_codes::OK
            } else {
                exit_codes::NEEDS_ATTENTION
            })
        }
    }
}

fn cmd_check(file: &Path) -> Result<i32> {
    let raw = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let diagnostics = lint_document(&raw)?;
    for diagnostic in &diagnostics {
        println!("{}", format_diagnostic(file, diagnostic));
    }

    let parsed = parse(&raw).with_context(|| format!("parse {}", file.display()))?;
    let commands = &parsed.commands().commands;
    let mode = match &parsed {
        Parsed::Envelope(envelope) => envelope.mode,
        Parsed::List(_) => ExecutionMode::DryRun,
    };
    let mut result = ExecutionResult::new(mode, commands.len());
    validate_batch(commands, &mut result);
    print_result(&result);

    let lint_errors = diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Severity::Error);
    Ok(if lint_errors {
        exit_codes::NEEDS_ATTENTION
    } else {
        result_code(&result)
    })
}

fn format_diagnostic(file: &Path, diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    match (diagnostic.line, diagnostic.column) {
        (Some(line), Some(column)) => format!(
            "{}:{line}:{column}: {severity}: {}",
            file.display(),
            diagnostic.message
        ),
        _ => format!("{}: {severity}: {}", file.display(), diagnostic.message),
    }
}

fn print_result(result: &ExecutionResult) {
    for line in result.logs() {
        println!("[log] {line}");
    }
    for line in result.warnings() {
        println!("[warn] {line}");
    }
    for line in result.errors() {
        println!("[error] {line}");
    }
    println!(
        "success={} mode={} planned={} executed={} errors={} warnings={}",
        result.success(),
        result.mode(),
        result.ops_planned(),
        result.ops_executed(),
        result.errors().len(),
        result.warnings().len()
    );
}

fn result_code(result: &ExecutionResult) -> i32 {
    if result.success() {
        exit_codes::OK
    } else {
        exit_codes::NEEDS_ATTENTION
    }
}
