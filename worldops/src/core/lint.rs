//! Structural lint of a raw command document against the bundled JSON Schema.
//!
//! Lint never blocks execution. Its findings are surfaced as diagnostics so a
//! misspelled field (silently ignored by the parser) is still visible.

use anyhow::{Result, anyhow};
use jsonschema::{Draft, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMMAND_FILE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/command_file/v1.schema.json"
));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// One lint finding. `line`/`column` are 1-based when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl Diagnostic {
    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            line: None,
            column: None,
        }
    }
}

/// Lint `raw`. `Err` only when the bundled schema itself cannot be compiled.
pub fn lint_document(raw: &str) -> Result<Vec<Diagnostic>> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            return Ok(vec![Diagnostic {
                severity: Severity::Error,
                message: format!("invalid JSON: {err}"),
                line: Some(err.line()).filter(|line| *line > 0),
                column: Some(err.column()).filter(|column| *column > 0),
            }]);
        }
    };

    let schema: Value =
        serde_json::from_str(COMMAND_FILE_SCHEMA).map_err(|err| anyhow!("parse schema: {err}"))?;
    let document = compile(&schema)?;
    let mut diagnostics: Vec<Diagnostic> = document
        .iter_errors(&value)
        .map(|err| Diagnostic::warning(err.to_string()))
        .collect();

    let mut command_schema = schema["$defs"]["command"].clone();
    command_schema["$defs"] = schema["$defs"].clone();
    let command = compile(&command_schema)?;
    for (i, cmd) in command_items(&value).iter().enumerate() {
        diagnostics.extend(
            command
                .iter_errors(cmd)
                .map(|err| Diagnostic::warning(format!("Command[{i}]: {err}"))),
        );
    }
    Ok(diagnostics)
}

fn compile(schema: &Value) -> Result<Validator> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| anyhow!("compile command schema: {err}"))
}

/// Command array of either accepted shape.
fn command_items(value: &Value) -> &[Value] {
    let commands = &value["commands"];
    commands
        .as_array()
        .or_else(|| commands["commands"].as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}
