//! Raw text to command batch.
//!
//! Two shapes are accepted. The envelope form wins whenever its nested list is
//! non-empty; the bare list form is the fallback.

use thiserror::Error;

use crate::core::types::{CommandList, Envelope};

pub const ENVELOPE_SHAPE: &str =
    r#"{"schemaVersion":"1.0","requestId":"...","mode":"DryRun","commands":{"commands":[...]}}"#;
pub const LIST_SHAPE: &str = r#"{"commands":[...]}"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty input")]
    Empty,
    #[error(
        "Parsed no commands. Expected either: {envelope} or {list}{cause}",
        envelope = ENVELOPE_SHAPE,
        list = LIST_SHAPE,
        cause = describe_cause(.detail)
    )]
    NoCommands { detail: Option<String> },
}

fn describe_cause(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(" ({detail})"))
        .unwrap_or_default()
}

/// A successfully parsed batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Envelope(Envelope),
    List(CommandList),
}

impl Parsed {
    pub fn commands(&self) -> &CommandList {
        match self {
            Parsed::Envelope(env) => &env.commands,
            Parsed::List(list) => list,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Parsed::Envelope(env) => Some(env.request_id.as_str()),
            Parsed::List(_) => None,
        }
    }
}

pub fn parse(raw: &str) -> Result<Parsed, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    match serde_json::from_str::<Envelope>(raw) {
        Ok(env) if !env.commands.is_empty() => return Ok(Parsed::Envelope(env)),
        Ok(_) => {}
        Err(err) => tracing::debug!(error = %err, "input is not an envelope"),
    }

    match serde_json::from_str::<CommandList>(raw) {
        Ok(list) if !list.is_empty() => Ok(Parsed::List(list)),
        Ok(_) => Err(ParseError::NoCommands { detail: None }),
        Err(err) => Err(ParseError::NoCommands {
            detail: Some(format!("Failed to parse command list JSON: {err}")),
        }),
    }
}
