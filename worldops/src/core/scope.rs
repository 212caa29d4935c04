//! Denied-root and batch-size checks applied before dispatch.
//!
//! Matching is a case-insensitive string prefix test, not path-segment aware:
//! `ZONE_1_LOCKED_EXTRA` is blocked by a denied root of `ZONE_1_LOCKED`.

use std::fmt;

use crate::core::types::{Command, SafetyScope};

/// A command touched a denied root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeViolation {
    pub denied_root: String,
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for ScopeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "references denied root '{}' in field value '{}'",
            self.denied_root, self.value
        )
    }
}

/// A batch is larger than the scope allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTooLarge {
    pub count: usize,
    pub max_operations: usize,
}

impl fmt::Display for BatchTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch of {} command(s) exceeds maxOperations {}. Nothing executed.",
            self.count, self.max_operations
        )
    }
}

/// Check one command against its own scope. Commands without a scope pass.
///
/// Denied roots are visited in declaration order, fields in
/// [`Command::path_fields`] order; the first match wins.
pub fn check_command(cmd: &Command) -> Option<ScopeViolation> {
    let scope = cmd.scope.as_ref()?;
    let fields = cmd.path_fields();
    for root in scope.denied_roots.iter().filter(|root| !root.is_empty()) {
        for (field, value) in fields {
            let Some(value) = value.filter(|value| !value.is_empty()) else {
                continue;
            };
            if starts_with_ignore_case(value, root) {
                return Some(ScopeViolation {
                    denied_root: root.clone(),
                    field,
                    value: value.to_string(),
                });
            }
        }
    }
    None
}

pub fn check_batch(count: usize, scope: &SafetyScope) -> Result<(), BatchTooLarge> {
    match scope.operation_cap() {
        Some(max_operations) if count > max_operations => Err(BatchTooLarge {
            count,
            max_operations,
        }),
        _ => Ok(()),
    }
}

/// Give every command without its own scope an independent copy of `scope`.
pub fn apply_default_scope(commands: &mut [Command], scope: &SafetyScope) {
    for cmd in commands.iter_mut().filter(|cmd| cmd.scope.is_none()) {
        cmd.scope = Some(scope.clone());
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.to_lowercase())
}
