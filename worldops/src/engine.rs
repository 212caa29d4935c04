//! Batch execution: scope checks, dispatch, and result accounting.

use tracing::{info, instrument, warn};

use crate::core::parser::Parsed;
use crate::core::scope::{apply_default_scope, check_batch, check_command};
use crate::core::types::{Command, Envelope, ExecutionMode, ExecutionResult};
use crate::ops::{Dispatch, OpContext, dispatch};
use crate::world::World;

/// Op name used for driver-level entries.
pub const DRIVER_OP: &str = "ExecuteCommands";

/// Run `commands` in order against `world`.
///
/// Every command is attempted; a failing command never stops the batch and
/// earlier Apply mutations are kept.
#[instrument(skip_all, fields(mode = %mode, commands = commands.len()))]
pub fn execute_commands(
    commands: &[Command],
    mode: ExecutionMode,
    world: &mut dyn World,
) -> ExecutionResult {
    if commands.is_empty() {
        let mut result = ExecutionResult::new(mode, 0);
        result.error(DRIVER_OP, "Null or empty command list.");
        return result;
    }

    let mut result = ExecutionResult::new(mode, commands.len());
    match commands[0].scope.as_ref() {
        Some(scope) => info!(
            allowed_roots = ?scope.allowed_roots,
            denied_roots = ?scope.denied_roots,
            max_operations = scope.max_operations,
            "executing batch"
        ),
        None => info!("executing batch"),
    }

    for (index, cmd) in commands.iter().enumerate() {
        let Some(op_name) = cmd.op_name() else {
            result.warn(DRIVER_OP, format!("Command[{index}] missing op. Skipped."));
            continue;
        };
        if let Some(violation) = check_command(cmd) {
            warn!(index, root = %violation.denied_root, field = violation.field, "command blocked by scope");
            result.error(DRIVER_OP, format!("Command[{index}] {violation}. Blocked."));
            continue;
        }

        let mut ctx = OpContext {
            world: &mut *world,
            mode,
            result: &mut result,
            batch: commands,
        };
        match dispatch(&mut ctx, cmd) {
            Ok(Dispatch::Handled(_)) => {}
            Ok(Dispatch::Unknown) => {
                result.warn(DRIVER_OP, format!("Unknown op: {op_name}. Skipped."));
            }
            Err(err) => {
                warn!(index, op = op_name, error = %err, "handler fault");
                result.error(op_name, format!("unexpected fault: {err:#}"));
            }
        }
        result.mark_executed();
    }

    info!(
        success = result.success(),
        executed = result.ops_executed(),
        errors = result.errors().len(),
        warnings = result.warnings().len(),
        "batch finished"
    );
    result
}

/// Run an envelope: default scopes, batch cap, scene check, then the batch.
///
/// `mode_override` wins over the envelope's own mode.
pub fn execute_envelope(
    envelope: &Envelope,
    mode_override: Option<ExecutionMode>,
    world: &mut dyn World,
) -> ExecutionResult {
    let mode = mode_override.unwrap_or(envelope.mode);
    let mut commands = envelope.commands.commands.clone();
    apply_default_scope(&mut commands, &envelope.scope);

    if let Err(too_large) = check_batch(commands.len(), &envelope.scope) {
        warn!(count = too_large.count, max = too_large.max_operations, "batch rejected");
        let mut result = ExecutionResult::new(mode, commands.len());
        result.error(DRIVER_OP, too_large);
        return result;
    }

    let scene = envelope.scene.scene_name.trim();
    let mismatch = !scene.is_empty() && scene != world.scene_name();
    let actual_scene = world.scene_name().to_string();
    let mut result = execute_commands(&commands, mode, world);
    if mismatch {
        result.warn(
            DRIVER_OP,
            format!("envelope targets scene '{scene}' but the world is '{actual_scene}'."),
        );
    }
    result
}

/// Run whichever shape the parser produced.
pub fn execute_parsed(
    parsed: &Parsed,
    mode_override: Option<ExecutionMode>,
    world: &mut dyn World,
) -> ExecutionResult {
    match parsed {
        Parsed::Envelope(envelope) => execute_envelope(envelope, mode_override, world),
        Parsed::List(list) => {
            execute_commands(&list.commands, mode_override.unwrap_or_default(), world)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CommandList, SafetyScope};
    use crate::world::memory::MemoryWorld;

    #[test]
    fn empty_batch_is_an_error_with_zero_counts() {
        let mut world = MemoryWorld::new("S");
        let result = execute_commands(&[], ExecutionMode::DryRun, &mut world);
        assert!(!result.success());
        assert_eq!(result.ops_planned(), 0);
        assert_eq!(result.ops_executed(), 0);
        assert_eq!(result.errors(), ["ExecuteCommands: Null or empty command list."]);
    }

    #[test]
    fn missing_op_is_skipped_without_counting() {
        let mut world = MemoryWorld::new("S");
        let commands = [Command::default(), Command::op("ping")];
        let result = execute_commands(&commands, ExecutionMode::DryRun, &mut world);
        assert!(result.success());
        assert_eq!(result.ops_planned(), 2);
        assert_eq!(result.ops_executed(), 1);
        assert_eq!(result.warnings(), ["ExecuteCommands: Command[0] missing op. Skipped."]);
    }

    #[test]
    fn blocked_commands_are_not_counted() {
        let mut world = MemoryWorld::new("S");
        let scope = SafetyScope {
            denied_roots: vec!["ZONE_1_LOCKED".to_string()],
            ..SafetyScope::default()
        };
        let commands = [Command {
            scope: Some(scope),
            name: Some("ZONE_1_LOCKED_EXTRA".to_string()),
            ..Command::op("ping")
        }];
        let result = execute_commands(&commands, ExecutionMode::Apply, &mut world);
        assert_eq!(result.ops_executed(), 0);
        assert_eq!(
            result.errors(),
            ["ExecuteCommands: Command[0] references denied root 'ZONE_1_LOCKED' in field value 'ZONE_1_LOCKED_EXTRA'. Blocked."]
        );
        assert!(result.logs().is_empty());
    }

    #[test]
    fn envelope_scope_reaches_every_command() {
        let mut world = MemoryWorld::new("S");
        let envelope = Envelope {
            scope: SafetyScope {
                denied_roots: vec!["Secret".to_string()],
                max_operations: 10,
                ..SafetyScope::default()
            },
            commands: CommandList::new(vec![
                Command::op("ping"),
                Command {
                    gate_id: Some("Secret_Gate".to_string()),
                    ..Command::op("validateGate")
                },
            ]),
            ..Envelope::default()
        };
        let result = execute_envelope(&envelope, None, &mut world);
        assert_eq!(result.ops_executed(), 1);
        assert_eq!(result.errors().len(), 1);
    }

    #[test]
    fn scene_mismatch_warns() {
        let mut world = MemoryWorld::new("Zone1");
        let mut envelope = Envelope {
            commands: CommandList::new(vec![Command::op("ping")]),
            ..Envelope::default()
        };
        envelope.scene.scene_name = "Zone2".to_string();
        let result = execute_envelope(&envelope, None, &mut world);
        assert!(result.success());
        assert_eq!(
            result.warnings(),
            ["ExecuteCommands: envelope targets scene 'Zone2' but the world is 'Zone1'."]
        );
    }

    #[test]
    fn mode_override_beats_envelope_mode() {
        let mut world = MemoryWorld::new("S");
        let envelope = Envelope {
            mode: ExecutionMode::Apply,
            commands: CommandList::new(vec![Command::op("ensureSceneRoots")]),
            ..Envelope::default()
        };
        let result = execute_envelope(&envelope, Some(ExecutionMode::DryRun), &mut world);
        assert_eq!(result.mode(), ExecutionMode::DryRun);
        assert!(world.roots().is_empty());
    }
}
