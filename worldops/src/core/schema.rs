//! Per-op field table and the read-only `validateCommandSchema` check.

use crate::core::drop_table::fmt_chance;
use crate::core::ops::Op;
use crate::core::types::{Command, ExecutionResult, non_blank};

const DROP_FIELDS: &[&str] = &["dropTableId", "expectedItems", "minDropChance"];
const ENEMY_DROP_FIELDS: &[&str] = &["enemyId", "dropTableId", "expectedItems", "minDropChance"];
const PREFAB_DROP_FIELDS: &[&str] = &["prefabId", "dropTableId", "expectedItems", "minDropChance"];

/// Payload fields an op reads. `op` and `scope` are always allowed.
pub fn allowed_fields(op: Op) -> &'static [&'static str] {
    match op {
        Op::ValidateDropTable => DROP_FIELDS,
        Op::ValidateEnemyDrops => ENEMY_DROP_FIELDS,
        Op::ValidateEnemyPrefabDrops => PREFAB_DROP_FIELDS,
        Op::ValidateAllDropTables => &["minDropChance"],
        Op::ValidateGate => &["gateId", "expectedKeyItem", "requiredAmount"],
        Op::EnsureFoundation => &["groundSize"],
        Op::EnsurePlayerInputStack => &["playerTag", "ensureCameraPan"],
        Op::RunRecipe => &["recipeName", "recipeOps"],
        Op::Ping
        | Op::EnsureSceneRoots
        | Op::ValidateSceneRoots
        | Op::ValidateNoScaledParents
        | Op::ValidateFoundation
        | Op::ListScriptableObjectTypes
        | Op::ListDropTables
        | Op::ListItemDefinitions
        | Op::ListGates
        | Op::ListEnemies
        | Op::ListEnemyPrefabs
        | Op::ValidateCommandSchema
        | Op::ValidateOrphanItemDefinitions => &[],
    }
}

/// Required fields the command leaves unset, in table order.
pub fn missing_required(op: Op, cmd: &Command) -> Vec<&'static str> {
    let mut missing = Vec::new();
    match op {
        Op::ValidateDropTable => {
            if non_blank(cmd.drop_table_id.as_deref()).is_none() {
                missing.push("dropTableId");
            }
        }
        Op::ValidateGate => {
            if non_blank(cmd.gate_id.as_deref()).is_none() {
                missing.push("gateId");
            }
            if non_blank(cmd.expected_key_item.as_deref()).is_none() {
                missing.push("expectedKeyItem");
            }
            if cmd.required_amount.unwrap_or(0) <= 0 {
                missing.push("requiredAmount");
            }
        }
        Op::RunRecipe => {
            let has_ops = cmd.recipe_ops.as_ref().is_some_and(|ops| !ops.is_empty());
            if !has_ops && non_blank(cmd.recipe_name.as_deref()).is_none() {
                missing.push("recipeName");
            }
        }
        _ => {}
    }
    missing
}

/// Populated fields the op never reads.
pub fn unused_fields(op: Op, cmd: &Command) -> Vec<&'static str> {
    let allowed = allowed_fields(op);
    cmd.populated_fields()
        .into_iter()
        .filter(|field| !allowed.contains(field))
        .collect()
}

fn validates_drops(op: Op) -> bool {
    matches!(
        op,
        Op::ValidateDropTable | Op::ValidateEnemyDrops | Op::ValidateEnemyPrefabDrops
    )
}

/// Check every command of a batch against the field table.
///
/// Missing required fields are one aggregated error per command; unused
/// fields are one aggregated warning. Nothing is executed.
pub fn validate_batch(commands: &[Command], result: &mut ExecutionResult) {
    let name = Op::ValidateCommandSchema.as_str();
    for (i, cmd) in commands.iter().enumerate() {
        let Some(op_name) = cmd.op_name() else {
            result.error(name, format!("Command[{i}] missing required field 'op'."));
            continue;
        };
        let Some(op) = Op::parse(op_name) else {
            result.error(name, format!("Command[{i}] unknown op '{op_name}'."));
            continue;
        };

        let missing = missing_required(op, cmd);
        if missing.is_empty() {
            result.log(name, format!("Command[{i}] ({op}) required fields OK."));
        } else {
            result.error(
                name,
                format!("Command[{i}] ({op}) missing required: {}", missing.join(", ")),
            );
        }

        let unused = unused_fields(op, cmd);
        if !unused.is_empty() {
            result.warn(
                name,
                format!("Command[{i}] ({op}) contains unused fields: {}", unused.join(", ")),
            );
        }

        if validates_drops(op) {
            for (j, item) in cmd.expected_items().iter().enumerate() {
                if item.trim().is_empty() {
                    result.warn(name, format!("Command[{i}] expectedItems[{j}] is empty."));
                }
            }
            if let Some(chance) = cmd.min_drop_chance
                && !(0.0..=1.0).contains(&chance)
            {
                result.warn(
                    name,
                    format!(
                        "Command[{i}] minDropChance {} is outside [0,1].",
                        fmt_chance(chance)
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ExecutionMode;

    fn run(commands: &[Command]) -> ExecutionResult {
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, commands.len());
        validate_batch(commands, &mut result);
        result
    }

    #[test]
    fn gate_requires_positive_amount() {
        let cmd = Command {
            gate_id: Some("Gate_A".to_string()),
            expected_key_item: Some("Key_A".to_string()),
            required_amount: Some(0),
            ..Command::op("validateGate")
        };
        let result = run(&[cmd]);
        assert_eq!(
            result.errors(),
            ["validateCommandSchema: Command[0] (validateGate) missing required: requiredAmount"]
        );
    }

    #[test]
    fn recipe_ops_satisfy_recipe_name() {
        let by_ops = Command {
            recipe_ops: Some(vec!["ping".to_string()]),
            ..Command::op("runRecipe")
        };
        assert!(missing_required(Op::RunRecipe, &by_ops).is_empty());
        assert_eq!(
            missing_required(Op::RunRecipe, &Command::op("runRecipe")),
            vec!["recipeName"]
        );
    }

    #[test]
    fn unused_fields_warn_without_failing() {
        let cmd = Command {
            gate_id: Some("Gate_A".to_string()),
            name: Some("Node".to_string()),
            ..Command::op("ping")
        };
        let result = run(&[cmd]);
        assert!(result.success());
        assert_eq!(
            result.warnings(),
            ["validateCommandSchema: Command[0] (ping) contains unused fields: name, gateId"]
        );
        assert_eq!(
            result.logs(),
            ["validateCommandSchema: Command[0] (ping) required fields OK."]
        );
    }

    #[test]
    fn unknown_and_missing_ops_are_errors() {
        let result = run(&[Command::op("frobulate"), Command::default()]);
        assert_eq!(
            result.errors(),
            [
                "validateCommandSchema: Command[0] unknown op 'frobulate'.",
                "validateCommandSchema: Command[1] missing required field 'op'.",
            ]
        );
    }

    #[test]
    fn drop_payload_sanity_warnings() {
        let cmd = Command {
            drop_table_id: Some("Drops_A".to_string()),
            expected_items: Some(vec!["Item_A".to_string(), " ".to_string()]),
            min_drop_chance: Some(1.5),
            ..Command::op("validateDropTable")
        };
        let result = run(&[cmd]);
        assert!(result.success());
        assert_eq!(
            result.warnings(),
            [
                "validateCommandSchema: Command[0] expectedItems[1] is empty.",
                "validateCommandSchema: Command[0] minDropChance 1.5 is outside [0,1].",
            ]
        );
    }

    #[test]
    fn scope_is_allowed_everywhere() {
        let cmd = Command {
            scope: Some(crate::core::types::SafetyScope::envelope_default()),
            ..Command::op("listGates")
        };
        assert!(unused_fields(Op::ListGates, &cmd).is_empty());
    }
}
