//! Content listing, gate validation and orphan detection.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::ops::Op;
use crate::core::types::{Command, ExecutionResult};
use crate::world::discover::{
    ContentType, DropTable, EnemyDefinition, GateDefinition, ItemDefinition, LIST_LIMIT, Prefab,
    data_assets, discover, prefabs,
};
use crate::world::{World, contains_any_ignore_case, contains_ignore_case};

const ENEMY_COMPONENT_TOKENS: &[&str] = &["Enemy", "Mob", "Monster"];

/// `[a, b, c]`, truncated to [`LIST_LIMIT`] names.
pub fn fmt_names<S: AsRef<str>>(names: &[S]) -> String {
    let shown: Vec<&str> = names.iter().take(LIST_LIMIT).map(AsRef::as_ref).collect();
    let hidden = names.len().saturating_sub(LIST_LIMIT);
    if hidden == 0 {
        format!("[{}]", shown.join(", "))
    } else {
        format!("[{}, ... (+{hidden} more)]", shown.join(", "))
    }
}

/// Label for an item link: `itemId`, asset name, or the raw id if dangling.
pub fn item_label(world: &dyn World, id: &str) -> String {
    world
        .asset(id)
        .and_then(ItemDefinition::from_asset)
        .map_or_else(|| id.to_string(), |item| item.label().to_string())
}

pub fn list_data_asset_types(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ListScriptableObjectTypes.as_str();
    let assets = data_assets(world);
    if assets.is_empty() {
        result.warn(op, "No data assets found.");
        return;
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for asset in &assets {
        *counts.entry(asset.type_name.as_str()).or_default() += 1;
    }
    let mut entries: Vec<(&str, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let take = entries.len().min(LIST_LIMIT);
    result.log(
        op,
        format!(
            "Total data assets loaded: {}. Distinct types: {}. Top {take}:",
            assets.len(),
            entries.len()
        ),
    );
    for (type_name, count) in entries.iter().take(take) {
        result.log(op, format!(" - {type_name} = {count}"));
    }
}

pub fn list_drop_tables(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ListDropTables.as_str();
    let found = discover::<DropTable>(world, result, op);
    if found.items.is_empty() {
        if found.fallback_candidates.is_empty() {
            result.warn(op, "No DropTable assets found (exact or fallback).");
        } else {
            result.warn(
                op,
                "No assets matched exact type 'DropTable'. Fallback candidates found; see logs for names and types.",
            );
        }
        return;
    }
    result.log(
        op,
        format!("Found {}: {}", found.items.len(), fmt_names(&found.names())),
    );
}

pub fn list_item_definitions(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ListItemDefinitions.as_str();
    let found = discover::<ItemDefinition>(world, result, op);
    if found.items.is_empty() {
        result.warn(op, "No ItemDefinition assets found (exact or fallback).");
        return;
    }
    result.log(
        op,
        format!("Found {}: {}", found.items.len(), fmt_names(&found.names())),
    );
}

pub fn list_gates(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ListGates.as_str();
    let found = discover::<GateDefinition>(world, result, op);
    if found.items.is_empty() {
        result.warn(op, "No GateDefinition assets found.");
        return;
    }
    result.log(op, format!("Found {} GateDefinition asset(s).", found.items.len()));
    for gate in found.items.iter().take(LIST_LIMIT) {
        let required = gate
            .required_item
            .as_deref()
            .map_or_else(|| "<null>".to_string(), |id| item_label(world, id));
        result.log(
            op,
            format!("{} | requiredItem={required} | path={}", gate.name, gate.path),
        );
    }
}

pub fn validate_gate(world: &dyn World, result: &mut ExecutionResult, cmd: &Command) {
    let op = Op::ValidateGate.as_str();
    let gate_id = cmd.gate_id.as_deref().unwrap_or_default().trim();
    let expected = cmd.expected_key_item.as_deref().unwrap_or_default().trim();
    let required_amount = cmd.required_amount.unwrap_or(0);

    if required_amount <= 0 {
        result.error(op, format!("requiredAmount must be > 0 (got {required_amount})."));
        return;
    }

    let gates = discover::<GateDefinition>(world, result, op);
    let Some(gate) = gates
        .items
        .iter()
        .find(|gate| gate.name.eq_ignore_ascii_case(gate_id))
    else {
        result.error(
            op,
            format!("GateDefinition not found for gateId '{gate_id}' (matched by asset name, case-insensitive)."),
        );
        return;
    };
    result.log(op, format!("GateDefinition found: {} | path={}", gate.name, gate.path));

    let items = discover::<ItemDefinition>(world, result, op);
    let Some(expected_item) = items.items.iter().find(|item| item.matches(expected)) else {
        result.error(
            op,
            format!(
                "Expected key item not found in ItemDefinition assets: '{expected}' (matched by itemId or asset name, case-insensitive)."
            ),
        );
        return;
    };
    result.log(
        op,
        format!(
            "Expected key item resolved: {} (itemId='{}') | path={}",
            expected_item.name,
            expected_item.item_id.as_deref().unwrap_or_default(),
            expected_item.path
        ),
    );

    let Some(required_id) = gate.required_item.as_deref() else {
        result.error(op, format!("GateDefinition '{}' has requiredItem = null.", gate.name));
        return;
    };
    let Some(required) = world.asset(required_id).and_then(ItemDefinition::from_asset) else {
        result.error(
            op,
            format!(
                "GateDefinition '{}' requiredItem '{required_id}' does not resolve to an ItemDefinition.",
                gate.name
            ),
        );
        return;
    };
    if !required.matches(expected) {
        result.error(
            op,
            format!(
                "GateDefinition '{}' requires '{}', which does not match expected '{expected}'.",
                gate.name,
                required.label()
            ),
        );
        return;
    }

    if required_amount != 1 {
        result.warn(
            op,
            format!(
                "GateDefinition has no quantity field; runtime gate treats requiredAmount as 1. You requested {required_amount}."
            ),
        );
    }
    result.log(op, "GateDefinition requirements validated.");
}

pub fn list_enemies(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ListEnemies.as_str();
    let found = discover::<EnemyDefinition>(world, result, op);
    if found.items.is_empty() {
        result.warn(op, "No enemy assets found.");
        return;
    }
    result.log(op, format!("Found {} enemy asset(s).", found.items.len()));
    for enemy in found.items.iter().take(LIST_LIMIT) {
        result.log(
            op,
            format!(" - {} | {} | {}", enemy.name, enemy.type_name, enemy.path),
        );
    }
}

/// A prefab that looks like an enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyPrefab {
    pub prefab: Prefab,
    /// Component types that matched the heuristic, deduplicated and sorted.
    pub matching_types: Vec<String>,
}

/// Prefabs whose name contains "Enemy" or that carry a component whose type
/// contains Enemy, Mob or Monster.
pub fn enemy_prefab_candidates(world: &dyn World) -> Vec<EnemyPrefab> {
    prefabs(world)
        .into_iter()
        .filter_map(|prefab| {
            let matching_types: BTreeSet<String> = prefab
                .root
                .all_components()
                .into_iter()
                .filter(|c| contains_any_ignore_case(&c.type_name, ENEMY_COMPONENT_TOKENS))
                .map(|c| c.type_name.clone())
                .collect();
            let name_match = contains_ignore_case(&prefab.name, "Enemy");
            (name_match || !matching_types.is_empty()).then(|| EnemyPrefab {
                prefab,
                matching_types: matching_types.into_iter().collect(),
            })
        })
        .collect()
}

pub fn list_enemy_prefabs(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ListEnemyPrefabs.as_str();
    let candidates = enemy_prefab_candidates(world);
    if candidates.is_empty() {
        result.warn(op, "No enemy prefab candidates found.");
        return;
    }
    result.log(
        op,
        format!(
            "Found {} enemy prefab candidate(s). Detection heuristics: prefab name contains 'Enemy' OR component type contains 'Enemy'/'Mob'/'Monster'.",
            candidates.len()
        ),
    );
    for candidate in candidates.iter().take(LIST_LIMIT) {
        let types = if candidate.matching_types.is_empty() {
            "(none)".to_string()
        } else {
            candidate.matching_types.join(", ")
        };
        result.log(
            op,
            format!(
                "{} | {} | matchingComponents=[{types}]",
                candidate.prefab.name, candidate.prefab.path
            ),
        );
    }
}

pub fn validate_orphan_item_definitions(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ValidateOrphanItemDefinitions.as_str();
    let items = discover::<ItemDefinition>(world, result, op);
    if items.items.is_empty() {
        if items.fallback_candidates.is_empty() {
            result.warn(op, "No ItemDefinition assets found.");
        } else {
            result.warn(
                op,
                "Found ItemDefinition-like candidates but none were loadable as ItemDefinition (see logs).",
            );
        }
        return;
    }

    let tables = discover::<DropTable>(world, result, op);
    let referenced: BTreeSet<&str> = tables
        .items
        .iter()
        .flat_map(|table| table.data.tiers())
        .flat_map(|(_, entries)| entries.iter())
        .filter_map(|entry| entry.item.as_deref())
        .collect();

    let orphans: Vec<&ItemDefinition> = items
        .items
        .iter()
        .filter(|item| !referenced.contains(item.path.as_str()))
        .collect();
    if orphans.is_empty() {
        result.log(
            op,
            format!("No orphan ItemDefinitions found. Total={}", items.items.len()),
        );
        return;
    }
    result.warn(
        op,
        format!(
            "Found {} orphan ItemDefinition(s) not referenced by any DropTable:",
            orphans.len()
        ),
    );
    for orphan in orphans {
        result.log(op, format!(" - {} | {}", orphan.name, orphan.path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ExecutionMode;
    use crate::test_support::{content_world, gate, item};
    use crate::world::memory::MemoryWorld;

    fn gate_cmd(gate_id: &str, key: &str, amount: i64) -> Command {
        Command {
            gate_id: Some(gate_id.to_string()),
            expected_key_item: Some(key.to_string()),
            required_amount: Some(amount),
            ..Command::op("validateGate")
        }
    }

    fn run_gate(world: &MemoryWorld, cmd: &Command) -> ExecutionResult {
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        validate_gate(world, &mut result, cmd);
        result
    }

    #[test]
    fn fmt_names_truncates() {
        let names: Vec<String> = (0..52).map(|i| format!("n{i}")).collect();
        let formatted = fmt_names(&names);
        assert!(formatted.ends_with("n49, ... (+2 more)]"));
        assert_eq!(fmt_names(&["a", "b"]), "[a, b]");
    }

    #[test]
    fn gate_matching_key_validates() {
        let world = content_world();
        let result = run_gate(&world, &gate_cmd("Gate_Zone1_Boss", "Item_AbyssalSigil", 1));
        assert!(result.success(), "{:?}", result.errors());
        assert!(result.warnings().is_empty());
        assert_eq!(
            result.logs().last().map(String::as_str),
            Some("validateGate: GateDefinition requirements validated.")
        );
    }

    #[test]
    fn gate_mismatch_is_one_error_naming_both_items() {
        let mut world = content_world();
        world.insert_asset(item("Item_RustyKey", None));
        let result = run_gate(&world, &gate_cmd("Gate_Zone1_Boss", "Item_RustyKey", 1));
        assert!(!result.success());
        assert_eq!(
            result.errors(),
            ["validateGate: GateDefinition 'Gate_Zone1_Boss' requires 'sigil_abyssal', which does not match expected 'Item_RustyKey'."]
        );
    }

    #[test]
    fn gate_amount_rules() {
        let world = content_world();
        let zero = run_gate(&world, &gate_cmd("Gate_Zone1_Boss", "Item_AbyssalSigil", 0));
        assert_eq!(
            zero.errors(),
            ["validateGate: requiredAmount must be > 0 (got 0)."]
        );
        let three = run_gate(&world, &gate_cmd("Gate_Zone1_Boss", "Item_AbyssalSigil", 3));
        assert!(three.success());
        assert_eq!(three.warnings().len(), 1);
    }

    #[test]
    fn gate_without_required_item() {
        let mut world = content_world();
        world.insert_asset(gate("Gate_Open", None));
        let result = run_gate(&world, &gate_cmd("gate_open", "Item_AbyssalSigil", 1));
        assert_eq!(
            result.errors(),
            ["validateGate: GateDefinition 'Gate_Open' has requiredItem = null."]
        );
    }

    #[test]
    fn list_ops_warn_on_empty_world() {
        let world = MemoryWorld::new("S");
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 6);
        list_data_asset_types(&world, &mut result);
        list_drop_tables(&world, &mut result);
        list_item_definitions(&world, &mut result);
        list_gates(&world, &mut result);
        list_enemies(&world, &mut result);
        list_enemy_prefabs(&world, &mut result);
        assert!(result.success());
        assert_eq!(result.warnings().len(), 6);
    }

    #[test]
    fn data_asset_types_sorted_by_count() {
        let world = content_world();
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        list_data_asset_types(&world, &mut result);
        assert_eq!(
            &result.logs()[..3],
            [
                "listScriptableObjectTypes: Total data assets loaded: 9. Distinct types: 4. Top 4:",
                "listScriptableObjectTypes:  - EnemyDefinition = 3",
                "listScriptableObjectTypes:  - ItemDefinition = 3",
            ]
        );
    }

    #[test]
    fn enemy_prefabs_match_by_name_or_component() {
        let world = content_world();
        let names: Vec<String> = enemy_prefab_candidates(&world)
            .into_iter()
            .map(|c| c.prefab.name)
            .collect();
        assert_eq!(names, vec!["Enemy_Goblin", "Wolf"]);
    }

    #[test]
    fn orphan_items_are_reported() {
        let world = content_world();
        let mut result = ExecutionResult::new(ExecutionMode::DryRun, 1);
        validate_orphan_item_definitions(&world, &mut result);
        assert_eq!(
            result.warnings(),
            ["validateOrphanItemDefinitions: Found 1 orphan ItemDefinition(s) not referenced by any DropTable:"]
        );
        assert!(result
            .logs()
            .iter()
            .any(|line| line.contains(" - Item_Unused | ")));
    }
}
