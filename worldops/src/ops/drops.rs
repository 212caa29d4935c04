//! Drop-table validation, directly and through enemies and enemy prefabs.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::drop_table::{fmt_chance, is_effectively_empty, max_tier_total, tier_total};
use crate::core::ops::Op;
use crate::core::types::{Command, ExecutionResult, non_blank};
use crate::ops::content::{enemy_prefab_candidates, fmt_names};
use crate::world::World;
use crate::world::content::{DROP_TABLE_TOKENS, FoundLink, LinkRef, extract_links};
use crate::world::discover::{
    ContentType, Discovery, DropTable, EnemyDefinition, ItemDefinition, Prefab, discover, prefabs,
};

/// Tier totals, emptiness, and optional item expectations for one table.
pub fn validate_table(
    world: &dyn World,
    result: &mut ExecutionResult,
    op: &str,
    table: &DropTable,
    expected_items: &[String],
    min_drop_chance: Option<f64>,
) {
    let name = &table.name;
    let tiers = table.data.tiers();
    let totals: Vec<_> = tiers
        .iter()
        .map(|(tier, entries)| {
            let chances: Vec<f64> = entries.iter().map(|e| e.drop_chance).collect();
            tier_total(*tier, &chances)
        })
        .collect();
    for total in &totals {
        result.log(
            op,
            format!(
                "{name} | Tier '{}' entries={} totalChance={}",
                total.tier,
                total.entries,
                fmt_chance(total.total)
            ),
        );
    }
    if is_effectively_empty(&totals) {
        result.warn(
            op,
            format!("{name} | All tiers have totalChance == 0 (table effectively empty)"),
        );
    }
    let max = max_tier_total(&totals);
    result.log(
        op,
        format!("{name} | Max possible drop chance (max tier total) = {}", fmt_chance(max)),
    );
    if let Some(min) = min_drop_chance
        && max < min
    {
        result.warn(
            op,
            format!(
                "{name} | Max possible drop chance {} is below minDropChance {}",
                fmt_chance(max),
                fmt_chance(min)
            ),
        );
    }

    if expected_items.is_empty() {
        return;
    }
    let items = discover::<ItemDefinition>(world, result, op);
    let mut by_name: BTreeMap<String, &ItemDefinition> = BTreeMap::new();
    for item in &items.items {
        by_name.entry(item.name.to_lowercase()).or_insert(item);
    }

    for expected in expected_items {
        if expected.trim().is_empty() {
            result.warn(op, format!("{name} | Encountered empty expectedItems entry; skipped."));
            continue;
        }
        let Some(item) = by_name.get(&expected.to_lowercase()) else {
            result.error(
                op,
                format!("{name} | Expected item '{expected}' is missing ItemDefinition asset (matched by asset.name)"),
            );
            continue;
        };
        if let Some(item_id) = non_blank(item.item_id.as_deref())
            && !item_id.eq_ignore_ascii_case(&item.name)
        {
            result.warn(
                op,
                format!(
                    "{name} | ItemDefinition '{}' itemId '{item_id}' does not match asset name",
                    item.name
                ),
            );
        }

        let mut per_tier = Vec::new();
        let mut max_entry = 0.0f64;
        for (tier, entries) in &tiers {
            for entry in entries.iter() {
                let entry_name = entry
                    .item
                    .as_deref()
                    .and_then(|id| world.asset(id))
                    .map(|asset| asset.name.as_str());
                if entry_name.is_some_and(|n| n.eq_ignore_ascii_case(expected)) {
                    max_entry = max_entry.max(entry.drop_chance);
                    per_tier.push(format!("{tier}: {}", fmt_chance(entry.drop_chance)));
                }
            }
        }
        if per_tier.is_empty() {
            result.error(
                op,
                format!("{name} | Expected item '{expected}' not referenced by any tier entry"),
            );
            continue;
        }
        if let Some(min) = min_drop_chance
            && max_entry < min
        {
            result.warn(
                op,
                format!(
                    "{name} | '{expected}' max entry chance {} < minDropChance {}",
                    fmt_chance(max_entry),
                    fmt_chance(min)
                ),
            );
        }
        result.log(
            op,
            format!(
                "{name} | '{expected}' | {} | maxEntryChance={}",
                per_tier.join(", "),
                fmt_chance(max_entry)
            ),
        );
    }
}

fn no_tables_message(found: &Discovery<DropTable>) -> &'static str {
    if found.fallback_candidates.is_empty() {
        "No DropTable assets found (exact or fallback)."
    } else {
        "No assets were loadable as DropTable (exact type search returned 0; fallback candidates exist but were not DropTable instances). See logs for candidate names/types."
    }
}

pub fn validate_drop_table(world: &dyn World, result: &mut ExecutionResult, cmd: &Command) {
    let op = Op::ValidateDropTable.as_str();
    let tables = discover::<DropTable>(world, result, op);
    let names = tables.names();
    result.log(
        op,
        format!("Discovered DropTables ({}): {}", names.len(), fmt_names(&names)),
    );
    if tables.items.is_empty() {
        result.error(op, no_tables_message(&tables));
        return;
    }
    let Some(table_id) = non_blank(cmd.drop_table_id.as_deref()) else {
        result.error(op, "Missing required field dropTableId.");
        return;
    };
    let Some(table) = tables
        .items
        .iter()
        .find(|table| table.name.eq_ignore_ascii_case(table_id))
    else {
        result.error(
            op,
            format!(
                "DropTable '{table_id}' not found (match is case-insensitive). Available: {}",
                fmt_names(&names)
            ),
        );
        return;
    };
    validate_table(world, result, op, table, cmd.expected_items(), cmd.min_drop_chance());
}

pub fn validate_all_drop_tables(world: &dyn World, result: &mut ExecutionResult, cmd: &Command) {
    let op = Op::ValidateAllDropTables.as_str();
    let warnings_before = result.warnings().len();
    let errors_before = result.errors().len();

    let tables = discover::<DropTable>(world, result, op);
    if tables.items.is_empty() {
        if tables.fallback_candidates.is_empty() {
            result.error(op, "No DropTable assets found.");
        } else {
            result.error(
                op,
                "No assets were loadable as DropTable (fallback candidates exist; see logs).",
            );
        }
        return;
    }

    result.log(op, format!("Validating {} DropTable(s)...", tables.items.len()));
    for table in &tables.items {
        validate_table(world, result, op, table, &[], cmd.min_drop_chance());
    }
    result.log(
        op,
        format!(
            "Summary: tables={} warningsAdded={} errorsAdded={}",
            tables.items.len(),
            result.warnings().len() - warnings_before,
            result.errors().len() - errors_before
        ),
    );
}

/// Drop tables by lowercase name, first one wins.
struct TableIndex<'a> {
    by_name: BTreeMap<String, &'a DropTable>,
}

impl<'a> TableIndex<'a> {
    fn new(tables: &'a [DropTable]) -> Self {
        let mut by_name = BTreeMap::new();
        for table in tables {
            by_name.entry(table.name.to_lowercase()).or_insert(table);
        }
        Self { by_name }
    }

    fn named(&self, id: &str) -> Option<DropTable> {
        self.by_name.get(&id.to_lowercase()).map(|t| (*t).clone())
    }
}

fn direct_table(world: &dyn World, path: &str) -> Option<DropTable> {
    world.asset(path).and_then(DropTable::from_asset)
}

/// Keep the first occurrence of each table, by asset path.
fn dedup_tables(tables: Vec<DropTable>) -> Vec<DropTable> {
    let mut seen = BTreeSet::new();
    tables
        .into_iter()
        .filter(|table| seen.insert(table.path.clone()))
        .collect()
}

/// Narrow `tables` to the expected id, recording an error on `owner` if none
/// matched.
fn filter_expected(
    result: &mut ExecutionResult,
    op: &str,
    owner: &str,
    expected: Option<&str>,
    tables: Vec<DropTable>,
) -> Vec<DropTable> {
    let Some(expected) = expected else {
        return tables;
    };
    let matching: Vec<DropTable> = tables
        .into_iter()
        .filter(|table| table.name.eq_ignore_ascii_case(expected))
        .collect();
    if matching.is_empty() {
        result.error(
            op,
            format!("{owner} does not reference expected dropTableId '{expected}'."),
        );
    }
    matching
}

pub fn validate_enemy_drops(world: &dyn World, result: &mut ExecutionResult, cmd: &Command) {
    let op = Op::ValidateEnemyDrops.as_str();
    let enemy_id = non_blank(cmd.enemy_id.as_deref());
    let expected_table = non_blank(cmd.drop_table_id.as_deref());

    let mut enemies = discover::<EnemyDefinition>(world, result, op).items;
    if let Some(id) = enemy_id {
        enemies.retain(|enemy| enemy.name.eq_ignore_ascii_case(id));
    }
    if enemies.is_empty() {
        match enemy_id {
            Some(id) => result.warn(op, format!("No enemy assets found matching enemyId '{id}'.")),
            None => result.warn(op, "No enemy assets found."),
        }
        return;
    }

    let tables = discover::<DropTable>(world, result, op);
    let index = TableIndex::new(&tables.items);

    for enemy in &enemies {
        let label = format!("Enemy '{}'", enemy.name);
        result.log(op, format!("{label} | {} | {}", enemy.type_name, enemy.path));

        let (links, _) = extract_links(&enemy.fields, DROP_TABLE_TOKENS, "field:");
        if links.is_empty() {
            result.warn(
                op,
                format!("{label} has no dropTable/dropTables/loot fields or properties found."),
            );
            continue;
        }

        let mut resolved = Vec::new();
        for FoundLink { link, source } in links {
            match link {
                LinkRef::Direct(path) => match direct_table(world, &path) {
                    Some(table) => {
                        result.log(
                            op,
                            format!("{label} ref {source} -> DropTable asset '{}'", table.name),
                        );
                        resolved.push(table);
                    }
                    None => result.error(
                        op,
                        format!("{label} ref {source} -> asset '{path}' is not a DropTable"),
                    ),
                },
                LinkRef::Named(id) => match index.named(&id) {
                    Some(table) => {
                        result.log(
                            op,
                            format!(
                                "{label} ref {source} -> DropTableId '{id}' resolved to '{}'",
                                table.name
                            ),
                        );
                        resolved.push(table);
                    }
                    None => result.error(
                        op,
                        format!("{label} ref {source} -> DropTableId '{id}' could not be resolved to an asset"),
                    ),
                },
            }
        }

        let unique = dedup_tables(resolved);
        if unique.is_empty() {
            result.warn(
                op,
                format!("{label} had drop table references but none could be resolved to assets."),
            );
            continue;
        }
        for table in filter_expected(result, op, &label, expected_table, unique) {
            validate_table(world, result, op, &table, cmd.expected_items(), cmd.min_drop_chance());
        }
    }
}

/// Prefabs to inspect: heuristic candidates, or the one explicitly named.
fn prefabs_to_validate(
    world: &dyn World,
    result: &mut ExecutionResult,
    op: &str,
    prefab_id: Option<&str>,
) -> Vec<Prefab> {
    let candidates: Vec<Prefab> = enemy_prefab_candidates(world)
        .into_iter()
        .map(|candidate| candidate.prefab)
        .collect();
    let Some(id) = prefab_id else {
        return candidates;
    };
    let matching: Vec<Prefab> = candidates
        .into_iter()
        .filter(|prefab| prefab.name.eq_ignore_ascii_case(id))
        .collect();
    if !matching.is_empty() {
        return matching;
    }
    match prefabs(world)
        .into_iter()
        .find(|prefab| prefab.name.eq_ignore_ascii_case(id))
    {
        Some(prefab) => {
            result.warn(
                op,
                format!("prefabId '{id}' did not match enemy heuristics, but will be validated because it was explicitly requested."),
            );
            vec![prefab]
        }
        None => Vec::new(),
    }
}

pub fn validate_enemy_prefab_drops(world: &dyn World, result: &mut ExecutionResult, cmd: &Command) {
    let op = Op::ValidateEnemyPrefabDrops.as_str();
    let prefab_id = non_blank(cmd.prefab_id.as_deref());
    let expected_table = non_blank(cmd.drop_table_id.as_deref());

    let to_validate = prefabs_to_validate(world, result, op, prefab_id);
    if to_validate.is_empty() {
        match prefab_id {
            Some(id) => result.warn(op, format!("No prefabs found matching prefabId '{id}'.")),
            None => result.warn(op, "No enemy prefab candidates found."),
        }
        return;
    }

    let tables = discover::<DropTable>(world, result, op);
    let index = TableIndex::new(&tables.items);
    result.log(
        op,
        format!("Matched member name tokens: {}", DROP_TABLE_TOKENS.join(", ")),
    );

    let check_tables = !cmd.expected_items().is_empty() || cmd.min_drop_chance().is_some();
    for prefab in &to_validate {
        let label = format!("Prefab '{}'", prefab.name);
        result.log(op, format!("{label} | {}", prefab.path));

        let components = prefab.root.all_components();
        if components.is_empty() {
            result.warn(op, format!("{label} has no components to inspect."));
            continue;
        }

        let mut matched_members = BTreeSet::new();
        let mut resolved = Vec::new();
        let mut broken_assets = BTreeSet::new();
        let mut unresolved_ids = BTreeSet::new();
        for component in components {
            let prefix = format!("{}.field:", component.type_name);
            let (links, matched) = extract_links(&component.fields, DROP_TABLE_TOKENS, &prefix);
            matched_members.extend(matched);
            for found in links {
                match found.link {
                    LinkRef::Direct(path) => match direct_table(world, &path) {
                        Some(table) => resolved.push(table),
                        None => {
                            broken_assets.insert(path);
                        }
                    },
                    LinkRef::Named(id) => match index.named(&id) {
                        Some(table) => resolved.push(table),
                        None => {
                            unresolved_ids.insert(id);
                        }
                    },
                }
            }
        }

        if matched_members.is_empty() {
            result.log(op, format!("{label} matched members: (none)"));
        } else {
            let members: Vec<String> = matched_members.into_iter().collect();
            result.log(op, format!("{label} matched members: [{}]", members.join(", ")));
        }

        let unique = dedup_tables(resolved);
        if unique.is_empty() && broken_assets.is_empty() && unresolved_ids.is_empty() {
            result.warn(op, format!("{label} | No DropTable reference found on prefab."));
            continue;
        }
        for path in &broken_assets {
            result.error(op, format!("{label} | asset '{path}' is not a DropTable."));
        }
        for id in &unresolved_ids {
            result.error(
                op,
                format!("{label} | DropTableId '{id}' could not be resolved to an asset."),
            );
        }

        let unique = filter_expected(result, op, &label, expected_table, unique);
        for table in &unique {
            if check_tables {
                validate_table(world, result, op, table, cmd.expected_items(), cmd.min_drop_chance());
            } else {
                result.log(op, format!("{label} references DropTable '{}'", table.name));
            }
        }
    }
}
