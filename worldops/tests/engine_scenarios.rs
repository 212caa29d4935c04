//! End-to-end batch scenarios driven through the public engine API.
//!
//! Each test parses or builds a batch, runs it against a fixture world, and
//! checks the result channels and the world afterwards.

use worldops::core::parser::{Parsed, parse};
use worldops::core::types::{Command, CommandList, Envelope, ExecutionMode, SafetyScope};
use worldops::engine::{execute_commands, execute_envelope, execute_parsed};
use worldops::ops::foundation::ensure_foundation;
use worldops::ops::scene::ensure_scene_roots;
use worldops::test_support::{ReadOnlyWorld, content_world, zone_world};
use worldops::world::World;
use worldops::world::memory::MemoryWorld;

fn envelope_with(scope: SafetyScope, commands: Vec<Command>) -> Envelope {
    Envelope {
        scope,
        commands: CommandList::new(commands),
        ..Envelope::default()
    }
}

fn capped(max_operations: i64) -> SafetyScope {
    SafetyScope {
        max_operations,
        ..SafetyScope::envelope_default()
    }
}

#[test]
fn ping_logs_ok() {
    let mut world = content_world();
    let parsed = parse(r#"{"commands":[{"op":"ping"}]}"#).expect("parse");
    let result = execute_parsed(&parsed, None, &mut world);

    assert!(result.success());
    assert_eq!(result.mode(), ExecutionMode::DryRun);
    assert_eq!(result.ops_planned(), 1);
    assert_eq!(result.ops_executed(), 1);
    assert_eq!(result.logs(), ["ping: ok"]);
}

#[test]
fn unknown_op_is_a_counted_warning() {
    let mut world = content_world();
    let commands = [Command::op("teleportEverything"), Command::op("ping")];
    let result = execute_commands(&commands, ExecutionMode::DryRun, &mut world);

    assert!(result.success());
    assert_eq!(result.ops_executed(), 2);
    assert_eq!(
        result.warnings(),
        ["ExecuteCommands: Unknown op: teleportEverything. Skipped."]
    );
}

#[test]
fn empty_drop_table_warns_but_succeeds() {
    let mut world = content_world();
    let parsed = parse(
        r#"{"requestId":"dt","commands":{"commands":[
            {"op":"validateDropTable","dropTableId":"DT_Empty"}
        ]}}"#,
    )
    .expect("parse");
    let result = execute_parsed(&parsed, None, &mut world);

    assert!(result.success());
    assert_eq!(
        result.warnings(),
        ["validateDropTable: DT_Empty | All tiers have totalChance == 0 (table effectively empty)"]
    );
}

#[test]
fn gate_key_mismatch_fails_the_batch() {
    let mut world = content_world();
    let parsed = parse(
        r#"{"commands":[
            {"op":"validateGate","gateId":"Gate_Zone1_Boss","expectedKeyItem":"Item_GoblinEar","requiredAmount":1},
            {"op":"ping"}
        ]}"#,
    )
    .expect("parse");
    let result = execute_parsed(&parsed, None, &mut world);

    assert!(!result.success());
    assert_eq!(result.ops_executed(), 2);
    assert_eq!(
        result.errors(),
        ["validateGate: GateDefinition 'Gate_Zone1_Boss' requires 'sigil_abyssal', which does not match expected 'Item_GoblinEar'."]
    );
    assert_eq!(result.logs().last().map(String::as_str), Some("ping: ok"));
}

#[test]
fn default_envelope_scope_blocks_locked_zone() {
    let mut world = zone_world();
    let before = world.to_snapshot();
    let envelope = Envelope {
        mode: ExecutionMode::Apply,
        ..envelope_with(
            SafetyScope::envelope_default(),
            vec![
                Command {
                    parent_path: Some("ZONE_1_LOCKED/Vault".to_string()),
                    ..Command::op("ensureSceneRoots")
                },
                Command::op("ping"),
            ],
        )
    };
    let result = execute_envelope(&envelope, None, &mut world);

    assert!(!result.success());
    assert_eq!(result.ops_planned(), 2);
    assert_eq!(result.ops_executed(), 1);
    assert_eq!(
        result.errors(),
        ["ExecuteCommands: Command[0] references denied root 'ZONE_1_LOCKED' in field value 'ZONE_1_LOCKED/Vault'. Blocked."]
    );
    assert_eq!(world.to_snapshot(), before);
}

#[test]
fn more_denied_roots_never_execute_more() {
    let commands = vec![
        Command {
            gate_id: Some("Gate_Zone1_Boss".to_string()),
            expected_key_item: Some("Item_AbyssalSigil".to_string()),
            required_amount: Some(1),
            ..Command::op("validateGate")
        },
        Command {
            drop_table_id: Some("DT_Goblin".to_string()),
            ..Command::op("validateDropTable")
        },
        Command::op("listGates"),
    ];
    let denials: [&[&str]; 4] = [&[], &["DT_"], &["DT_", "Gate"], &["DT_", "Gate", "Zone"]];

    let mut previous: Option<(usize, usize)> = None;
    for denied in denials {
        let scope = SafetyScope {
            denied_roots: denied.iter().map(|root| root.to_string()).collect(),
            ..SafetyScope::default()
        };
        let mut world = content_world();
        let result = execute_envelope(&envelope_with(scope, commands.clone()), None, &mut world);
        let current = (result.ops_executed(), result.errors().len());
        if let Some((executed, errors)) = previous {
            assert!(current.0 <= executed, "{denied:?} executed more");
            assert!(current.1 >= errors, "{denied:?} reported fewer errors");
        }
        previous = Some(current);
    }
    assert_eq!(previous, Some((1, 2)));
}

#[test]
fn batch_cap_allows_exactly_max_operations() {
    let mut world = content_world();
    let at_cap = envelope_with(capped(2), vec![Command::op("ping"), Command::op("ping")]);
    let result = execute_envelope(&at_cap, None, &mut world);
    assert!(result.success());
    assert_eq!(result.ops_executed(), 2);

    let over_cap = envelope_with(
        capped(2),
        vec![Command::op("ping"), Command::op("ping"), Command::op("ping")],
    );
    let result = execute_envelope(&over_cap, None, &mut world);
    assert!(!result.success());
    assert_eq!(result.ops_planned(), 3);
    assert_eq!(result.ops_executed(), 0);
    assert_eq!(
        result.errors(),
        ["ExecuteCommands: batch of 3 command(s) exceeds maxOperations 2. Nothing executed."]
    );
    assert!(result.logs().is_empty());
}

#[test]
fn dry_run_plans_what_apply_applies() {
    let mut dry = zone_world();
    let before = dry.to_snapshot();
    let mut applied = zone_world();

    let dry_roots = ensure_scene_roots(&mut dry, ExecutionMode::DryRun).expect("dry roots");
    let dry_foundation =
        ensure_foundation(&mut dry, ExecutionMode::DryRun, Some([20.0, 1.0, 20.0])).expect("dry");
    assert_eq!(dry.to_snapshot(), before);
    assert!(dry_roots.applied.is_empty() && dry_foundation.applied.is_empty());
    assert!(!dry_foundation.pass);

    let apply_roots = ensure_scene_roots(&mut applied, ExecutionMode::Apply).expect("apply roots");
    assert_eq!(dry_roots.planned, apply_roots.applied);
    let apply_foundation =
        ensure_foundation(&mut applied, ExecutionMode::Apply, Some([20.0, 1.0, 20.0]))
            .expect("apply");
    assert!(apply_foundation.pass);
    assert!(applied.find_path("ZONE_1/Zone1_Env/Ground_Large").is_some());
    assert!(applied.find_path("ZONE_1/Zone1_Paths/Stone_Path_01").is_some());
    let ground = applied.find_path("ZONE_1/Zone1_Env/Ground").expect("ground");
    assert_eq!(applied.local_scale(ground), [20.0, 1.0, 20.0]);
}

#[test]
fn ensure_recipe_is_idempotent() {
    let mut world = zone_world();
    let recipe = Command {
        recipe_name: Some("zone1_foundation_ensure".to_string()),
        ..Command::op("runRecipe")
    };

    let first = execute_commands(std::slice::from_ref(&recipe), ExecutionMode::Apply, &mut world);
    assert!(first.success(), "{:?}", first.errors());
    let after_first = world.to_snapshot();

    let second = execute_commands(std::slice::from_ref(&recipe), ExecutionMode::Apply, &mut world);
    assert!(second.success(), "{:?}", second.errors());
    assert_eq!(world.to_snapshot(), after_first);
    assert!(second.logs().iter().all(|line| !line.contains("applied:")));
    assert!(second
        .logs()
        .contains(&"ensureFoundation: pass=true planned=0 applied=0".to_string()));
}

#[test]
fn non_empty_envelope_wins_over_list_shape() {
    let raw = r#"{"mode":"Apply","commands":{"commands":[{"op":"ping"}]}}"#;
    let parsed = parse(raw).expect("parse");
    assert!(matches!(parsed, Parsed::Envelope(ref envelope) if envelope.mode == ExecutionMode::Apply));

    let mut world = content_world();
    let result = execute_parsed(&parsed, None, &mut world);
    assert_eq!(result.mode(), ExecutionMode::Apply);
    let forced = execute_parsed(&parsed, Some(ExecutionMode::DryRun), &mut world);
    assert_eq!(forced.mode(), ExecutionMode::DryRun);
}

#[test]
fn success_never_recovers_after_an_error() {
    let mut world = content_world();
    let commands = [
        Command::op("validateDropTable"),
        Command::op("ping"),
        Command::op("listDropTables"),
    ];
    let result = execute_commands(&commands, ExecutionMode::DryRun, &mut world);

    assert!(!result.success());
    assert_eq!(result.ops_executed(), 3);
    assert_eq!(result.errors(), ["validateDropTable: Missing required field dropTableId."]);
    assert!(result.logs().contains(&"ping: ok".to_string()));
}

#[test]
fn content_audit_recipe_runs_every_step() {
    let mut world = content_world();
    let recipe = Command {
        recipe_name: Some("content_audit".to_string()),
        ..Command::op("runRecipe")
    };
    let result = execute_commands(&[recipe], ExecutionMode::DryRun, &mut world);

    assert_eq!(result.ops_executed(), 1);
    for step in [
        "listDropTables",
        "validateAllDropTables",
        "validateOrphanItemDefinitions",
        "validateEnemyDrops",
    ] {
        assert!(
            result.logs().iter().any(|line| line.ends_with(&format!(": {step}"))),
            "missing step {step}"
        );
    }
    assert_eq!(
        result.errors(),
        ["validateEnemyDrops: Enemy 'Orc' ref field:lootTables -> DropTableId 'DT_Missing' could not be resolved to an asset"]
    );
}

#[test]
fn slash_in_a_node_name_still_applies() {
    let mut world = MemoryWorld::new("Zone1");
    let odd = world.create_node(None, "Ground/Old").expect("odd root");
    let commands = [
        Command {
            recipe_name: Some("zone1_foundation_ensure".to_string()),
            ..Command::op("runRecipe")
        },
        Command::op("ping"),
    ];
    let result = execute_commands(&commands, ExecutionMode::Apply, &mut world);

    assert!(result.success(), "{:?}", result.errors());
    assert!(result
        .logs()
        .contains(&"ensureFoundation: applied: move Ground/Old -> ZONE_1/Zone1_Env/".to_string()));
    assert!(result.logs().contains(&"validateFoundation: pass=true".to_string()));
    let env = world.find_path("ZONE_1/Zone1_Env").expect("env");
    assert_eq!(world.parent(odd), Some(env));
}

#[test]
fn refused_writes_leave_partial_progress_visible() {
    let mut world = ReadOnlyWorld(zone_world());
    let commands = [Command::op("ensurePlayerInputStack"), Command::op("ping")];
    let result = execute_commands(&commands, ExecutionMode::Apply, &mut world);

    assert!(!result.success());
    assert_eq!(result.ops_executed(), 2);
    assert!(result.errors()[0].starts_with(
        "ensurePlayerInputStack: unexpected fault: apply 'add PlayerInputAuthority to _RUNTIME/Hero'"
    ));
    assert!(result
        .logs()
        .contains(&"ensurePlayerInputStack: pass=false planned=3 applied=0".to_string()));
    assert_eq!(result.logs().last().map(String::as_str), Some("ping: ok"));
}
