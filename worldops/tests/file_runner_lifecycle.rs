//! Lifecycle tests for `run_latest_incoming`: pick, execute, report, route.
//!
//! Each test builds a project with `init_layout`, drops command files into
//! the incoming folder, and inspects the routed file, the command report and
//! the QA session artifact.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use worldops::core::types::ExecutionMode;
use worldops::file_runner::{CompletedRun, RunOutcome, run_latest_incoming};
use worldops::io::config::{ProjectPaths, WorldopsConfig};
use worldops::io::init::{InitOptions, init_layout};
use worldops::io::session::SessionRecorder;
use worldops::io::world_store::{load_world, write_world};
use worldops::test_support::zone_world;
use worldops::world::World;

struct Project {
    _temp: tempfile::TempDir,
    paths: ProjectPaths,
    cfg: WorldopsConfig,
    recorder: SessionRecorder,
}

impl Project {
    fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_layout(temp.path(), &InitOptions { force: false }).expect("init");
        write_world(&paths.world_path, &zone_world()).expect("world");
        Self {
            _temp: temp,
            paths,
            cfg: WorldopsConfig::default(),
            recorder: SessionRecorder::new(),
        }
    }

    fn drop_file(&self, name: &str, contents: &str, age_secs: u64) {
        let path = self.paths.incoming.join(name);
        fs::write(&path, contents).expect("write command file");
        let modified = SystemTime::now() - Duration::from_secs(age_secs);
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(modified))
            .expect("set mtime");
    }

    /// Run once with the recorder installed as the thread's subscriber.
    fn run(&self, mode: Option<ExecutionMode>) -> RunOutcome {
        let subscriber = tracing_subscriber::registry().with(self.recorder.clone());
        tracing::subscriber::with_default(subscriber, || {
            run_latest_incoming(&self.paths, &self.cfg, mode, &self.recorder).expect("run")
        })
    }

    fn run_completed(&self, mode: Option<ExecutionMode>) -> CompletedRun {
        match self.run(mode) {
            RunOutcome::Completed(run) => run,
            RunOutcome::Idle => panic!("expected a pending command file"),
        }
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read artifact")).expect("json")
}

const ENSURE_ENVELOPE: &str = r#"{
    "schemaVersion": "1.0",
    "requestId": "zone1-setup",
    "mode": "Apply",
    "scene": {"sceneName": "Zone1"},
    "commands": {"commands": [
        {"op": "runRecipe", "recipeName": "zone1_foundation_ensure"},
        {"op": "ensurePlayerInputStack", "ensureCameraPan": true}
    ]}
}"#;

const GATE_MISMATCH: &str = r#"{"commands": [
    {"op": "validateGate", "gateId": "Gate_Zone1_Boss", "expectedKeyItem": "Item_GoblinEar", "requiredAmount": 1}
]}"#;

#[test]
fn apply_envelope_is_processed_and_saves_the_world() {
    let project = Project::new();
    project.drop_file("setup.json", ENSURE_ENVELOPE, 0);

    let run = project.run_completed(None);
    assert!(run.succeeded(), "{:?}", run.report.result);
    assert_eq!(run.routed_to, project.paths.processed.join("setup.json"));
    assert!(!run.source.exists());
    assert!(!project.recorder.is_active());

    let report = read_json(&run.report_path);
    assert_eq!(report["requestId"], "zone1-setup");
    assert_eq!(report["mode"], "Apply");
    assert_eq!(report["result"]["success"], true);
    assert_eq!(report["result"]["opsExecuted"], 2);
    let report_name = run.report_path.file_name().expect("name").to_string_lossy().into_owned();
    assert!(report_name.ends_with("_zone1-setup.json"), "{report_name}");

    let qa = read_json(run.qa_path.as_deref().expect("qa artifact"));
    assert_eq!(qa["name"], "CommandRun");
    assert_eq!(qa["correlationId"], "zone1-setup");
    assert!(qa["endedUtc"].is_string());
    let logs = qa["logs"].as_array().expect("logs");
    assert!(logs.iter().any(|entry| {
        entry["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("ensureFoundation: pass=true"))
    }));

    let world = load_world(&project.paths.world_path).expect("saved world");
    assert!(world.find_path("ZONE_1/Zone1_Env/Ground").is_some());
    let hero = world.find_path("_RUNTIME/Hero").expect("hero");
    assert!(world.has_own_component(hero, "PlayerInputGameplayBinder"));
    let camera = world.find_by_tag("MainCamera").expect("camera");
    assert!(world.has_own_component(camera, "CameraPanController"));
}

#[test]
fn mode_flag_forces_dry_run() {
    let project = Project::new();
    let before = load_world(&project.paths.world_path).expect("world").to_snapshot();
    project.drop_file("setup.json", ENSURE_ENVELOPE, 0);

    let run = project.run_completed(Some(ExecutionMode::DryRun));
    assert!(run.succeeded());
    assert_eq!(run.report.mode, ExecutionMode::DryRun);
    let after = load_world(&project.paths.world_path).expect("world").to_snapshot();
    assert_eq!(after, before);
}

#[test]
fn failing_batch_routes_to_failed_with_session_errors() {
    let project = Project::new();
    project.drop_file("gate_check.json", GATE_MISMATCH, 0);

    let run = project.run_completed(None);
    assert!(!run.succeeded());
    assert_eq!(run.routed_to, project.paths.failed.join("gate_check.json"));
    assert_eq!(run.report.request_id, "gate_check");
    assert_eq!(run.report.mode, ExecutionMode::DryRun);

    let qa = read_json(run.qa_path.as_deref().expect("qa artifact"));
    assert_eq!(qa["correlationId"], "gate_check");
    let errors: Vec<&Value> = qa["logs"]
        .as_array()
        .expect("logs")
        .iter()
        .filter(|entry| entry["logType"] == "Error")
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["message"]
        .as_str()
        .is_some_and(|m| m.contains("does not match expected 'Item_GoblinEar'")));
}

#[test]
fn newest_file_runs_first_then_idle() {
    let project = Project::new();
    project.drop_file("older.json", r#"{"commands":[{"op":"ping"}]}"#, 120);
    project.drop_file("newer.json", r#"{"commands":[{"op":"listGates"}]}"#, 10);
    fs::write(project.paths.incoming.join("notes.txt"), "ignored").expect("notes");

    let first = project.run_completed(None);
    assert_eq!(first.routed_to.file_name().expect("name"), "newer.json");
    let second = project.run_completed(None);
    assert_eq!(second.routed_to.file_name().expect("name"), "older.json");
    assert_eq!(project.run(None), RunOutcome::Idle);
    assert!(project.paths.incoming.join("notes.txt").exists());
}

#[test]
fn lint_findings_become_compiler_messages() {
    let project = Project::new();
    project.drop_file(
        "typo.json",
        r#"{"commands":[{"op":"ping","dropTabelId":"DT_Goblin"}]}"#,
        0,
    );

    let run = project.run_completed(None);
    assert!(run.succeeded());
    let qa = read_json(run.qa_path.as_deref().expect("qa artifact"));
    let messages = qa["compilerMessages"].as_array().expect("compiler messages");
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|m| m["messageType"] == "Warning"));
}

#[test]
fn name_collisions_in_processed_get_a_suffix() {
    let project = Project::new();
    fs::write(project.paths.processed.join("ping.json"), "earlier").expect("existing");
    project.drop_file("ping.json", r#"{"commands":[{"op":"ping"}]}"#, 0);

    let run = project.run_completed(None);
    assert!(run.succeeded());
    assert_ne!(run.routed_to, project.paths.processed.join("ping.json"));
    assert!(run.routed_to.starts_with(&project.paths.processed));
    let name = run.routed_to.file_name().expect("name").to_string_lossy().into_owned();
    assert!(name.starts_with("ping_") && name.ends_with(".json"), "{name}");
    assert_eq!(
        fs::read_to_string(project.paths.processed.join("ping.json")).expect("read"),
        "earlier"
    );
}
