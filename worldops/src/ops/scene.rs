//! Scene-root layout and scaled-parent checks.

use crate::core::ops::Op;
use crate::core::types::{ExecutionMode, ExecutionResult};
use crate::ops::{ApplyFault, Change, EnsureReport};
use crate::world::{NodeId, UNIT_SCALE, World, contains_any_ignore_case};

/// Top-level nodes every scene must have, in creation order.
pub const SCENE_ROOTS: [&str; 4] = ["_SYSTEMS", "_AI_WORKSPACE", "_RUNTIME", "ZONE_1"];
pub const ZONE_ROOT: &str = "ZONE_1";
pub const ENV_ROOT: &str = "Zone1_Env";

const ACTOR_TOKENS: &[&str] = &["Enemy", "Player", "Combat", "Health", "Boss"];
const GAMEPLAY_TOKENS: &[&str] = &["Encounter", "Spawner", "Spawn", "Gate", "Trigger"];

pub fn ensure_scene_roots(
    world: &mut dyn World,
    mode: ExecutionMode,
) -> Result<EnsureReport, ApplyFault> {
    let plan: Vec<Change> = SCENE_ROOTS
        .iter()
        .filter(|root| world.find_child(None, root).is_none())
        .map(|root| Change::CreateNode {
            parent: None,
            name: (*root).to_string(),
        })
        .collect();
    EnsureReport::execute(world, mode, &plan)
}

pub fn validate_scene_roots(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ValidateSceneRoots.as_str();
    let mut pass = true;
    for root in SCENE_ROOTS {
        if world.find_child(None, root).is_some() {
            result.log(op, format!("found scene root '{root}'."));
        } else if let Some(node) = world.find_node(root) {
            pass = false;
            result.error(
                op,
                format!(
                    "'{root}' exists at '{}' but is not a scene root.",
                    world.node_path(node)
                ),
            );
        } else {
            pass = false;
            result.error(op, format!("missing scene root '{root}'."));
        }
    }
    result.log(op, format!("pass={pass}"));
}

/// Severity assigned to one scaled parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleFinding {
    Actor(Vec<String>),
    Gameplay,
    Environment,
    Structural,
    Ignored,
}

/// Classify a scaled node that has children. First matching rule wins.
pub fn classify_scaled_parent(world: &dyn World, node: NodeId) -> ScaleFinding {
    let subtree = world.subtree(node);
    let actor_types: Vec<String> = subtree
        .iter()
        .flat_map(|n| world.components(*n))
        .filter(|c| contains_any_ignore_case(&c.type_name, ACTOR_TOKENS))
        .map(|c| c.type_name.clone())
        .collect();
    if !actor_types.is_empty() {
        return ScaleFinding::Actor(actor_types);
    }

    let gameplay = subtree.iter().any(|n| {
        contains_any_ignore_case(world.name(*n), GAMEPLAY_TOKENS)
            || world
                .components(*n)
                .iter()
                .any(|c| contains_any_ignore_case(&c.type_name, GAMEPLAY_TOKENS))
    });
    if gameplay {
        return ScaleFinding::Gameplay;
    }

    let zone = world.find_child(None, ZONE_ROOT);
    let env = zone.and_then(|zone| world.find_child(Some(zone), ENV_ROOT));
    if env.is_some_and(|env| world.is_within(node, env)) {
        return ScaleFinding::Environment;
    }
    if zone.is_some_and(|zone| world.is_within(node, zone)) {
        return ScaleFinding::Structural;
    }
    ScaleFinding::Ignored
}

pub fn validate_no_scaled_parents(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ValidateNoScaledParents.as_str();
    let mut checked = 0usize;
    let mut pass = true;
    for node in world.all_nodes() {
        let scale = world.local_scale(node);
        if scale == UNIT_SCALE || world.children(node).is_empty() {
            continue;
        }
        checked += 1;
        let path = world.node_path(node);
        let scale = format!("[{}, {}, {}]", scale[0], scale[1], scale[2]);
        match classify_scaled_parent(world, node) {
            ScaleFinding::Actor(types) => {
                pass = false;
                result.error(
                    op,
                    format!(
                        "{path} has scale {scale} and parents actor/combat components ({}).",
                        types.join(", ")
                    ),
                );
            }
            ScaleFinding::Gameplay => {
                pass = false;
                result.error(
                    op,
                    format!("{path} has scale {scale} and parents encounter/spawner/gate/trigger content."),
                );
            }
            ScaleFinding::Environment => result.warn(
                op,
                format!("{path} has scale {scale} inside the environment subtree (cosmetic)."),
            ),
            ScaleFinding::Structural => {
                pass = false;
                result.error(
                    op,
                    format!("{path} has scale {scale} inside structural zone root '{ZONE_ROOT}'."),
                );
            }
            ScaleFinding::Ignored => {
                tracing::debug!(path = %path, "scaled parent outside zone ignored");
            }
        }
    }
    result.log(op, format!("checked {checked} scaled parent(s); pass={pass}"));
}
