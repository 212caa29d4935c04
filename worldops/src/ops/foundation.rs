//! Zone foundation layout: structural groups under the zone root, the ground
//! node, and re-parenting of loose top-level ground/path pieces.

use crate::core::ops::Op;
use crate::core::types::{ExecutionMode, ExecutionResult};
use crate::ops::scene::{ENV_ROOT, SCENE_ROOTS, ZONE_ROOT};
use crate::ops::{ApplyFault, Change, EnsureReport, Target};
use crate::world::{World, contains_any_ignore_case, contains_ignore_case};

pub const PATHS_ROOT: &str = "Zone1_Paths";
/// Groups that must exist directly under the zone root.
pub const ZONE_GROUPS: [&str; 4] = [ENV_ROOT, PATHS_ROOT, "Zone1_Encounters", "Zone1_Gates"];
pub const GROUND: &str = "Ground";

/// Where a loose top-level node belongs, if anywhere.
pub fn loose_node_home(name: &str) -> Option<&'static str> {
    if SCENE_ROOTS.contains(&name) || ZONE_GROUPS.contains(&name) {
        return None;
    }
    if contains_ignore_case(name, "ground") {
        Some(ENV_ROOT)
    } else if contains_any_ignore_case(name, &["slab", "path"]) {
        Some(PATHS_ROOT)
    } else {
        None
    }
}

/// Plan the foundation against the current world. Nodes that already exist
/// are targeted by id; only nodes the plan creates are looked up by path.
///
/// A loose top-level `Ground` is adopted as the zone ground instead of
/// creating a second one.
pub fn plan_foundation(world: &dyn World, ground_size: Option<[f64; 3]>) -> Vec<Change> {
    let mut plan = Vec::new();
    let zone = world.find_child(None, ZONE_ROOT);
    if zone.is_none() {
        plan.push(Change::CreateNode {
            parent: None,
            name: ZONE_ROOT.to_string(),
        });
    }

    for group in ZONE_GROUPS {
        if zone.and_then(|zone| world.find_child(Some(zone), group)).is_none() {
            plan.push(Change::CreateNode {
                parent: Some(Target::at_path(world, ZONE_ROOT)),
                name: group.to_string(),
            });
        }
    }

    let env_path = format!("{ZONE_ROOT}/{ENV_ROOT}");
    let ground = match world.find_path(&format!("{env_path}/{GROUND}")) {
        Some(node) => Some(node),
        None => {
            let loose = world.find_child(None, GROUND);
            if loose.is_none() {
                plan.push(Change::CreateNode {
                    parent: Some(Target::at_path(world, &env_path)),
                    name: GROUND.to_string(),
                });
            }
            loose
        }
    };
    if let Some(size) = ground_size {
        let current = ground.map(|node| world.local_scale(node));
        if current != Some(size) {
            let node = match ground {
                Some(node) => Target::existing(world, node),
                None => Target::Planned(format!("{env_path}/{GROUND}")),
            };
            plan.push(Change::SetScale { node, scale: size });
        }
    }

    for node in world.roots() {
        if let Some(home) = loose_node_home(world.name(node)) {
            plan.push(Change::Reparent {
                node: Target::existing(world, node),
                parent: Target::at_path(world, &format!("{ZONE_ROOT}/{home}")),
            });
        }
    }
    plan
}

pub fn ensure_foundation(
    world: &mut dyn World,
    mode: ExecutionMode,
    ground_size: Option<[f64; 3]>,
) -> Result<EnsureReport, ApplyFault> {
    let plan = plan_foundation(world, ground_size);
    EnsureReport::execute(world, mode, &plan)
}

pub fn validate_foundation(world: &dyn World, result: &mut ExecutionResult) {
    let op = Op::ValidateFoundation.as_str();
    let Some(zone) = world.find_child(None, ZONE_ROOT) else {
        result.error(op, format!("missing zone root '{ZONE_ROOT}'."));
        result.log(op, "pass=false");
        return;
    };

    let mut pass = true;
    for group in ZONE_GROUPS {
        if world.find_child(Some(zone), group).is_none() {
            pass = false;
            result.error(op, format!("missing '{ZONE_ROOT}/{group}'."));
        }
    }

    let ground_path = format!("{ZONE_ROOT}/{ENV_ROOT}/{GROUND}");
    match world.find_path(&ground_path) {
        Some(ground) => {
            let scale = world.local_scale(ground);
            result.log(
                op,
                format!("found '{ground_path}' scale=[{}, {}, {}]", scale[0], scale[1], scale[2]),
            );
        }
        None => {
            pass = false;
            result.error(op, format!("missing '{ground_path}'."));
        }
    }

    for node in world.roots() {
        let name = world.name(node);
        if let Some(home) = loose_node_home(name) {
            result.warn(
                op,
                format!("loose top-level node '{name}' belongs under '{ZONE_ROOT}/{home}'."),
            );
        }
    }
    result.log(op, format!("pass={pass}"));
}
