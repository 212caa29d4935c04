//! Player input component stack.

use anyhow::Result;

use crate::core::ops::Op;
use crate::core::types::{Command, non_blank};
use crate::ops::{Change, EnsureReport, OpContext, Target};
use crate::world::World;

pub const DEFAULT_PLAYER_TAG: &str = "Player";
pub const CAMERA_TAG: &str = "MainCamera";
/// Components the player needs, in the order they are added.
pub const PLAYER_STACK: [&str; 3] = ["PlayerInput", "PlayerInputAuthority", "PlayerInputGameplayBinder"];
pub const CAMERA_PAN: &str = "CameraPanController";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerPlan {
    pub changes: Vec<Change>,
    pub warnings: Vec<String>,
}

/// Plan the stack for the node tagged `tag`. `None` when no such node exists.
pub fn plan_player_input_stack(world: &dyn World, tag: &str, camera_pan: bool) -> Option<PlayerPlan> {
    let player = world.find_by_tag(tag)?;
    let player_path = world.node_path(player);
    let mut plan = PlayerPlan::default();

    let inputs = world
        .components(player)
        .iter()
        .filter(|c| c.type_name == PLAYER_STACK[0])
        .count();
    if inputs > 1 {
        plan.warnings.push(format!(
            "'{player_path}' has {inputs} PlayerInput components; the first one is used."
        ));
    }

    for component in PLAYER_STACK {
        if !world.has_own_component(player, component) {
            plan.changes.push(Change::AddComponent {
                node: Target::existing(world, player),
                component: component.to_string(),
            });
        }
    }

    if camera_pan {
        match world.find_by_tag(CAMERA_TAG) {
            Some(camera) if !world.has_own_component(camera, CAMERA_PAN) => {
                plan.changes.push(Change::AddComponent {
                    node: Target::existing(world, camera),
                    component: CAMERA_PAN.to_string(),
                });
            }
            Some(_) => {}
            None => plan.warnings.push(format!(
                "no node tagged '{CAMERA_TAG}'; {CAMERA_PAN} not ensured."
            )),
        }
    }
    Some(plan)
}

pub fn ensure_player_input_stack(ctx: &mut OpContext<'_>, cmd: &Command) -> Result<()> {
    let op = Op::EnsurePlayerInputStack;
    let tag = non_blank(cmd.player_tag.as_deref()).unwrap_or(DEFAULT_PLAYER_TAG);
    let Some(plan) = plan_player_input_stack(ctx.world, tag, cmd.ensure_camera_pan()) else {
        ctx.result
            .error(op.as_str(), format!("no node tagged '{tag}' found."));
        return Ok(());
    };
    for warning in &plan.warnings {
        ctx.result.warn(op.as_str(), warning);
    }
    let outcome = EnsureReport::execute(ctx.world, ctx.mode, &plan.changes);
    EnsureReport::record_outcome(outcome, ctx.result, op, ctx.mode)
}
