//! Op handlers and the dispatch table.
//!
//! A handler reads the command payload, talks to the world through
//! [`World`], and appends to the shared [`ExecutionResult`]. Handlers return
//! `Err` only for faults the world itself raised; business-rule failures are
//! recorded as result errors and the handler returns `Ok`.

pub mod content;
pub mod drops;
pub mod foundation;
pub mod player;
pub mod recipe;
pub mod scene;

use std::fmt;

use anyhow::{Result, bail};

use crate::core::ops::Op;
use crate::core::schema;
use crate::core::types::{Command, ExecutionMode, ExecutionResult};
use crate::world::{NodeId, World, ensure_child};

/// Everything a handler may touch.
pub struct OpContext<'a> {
    pub world: &'a mut dyn World,
    pub mode: ExecutionMode,
    pub result: &'a mut ExecutionResult,
    /// The whole batch, for ops that inspect it (`validateCommandSchema`).
    pub batch: &'a [Command],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled(Op),
    Unknown,
}

/// Route a command to its handler. Commands without an op are `Unknown`.
pub fn dispatch(ctx: &mut OpContext<'_>, cmd: &Command) -> Result<Dispatch> {
    let Some(op) = cmd.op_name().and_then(Op::parse) else {
        return Ok(Dispatch::Unknown);
    };
    run_op(ctx, op, cmd)?;
    Ok(Dispatch::Handled(op))
}

pub fn run_op(ctx: &mut OpContext<'_>, op: Op, cmd: &Command) -> Result<()> {
    match op {
        Op::Ping => {
            ctx.result.log(op.as_str(), "ok");
            Ok(())
        }
        Op::EnsureSceneRoots => {
            let outcome = scene::ensure_scene_roots(ctx.world, ctx.mode);
            EnsureReport::record_outcome(outcome, ctx.result, op, ctx.mode)
        }
        Op::ValidateSceneRoots => {
            scene::validate_scene_roots(ctx.world, ctx.result);
            Ok(())
        }
        Op::ValidateNoScaledParents => {
            scene::validate_no_scaled_parents(ctx.world, ctx.result);
            Ok(())
        }
        Op::EnsureFoundation => {
            let outcome = foundation::ensure_foundation(ctx.world, ctx.mode, cmd.ground_size);
            EnsureReport::record_outcome(outcome, ctx.result, op, ctx.mode)
        }
        Op::ValidateFoundation => {
            foundation::validate_foundation(ctx.world, ctx.result);
            Ok(())
        }
        Op::EnsurePlayerInputStack => player::ensure_player_input_stack(ctx, cmd),
        Op::RunRecipe => recipe::run_recipe(ctx, cmd),
        Op::ListScriptableObjectTypes => {
            content::list_data_asset_types(ctx.world, ctx.result);
            Ok(())
        }
        Op::ListDropTables => {
            content::list_drop_tables(ctx.world, ctx.result);
            Ok(())
        }
        Op::ListItemDefinitions => {
            content::list_item_definitions(ctx.world, ctx.result);
            Ok(())
        }
        Op::ListGates => {
            content::list_gates(ctx.world, ctx.result);
            Ok(())
        }
        Op::ValidateGate => {
            content::validate_gate(ctx.world, ctx.result, cmd);
            Ok(())
        }
        Op::ListEnemies => {
            content::list_enemies(ctx.world, ctx.result);
            Ok(())
        }
        Op::ListEnemyPrefabs => {
            content::list_enemy_prefabs(ctx.world, ctx.result);
            Ok(())
        }
        Op::ValidateCommandSchema => {
            schema::validate_batch(ctx.batch, ctx.result);
            Ok(())
        }
        Op::ValidateDropTable => {
            drops::validate_drop_table(ctx.world, ctx.result, cmd);
            Ok(())
        }
        Op::ValidateAllDropTables => {
            drops::validate_all_drop_tables(ctx.world, ctx.result, cmd);
            Ok(())
        }
        Op::ValidateOrphanItemDefinitions => {
            content::validate_orphan_item_definitions(ctx.world, ctx.result);
            Ok(())
        }
        Op::ValidateEnemyDrops => {
            drops::validate_enemy_drops(ctx.world, ctx.result, cmd);
            Ok(())
        }
        Op::ValidateEnemyPrefabDrops => {
            drops::validate_enemy_prefab_drops(ctx.world, ctx.result, cmd);
            Ok(())
        }
    }
}

/// Where a planned change points.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A node that already existed when the plan was made. `path` is only
    /// used for display.
    Existing { id: NodeId, path: String },
    /// A node created by an earlier change of the same plan, looked up by its
    /// slash-separated path at apply time.
    Planned(String),
}

impl Target {
    pub fn existing(world: &dyn World, id: NodeId) -> Self {
        Target::Existing {
            id,
            path: world.node_path(id),
        }
    }

    /// `Existing` when `path` resolves now, otherwise `Planned`.
    pub fn at_path(world: &dyn World, path: &str) -> Self {
        match world.find_path(path) {
            Some(id) => Target::Existing {
                id,
                path: path.to_string(),
            },
            None => Target::Planned(path.to_string()),
        }
    }

    fn resolve(&self, world: &dyn World) -> Result<NodeId> {
        match self {
            Target::Existing { id, .. } => Ok(*id),
            Target::Planned(path) => match world.find_path(path) {
                Some(node) => Ok(node),
                None => bail!("node '{path}' not found"),
            },
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Existing { path, .. } | Target::Planned(path) => f.write_str(path),
        }
    }
}

/// One planned world change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    CreateNode { parent: Option<Target>, name: String },
    Reparent { node: Target, parent: Target },
    AddComponent { node: Target, component: String },
    SetScale { node: Target, scale: [f64; 3] },
}

impl Change {
    pub fn apply(&self, world: &mut dyn World) -> Result<()> {
        match self {
            Change::CreateNode { parent, name } => {
                let parent = match parent {
                    Some(target) => Some(target.resolve(world)?),
                    None => None,
                };
                ensure_child(world, parent, name, ExecutionMode::Apply)?;
            }
            Change::Reparent { node, parent } => {
                let node = node.resolve(world)?;
                let parent = parent.resolve(world)?;
                world.set_parent(node, Some(parent))?;
            }
            Change::AddComponent { node, component } => {
                let node = node.resolve(world)?;
                world.add_component(node, component)?;
            }
            Change::SetScale { node, scale } => {
                let node = node.resolve(world)?;
                world.set_local_scale(node, *scale)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::CreateNode {
                parent: Some(parent),
                name,
            } => write!(f, "create {parent}/{name}"),
            Change::CreateNode { parent: None, name } => write!(f, "create {name}"),
            Change::Reparent { node, parent } => write!(f, "move {node} -> {parent}/"),
            Change::AddComponent { node, component } => write!(f, "add {component} to {node}"),
            Change::SetScale { node, scale } => write!(
                f,
                "scale {node} to [{}, {}, {}]",
                scale[0], scale[1], scale[2]
            ),
        }
    }
}

/// Outcome of an idempotent ensure-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureReport {
    /// The world satisfies the op after it ran.
    pub pass: bool,
    pub planned: Vec<String>,
    pub applied: Vec<String>,
}

/// An Apply run that stopped on a failing change. `report` lists the changes
/// that were applied before it, with `pass=false`.
#[derive(Debug)]
pub struct ApplyFault {
    pub report: EnsureReport,
    pub error: anyhow::Error,
}

impl EnsureReport {
    /// Run `plan` in Apply mode; in DryRun only describe it.
    pub fn execute(
        world: &mut dyn World,
        mode: ExecutionMode,
        plan: &[Change],
    ) -> std::result::Result<Self, ApplyFault> {
        let planned: Vec<String> = plan.iter().map(Change::to_string).collect();
        let mut applied = Vec::new();
        if mode.is_apply() {
            for change in plan {
                if let Err(err) = change.apply(world) {
                    return Err(ApplyFault {
                        report: Self {
                            pass: false,
                            planned,
                            applied,
                        },
                        error: err.context(format!("apply '{change}'")),
                    });
                }
                applied.push(change.to_string());
            }
        }
        Ok(Self {
            pass: mode.is_apply() || plan.is_empty(),
            planned,
            applied,
        })
    }

    /// Record the outcome of [`EnsureReport::execute`]. A partial report is
    /// recorded before the fault is passed on.
    pub fn record_outcome(
        outcome: std::result::Result<Self, ApplyFault>,
        result: &mut ExecutionResult,
        op: Op,
        mode: ExecutionMode,
    ) -> Result<()> {
        match outcome {
            Ok(report) => {
                report.record(result, op, mode);
                Ok(())
            }
            Err(ApplyFault { report, error }) => {
                report.record(result, op, mode);
                Err(error)
            }
        }
    }

    pub fn record(&self, result: &mut ExecutionResult, op: Op, mode: ExecutionMode) {
        let name = op.as_str();
        for item in &self.planned {
            result.log(name, format!("planned: {item}"));
        }
        for item in &self.applied {
            result.log(name, format!("applied: {item}"));
        }
        if self.planned.is_empty() {
            result.log(name, "nothing to do.");
        } else if !mode.is_apply() {
            result.log(
                name,
                format!("{} change(s) planned; DryRun left the world untouched.", self.planned.len()),
            );
        }
        result.log(
            name,
            format!(
                "pass={} planned={} applied={}",
                self.pass,
                self.planned.len(),
                self.applied.len()
            ),
        );
    }
}
