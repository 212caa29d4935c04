//! `runRecipe`: expand a named op sequence into the current batch.

use anyhow::Result;

use crate::core::ops::Op;
use crate::core::recipes;
use crate::core::types::{Command, non_blank};
use crate::ops::{OpContext, run_op};

/// Resolve the step list, preferring a non-empty `recipeOps` override.
fn steps(ctx: &mut OpContext<'_>, cmd: &Command) -> Option<(String, Vec<String>)> {
    let op = Op::RunRecipe.as_str();
    let name = non_blank(cmd.recipe_name.as_deref()).unwrap_or("(override)");
    if let Some(ops) = cmd.recipe_ops.as_ref().filter(|ops| !ops.is_empty()) {
        ctx.result.log(
            op,
            format!("recipe '{name}' using recipeOps override ({} step(s)).", ops.len()),
        );
        return Some((name.to_string(), ops.clone()));
    }

    let Some(name) = non_blank(cmd.recipe_name.as_deref()) else {
        ctx.result.error(op, "missing recipeName (or non-empty recipeOps).");
        return None;
    };
    match recipes::lookup(name) {
        Some(ops) => Some((
            name.to_string(),
            ops.iter().map(|op| (*op).to_string()).collect(),
        )),
        None => {
            let known: Vec<&str> = recipes::names().collect();
            ctx.result.error(
                op,
                format!("unknown recipe '{name}'. Known: {}", known.join(", ")),
            );
            None
        }
    }
}

/// Steps run as payload-free commands against the same result and do not
/// count toward `opsExecuted`. A faulting step is recorded as an error and
/// the remaining steps still run.
pub fn run_recipe(ctx: &mut OpContext<'_>, cmd: &Command) -> Result<()> {
    let op = Op::RunRecipe.as_str();
    let Some((name, steps)) = steps(ctx, cmd) else {
        return Ok(());
    };

    let total = steps.len();
    for (index, step) in steps.iter().enumerate() {
        let step = step.trim();
        match Op::parse(step) {
            Some(Op::RunRecipe) => {
                ctx.result
                    .warn(op, format!("step '{step}' would nest a recipe; skipped."));
            }
            Some(step_op) => {
                ctx.result.log(
                    op,
                    format!("recipe '{name}' step {}/{total}: {step_op}", index + 1),
                );
                if let Err(err) = run_op(ctx, step_op, &Command::op(step_op.as_str())) {
                    ctx.result
                        .error(step_op.as_str(), format!("unexpected fault: {err:#}"));
                }
            }
            None => {
                ctx.result
                    .warn(op, format!("step '{step}' is not a known op; skipped."));
            }
        }
    }
    ctx.result.log(op, format!("recipe '{name}' finished ({total} step(s))."));
    Ok(())
}
