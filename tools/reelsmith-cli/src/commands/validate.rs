//! Validate a plan and the assets it needs.

use reelsmith_common::config::AppConfig;
use reelsmith_plan_model::plan::Plan;

use super::{asset_layout, plan_path, visual_role};
use crate::{InputArgs, ModeArg};

pub fn run(config: &AppConfig, mode: ModeArg, inputs: &InputArgs) -> anyhow::Result<()> {
    let path = plan_path(config, inputs);
    println!("Validating plan at: {}", path.display());

    let plan = Plan::load(&path).map_err(reelsmith_common::ReelError::from)?;
    let layout = asset_layout(config, inputs);

    println!("  Title: {}", plan.title);
    println!("  Clips: {}", plan.clips.len());

    let narrated = plan
        .clips
        .iter()
        .enumerate()
        .filter(|(position, clip)| {
            layout
                .resolve_audio(clip.index_or(*position as u32 + 1))
                .is_some()
        })
        .count();
    println!("  Narration: {narrated}/{} clip(s)", plan.clips.len());

    let mut issues = plan.validate();
    issues.extend(layout.missing_assets(&plan, visual_role(mode), None));

    if issues.is_empty() {
        println!("\nPlan is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("{} issue(s) found", issues.len())
}
