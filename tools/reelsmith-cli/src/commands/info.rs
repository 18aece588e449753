//! Show plan information.

use reelsmith_common::config::AppConfig;
use reelsmith_plan_model::naming::make_slug;
use reelsmith_plan_model::plan::Plan;

use super::{asset_layout, plan_path};
use crate::InputArgs;

pub fn run(config: &AppConfig, inputs: &InputArgs) -> anyhow::Result<()> {
    let path = plan_path(config, inputs);
    let plan = Plan::load(&path).map_err(reelsmith_common::ReelError::from)?;
    let layout = asset_layout(config, inputs);

    println!("Plan: {}", plan.title);
    println!("  File: {}", path.display());
    println!("  Output slug: {}", make_slug(&plan.title));
    println!("  Clips: {}", plan.clips.len());
    println!();

    for (position, clip) in plan.clips.iter().enumerate() {
        let index = clip.index_or(position as u32 + 1);
        let mode = clip
            .mode
            .map(|m| format!("{m:?}").to_lowercase())
            .unwrap_or_else(|| "-".to_string());
        let narration = layout
            .resolve_audio(index)
            .map(|a| a.path.display().to_string())
            .unwrap_or_else(|| "(silent)".to_string());

        println!("Clip {index} [{mode}]");
        println!("  Text: {}", clip.caption_text());
        if let Some(subtitle) = &clip.subtitle {
            println!("  Subtitle: {subtitle}");
        }
        println!("  Narration: {narration}");
    }

    Ok(())
}
