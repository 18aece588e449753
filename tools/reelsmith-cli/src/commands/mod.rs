pub mod check;
pub mod compose;
pub mod info;
pub mod init;
pub mod validate;

use std::path::PathBuf;

use reelsmith_common::config::AppConfig;
use reelsmith_plan_model::assets::{AssetLayout, AssetRole};

use crate::{InputArgs, ModeArg};

/// Plan path from the flags or the configured outputs tree.
pub fn plan_path(config: &AppConfig, inputs: &InputArgs) -> PathBuf {
    inputs.plan.clone().unwrap_or_else(|| config.plan_path())
}

/// Asset directories from the flags or the configured outputs tree.
pub fn asset_layout(config: &AppConfig, inputs: &InputArgs) -> AssetLayout {
    AssetLayout::new(
        inputs.images.clone().unwrap_or_else(|| config.images_dir()),
        inputs.videos.clone().unwrap_or_else(|| config.videos_dir()),
        inputs.audio.clone().unwrap_or_else(|| config.audio_dir()),
    )
}

/// The visual asset every clip needs in `mode`.
pub fn visual_role(mode: ModeArg) -> AssetRole {
    match mode {
        ModeArg::Slides => AssetRole::Image,
        ModeArg::Video => AssetRole::Video,
    }
}
