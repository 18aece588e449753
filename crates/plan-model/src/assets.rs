//! Per-clip asset lookup.
//!
//! Every asset is named `clip<index>.<ext>` inside a role-specific
//! directory. Visual assets are required; narration is optional and may use
//! any of [`AUDIO_EXTENSIONS`], first match wins.

use std::fmt;
use std::path::{Path, PathBuf};

use reelsmith_common::error::{ReelError, ReelResult};

use crate::plan::Plan;

/// Narration extensions in lookup priority order.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "wav", "opus", "ulaw", "alaw"];

/// Extension of still-image assets.
pub const IMAGE_EXTENSION: &str = "png";

/// Extension of provider video assets.
pub const VIDEO_EXTENSION: &str = "mp4";

/// What an asset is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    Image,
    Video,
    Audio,
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetRole::Image => "image",
            AssetRole::Video => "video",
            AssetRole::Audio => "audio",
        };
        f.write_str(name)
    }
}

/// How a narration file is encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    /// Self-describing container (mp3, wav, opus).
    Container,
    /// Headerless 8 kHz mono G.711 mu-law.
    Mulaw,
    /// Headerless 8 kHz mono G.711 A-law.
    Alaw,
}

impl AudioEncoding {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "ulaw" => AudioEncoding::Mulaw,
            "alaw" => AudioEncoding::Alaw,
            _ => AudioEncoding::Container,
        }
    }
}

/// A narration file found for a clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub encoding: AudioEncoding,
}

/// Directories holding each role's assets.
#[derive(Debug, Clone)]
pub struct AssetLayout {
    pub images_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub audio_dir: PathBuf,
}

impl AssetLayout {
    pub fn new(
        images_dir: impl Into<PathBuf>,
        videos_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            images_dir: images_dir.into(),
            videos_dir: videos_dir.into(),
            audio_dir: audio_dir.into(),
        }
    }

    /// Conventional path of a visual asset, whether or not it exists.
    pub fn visual_path(&self, role: AssetRole, index: u32) -> PathBuf {
        match role {
            AssetRole::Image => clip_file(&self.images_dir, index, IMAGE_EXTENSION),
            AssetRole::Video => clip_file(&self.videos_dir, index, VIDEO_EXTENSION),
            AssetRole::Audio => clip_file(&self.audio_dir, index, AUDIO_EXTENSIONS[0]),
        }
    }

    /// Locate the asset for `role` and `index`, if present.
    pub fn resolve(&self, role: AssetRole, index: u32) -> Option<PathBuf> {
        match role {
            AssetRole::Audio => self.resolve_audio(index).map(|asset| asset.path),
            AssetRole::Image | AssetRole::Video => {
                let path = self.visual_path(role, index);
                path.is_file().then_some(path)
            }
        }
    }

    /// Locate a required visual asset. Absence is fatal for the clip.
    pub fn require(&self, role: AssetRole, index: u32) -> ReelResult<PathBuf> {
        self.resolve(role, index)
            .ok_or_else(|| ReelError::missing_asset(index, role.to_string(), self.visual_path(role, index)))
    }

    /// Locate the clip's narration. `None` means a silent clip.
    pub fn resolve_audio(&self, index: u32) -> Option<AudioAsset> {
        AUDIO_EXTENSIONS.iter().find_map(|ext| {
            let path = clip_file(&self.audio_dir, index, ext);
            path.is_file().then(|| AudioAsset {
                path,
                encoding: AudioEncoding::from_extension(ext),
            })
        })
    }

    /// Human-readable report of missing required assets for the first
    /// `limit` clips of `plan`.
    pub fn missing_assets(&self, plan: &Plan, role: AssetRole, limit: Option<usize>) -> Vec<String> {
        plan.clips_limited(limit)
            .iter()
            .enumerate()
            .filter_map(|(position, clip)| {
                let index = clip.index_or(position as u32 + 1);
                match self.require(role, index) {
                    Ok(_) => None,
                    Err(err) => Some(format!("clip {index}: {err}")),
                }
            })
            .collect()
    }
}

fn clip_file(dir: &Path, index: u32, ext: &str) -> PathBuf {
    dir.join(format!("clip{index}.{ext}"))
}
