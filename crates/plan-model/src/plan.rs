//! Plan document types.
//!
//! A plan is produced and schema-checked upstream. This module only loads
//! it, derives the spoken text of each clip, and reports consistency issues
//! for the `validate` command.

use std::path::{Path, PathBuf};

use reelsmith_common::error::ReelError;
use serde::{Deserialize, Serialize};

/// Maximum length of a clip's on-screen subtitle.
pub const MAX_SUBTITLE_CHARS: usize = 100;

/// Top-level plan file (`plan.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Human-readable title. Used to name auto-numbered renders.
    #[serde(default)]
    pub title: String,

    /// Clips in narration order.
    pub clips: Vec<Clip>,
}

/// One scene of the plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clip {
    /// 1-based position in the plan. Falls back to the position when absent.
    #[serde(default)]
    pub index: Option<u32>,

    /// Which text sources the clip narrates.
    #[serde(default)]
    pub mode: Option<ClipMode>,

    #[serde(default)]
    pub dialogue_text: Option<String>,

    #[serde(default)]
    pub verse: Option<Verse>,

    /// Short on-screen text.
    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default)]
    pub image_prompt: Option<String>,

    #[serde(default)]
    pub video_motion_prompt: Option<String>,

    /// Pre-`dialogue_text` narration field found in older plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,

    /// Optional explicit placement (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

/// Narration source selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    Dialogue,
    Verse,
    Both,
}

/// A quoted passage with its reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Verse {
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,

    #[serde(default)]
    pub text: String,
}

/// Errors that can occur when loading a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Plan {path} contains no clips")]
    Empty { path: PathBuf },
}

impl From<PlanError> for ReelError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::IoError { path, source } => ReelError::UnreadablePlan {
                path,
                message: source.to_string(),
            },
            PlanError::ParseError { path, source } => ReelError::UnreadablePlan {
                path,
                message: source.to_string(),
            },
            PlanError::Empty { path } => ReelError::EmptyPlan { path },
        }
    }
}

impl Plan {
    /// Load a plan from a JSON file. A plan without clips is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref().to_path_buf();

        let json = std::fs::read_to_string(&path).map_err(|e| PlanError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let plan = Self::from_json(&json).map_err(|e| PlanError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        if plan.clips.is_empty() {
            return Err(PlanError::Empty { path });
        }

        tracing::debug!(path = %path.display(), clips = plan.clips.len(), "Loaded plan");
        Ok(plan)
    }

    /// Parse a plan from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clips to compose, honoring an optional "first N clips" limit.
    pub fn clips_limited(&self, limit: Option<usize>) -> &[Clip] {
        match limit {
            Some(n) => &self.clips[..n.min(self.clips.len())],
            None => &self.clips,
        }
    }

    /// Consistency issues a composition run would trip over or render oddly.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];

        if self.clips.is_empty() {
            issues.push("Plan contains no clips".to_string());
        }

        let mut previous_end: Option<f64> = None;
        for (position, clip) in self.clips.iter().enumerate() {
            let expected = position as u32 + 1;
            let index = clip.index_or(expected);

            if index != expected {
                issues.push(format!(
                    "Clip at position {expected} has index {index} (expected {expected})"
                ));
            }

            if clip.spoken_text().is_empty() {
                issues.push(format!("Clip {index} has no spoken text"));
            }

            if let Some(subtitle) = &clip.subtitle {
                let chars = subtitle.chars().count();
                if chars > MAX_SUBTITLE_CHARS {
                    issues.push(format!(
                        "Clip {index} subtitle is {chars} characters (max {MAX_SUBTITLE_CHARS})"
                    ));
                }
            }

            if let (Some(start), Some(end)) = (clip.start, clip.end) {
                if end <= start {
                    issues.push(format!(
                        "Clip {index} ends at {end:.3}s, not after its start {start:.3}s"
                    ));
                }
                if let Some(prev) = previous_end {
                    if start < prev {
                        issues.push(format!(
                            "Clip {index} starts at {start:.3}s, before the previous clip ends ({prev:.3}s)"
                        ));
                    }
                }
                previous_end = Some(end);
            }
        }

        issues
    }
}

impl Clip {
    /// The clip's own index, or `position` (1-based) when unset or zero.
    pub fn index_or(&self, position: u32) -> u32 {
        match self.index {
            Some(index) if index > 0 => index,
            _ => position,
        }
    }

    /// Text the narration speaks: verse text (with its parenthesized
    /// reference) followed by dialogue, whitespace-normalized.
    pub fn spoken_text(&self) -> String {
        if self.dialogue_text.is_none() && self.verse.is_none() {
            return normalize_whitespace(self.dialogue.as_deref().unwrap_or_default());
        }

        let mut parts: Vec<String> = vec![];
        if let Some(verse) = &self.verse {
            if !verse.text.trim().is_empty() {
                let reference = verse.reference.as_deref().unwrap_or_default().trim();
                if reference.is_empty() {
                    parts.push(verse.text.clone());
                } else {
                    parts.push(format!("{} ({reference}).", verse.text));
                }
            }
        }
        if let Some(dialogue) = &self.dialogue_text {
            if !dialogue.trim().is_empty() {
                parts.push(dialogue.clone());
            }
        }

        normalize_whitespace(&parts.join(" "))
    }

    /// Text for the clip's subtitle cue: the spoken text, or the on-screen
    /// subtitle when nothing is spoken.
    pub fn caption_text(&self) -> String {
        let spoken = self.spoken_text();
        if spoken.is_empty() {
            normalize_whitespace(self.subtitle.as_deref().unwrap_or_default())
        } else {
            spoken
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
