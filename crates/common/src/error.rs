//! Error types shared across reelsmith crates.

use std::path::PathBuf;

/// Top-level error type for composition runs.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Missing {role} asset: {}", path.display())]
    MissingAsset {
        clip_index: u32,
        role: String,
        path: PathBuf,
    },

    #[error("Unreadable plan {}: {message}", path.display())]
    UnreadablePlan { path: PathBuf, message: String },

    #[error("Plan {} contains no clips", path.display())]
    EmptyPlan { path: PathBuf },

    #[error("Failed to read audio {}: {message}", path.display())]
    AudioRead { path: PathBuf, message: String },

    #[error("Video {} is not decodable even after normalization: {message}", path.display())]
    DecodeNormalization { path: PathBuf, message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("{program} exited with status {}: {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Tool {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("clip {index}: {source}")]
    Clip {
        index: u32,
        #[source]
        source: Box<ReelError>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn missing_asset(clip_index: u32, role: impl Into<String>, path: PathBuf) -> Self {
        Self::MissingAsset {
            clip_index,
            role: role.into(),
            path,
        }
    }

    /// Attach a clip index to a per-clip failure. Already-tagged errors are
    /// left as they are.
    pub fn for_clip(self, index: u32) -> Self {
        match self {
            tagged @ Self::Clip { .. } => tagged,
            other => Self::Clip {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Index of the clip this error belongs to, if any.
    pub fn clip_index(&self) -> Option<u32> {
        match self {
            Self::Clip { index, .. } => Some(*index),
            Self::MissingAsset { clip_index, .. } => Some(*clip_index),
            _ => None,
        }
    }

    /// Process exit code for this failure. A failed external tool propagates
    /// its own code; everything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Tool {
                code: Some(code), ..
            } if *code != 0 => *code,
            Self::Clip { source, .. } => source.exit_code(),
            _ => 1,
        }
    }

    /// Whether the run may continue after this error. Only unreadable
    /// narration is downgraded (to silence).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AudioRead { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_wrapper_names_index() {
        let err = ReelError::render("concat failed").for_clip(4);
        assert_eq!(err.to_string(), "clip 4: Render error: concat failed");
        assert_eq!(err.clip_index(), Some(4));
    }

    #[test]
    fn test_for_clip_does_not_double_wrap() {
        let err = ReelError::render("x").for_clip(2).for_clip(7);
        assert_eq!(err.clip_index(), Some(2));
    }

    #[test]
    fn test_exit_code_propagates_tool_status() {
        let err = ReelError::Tool {
            program: "ffmpeg".to_string(),
            code: Some(183),
            stderr: String::new(),
        }
        .for_clip(1);
        assert_eq!(err.exit_code(), 183);
        assert_eq!(ReelError::render("boom").exit_code(), 1);
    }

    #[test]
    fn test_only_audio_read_is_recoverable() {
        let audio = ReelError::AudioRead {
            path: PathBuf::from("audio/clip1.mp3"),
            message: "bad header".to_string(),
        };
        assert!(audio.is_recoverable());
        assert!(!ReelError::missing_asset(1, "image", PathBuf::from("images/clip1.png"))
            .is_recoverable());
    }
}
