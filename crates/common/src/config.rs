//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ReelError, ReelResult};

/// Environment variable that relocates the default outputs tree.
pub const OUTPUTS_ENV: &str = "REELSMITH_OUTPUTS";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the pipeline's outputs tree (plan, images, audio, video).
    pub outputs_dir: PathBuf,

    /// Default composition settings.
    pub compose: ComposeSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Tunables for one composition run.
///
/// Passed explicitly into the reconciler, the extenders, and the render
/// backend so runs can be reproduced with different values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    /// Output frame rate. Also used for normalization and the freeze sample point.
    pub fps: u32,

    /// Fixed slot length for slides (seconds).
    pub slide_secs: f64,

    /// Silence before narration in paced slides.
    pub pad_before_secs: f64,

    /// Silence after narration in paced slides.
    pub pad_after_secs: f64,

    /// Slot length of a paced slide that has no narration.
    pub fallback_clip_secs: f64,

    /// Tail fade window before black padding. Clamped to half the video.
    pub fade_secs: f64,

    /// Output canvas width.
    pub width: u32,

    /// Output canvas height.
    pub height: u32,

    /// Size of the synthetic black still used when no frame can be grabbed.
    pub black_width: u32,
    pub black_height: u32,

    /// Final video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Final audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Sample rate of the narration track.
    pub audio_sample_rate: u32,

    /// What fixed-length slides do with narration longer than the slot.
    pub slide_overflow: OverflowPolicy,

    /// How provider video shorter than its narration is extended.
    pub video_extension: ExtendStrategy,
}

/// Handling of narration that outlasts a fixed slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep the slot length and cut the narration at the slot end.
    #[default]
    Truncate,
    /// Grow the slot to the narration length.
    Extend,
}

/// Extension strategy for provider video shorter than its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtendStrategy {
    /// Fade the tail to black and hold black.
    #[default]
    BlackPad,
    /// Hold the last decodable frame.
    Freeze,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelsmith=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            outputs_dir: default_outputs_dir(),
            compose: ComposeSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            slide_secs: 10.0,
            pad_before_secs: 0.5,
            pad_after_secs: 0.5,
            fallback_clip_secs: 3.0,
            fade_secs: 0.5,
            width: 1280,
            height: 720,
            black_width: 1280,
            black_height: 720,
            video_bitrate_kbps: 5000,
            audio_bitrate_kbps: 192,
            audio_sample_rate: 48000,
            slide_overflow: OverflowPolicy::Truncate,
            video_extension: ExtendStrategy::BlackPad,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl ComposeSettings {
    /// Reject values the reconciler and the encoder cannot work with.
    pub fn validate(&self) -> ReelResult<()> {
        if self.fps == 0 {
            return Err(ReelError::config("fps must be positive"));
        }
        if !(self.slide_secs.is_finite() && self.slide_secs > 0.0) {
            return Err(ReelError::config("slide duration must be positive"));
        }
        if !(self.fallback_clip_secs.is_finite() && self.fallback_clip_secs > 0.0) {
            return Err(ReelError::config("fallback clip duration must be positive"));
        }
        for (name, value) in [
            ("pad_before_secs", self.pad_before_secs),
            ("pad_after_secs", self.pad_after_secs),
            ("fade_secs", self.fade_secs),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ReelError::config(format!("{name} must be non-negative")));
            }
        }
        if self.width < 2 || self.height < 2 || self.black_width < 2 || self.black_height < 2 {
            return Err(ReelError::config("frame dimensions must be at least 2x2"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ReelError::config(format!(
                "canvas {}x{} must have even dimensions for yuv420p",
                self.width, self.height
            )));
        }
        if self.video_bitrate_kbps == 0 || self.audio_bitrate_kbps == 0 || self.audio_sample_rate == 0 {
            return Err(ReelError::config("bitrates and sample rate must be positive"));
        }
        Ok(())
    }

    /// Duration of one output frame in seconds.
    pub fn frame_secs(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}

impl AppConfig {
    /// Load config from the standard location. A missing file yields the
    /// defaults; an unreadable or malformed file is an error so the caller
    /// can report it once logging is up.
    pub fn load() -> ReelResult<Self> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> ReelResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReelError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ReelError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.outputs_dir.join("plan.json")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.outputs_dir.join("images")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.outputs_dir.join("video_provider")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.outputs_dir.join("audio")
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.outputs_dir.join("video")
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelsmith").join("config.json")
}

/// Default outputs tree.
fn default_outputs_dir() -> PathBuf {
    std::env::var(OUTPUTS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("outputs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ComposeSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.slide_overflow, OverflowPolicy::Truncate);
        assert_eq!(settings.video_extension, ExtendStrategy::BlackPad);
    }

    #[test]
    fn test_zero_fps_rejected() {
        let settings = ComposeSettings {
            fps: 0,
            ..ComposeSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_negative_fade_rejected() {
        let settings = ComposeSettings {
            fade_secs: -0.1,
            ..ComposeSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_odd_canvas_rejected() {
        let settings = ComposeSettings {
            width: 1281,
            ..ComposeSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = ComposeSettings {
            height: 719,
            ..ComposeSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.compose, ComposeSettings::default());
    }

    #[test]
    fn test_broken_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ broken").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ReelError::Config { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_saved_config_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            outputs_dir: PathBuf::from("/data/out"),
            ..AppConfig::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().outputs_dir, PathBuf::from("/data/out"));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let parsed: ComposeSettings =
            serde_json::from_str(r#"{"fps": 24, "video_extension": "freeze"}"#).unwrap();
        assert_eq!(parsed.fps, 24);
        assert_eq!(parsed.video_extension, ExtendStrategy::Freeze);
        assert!((parsed.slide_secs - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_derived_paths_follow_outputs_dir() {
        let config = AppConfig {
            outputs_dir: PathBuf::from("/data/out"),
            ..AppConfig::default()
        };
        assert_eq!(config.plan_path(), PathBuf::from("/data/out/plan.json"));
        assert_eq!(config.videos_dir(), PathBuf::from("/data/out/video_provider"));
        assert_eq!(config.renders_dir(), PathBuf::from("/data/out/video"));
    }
}
