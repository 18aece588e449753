//! Media inspection seam.
//!
//! Everything the timeline pass needs to know about source files goes
//! through [`MediaTools`], so the reconciliation logic can run against a
//! scripted fake in tests and against ffmpeg/ffprobe in production.

use std::path::Path;

use reelsmith_common::error::ReelResult;
use reelsmith_plan_model::assets::AudioEncoding;
use serde::{Deserialize, Serialize};

/// Sample rate of headerless G.711 narration files.
pub const G711_SAMPLE_RATE: u32 = 8000;

/// Basic properties of a decodable video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

/// Probing and frame operations on source media.
pub trait MediaTools {
    /// Duration of an audio file in seconds. Fails when the file cannot be
    /// decoded.
    fn probe_duration(&self, path: &Path, encoding: AudioEncoding) -> ReelResult<f64>;

    /// Duration and frame size of the first video stream.
    fn probe_video(&self, path: &Path) -> ReelResult<VideoInfo>;

    /// Decode frame 0. Succeeds only if a frame was actually produced.
    fn decode_first_frame(&self, path: &Path) -> ReelResult<()>;

    /// Re-encode `source` into a canonical, reliably decodable MP4 at `target`.
    fn normalize(&self, source: &Path, target: &Path, fps: u32) -> ReelResult<()>;

    /// Write the frame at `at_secs` of `video` as an image at `target`.
    fn extract_frame(&self, video: &Path, at_secs: f64, target: &Path) -> ReelResult<()>;
}

/// Demuxer arguments that must precede `-i` for headerless audio.
pub fn input_format_args(encoding: AudioEncoding) -> Vec<String> {
    let format = match encoding {
        AudioEncoding::Container => return vec![],
        AudioEncoding::Mulaw => "mulaw",
        AudioEncoding::Alaw => "alaw",
    };
    vec![
        "-f".to_string(),
        format.to_string(),
        "-ar".to_string(),
        G711_SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        "1".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_audio_needs_no_hints() {
        assert!(input_format_args(AudioEncoding::Container).is_empty());
    }

    #[test]
    fn test_g711_hints() {
        assert_eq!(
            input_format_args(AudioEncoding::Mulaw),
            vec!["-f", "mulaw", "-ar", "8000", "-ac", "1"]
        );
        assert_eq!(input_format_args(AudioEncoding::Alaw)[1], "alaw");
    }
}
