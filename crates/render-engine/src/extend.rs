//! Visual extension: fitting a visual asset to its reconciled slot.
//!
//! Every [`VisualPlan`] reports exactly the slot length it was built for,
//! which keeps the assembler's cursor in step with what gets rendered.

use std::path::{Path, PathBuf};

use reelsmith_common::config::ComposeSettings;
use reelsmith_common::timecode::DURATION_EPSILON;
use serde::{Deserialize, Serialize};

use crate::media::MediaTools;
use crate::normalize::OpenedVideo;

/// How the visual part of one segment is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum VisualPlan {
    /// A still image shown for the whole slot.
    Still { image: PathBuf, secs: f64 },

    /// A video cut to the slot (native length already covers it).
    Trimmed { video: PathBuf, secs: f64 },

    /// A video followed by a held frame.
    Frozen {
        video: PathBuf,
        native_secs: f64,
        hold: HeldFrame,
        hold_secs: f64,
        secs: f64,
    },

    /// A video faded out to black, followed by solid black.
    BlackPadded {
        video: PathBuf,
        native_secs: f64,
        fade_secs: f64,
        pad_secs: f64,
        width: u32,
        height: u32,
        secs: f64,
    },
}

impl VisualPlan {
    /// Rendered length of this visual. Always the requested slot.
    pub fn duration_secs(&self) -> f64 {
        match self {
            VisualPlan::Still { secs, .. }
            | VisualPlan::Trimmed { secs, .. }
            | VisualPlan::Frozen { secs, .. }
            | VisualPlan::BlackPadded { secs, .. } => *secs,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VisualPlan::Still { .. } => "still",
            VisualPlan::Trimmed { .. } => "trimmed",
            VisualPlan::Frozen { .. } => "frozen",
            VisualPlan::BlackPadded { .. } => "black_padded",
        }
    }

    /// Time at which the picture is fully black, for black-padded visuals.
    pub fn black_from_secs(&self) -> Option<f64> {
        match self {
            VisualPlan::BlackPadded { native_secs, .. } => Some(*native_secs),
            _ => None,
        }
    }
}

/// The frame held by a freeze extension, in fallback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum HeldFrame {
    /// Frame sampled one frame before the end.
    Last { image: PathBuf, at_secs: f64 },
    /// Frame 0.
    First { image: PathBuf },
    /// Synthetic black still.
    Black { width: u32, height: u32 },
}

/// A frame grab that did not produce an image.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGrabFailure {
    pub at_secs: f64,
    pub error: String,
}

/// Result of a freeze extension, including the fallbacks that were taken.
#[derive(Debug, Clone, PartialEq)]
pub struct FreezeOutcome {
    pub visual: VisualPlan,
    pub failures: Vec<FrameGrabFailure>,
}

/// A still image covering `secs`.
pub fn still(image: &Path, secs: f64) -> VisualPlan {
    VisualPlan::Still {
        image: image.to_path_buf(),
        secs,
    }
}

fn covers(native_secs: f64, target_secs: f64) -> bool {
    native_secs + DURATION_EPSILON >= target_secs
}

/// Extend `video` to `target_secs` by holding a frame.
///
/// Tries the frame at `max(0, duration - 1/fps)`, then frame 0, then a black
/// still of the configured size. Grabbed frames are written into `frame_dir`.
pub fn freeze_extend<M: MediaTools + ?Sized>(
    tools: &M,
    video: &OpenedVideo,
    target_secs: f64,
    settings: &ComposeSettings,
    frame_dir: &Path,
    clip_index: u32,
) -> FreezeOutcome {
    let native_secs = video.info.duration_secs;
    if covers(native_secs, target_secs) {
        return FreezeOutcome {
            visual: VisualPlan::Trimmed {
                video: video.path.clone(),
                secs: target_secs,
            },
            failures: vec![],
        };
    }

    let mut failures = vec![];
    let last_at = (native_secs - settings.frame_secs()).max(0.0);
    let last_image = frame_dir.join(format!("clip{clip_index}_last.png"));
    let first_image = frame_dir.join(format!("clip{clip_index}_first.png"));

    let hold = match tools.extract_frame(&video.path, last_at, &last_image) {
        Ok(()) => HeldFrame::Last {
            image: last_image,
            at_secs: last_at,
        },
        Err(err) => {
            failures.push(FrameGrabFailure {
                at_secs: last_at,
                error: err.to_string(),
            });
            match tools.extract_frame(&video.path, 0.0, &first_image) {
                Ok(()) => HeldFrame::First { image: first_image },
                Err(err) => {
                    failures.push(FrameGrabFailure {
                        at_secs: 0.0,
                        error: err.to_string(),
                    });
                    HeldFrame::Black {
                        width: settings.black_width,
                        height: settings.black_height,
                    }
                }
            }
        }
    };

    FreezeOutcome {
        visual: VisualPlan::Frozen {
            video: video.path.clone(),
            native_secs,
            hold,
            hold_secs: target_secs - native_secs,
            secs: target_secs,
        },
        failures,
    }
}

/// Extend `video` to `target_secs` by fading its tail to black and holding
/// black. The fade window is clamped to half the video.
pub fn black_pad(video: &OpenedVideo, target_secs: f64, settings: &ComposeSettings) -> VisualPlan {
    let native_secs = video.info.duration_secs;
    if covers(native_secs, target_secs) {
        return VisualPlan::Trimmed {
            video: video.path.clone(),
            secs: target_secs,
        };
    }

    VisualPlan::BlackPadded {
        video: video.path.clone(),
        native_secs,
        fade_secs: settings.fade_secs.min(native_secs / 2.0).max(0.0),
        pad_secs: target_secs - native_secs,
        width: video.info.width,
        height: video.info.height,
        secs: target_secs,
    }
}
