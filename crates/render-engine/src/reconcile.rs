//! Duration reconciliation.
//!
//! Decides how long each clip occupies the timeline and where its narration
//! sits inside that slot. The mode is chosen once per run.
//!
//! | mode            | narration `A` vs visual | slot             | offset        |
//! |-----------------|-------------------------|------------------|---------------|
//! | fixed slides    | `A <= T`                | `T`              | `(T - A) / 2` |
//! | fixed slides    | `A > T`                 | `T` (or `A`)     | `0`           |
//! | paced slides    | any `A > 0`             | `A + pads`       | `pad_before`  |
//! | provider video  | `A > V`                 | `A`              | `0`           |
//! | provider video  | `A <= V`                | `V`              | `(V - A) / 2` |

use std::fmt;

use reelsmith_common::config::{ComposeSettings, OverflowPolicy};
use serde::{Deserialize, Serialize};

/// Shortest slot a paced slide may get.
pub const MIN_SLOT_SECS: f64 = 0.01;

/// Timing policy for still-image slides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SlideTiming {
    /// Every slide lasts `secs`.
    Fixed { secs: f64 },
    /// Slides last as long as their narration plus the configured pads.
    Paced,
}

/// Run-wide composition policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum CompositionMode {
    /// Still images from the images directory.
    Slides { timing: SlideTiming },
    /// Provider-generated video clips.
    ProviderVideo,
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionMode::Slides {
                timing: SlideTiming::Fixed { secs },
            } => write!(f, "slides (fixed {secs}s)"),
            CompositionMode::Slides {
                timing: SlideTiming::Paced,
            } => write!(f, "slides (paced)"),
            CompositionMode::ProviderVideo => write!(f, "provider video"),
        }
    }
}

/// Reconciled placement of one clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reconciled {
    /// Final slot length on the timeline.
    pub slot_secs: f64,

    /// Narration start relative to the slot start. 0 without narration.
    pub audio_offset_secs: f64,

    /// How much narration is heard inside the slot. 0 without narration.
    pub audible_secs: f64,
}

impl Reconciled {
    fn silent(slot_secs: f64) -> Self {
        Self {
            slot_secs,
            audio_offset_secs: 0.0,
            audible_secs: 0.0,
        }
    }

    fn narrated(slot_secs: f64, audio_offset_secs: f64, narration_secs: f64) -> Self {
        let audible_secs = narration_secs.min((slot_secs - audio_offset_secs).max(0.0));
        Self {
            slot_secs,
            audio_offset_secs,
            audible_secs,
        }
    }
}

/// Treat zero, negative, and non-finite durations as "no narration".
pub fn effective_narration(narration_secs: Option<f64>) -> Option<f64> {
    narration_secs.filter(|a| a.is_finite() && *a > 0.0)
}

/// Slot for a still-image slide.
pub fn reconcile_slide(
    timing: SlideTiming,
    narration_secs: Option<f64>,
    settings: &ComposeSettings,
) -> Reconciled {
    let narration = effective_narration(narration_secs);

    match (timing, narration) {
        (SlideTiming::Fixed { secs }, None) => Reconciled::silent(secs),
        (SlideTiming::Fixed { secs }, Some(a)) if a <= secs => {
            Reconciled::narrated(secs, (secs - a) / 2.0, a)
        }
        (SlideTiming::Fixed { secs }, Some(a)) => match settings.slide_overflow {
            OverflowPolicy::Truncate => Reconciled::narrated(secs, 0.0, a),
            OverflowPolicy::Extend => Reconciled::narrated(a, 0.0, a),
        },
        (SlideTiming::Paced, None) => Reconciled::silent(settings.fallback_clip_secs),
        (SlideTiming::Paced, Some(a)) => {
            let slot = (a + settings.pad_before_secs + settings.pad_after_secs).max(MIN_SLOT_SECS);
            Reconciled::narrated(slot, settings.pad_before_secs, a)
        }
    }
}

/// Slot for a provider video of native length `video_secs`.
///
/// The video is never truncated. It is only extended when the narration
/// does not fit, and then the narration starts at the slot start.
pub fn reconcile_video(video_secs: f64, narration_secs: Option<f64>) -> Reconciled {
    match effective_narration(narration_secs) {
        Some(a) if a > video_secs => Reconciled::narrated(a, 0.0, a),
        Some(a) => Reconciled::narrated(video_secs, (video_secs - a) / 2.0, a),
        None => Reconciled::silent(video_secs),
    }
}
