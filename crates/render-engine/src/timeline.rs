//! Timeline assembly.
//!
//! Clips are processed strictly in plan order: each clip's slot length
//! advances the cursor that the next clip's subtitle timing starts from.

use std::path::{Path, PathBuf};

use reelsmith_captions::SubtitleEntry;
use reelsmith_common::config::{ComposeSettings, ExtendStrategy};
use reelsmith_common::error::{ReelError, ReelResult};
use reelsmith_common::timecode::approx_eq;
use reelsmith_plan_model::assets::{AssetLayout, AssetRole, AudioEncoding};
use reelsmith_plan_model::plan::Clip;

use crate::extend::{self, VisualPlan};
use crate::media::MediaTools;
use crate::normalize::SourceNormalizer;
use crate::reconcile::{self, CompositionMode, Reconciled};

/// A readable narration track for one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub path: PathBuf,
    pub encoding: AudioEncoding,
    pub duration_secs: f64,
}

/// One clip's slot on the final timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub clip_index: u32,

    /// Slot start on the final timeline.
    pub start_secs: f64,

    /// Slot length. Equals `visual.duration_secs()`.
    pub duration_secs: f64,

    pub visual: VisualPlan,

    pub narration: Option<Narration>,

    /// Narration start relative to `start_secs`.
    pub audio_offset_secs: f64,

    /// Narration heard inside the slot.
    pub audible_secs: f64,
}

impl Segment {
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// The assembled composition: segments in plan order plus their cues.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub mode: CompositionMode,
    pub segments: Vec<Segment>,
    pub subtitles: Vec<SubtitleEntry>,
}

impl Timeline {
    /// Total rendered length: the sum of all slot lengths.
    pub fn total_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Running cursor plus the growing segment and cue lists.
#[derive(Debug, Default)]
pub struct TimelineAssembler {
    cursor_secs: f64,
    segments: Vec<Segment>,
    subtitles: Vec<SubtitleEntry>,
}

impl TimelineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_secs(&self) -> f64 {
        self.cursor_secs
    }

    /// Append one clip and advance the cursor by its slot.
    ///
    /// The cue spans the audible narration, or the whole slot for a silent
    /// clip.
    pub fn append(
        &mut self,
        clip_index: u32,
        visual: VisualPlan,
        narration: Option<Narration>,
        placement: Reconciled,
        caption: String,
    ) -> &Segment {
        debug_assert!(approx_eq(visual.duration_secs(), placement.slot_secs));

        let start = self.cursor_secs;
        let (cue_start, cue_end) = match &narration {
            Some(_) => {
                let cue_start = start + placement.audio_offset_secs;
                (cue_start, cue_start + placement.audible_secs)
            }
            None => (start, start + placement.slot_secs),
        };

        tracing::debug!(
            clip = clip_index,
            start_secs = start,
            slot_secs = placement.slot_secs,
            offset_secs = placement.audio_offset_secs,
            visual = visual.kind(),
            "Appending segment"
        );

        self.subtitles
            .push(SubtitleEntry::new(cue_start, cue_end, caption));
        self.segments.push(Segment {
            clip_index,
            start_secs: start,
            duration_secs: placement.slot_secs,
            visual,
            narration,
            audio_offset_secs: placement.audio_offset_secs,
            audible_secs: placement.audible_secs,
        });
        self.cursor_secs += placement.slot_secs;

        &self.segments[self.segments.len() - 1]
    }

    pub fn finish(self, mode: CompositionMode) -> Timeline {
        Timeline {
            mode,
            segments: self.segments,
            subtitles: self.subtitles,
        }
    }
}

/// Builds a [`Timeline`] from plan clips and their on-disk assets.
pub struct Composer<'a, M: MediaTools + ?Sized> {
    tools: &'a M,
    layout: &'a AssetLayout,
    settings: &'a ComposeSettings,
    mode: CompositionMode,
    frame_dir: &'a Path,
}

impl<'a, M: MediaTools + ?Sized> Composer<'a, M> {
    /// `frame_dir` receives frames grabbed for freeze extension.
    pub fn new(
        tools: &'a M,
        layout: &'a AssetLayout,
        settings: &'a ComposeSettings,
        mode: CompositionMode,
        frame_dir: &'a Path,
    ) -> Self {
        Self {
            tools,
            layout,
            settings,
            mode,
            frame_dir,
        }
    }

    /// Single sequential pass over `clips`. The first fatal clip error
    /// aborts the pass, tagged with that clip's index.
    pub fn compose(&self, clips: &[Clip]) -> ReelResult<Timeline> {
        self.settings.validate()?;
        tracing::info!(mode = %self.mode, clips = clips.len(), "Assembling timeline");

        let mut assembler = TimelineAssembler::new();
        for (position, clip) in clips.iter().enumerate() {
            let index = clip.index_or(position as u32 + 1);
            self.compose_clip(&mut assembler, index, clip)
                .map_err(|e| e.for_clip(index))?;
        }

        let timeline = assembler.finish(self.mode);
        tracing::info!(
            segments = timeline.segments.len(),
            total_secs = timeline.total_secs(),
            "Timeline assembled"
        );
        Ok(timeline)
    }

    fn compose_clip(
        &self,
        assembler: &mut TimelineAssembler,
        index: u32,
        clip: &Clip,
    ) -> ReelResult<()> {
        let narration = match self.narration(index) {
            Ok(narration) => narration,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(clip = index, error = %err, "Treating clip as silent");
                None
            }
            Err(err) => return Err(err),
        };
        let narration_secs = narration.as_ref().map(|n| n.duration_secs);

        let (visual, placement) = match self.mode {
            CompositionMode::Slides { timing } => {
                let image = self.layout.require(AssetRole::Image, index)?;
                let placement = reconcile::reconcile_slide(timing, narration_secs, self.settings);
                (extend::still(&image, placement.slot_secs), placement)
            }
            CompositionMode::ProviderVideo => {
                let source = self.layout.require(AssetRole::Video, index)?;
                let opened = SourceNormalizer::new(self.tools, self.settings.fps).open(&source)?;
                let placement = reconcile::reconcile_video(opened.info.duration_secs, narration_secs);
                let visual = match self.settings.video_extension {
                    ExtendStrategy::BlackPad => {
                        extend::black_pad(&opened, placement.slot_secs, self.settings)
                    }
                    ExtendStrategy::Freeze => {
                        let outcome = extend::freeze_extend(
                            self.tools,
                            &opened,
                            placement.slot_secs,
                            self.settings,
                            self.frame_dir,
                            index,
                        );
                        for failure in &outcome.failures {
                            tracing::warn!(
                                clip = index,
                                at_secs = failure.at_secs,
                                error = %failure.error,
                                "Frame grab failed, falling back"
                            );
                        }
                        outcome.visual
                    }
                };
                (visual, placement)
            }
        };

        let narration = narration.filter(|_| placement.audible_secs > 0.0);
        assembler.append(index, visual, narration, placement, clip.caption_text());
        Ok(())
    }

    /// Resolve and measure the clip's narration. `None` is a silent clip.
    fn narration(&self, index: u32) -> ReelResult<Option<Narration>> {
        let Some(asset) = self.layout.resolve_audio(index) else {
            return Ok(None);
        };
        let duration_secs = self
            .tools
            .probe_duration(&asset.path, asset.encoding)
            .map_err(|e| ReelError::AudioRead {
                path: asset.path.clone(),
                message: e.to_string(),
            })?;
        Ok(Some(Narration {
            path: asset.path,
            encoding: asset.encoding,
            duration_secs,
        }))
    }
}
