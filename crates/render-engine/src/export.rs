//! Composition jobs and the rendering entry point.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reelsmith_captions::save_subtitles;
use reelsmith_common::config::ComposeSettings;
use reelsmith_common::error::{ReelError, ReelResult};
use reelsmith_plan_model::assets::AssetLayout;
use reelsmith_plan_model::naming::{make_slug, next_numbered_path, sidecar_path};
use reelsmith_plan_model::plan::Plan;
use serde::Serialize;

use crate::backend::FfmpegBackend;
use crate::extend::VisualPlan;
use crate::ffmpeg::FfmpegTools;
use crate::media::MediaTools;
use crate::reconcile::CompositionMode;
use crate::timeline::{Composer, Timeline};

/// Where the rendered video goes.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    /// `<dir>/<slug>_NNN.mp4`, slug derived from the plan title.
    Auto { dir: PathBuf },
    /// Exactly this path.
    Explicit(PathBuf),
}

/// A composition run ready to be rendered.
#[derive(Debug, Clone)]
pub struct ComposeJob {
    pub plan_path: PathBuf,

    pub layout: AssetLayout,

    pub mode: CompositionMode,

    pub settings: ComposeSettings,

    pub output: OutputTarget,

    /// Only compose the first N clips.
    pub clip_limit: Option<usize>,

    /// Also write a WebVTT sidecar.
    pub write_vtt: bool,
}

/// Progress callback for composition.
pub type ProgressCallback = Box<dyn Fn(ComposeProgress) + Send>;

/// Composition progress report.
#[derive(Debug, Clone)]
pub struct ComposeProgress {
    pub stage: ComposeStage,

    /// Progress within the stage [0.0, 1.0].
    pub progress: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,
}

/// Stages of a composition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeStage {
    Preparing,
    Segments,
    Encoding,
    Finalizing,
    Complete,
}

/// What a backend renders.
pub struct RenderRequest<'a> {
    pub timeline: &'a Timeline,
    pub settings: &'a ComposeSettings,

    /// File to write. Callers rename it into place on success.
    pub output: &'a Path,

    /// Scratch directory for intermediates, removed after the run.
    pub work_dir: &'a Path,
}

/// Trait for render backends.
pub trait RenderBackend: Send {
    /// Render the timeline to `request.output`.
    fn render(&mut self, request: &RenderRequest<'_>, progress: Option<&ProgressCallback>) -> ReelResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Files produced by a successful run.
#[derive(Debug, Clone)]
pub struct ComposeOutcome {
    pub video_path: PathBuf,
    pub subtitle_path: PathBuf,
    pub vtt_path: Option<PathBuf>,
    pub report_path: PathBuf,
    pub timeline: Timeline,
}

/// Per-clip row of the timeline report.
#[derive(Debug, Clone, Serialize)]
pub struct ClipReport {
    pub clip_index: u32,
    pub start_secs: f64,
    pub slot_secs: f64,
    pub audio_offset_secs: f64,
    pub audible_secs: f64,
    pub narration: Option<PathBuf>,
    pub visual: VisualPlan,
}

/// `<output>.timeline.json`
#[derive(Debug, Clone, Serialize)]
pub struct TimelineReport {
    pub generated_at: DateTime<Utc>,
    pub output: PathBuf,
    pub mode: CompositionMode,
    pub total_secs: f64,
    pub clips: Vec<ClipReport>,
}

impl TimelineReport {
    pub fn new(timeline: &Timeline, output: &Path) -> Self {
        Self {
            generated_at: Utc::now(),
            output: output.to_path_buf(),
            mode: timeline.mode,
            total_secs: timeline.total_secs(),
            clips: timeline
                .segments
                .iter()
                .map(|s| ClipReport {
                    clip_index: s.clip_index,
                    start_secs: s.start_secs,
                    slot_secs: s.duration_secs,
                    audio_offset_secs: s.audio_offset_secs,
                    audible_secs: s.audible_secs,
                    narration: s.narration.as_ref().map(|n| n.path.clone()),
                    visual: s.visual.clone(),
                })
                .collect(),
        }
    }
}

/// Sibling written during the render: `final.mp4` -> `final.partial.mp4`.
pub fn partial_path(output: &Path) -> PathBuf {
    output.with_extension("partial.mp4")
}

fn report(progress: Option<&ProgressCallback>, stage: ComposeStage, value: f64) {
    if let Some(cb) = progress {
        cb(ComposeProgress {
            stage,
            progress: value,
            eta_secs: 0.0,
        });
    }
}

fn load_plan(job: &ComposeJob) -> ReelResult<Plan> {
    let plan = Plan::load(&job.plan_path)?;
    if plan.clips_limited(job.clip_limit).is_empty() {
        return Err(ReelError::EmptyPlan {
            path: job.plan_path.clone(),
        });
    }
    Ok(plan)
}

fn resolve_output(target: &OutputTarget, title: &str) -> ReelResult<PathBuf> {
    let path = match target {
        OutputTarget::Explicit(path) => path.clone(),
        OutputTarget::Auto { dir } => next_numbered_path(dir, &make_slug(title), "mp4")?,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}

fn work_dir() -> ReelResult<tempfile::TempDir> {
    Ok(tempfile::Builder::new().prefix("reelsmith-").tempdir()?)
}

/// Assemble the timeline without rendering anything.
pub fn preview_timeline_with<M: MediaTools + ?Sized>(job: &ComposeJob, tools: &M) -> ReelResult<Timeline> {
    let plan = load_plan(job)?;
    let work = work_dir()?;
    Composer::new(tools, &job.layout, &job.settings, job.mode, work.path())
        .compose(plan.clips_limited(job.clip_limit))
}

/// [`preview_timeline_with`] using ffprobe for media inspection.
pub fn preview_timeline(job: &ComposeJob) -> ReelResult<Timeline> {
    preview_timeline_with(job, &FfmpegTools::new())
}

/// Run a full composition with the given media tools and backend.
///
/// The video is rendered to a `.partial.mp4` sibling and renamed into place
/// only after the backend succeeds; subtitles and the report follow.
pub fn compose_with<M: MediaTools + ?Sized>(
    job: &ComposeJob,
    tools: &M,
    backend: &mut dyn RenderBackend,
    progress: Option<&ProgressCallback>,
) -> ReelResult<ComposeOutcome> {
    report(progress, ComposeStage::Preparing, 0.0);
    let plan = load_plan(job)?;
    let work = work_dir()?;

    let timeline = Composer::new(tools, &job.layout, &job.settings, job.mode, work.path())
        .compose(plan.clips_limited(job.clip_limit))?;

    let output = resolve_output(&job.output, &plan.title)?;
    let partial = partial_path(&output);
    tracing::info!(
        output = %output.display(),
        backend = backend.name(),
        total_secs = timeline.total_secs(),
        "Rendering"
    );

    let request = RenderRequest {
        timeline: &timeline,
        settings: &job.settings,
        output: &partial,
        work_dir: work.path(),
    };
    if let Err(err) = backend.render(&request, progress) {
        if partial.exists() {
            if let Err(rm) = std::fs::remove_file(&partial) {
                tracing::warn!(path = %partial.display(), error = %rm, "Failed to remove partial output");
            }
        }
        return Err(err);
    }

    report(progress, ComposeStage::Finalizing, 1.0);
    if !partial.is_file() {
        return Err(ReelError::render(format!(
            "Backend {} produced no output at {}",
            backend.name(),
            partial.display()
        )));
    }
    std::fs::rename(&partial, &output)?;

    let subtitle_path = sidecar_path(&output, "srt");
    save_subtitles(&timeline.subtitles, &subtitle_path)?;
    let vtt_path = if job.write_vtt {
        let path = sidecar_path(&output, "vtt");
        save_subtitles(&timeline.subtitles, &path)?;
        Some(path)
    } else {
        None
    };

    let report_path = sidecar_path(&output, "timeline.json");
    let json = serde_json::to_string_pretty(&TimelineReport::new(&timeline, &output))?;
    std::fs::write(&report_path, json)?;

    report(progress, ComposeStage::Complete, 1.0);
    tracing::info!(
        output = %output.display(),
        subtitles = %subtitle_path.display(),
        "Composition complete"
    );

    Ok(ComposeOutcome {
        video_path: output,
        subtitle_path,
        vtt_path,
        report_path,
        timeline,
    })
}

/// Compose the reel with ffmpeg.
///
/// This is the main entry point for rendering.
pub async fn compose_reel(job: ComposeJob, progress: Option<ProgressCallback>) -> ReelResult<ComposeOutcome> {
    tracing::info!(
        plan = %job.plan_path.display(),
        mode = %job.mode,
        "Starting composition"
    );

    tokio::task::spawn_blocking(move || {
        let mut backend = FfmpegBackend::new();
        if !backend.is_available() {
            return Err(ReelError::unsupported(
                "No supported render backend found (expected ffmpeg and ffprobe in PATH)",
            ));
        }
        tracing::info!(backend = backend.name(), "Using render backend");
        compose_with(&job, &FfmpegTools::new(), &mut backend, progress.as_ref())
    })
    .await
    .map_err(|e| ReelError::render(format!("Composition task failed: {e}")))?
}
