//! Compose a plan into a video with subtitles.

use std::io::Write;

use reelsmith_captions::generate_srt;
use reelsmith_common::config::{AppConfig, ComposeSettings, ExtendStrategy, OverflowPolicy};
use reelsmith_common::timecode::frames_for;
use reelsmith_render_engine::export::{
    compose_reel, preview_timeline, ComposeJob, ComposeProgress, ComposeStage, OutputTarget,
    ProgressCallback,
};
use reelsmith_render_engine::{CompositionMode, SlideTiming, Timeline};

use super::{asset_layout, plan_path};
use crate::{ComposeArgs, ModeArg};

pub async fn run(config: &AppConfig, args: ComposeArgs) -> anyhow::Result<()> {
    let job = build_job(config, &args)?;

    println!("Composing {}", job.plan_path.display());
    println!("  Mode: {}", job.mode);
    println!(
        "  Canvas: {}x{} @ {}fps",
        job.settings.width, job.settings.height, job.settings.fps
    );

    if args.dry_run {
        let timeline = preview_timeline(&job)?;
        print_timeline(&timeline, job.settings.fps);
        println!();
        print!("{}", generate_srt(&timeline.subtitles));
        return Ok(());
    }

    let progress_cb: ProgressCallback = Box::new(|p: ComposeProgress| {
        let label = match p.stage {
            ComposeStage::Preparing => "Preparing",
            ComposeStage::Segments => "Segments",
            ComposeStage::Encoding => "Encoding",
            ComposeStage::Finalizing => "Finalizing",
            ComposeStage::Complete => "Complete",
        };
        print!(
            "\r  {label}: {:.1}% (ETA: {:.0}s)      ",
            p.progress * 100.0,
            p.eta_secs
        );
        let _ = std::io::stdout().flush();
    });

    let outcome = compose_reel(job, Some(progress_cb)).await;
    println!();
    let outcome = outcome?;

    println!("Composition complete:");
    println!("  Video: {}", outcome.video_path.display());
    println!("  Subtitles: {}", outcome.subtitle_path.display());
    if let Some(vtt) = &outcome.vtt_path {
        println!("  WebVTT: {}", vtt.display());
    }
    println!("  Report: {}", outcome.report_path.display());
    println!(
        "  Duration: {:.3}s across {} clip(s)",
        outcome.timeline.total_secs(),
        outcome.timeline.segments.len()
    );

    Ok(())
}

fn build_job(config: &AppConfig, args: &ComposeArgs) -> anyhow::Result<ComposeJob> {
    let settings = settings_for(&config.compose, args);
    settings.validate()?;

    let mode = match args.mode {
        ModeArg::Slides if args.paced => CompositionMode::Slides {
            timing: SlideTiming::Paced,
        },
        ModeArg::Slides => CompositionMode::Slides {
            timing: SlideTiming::Fixed {
                secs: settings.slide_secs,
            },
        },
        ModeArg::Video => {
            if args.paced || args.slide_duration.is_some() || args.extend_slides {
                tracing::warn!("Slide timing flags have no effect in video mode");
            }
            CompositionMode::ProviderVideo
        }
    };
    if args.freeze && args.mode == ModeArg::Slides {
        tracing::warn!("--freeze only applies to video mode");
    }

    let output = match (&args.out, &args.outdir) {
        (Some(path), _) => OutputTarget::Explicit(path.clone()),
        (None, Some(dir)) => OutputTarget::Auto { dir: dir.clone() },
        (None, None) => OutputTarget::Auto {
            dir: config.renders_dir(),
        },
    };

    Ok(ComposeJob {
        plan_path: plan_path(config, &args.inputs),
        layout: asset_layout(config, &args.inputs),
        mode,
        settings,
        output,
        clip_limit: args.clips,
        write_vtt: args.vtt,
    })
}

fn settings_for(base: &ComposeSettings, args: &ComposeArgs) -> ComposeSettings {
    let mut settings = base.clone();
    if let Some(secs) = args.slide_duration {
        settings.slide_secs = secs;
    }
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(secs) = args.pad_before {
        settings.pad_before_secs = secs;
    }
    if let Some(secs) = args.pad_after {
        settings.pad_after_secs = secs;
    }
    if let Some(secs) = args.fallback_duration {
        settings.fallback_clip_secs = secs;
    }
    if let Some(secs) = args.fade {
        settings.fade_secs = secs;
    }
    if let Some(width) = args.black_width {
        settings.black_width = width;
    }
    if let Some(height) = args.black_height {
        settings.black_height = height;
    }
    if let Some(kbps) = args.video_bitrate {
        settings.video_bitrate_kbps = kbps;
    }
    if let Some(kbps) = args.audio_bitrate {
        settings.audio_bitrate_kbps = kbps;
    }
    if let Some(rate) = args.sample_rate {
        settings.audio_sample_rate = rate;
    }
    if args.extend_slides {
        settings.slide_overflow = OverflowPolicy::Extend;
    }
    if args.freeze {
        settings.video_extension = ExtendStrategy::Freeze;
    }
    settings
}

fn print_timeline(timeline: &Timeline, fps: u32) {
    println!();
    println!(
        "{:>5}  {:>9}  {:>9}  {:>7}  {:>9}  {:>9}  visual",
        "clip", "start", "slot", "frames", "offset", "audible"
    );
    for s in &timeline.segments {
        println!(
            "{:>5}  {:>9.3}  {:>9.3}  {:>7}  {:>9.3}  {:>9.3}  {}",
            s.clip_index,
            s.start_secs,
            s.duration_secs,
            frames_for(s.duration_secs, fps),
            s.audio_offset_secs,
            s.audible_secs,
            s.visual.kind()
        );
    }
    println!(
        "Total: {:.3}s ({} frames)",
        timeline.total_secs(),
        frames_for(timeline.total_secs(), fps)
    );
}
