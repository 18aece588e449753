//! ffmpeg render backend.
//!
//! Every segment is encoded to an intermediate MP4 (canvas size, fixed fps,
//! stereo AAC) holding a whole number of frames: the slot's start and end
//! are each snapped to the frame grid, so the concatenated picture stays
//! within half a frame of the subtitle cursor however many clips there
//! are. The intermediates are then joined in order with the concat demuxer
//! and re-encoded once.

use std::path::{Path, PathBuf};
use std::time::Instant;

use reelsmith_common::config::ComposeSettings;
use reelsmith_common::error::ReelResult;
use reelsmith_common::timecode::{ffmpeg_secs, frame_span, secs_to_millis};

use crate::export::{ComposeProgress, ComposeStage, ProgressCallback, RenderBackend, RenderRequest};
use crate::extend::{HeldFrame, VisualPlan};
use crate::ffmpeg::{command_exists, run_ffmpeg_with_progress, run_tool, ProgressState};
use crate::media::input_format_args;
use crate::timeline::Segment;

/// Renders timelines with the `ffmpeg` binary.
#[derive(Debug, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }

    fn render_segment(&self, segment: &Segment, settings: &ComposeSettings, target: &Path) -> ReelResult<()> {
        let args = segment_args(segment, settings, target);
        tracing::debug!(clip = segment.clip_index, args = ?args, "Encoding segment");
        run_tool("ffmpeg", &args)?;
        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(&mut self, request: &RenderRequest<'_>, progress: Option<&ProgressCallback>) -> ReelResult<()> {
        let started = Instant::now();
        let segments = &request.timeline.segments;
        let total_secs = request.timeline.total_secs();

        let mut parts = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if let Some(cb) = progress {
                cb(ComposeProgress {
                    stage: ComposeStage::Segments,
                    progress: i as f64 / segments.len() as f64,
                    eta_secs: 0.0,
                });
            }
            let part = request
                .work_dir
                .join(format!("segment_{:03}.mp4", i + 1));
            self.render_segment(segment, request.settings, &part)
                .map_err(|e| e.for_clip(segment.clip_index))?;
            parts.push(part);
        }
        tracing::info!(
            segments = parts.len(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Segments encoded"
        );

        let list_path = request.work_dir.join("concat.txt");
        std::fs::write(&list_path, concat_list(&parts))?;

        let args = concat_args(&list_path, request.output, request.settings);
        let encode_started = Instant::now();
        run_ffmpeg_with_progress(&args, |state| {
            if let Some(cb) = progress {
                cb(progress_report(
                    state,
                    total_secs,
                    encode_started.elapsed().as_secs_f64(),
                ));
            }
        })?;

        tracing::info!(
            output = %request.output.display(),
            total_secs,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Render finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg") && command_exists("ffprobe")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Scale into the canvas keeping aspect, pad with black, fixed fps.
fn canvas_filter(settings: &ComposeSettings) -> String {
    let (w, h) = (settings.width, settings.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={},format=yuv420p",
        settings.fps
    )
}

fn push_args(args: &mut Vec<String>, values: &[&str]) {
    args.extend(values.iter().map(|v| v.to_string()));
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn still_input(args: &mut Vec<String>, image: &Path, secs: f64, fps: u32) {
    push_args(args, &["-loop", "1", "-framerate"]);
    args.push(fps.to_string());
    args.push("-t".to_string());
    args.push(ffmpeg_secs(secs));
    args.push("-i".to_string());
    args.push(path_arg(image));
}

fn black_input(args: &mut Vec<String>, width: u32, height: u32, secs: f64, fps: u32) {
    push_args(args, &["-f", "lavfi", "-i"]);
    args.push(format!(
        "color=c=black:s={width}x{height}:r={fps}:d={}",
        ffmpeg_secs(secs)
    ));
}

/// Input arguments and video filtergraph for a visual plan. The graph ends
/// in the `[vbody]` label.
fn visual_args(visual: &VisualPlan, settings: &ComposeSettings) -> (Vec<String>, String) {
    let canvas = canvas_filter(settings);
    let fps = settings.fps;
    let mut args = vec![];

    let graph = match visual {
        VisualPlan::Still { image, secs } => {
            still_input(&mut args, image, *secs, fps);
            format!("[0:v]{canvas},trim=duration={}[vbody]", ffmpeg_secs(*secs))
        }
        VisualPlan::Trimmed { video, secs } => {
            args.push("-i".to_string());
            args.push(path_arg(video));
            format!(
                "[0:v]trim=duration={},setpts=PTS-STARTPTS,{canvas}[vbody]",
                ffmpeg_secs(*secs)
            )
        }
        VisualPlan::Frozen {
            video,
            native_secs,
            hold,
            hold_secs,
            ..
        } => {
            args.push("-i".to_string());
            args.push(path_arg(video));
            match hold {
                HeldFrame::Last { image, .. } | HeldFrame::First { image } => {
                    still_input(&mut args, image, *hold_secs, fps)
                }
                HeldFrame::Black { width, height } => {
                    black_input(&mut args, *width, *height, *hold_secs, fps)
                }
            }
            format!(
                "[0:v]trim=duration={},setpts=PTS-STARTPTS,{canvas}[v0];\
                 [1:v]{canvas},trim=duration={}[v1];[v0][v1]concat=n=2:v=1:a=0[vbody]",
                ffmpeg_secs(*native_secs),
                ffmpeg_secs(*hold_secs)
            )
        }
        VisualPlan::BlackPadded {
            video,
            native_secs,
            fade_secs,
            pad_secs,
            width,
            height,
            ..
        } => {
            args.push("-i".to_string());
            args.push(path_arg(video));
            black_input(&mut args, *width, *height, *pad_secs, fps);
            let fade = if *fade_secs > 0.0 {
                format!(
                    "fade=t=out:st={}:d={},",
                    ffmpeg_secs(native_secs - fade_secs),
                    ffmpeg_secs(*fade_secs)
                )
            } else {
                String::new()
            };
            format!(
                "[0:v]trim=duration={},setpts=PTS-STARTPTS,{fade}{canvas}[v0];\
                 [1:v]{canvas}[v1];[v0][v1]concat=n=2:v=1:a=0[vbody]",
                ffmpeg_secs(*native_secs)
            )
        }
    };

    (args, graph)
}

/// Whole frames a segment occupies in the rendered output.
pub fn segment_frames(segment: &Segment, fps: u32) -> u64 {
    frame_span(segment.start_secs, segment.end_secs(), fps).max(1)
}

/// Full argument vector for encoding one segment to `target`.
pub fn segment_args(segment: &Segment, settings: &ComposeSettings, target: &Path) -> Vec<String> {
    let frames = segment_frames(segment, settings.fps);
    let slot = ffmpeg_secs(frames as f64 / settings.fps as f64);
    let rate = settings.audio_sample_rate;

    let mut args = vec![];
    push_args(&mut args, &["-y", "-hide_banner", "-nostdin", "-loglevel", "error"]);

    let (visual_inputs, video_graph) = visual_args(&segment.visual, settings);
    let audio_input = visual_inputs.iter().filter(|a| *a == "-i").count();
    args.extend(visual_inputs);

    let audio_graph = match &segment.narration {
        Some(narration) => {
            args.extend(input_format_args(narration.encoding));
            args.push("-i".to_string());
            args.push(path_arg(&narration.path));
            let delay_ms = secs_to_millis(segment.audio_offset_secs);
            format!(
                "[{audio_input}:a]aresample={rate},aformat=channel_layouts=stereo,\
                 adelay={delay_ms}:all=1,apad,atrim=duration={slot}[a]"
            )
        }
        None => {
            push_args(&mut args, &["-f", "lavfi", "-t"]);
            args.push(slot.clone());
            args.push("-i".to_string());
            args.push(format!("anullsrc=channel_layout=stereo:sample_rate={rate}"));
            format!("[{audio_input}:a]atrim=duration={slot}[a]")
        }
    };

    // Hold the last picture so a visual that ends a fraction early still
    // fills every frame of the slot.
    let frame_fit = format!(
        "[vbody]tpad=stop_mode=clone:stop=-1,trim=end_frame={frames},setpts=PTS-STARTPTS[v]"
    );
    args.push("-filter_complex".to_string());
    args.push(format!("{video_graph};{frame_fit};{audio_graph}"));
    push_args(
        &mut args,
        &[
            "-map", "[v]", "-map", "[a]", "-c:v", "libx264", "-preset", "veryfast", "-crf", "18",
            "-pix_fmt", "yuv420p", "-r",
        ],
    );
    args.push(settings.fps.to_string());
    args.push("-frames:v".to_string());
    args.push(frames.to_string());
    push_args(&mut args, &["-c:a", "aac", "-ac", "2", "-ar"]);
    args.push(rate.to_string());
    args.push("-t".to_string());
    args.push(slot);
    args.push(path_arg(target));
    args
}

/// Concat demuxer list. Single quotes in paths are escaped the way the
/// demuxer expects.
pub fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", path_arg(p).replace('\'', "'\\''")))
        .collect()
}

/// Final encode of the concatenated segments.
pub fn concat_args(list_path: &Path, output: &Path, settings: &ComposeSettings) -> Vec<String> {
    let mut args = vec![];
    push_args(
        &mut args,
        &["-y", "-hide_banner", "-nostdin", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"],
    );
    args.push(path_arg(list_path));
    push_args(
        &mut args,
        &["-c:v", "libx264", "-preset", "medium", "-profile:v", "high", "-pix_fmt", "yuv420p", "-b:v"],
    );
    args.push(format!("{}k", settings.video_bitrate_kbps));
    args.push("-r".to_string());
    args.push(settings.fps.to_string());
    push_args(&mut args, &["-c:a", "aac", "-b:a"]);
    args.push(format!("{}k", settings.audio_bitrate_kbps));
    args.push("-ar".to_string());
    args.push(settings.audio_sample_rate.to_string());
    push_args(
        &mut args,
        &["-movflags", "+faststart", "-f", "mp4", "-progress", "pipe:1", "-nostats"],
    );
    args.push(path_arg(output));
    args
}

fn progress_report(state: &ProgressState, total_secs: f64, elapsed_secs: f64) -> ComposeProgress {
    let progress = if total_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / total_secs).clamp(0.0, 1.0)
    };
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ComposeProgress {
        stage: ComposeStage::Encoding,
        progress: if state.complete { 1.0 } else { progress },
        eta_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extend::still;
    use crate::timeline::Narration;
    use reelsmith_plan_model::assets::AudioEncoding;

    fn segment(visual: VisualPlan, narration: Option<Narration>, offset: f64) -> Segment {
        Segment {
            clip_index: 1,
            start_secs: 0.0,
            duration_secs: visual.duration_secs(),
            audible_secs: narration.as_ref().map(|n| n.duration_secs).unwrap_or(0.0),
            visual,
            narration,
            audio_offset_secs: offset,
        }
    }

    fn graph(args: &[String]) -> &str {
        let i = args.iter().position(|a| a == "-filter_complex").unwrap();
        &args[i + 1]
    }

    #[test]
    fn test_silent_still_uses_null_audio() {
        let seg = segment(still(Path::new("img/clip1.png"), 10.0), None, 0.0);
        let args = segment_args(&seg, &ComposeSettings::default(), Path::new("out.mp4"));

        assert!(args.windows(2).any(|w| w[0] == "-loop" && w[1] == "1"));
        assert!(args.iter().any(|a| a.starts_with("anullsrc=channel_layout=stereo")));
        assert!(graph(&args).contains("[1:a]atrim=duration=10.000000[a]"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_narration_is_delayed_and_padded() {
        let narration = Narration {
            path: PathBuf::from("audio/clip1.mp3"),
            encoding: AudioEncoding::Container,
            duration_secs: 4.0,
        };
        let seg = segment(still(Path::new("img/clip1.png"), 10.0), Some(narration), 3.0);
        let args = segment_args(&seg, &ComposeSettings::default(), Path::new("out.mp4"));

        let graph = graph(&args);
        assert!(graph.contains("adelay=3000:all=1"));
        assert!(graph.contains("apad,atrim=duration=10.000000[a]"));
    }

    #[test]
    fn test_g711_narration_gets_format_hints() {
        let narration = Narration {
            path: PathBuf::from("audio/clip1.ulaw"),
            encoding: AudioEncoding::Mulaw,
            duration_secs: 2.0,
        };
        let seg = segment(still(Path::new("img/clip1.png"), 10.0), Some(narration), 4.0);
        let args = segment_args(&seg, &ComposeSettings::default(), Path::new("out.mp4"));

        let at = args.iter().position(|a| a == "audio/clip1.ulaw").unwrap();
        assert_eq!(&args[at - 7..at], ["-f", "mulaw", "-ar", "8000", "-ac", "1", "-i"]);
    }

    #[test]
    fn test_black_pad_fades_and_concats() {
        let visual = VisualPlan::BlackPadded {
            video: PathBuf::from("v/clip1.mp4"),
            native_secs: 6.0,
            fade_secs: 0.5,
            pad_secs: 3.0,
            width: 1920,
            height: 1080,
            secs: 9.0,
        };
        let seg = segment(visual, None, 0.0);
        let args = segment_args(&seg, &ComposeSettings::default(), Path::new("out.mp4"));

        assert!(args.iter().any(|a| a == "color=c=black:s=1920x1080:r=30:d=3.000000"));
        let graph = graph(&args);
        assert!(graph.contains("fade=t=out:st=5.500000:d=0.500000"));
        assert!(graph.contains("[v0][v1]concat=n=2:v=1:a=0[vbody]"));
        assert!(graph.contains("[2:a]"));
    }

    #[test]
    fn test_frozen_black_hold_uses_configured_size() {
        let visual = VisualPlan::Frozen {
            video: PathBuf::from("v/clip1.mp4"),
            native_secs: 6.0,
            hold: HeldFrame::Black {
                width: 1280,
                height: 720,
            },
            hold_secs: 3.0,
            secs: 9.0,
        };
        let seg = segment(visual, None, 0.0);
        let args = segment_args(&seg, &ComposeSettings::default(), Path::new("out.mp4"));
        assert!(args.iter().any(|a| a == "color=c=black:s=1280x720:r=30:d=3.000000"));
    }

    fn frames_arg(args: &[String]) -> u64 {
        let i = args.iter().position(|a| a == "-frames:v").unwrap();
        args[i + 1].parse().unwrap()
    }

    #[test]
    fn test_segments_land_on_the_frame_grid() {
        let settings = ComposeSettings::default();
        let fps = settings.fps as f64;
        let mut cursor = 0.0;
        let mut rendered_frames = 0;
        for index in 1..=30 {
            let mut seg = segment(still(Path::new("img/clip.png"), 3.31), None, 0.0);
            seg.clip_index = index;
            seg.start_secs = cursor;
            cursor += seg.duration_secs;

            let args = segment_args(&seg, &settings, Path::new("out.mp4"));
            let frames = frames_arg(&args);
            assert!(graph(&args).contains(&format!("trim=end_frame={frames},")));
            rendered_frames += frames;

            let drift = (rendered_frames as f64 / fps - cursor).abs();
            assert!(drift <= 0.5 / fps + 1e-9, "clip {index}: drift {drift}");
        }
        assert_eq!(rendered_frames, 2979);
    }

    #[test]
    fn test_slot_duration_matches_frame_count() {
        let mut seg = segment(still(Path::new("img/clip1.png"), 3.31), None, 0.0);
        seg.start_secs = 3.31;
        let args = segment_args(&seg, &ComposeSettings::default(), Path::new("out.mp4"));

        assert_eq!(frames_arg(&args), 100);
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "3.333333"));
        assert!(graph(&args).contains("atrim=duration=3.333333[a]"));
    }

    #[test]
    fn test_tiny_slot_still_renders_a_frame() {
        let seg = segment(still(Path::new("img/clip1.png"), 0.01), None, 0.0);
        assert_eq!(segment_frames(&seg, 30), 1);
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_concat_args_stream_progress_and_faststart() {
        let args = concat_args(
            Path::new("concat.txt"),
            Path::new("final.partial.mp4"),
            &ComposeSettings::default(),
        );
        assert!(args.windows(2).any(|w| w[0] == "-progress" && w[1] == "pipe:1"));
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "+faststart"));
        assert!(args.windows(2).any(|w| w[0] == "-b:v" && w[1] == "5000k"));
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == "mp4"));
    }

    #[test]
    fn test_progress_report_clamps() {
        let state = ProgressState {
            out_time_secs: 30.0,
            complete: false,
        };
        let report = progress_report(&state, 20.0, 10.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, ComposeStage::Encoding);
    }
}
