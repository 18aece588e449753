//! ffmpeg/ffprobe process plumbing.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use reelsmith_common::error::{ReelError, ReelResult};
use reelsmith_common::timecode::ffmpeg_secs;
use reelsmith_plan_model::assets::AudioEncoding;
use serde::Deserialize;

use crate::media::{MediaTools, VideoInfo, G711_SAMPLE_RATE};

/// Lines of stderr kept in a tool failure.
const STDERR_TAIL_LINES: usize = 12;

/// [`MediaTools`] backed by the `ffmpeg` and `ffprobe` binaries on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTools;

impl FfmpegTools {
    pub fn new() -> Self {
        Self
    }
}

impl MediaTools for FfmpegTools {
    fn probe_duration(&self, path: &Path, encoding: AudioEncoding) -> ReelResult<f64> {
        if encoding != AudioEncoding::Container {
            // One byte per sample, mono.
            let bytes = std::fs::metadata(path)?.len();
            return Ok(bytes as f64 / G711_SAMPLE_RATE as f64);
        }

        let mut args = vec!["-v".to_string(), "error".to_string()];
        args.extend(
            [
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ]
            .map(String::from),
        );
        args.push(path.to_string_lossy().to_string());

        let output = run_tool("ffprobe", &args)?;
        let raw = String::from_utf8_lossy(&output.stdout);
        let line = raw.lines().next().unwrap_or_default().trim();
        line.parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
            .ok_or_else(|| ReelError::render(format!("ffprobe reported no duration ({line:?})")))
    }

    fn probe_video(&self, path: &Path) -> ReelResult<VideoInfo> {
        let args: Vec<String> = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:format=duration",
            "-of",
            "json",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(path.to_string_lossy().to_string()))
        .collect();

        let output = run_tool("ffprobe", &args)?;
        parse_probe_json(&output.stdout)
    }

    fn decode_first_frame(&self, path: &Path) -> ReelResult<()> {
        let args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-v",
            "error",
            "-xerror",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain([
            path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ])
        .collect();

        run_tool("ffmpeg", &args).map(|_| ())
    }

    fn normalize(&self, source: &Path, target: &Path, fps: u32) -> ReelResult<()> {
        let args = normalize_args(source, target, fps);
        tracing::debug!(args = ?args, "Normalizing video");
        run_tool("ffmpeg", &args).map(|_| ())
    }

    fn extract_frame(&self, video: &Path, at_secs: f64, target: &Path) -> ReelResult<()> {
        let args: Vec<String> = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            ffmpeg_secs(at_secs),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-update".to_string(),
            "1".to_string(),
            target.to_string_lossy().to_string(),
        ];
        run_tool("ffmpeg", &args)?;

        // ffmpeg exits 0 with no output when the seek lands past the last frame.
        match std::fs::metadata(target) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(ReelError::render(format!(
                "no frame decoded at {at_secs:.3}s of {}",
                video.display()
            ))),
        }
    }
}

/// Arguments re-encoding a provider video into H.264 yuv420p / AAC with
/// even dimensions, a fixed frame rate, and the index at the front.
pub fn normalize_args(source: &Path, target: &Path, fps: u32) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        source.to_string_lossy().to_string(),
        "-vf".to_string(),
        format!("scale=trunc(iw/2)*2:trunc(ih/2)*2,fps={fps}"),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-profile:v".to_string(),
        "high".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        target.to_string_lossy().to_string(),
    ]
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_json(stdout: &[u8]) -> ReelResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| ReelError::render("no video stream"))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(ReelError::render("video stream has no frame size")),
    };

    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ReelError::render("video has no usable duration"))?;

    Ok(VideoInfo {
        duration_secs,
        width,
        height,
    })
}

/// Run a tool to completion, turning a non-zero exit into [`ReelError::Tool`].
pub(crate) fn run_tool(program: &str, args: &[String]) -> ReelResult<std::process::Output> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ReelError::render(format!("Failed to start {program}: {e}")))?;

    if !output.status.success() {
        return Err(ReelError::Tool {
            program: program.to_string(),
            code: output.status.code(),
            stderr: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
        });
    }
    Ok(output)
}

/// Run ffmpeg with `-progress pipe:1`, reporting encoded seconds as they
/// advance.
pub(crate) fn run_ffmpeg_with_progress(
    args: &[String],
    mut on_progress: impl FnMut(&ProgressState),
) -> ReelResult<()> {
    tracing::debug!(args = ?args, "Running ffmpeg");
    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReelError::render(format!("Failed to start ffmpeg: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ReelError::render("Failed to capture ffmpeg stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ReelError::render("Failed to capture ffmpeg stderr"))?;

    // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
    let stderr_task = std::thread::spawn(move || -> String {
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    });

    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    let mut state = ProgressState::default();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|e| ReelError::render(format!("Failed reading ffmpeg progress: {e}")))?;
        if bytes == 0 {
            break;
        }

        if let Some((key, value)) = line.trim().split_once('=') {
            state.update(key, value);
            if key == "progress" {
                on_progress(&state);
            }
        }
    }

    let status = child
        .wait()
        .map_err(|e| ReelError::render(format!("Failed to wait on ffmpeg: {e}")))?;
    let stderr_output = stderr_task
        .join()
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

    if !status.success() {
        return Err(ReelError::Tool {
            program: "ffmpeg".to_string(),
            code: status.code(),
            stderr: stderr_tail(&stderr_output),
        });
    }
    Ok(())
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Latest values from an ffmpeg `-progress` stream.
#[derive(Debug, Default, Clone)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_probe_json() {
        let json = br#"{"programs":[],"streams":[{"width":1280,"height":720}],"format":{"duration":"8.000000"}}"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert!((info.duration_secs - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_json_requires_stream_and_duration() {
        assert!(parse_probe_json(br#"{"streams":[],"format":{"duration":"1.0"}}"#).is_err());
        assert!(parse_probe_json(br#"{"streams":[{"width":2,"height":2}],"format":{"duration":"N/A"}}"#).is_err());
        assert!(parse_probe_json(b"garbage").is_err());
    }

    #[test]
    fn test_normalize_args_force_even_size_and_fps() {
        let args = normalize_args(
            &PathBuf::from("video_provider/clip3.mp4"),
            &PathBuf::from("video_provider/clip3.norm.mp4"),
            30,
        );
        assert!(args.contains(&"scale=trunc(iw/2)*2:trunc(ih/2)*2,fps=30".to_string()));
        assert!(args.contains(&"yuv420p".to_string()));
        assert!(args.contains(&"+faststart".to_string()));
        assert_eq!(args.last().unwrap(), "video_provider/clip3.norm.mp4");
    }

    #[test]
    fn test_progress_state_parses_microseconds() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("progress", "continue");
        assert!(!state.complete);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let noisy: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(&noisy);
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 29"));
    }
}
