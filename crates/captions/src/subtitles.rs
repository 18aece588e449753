//! Subtitle generation in SRT and VTT formats.

use std::path::Path;

use reelsmith_common::error::ReelResult;
use reelsmith_common::timecode::format_hms_millis;
use serde::{Deserialize, Serialize};

/// One timed cue. Display numbers are assigned on output, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    /// Cue start on the final timeline (seconds).
    pub start_secs: f64,

    /// Cue end on the final timeline (seconds).
    pub end_secs: f64,

    /// Cue text as written by the plan.
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Collapse line breaks into spaces and trim, so a cue is a single line.
pub fn escape_cue_text(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Generate SRT subtitle content. Cues are numbered 1..N in slice order.
pub fn generate_srt(entries: &[SubtitleEntry]) -> String {
    let mut output = String::new();

    for (i, entry) in entries.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(entry.start_secs),
            format_srt_time(entry.end_secs),
        ));
        output.push_str(&escape_cue_text(&entry.text));
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content.
pub fn generate_vtt(entries: &[SubtitleEntry]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for entry in entries {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(entry.start_secs),
            format_vtt_time(entry.end_secs),
        ));
        output.push_str(&escape_cue_text(&entry.text));
        output.push_str("\n\n");
    }

    output
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
pub fn format_srt_time(secs: f64) -> String {
    format_hms_millis(secs, ',')
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
pub fn format_vtt_time(secs: f64) -> String {
    format_hms_millis(secs, '.')
}

/// Save subtitles to a file. The format follows the extension (`.vtt`,
/// anything else is SRT).
pub fn save_subtitles(entries: &[SubtitleEntry], path: &Path) -> ReelResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(entries),
        _ => generate_srt(entries),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), cues = entries.len(), "Wrote subtitles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_srt_generation() {
        let entries = vec![
            SubtitleEntry::new(3.0, 7.0, "Hello world"),
            SubtitleEntry::new(10.0, 12.25, "This is\na test  "),
        ];

        let srt = generate_srt(&entries);
        assert_eq!(
            srt,
            "1\n00:00:03,000 --> 00:00:07,000\nHello world\n\n\
             2\n00:00:10,000 --> 00:00:12,250\nThis is a test\n\n"
        );
    }

    #[test]
    fn test_vtt_generation() {
        let entries = vec![SubtitleEntry::new(61.5, 63.0, "One minute in")];

        let vtt = generate_vtt(&entries);
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:01:01.500 --> 00:01:03.000"));
    }

    #[test]
    fn test_time_formatting_rounds_to_millis() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        assert_eq!(format_srt_time(1.0006), "00:00:01,001");
        assert_eq!(format_srt_time(4.9999), "00:00:05,000");
        assert_eq!(format_vtt_time(3661.5), "01:01:01.500");
    }

    #[test]
    fn test_escape_collapses_newlines() {
        assert_eq!(escape_cue_text("  a\r\nb\nc \n"), "a b c");
    }

    #[test]
    fn test_save_subtitles_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![SubtitleEntry::new(0.0, 1.0, "x")];

        let srt_path = dir.path().join("reel_001.srt");
        save_subtitles(&entries, &srt_path).unwrap();
        let srt = std::fs::read_to_string(&srt_path).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,000\n"));

        let vtt_path = dir.path().join("reel_001.vtt");
        save_subtitles(&entries, &vtt_path).unwrap();
        let vtt = std::fs::read_to_string(&vtt_path).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n"));
    }

    proptest! {
        #[test]
        fn srt_numbers_cues_sequentially(count in 1usize..40) {
            let entries: Vec<SubtitleEntry> = (0..count)
                .map(|i| SubtitleEntry::new(i as f64, i as f64 + 0.5, format!("cue {i}")))
                .collect();
            let srt = generate_srt(&entries);
            let blocks: Vec<&str> = srt.trim_end().split("\n\n").collect();
            prop_assert_eq!(blocks.len(), count);
            for (i, block) in blocks.iter().enumerate() {
                let first_line = block.lines().next().unwrap();
                prop_assert_eq!(first_line, (i + 1).to_string());
            }
        }

        #[test]
        fn srt_timestamp_shape(secs in 0.0f64..400_000.0) {
            let ts = format_srt_time(secs);
            let (hms, millis) = ts.rsplit_once(',').unwrap();
            prop_assert_eq!(millis.len(), 3);
            let parts: Vec<&str> = hms.split(':').collect();
            prop_assert_eq!(parts.len(), 3);
            prop_assert!(parts[0].len() >= 2);
            prop_assert_eq!(parts[1].len(), 2);
            prop_assert_eq!(parts[2].len(), 2);
        }
    }
}
