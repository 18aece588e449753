//! Timecode utilities shared by the reconciler, the renderer, and the
//! subtitle writers.
//!
//! Timeline positions are carried as `f64` seconds. Conversions to integer
//! milliseconds round to nearest so that subtitle timestamps are stable
//! across runs.

/// Tolerance used when comparing reconciled durations.
pub const DURATION_EPSILON: f64 = 1e-6;

/// Round seconds to the nearest whole millisecond. Negative input clamps to 0.
pub fn secs_to_millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as u64
}

/// Format seconds as `HH:MM:SS<sep>mmm`. Hours are not wrapped at 24.
pub fn format_hms_millis(secs: f64, separator: char) -> String {
    let total_ms = secs_to_millis(secs);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{separator}{millis:03}")
}

/// Format seconds for ffmpeg arguments (microsecond precision, no exponent).
pub fn ffmpeg_secs(secs: f64) -> String {
    format!("{:.6}", secs.max(0.0))
}

/// Number of whole frames covering `secs` at `fps` (rounded to nearest).
pub fn frames_for(secs: f64, fps: u32) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * fps as f64).round() as u64
}

/// Frames between two timeline positions, each snapped to the nearest
/// frame boundary. Summed over back-to-back spans this never drifts more
/// than half a frame from the exact end position.
pub fn frame_span(start_secs: f64, end_secs: f64, fps: u32) -> u64 {
    frames_for(end_secs, fps).saturating_sub(frames_for(start_secs, fps))
}

/// Whether two durations are equal within [`DURATION_EPSILON`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= DURATION_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_to_nearest() {
        assert_eq!(secs_to_millis(2.9996), 3000);
        assert_eq!(secs_to_millis(0.0004), 0);
        assert_eq!(secs_to_millis(-1.0), 0);
        assert_eq!(secs_to_millis(f64::NAN), 0);
    }

    #[test]
    fn test_hms_formatting() {
        assert_eq!(format_hms_millis(0.0, ','), "00:00:00,000");
        assert_eq!(format_hms_millis(3661.5, ','), "01:01:01,500");
        assert_eq!(format_hms_millis(3661.5, '.'), "01:01:01.500");
    }

    #[test]
    fn test_hours_do_not_wrap() {
        assert_eq!(format_hms_millis(25.0 * 3600.0 + 1.0, ','), "25:00:01,000");
    }

    #[test]
    fn test_frames_for() {
        assert_eq!(frames_for(1.0, 30), 30);
        assert_eq!(frames_for(0.5, 30), 15);
        assert_eq!(frames_for(0.0, 30), 0);
    }

    #[test]
    fn test_frame_span_snaps_both_ends() {
        assert_eq!(frame_span(0.0, 3.31, 30), 99);
        assert_eq!(frame_span(3.31, 6.62, 30), 100);
        assert_eq!(frame_span(6.62, 9.93, 30), 99);
        assert_eq!(frame_span(5.0, 4.0, 30), 0);
    }

    #[test]
    fn test_ffmpeg_secs_has_fixed_precision() {
        assert_eq!(ffmpeg_secs(1.5), "1.500000");
        assert_eq!(ffmpeg_secs(-2.0), "0.000000");
    }
}
