//! Reelsmith Captions
//!
//! Subtitle track output for composed reels:
//! - **Cues:** timed narration text recorded by the timeline assembler
//! - **SRT:** the primary sidecar, numbered 1..N in timeline order
//! - **WebVTT:** optional secondary sidecar

pub mod subtitles;

pub use subtitles::*;
