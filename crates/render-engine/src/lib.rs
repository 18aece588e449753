//! Reelsmith Render Engine
//!
//! Turns a plan plus its per-clip assets into one continuous video and a
//! time-aligned subtitle track.
//!
//! # Pipeline
//!
//! ```text
//! plan.json ──┐
//!             ├── resolve assets (image | video, optional narration)
//!             │        │
//!             │        ├── normalize (video only, at most once)
//!             │        │
//!             │        ├── reconcile slot + narration offset
//!             │        │
//!             │        ├── extend visual to slot (still | trim | freeze | black pad)
//!             │        │
//!             │        └── append at cursor ──► subtitle cue
//!             ▼
//!      segment_001.mp4 … segment_NNN.mp4
//!             │
//!             ▼
//!      concat + encode (H.264 / AAC)
//!             │
//!             ▼
//!      <slug>_NNN.mp4 + .srt (+ .vtt) + .timeline.json
//! ```

pub mod backend;
pub mod export;
pub mod extend;
pub mod ffmpeg;
pub mod media;
pub mod normalize;
pub mod reconcile;
pub mod timeline;

#[cfg(test)]
mod fake;

pub use backend::FfmpegBackend;
pub use export::*;
pub use ffmpeg::FfmpegTools;
pub use media::{MediaTools, VideoInfo};
pub use reconcile::{CompositionMode, Reconciled, SlideTiming};
pub use timeline::{Narration, Segment, Timeline};
