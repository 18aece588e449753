//! Reelsmith Plan Model
//!
//! Defines the inputs a composition run consumes:
//! - **Plan:** the validated narration document (title + ordered clips)
//! - **Assets:** the `clip<index>.<ext>` naming convention for per-clip
//!   image, video, and narration files
//! - **Naming:** slugified, numbered output paths that never overwrite a
//!   previous render

pub mod assets;
pub mod naming;
pub mod plan;

pub use assets::*;
pub use naming::*;
pub use plan::*;
