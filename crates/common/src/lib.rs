//! Reelsmith Common Utilities
//!
//! Shared infrastructure for all reelsmith crates:
//! - Error types and result aliases
//! - Timecode helpers for timeline bookkeeping and subtitle timestamps
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;

pub use config::*;
pub use error::*;
