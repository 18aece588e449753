//! Source normalization for provider video.
//!
//! Provider MP4s are not guaranteed to be seekable or decodable. A video is
//! opened by decoding frame 0 and probing it; if that fails it is re-encoded
//! once to a sibling `*.norm.mp4` and opened again. A second failure is fatal.

use std::path::{Path, PathBuf};

use reelsmith_common::error::{ReelError, ReelResult};

use crate::media::{MediaTools, VideoInfo};

/// A video that decoded successfully, possibly via its normalized copy.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedVideo {
    /// The asset as found on disk.
    pub source: PathBuf,

    /// The file that actually serves frames.
    pub path: PathBuf,

    /// Whether `path` is the normalized copy.
    pub normalized: bool,

    pub info: VideoInfo,
}

/// Sibling path of a normalized copy: `clip3.mp4` -> `clip3.norm.mp4`.
pub fn normalized_path(source: &Path) -> PathBuf {
    source.with_extension("norm.mp4")
}

/// Opens provider videos, normalizing each at most once.
pub struct SourceNormalizer<'a, M: MediaTools + ?Sized> {
    tools: &'a M,
    fps: u32,
}

impl<'a, M: MediaTools + ?Sized> SourceNormalizer<'a, M> {
    pub fn new(tools: &'a M, fps: u32) -> Self {
        Self { tools, fps }
    }

    /// Open `path`, falling back to a single normalization pass.
    pub fn open(&self, path: &Path) -> ReelResult<OpenedVideo> {
        let first_error = match self.try_open(path) {
            Ok(info) => {
                return Ok(OpenedVideo {
                    source: path.to_path_buf(),
                    path: path.to_path_buf(),
                    normalized: false,
                    info,
                })
            }
            Err(err) => err,
        };

        let target = normalized_path(path);
        tracing::warn!(
            path = %path.display(),
            error = %first_error,
            target = %target.display(),
            "Video did not decode, normalizing"
        );

        self.tools
            .normalize(path, &target, self.fps)
            .and_then(|()| self.try_open(&target))
            .map(|info| OpenedVideo {
                source: path.to_path_buf(),
                path: target.clone(),
                normalized: true,
                info,
            })
            .map_err(|retry_error| ReelError::DecodeNormalization {
                path: path.to_path_buf(),
                message: format!("{retry_error} (initial open: {first_error})"),
            })
    }

    fn try_open(&self, path: &Path) -> ReelResult<VideoInfo> {
        self.tools.decode_first_frame(path)?;
        let info = self.tools.probe_video(path)?;
        if !(info.duration_secs.is_finite() && info.duration_secs > 0.0) {
            return Err(ReelError::render("video has no usable duration"));
        }
        Ok(info)
    }
}
