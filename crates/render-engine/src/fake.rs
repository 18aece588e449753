//! Scripted [`MediaTools`] for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use reelsmith_common::error::{ReelError, ReelResult};
use reelsmith_plan_model::assets::AudioEncoding;

use crate::media::{MediaTools, VideoInfo};

#[derive(Default)]
pub struct FakeMedia {
    videos: HashMap<PathBuf, VideoInfo>,
    undecodable: HashSet<PathBuf>,
    audio: HashMap<PathBuf, f64>,
    broken_audio: HashSet<PathBuf>,
    failing_last_frame: HashSet<PathBuf>,
    failing_first_frame: HashSet<PathBuf>,
    normalize_calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    extract_calls: RefCell<Vec<(PathBuf, f64)>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: &str, duration_secs: f64, width: u32, height: u32) -> Self {
        self.videos.insert(
            PathBuf::from(path),
            VideoInfo {
                duration_secs,
                width,
                height,
            },
        );
        self
    }

    pub fn undecodable(mut self, path: &str) -> Self {
        self.undecodable.insert(PathBuf::from(path));
        self
    }

    pub fn with_audio(mut self, path: &str, duration_secs: f64) -> Self {
        self.audio.insert(PathBuf::from(path), duration_secs);
        self
    }

    pub fn broken_audio(mut self, path: &str) -> Self {
        self.broken_audio.insert(PathBuf::from(path));
        self
    }

    pub fn failing_last_frame(mut self, path: &str) -> Self {
        self.failing_last_frame.insert(PathBuf::from(path));
        self
    }

    pub fn failing_first_frame(mut self, path: &str) -> Self {
        self.failing_first_frame.insert(PathBuf::from(path));
        self
    }

    pub fn normalize_calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.normalize_calls.borrow().clone()
    }

    pub fn extract_calls(&self) -> Vec<(PathBuf, f64)> {
        self.extract_calls.borrow().clone()
    }
}

impl MediaTools for FakeMedia {
    fn probe_duration(&self, path: &Path, _encoding: AudioEncoding) -> ReelResult<f64> {
        if self.broken_audio.contains(path) {
            return Err(ReelError::render("invalid data found when processing input"));
        }
        self.audio
            .get(path)
            .copied()
            .ok_or_else(|| ReelError::render(format!("unknown audio {}", path.display())))
    }

    fn probe_video(&self, path: &Path) -> ReelResult<VideoInfo> {
        self.videos
            .get(path)
            .copied()
            .ok_or_else(|| ReelError::render(format!("unknown video {}", path.display())))
    }

    fn decode_first_frame(&self, path: &Path) -> ReelResult<()> {
        if self.undecodable.contains(path) || !self.videos.contains_key(path) {
            return Err(ReelError::render("moov atom not found"));
        }
        Ok(())
    }

    fn normalize(&self, source: &Path, target: &Path, _fps: u32) -> ReelResult<()> {
        self.normalize_calls
            .borrow_mut()
            .push((source.to_path_buf(), target.to_path_buf()));
        Ok(())
    }

    fn extract_frame(&self, video: &Path, at_secs: f64, _target: &Path) -> ReelResult<()> {
        self.extract_calls
            .borrow_mut()
            .push((video.to_path_buf(), at_secs));
        let failing = if at_secs > 0.0 {
            &self.failing_last_frame
        } else {
            &self.failing_first_frame
        };
        if failing.contains(video) {
            return Err(ReelError::render("could not decode frame"));
        }
        Ok(())
    }
}
