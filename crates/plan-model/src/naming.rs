//! Output naming: `<slug>_<NNN>.mp4` in a renders directory.

use std::path::{Path, PathBuf};

/// Slug used when a title has no usable characters.
pub const DEFAULT_SLUG: &str = "video";

/// Lowercase `title`, keep `[a-z0-9_-]`, collapse everything else into
/// single hyphens, and trim hyphens from both ends.
pub fn make_slug(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.chars() {
        let keep = ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_';
        if keep {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}

/// First `<dir>/<slug>_NNN<ext>` that does not exist yet, starting at 001.
/// Creates `dir` if needed.
pub fn next_numbered_path(dir: &Path, slug: &str, extension: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let extension = extension.trim_start_matches('.');
    let mut n: u32 = 1;
    loop {
        let candidate = dir.join(format!("{slug}_{n:03}.{extension}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Subtitle sidecar path: the video path with its extension replaced.
pub fn sidecar_path(video: &Path, extension: &str) -> PathBuf {
    video.with_extension(extension.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_basic() {
        assert_eq!(make_slug("The Good Shepherd!"), "the-good-shepherd");
        assert_eq!(make_slug("  --Psalm 23 -- Part_2--  "), "psalm-23-part_2");
    }

    #[test]
    fn test_slug_hyphen_kept_as_separator() {
        assert_eq!(make_slug("a-b"), "a-b");
        assert_eq!(make_slug("a - - b"), "a-b");
    }

    #[test]
    fn test_slug_default() {
        assert_eq!(make_slug(""), DEFAULT_SLUG);
        assert_eq!(make_slug("¡¿!!"), DEFAULT_SLUG);
    }

    #[test]
    fn test_next_numbered_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let first = next_numbered_path(dir.path(), "story", ".mp4").unwrap();
        assert_eq!(first.file_name().unwrap(), "story_001.mp4");

        std::fs::write(&first, b"").unwrap();
        let second = next_numbered_path(dir.path(), "story", "mp4").unwrap();
        assert_eq!(second.file_name().unwrap(), "story_002.mp4");
    }

    #[test]
    fn test_sidecar_path() {
        let srt = sidecar_path(Path::new("/renders/story_001.mp4"), "srt");
        assert_eq!(srt, PathBuf::from("/renders/story_001.srt"));
    }
}
