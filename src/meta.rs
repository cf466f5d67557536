//! Filename based metadata guessing
//!
//! Produces the [`MetaCandidate`] the host chain recognizes by name when no
//! sidecar identifier is available. Handles names like:
//! - "The.Matrix.1999.1080p.BluRay.x264.mkv"
//! - "Chicago Fire S14E08 1080p WEB h264-ETHEL.mkv"
//! - "[Group] Show - 1x05.mp4"

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::{MediaType, MetaCandidate};

static RE_SEASON_EP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s\-\[])s(\d{1,2})[\s\-]?e(\d{1,3})(?:\b|$)").expect("valid regex")
});
static RE_CROSS_EP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s\-])(\d{1,2})x(\d{2,3})(?:\b|$)").expect("valid regex")
});
static RE_BARE_EP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s\-\[])(?:ep?|第)(\d{1,3})(?:集)?(?:\b|\]|$)").expect("valid regex")
});
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s\(\[])((?:19|20)\d{2})(?:[\s\)\]]|$)").expect("valid regex"));
static RE_SEASON_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:season\s*(\d{1,3})|s(\d{1,3})|第\s*(\d{1,3})\s*季|specials)$").expect("valid regex")
});
static RE_GROUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*?\]\s*-?\s*").expect("valid regex"));
static RE_RELEASE_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*\b(2160p|1080p|1080i|720p|480p|4k|uhd|blu-?ray|bdrip|brrip|web-?dl|webrip|web|hdtv|dvdrip|remux|x26[45]|h\s?26[45]|hevc|avc|hdr10?|dv|10bit|aac|ac3|dts|ddp?\d?|atmos|proper|repack)\b.*$",
    )
    .expect("valid regex")
});

impl MetaCandidate {
    /// Guess metadata for a media file from its name and parent directories
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut meta = parse_name(&stem);

        let parent = path.parent();
        let season_dir = parent
            .and_then(|p| p.file_name())
            .and_then(|n| season_from_dir(&n.to_string_lossy()));

        if let Some(season) = season_dir {
            meta.media_type = Some(MediaType::Tv);
            if meta.season.is_none() {
                meta.season = Some(season);
            }
        }

        if meta.title.is_empty() {
            // Fall back to the show or movie folder name
            let folder = if season_dir.is_some() {
                parent.and_then(Path::parent)
            } else {
                parent
            };
            if let Some(name) = folder.and_then(|p| p.file_name()) {
                let folder_meta = parse_name(&name.to_string_lossy());
                meta.title = folder_meta.title;
                if meta.year.is_none() {
                    meta.year = folder_meta.year;
                }
            }
        }

        meta
    }
}

/// Parse a bare name (no extension) into a candidate
fn parse_name(name: &str) -> MetaCandidate {
    let stripped = RE_GROUP_TAG.replace(name, "");
    let cleaned = stripped.replace(['.', '_'], " ");
    let cleaned = cleaned.trim();

    let mut meta = MetaCandidate::default();
    let mut title_end = cleaned.len();

    let episode_match = RE_SEASON_EP
        .captures(cleaned)
        .map(|c| (c, true))
        .or_else(|| RE_CROSS_EP.captures(cleaned).map(|c| (c, true)))
        .or_else(|| RE_BARE_EP.captures(cleaned).map(|c| (c, false)));

    if let Some((caps, with_season)) = episode_match {
        meta.media_type = Some(MediaType::Tv);
        if with_season {
            meta.season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            meta.episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        } else {
            meta.episode = caps.get(1).and_then(|m| m.as_str().parse().ok());
        }
        if let Some(whole) = caps.get(0) {
            title_end = whole.start();
        }
    } else {
        meta.media_type = Some(MediaType::Movie);
    }

    if let Some(caps) = RE_YEAR.captures(&cleaned[..title_end]) {
        if let (Some(whole), Some(year)) = (caps.get(0), caps.get(1)) {
            // A bare year as the whole name is a title, not a year
            if whole.start() > 0 {
                meta.year = year.as_str().parse().ok();
                title_end = whole.start();
            }
        }
    }

    let title = RE_RELEASE_INFO.replace(&cleaned[..title_end], "");
    meta.title = title
        .trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '(' || c == '[')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    meta
}

/// Season number for a season folder name, `0` for specials
fn season_from_dir(name: &str) -> Option<u32> {
    let caps = RE_SEASON_DIR.captures(name.trim())?;
    let number = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .and_then(|m| m.as_str().parse().ok());
    Some(number.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_movie_with_year() {
        let meta = MetaCandidate::from_path(&PathBuf::from(
            "/movies/The Matrix (1999)/The.Matrix.1999.1080p.BluRay.x264.mkv",
        ));
        assert_eq!(meta.title, "The Matrix");
        assert_eq!(meta.year, Some(1999));
        assert_eq!(meta.media_type, Some(MediaType::Movie));
        assert_eq!(meta.season, None);
    }

    #[test]
    fn test_episode_markers() {
        let meta = MetaCandidate::from_path(&PathBuf::from(
            "/tv/Chicago Fire/Chicago Fire S14E08 1080p WEB h264-ETHEL.mkv",
        ));
        assert_eq!(meta.title, "Chicago Fire");
        assert_eq!(meta.season, Some(14));
        assert_eq!(meta.episode, Some(8));
        assert_eq!(meta.media_type, Some(MediaType::Tv));

        let meta = MetaCandidate::from_path(&PathBuf::from("/tv/[Group] Show - 1x05.mp4"));
        assert_eq!(meta.title, "Show");
        assert_eq!(meta.season, Some(1));
        assert_eq!(meta.episode, Some(5));
    }

    #[test]
    fn test_season_folder_implies_tv() {
        let meta = MetaCandidate::from_path(&PathBuf::from("/tv/Severance/Season 2/E03.mkv"));
        assert_eq!(meta.media_type, Some(MediaType::Tv));
        assert_eq!(meta.season, Some(2));
        assert_eq!(meta.episode, Some(3));
        assert_eq!(meta.title, "Severance");

        assert_eq!(season_from_dir("Specials"), Some(0));
        assert_eq!(season_from_dir("S03"), Some(3));
        assert_eq!(season_from_dir("Extras"), None);
    }

    #[test]
    fn test_year_only_name_is_title() {
        let meta = MetaCandidate::from_path(&PathBuf::from("/movies/1917.mkv"));
        assert_eq!(meta.title, "1917");
        assert_eq!(meta.year, None);
    }
}
