//! Library path entries
//!
//! Each configured line is a directory, optionally followed by `#<type>` to
//! force the media type of everything below it:
//!
//! ```text
//! /media/movies#movie
//! /media/series#tv
//! /media/mixed
//! ```

use log::warn;
use std::path::PathBuf;

use crate::models::MediaType;
use crate::walker::ExclusionFilter;

/// A library root with an optional forced media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapePath {
    /// Root directory (or single file) to walk
    pub path: PathBuf,
    /// Forced media type for every file under the root
    pub media_type: Option<MediaType>,
}

impl ScrapePath {
    /// Create a new scrape path
    pub fn new(path: impl Into<PathBuf>, media_type: Option<MediaType>) -> Self {
        Self {
            path: path.into(),
            media_type,
        }
    }

    /// Parse one configured line
    ///
    /// Lines with more than one `#` are kept literally and get no forced type.
    pub fn parse(line: &str) -> Self {
        match line.matches('#').count() {
            1 => {
                let (path, tag) = line.split_once('#').unwrap_or((line, ""));
                let media_type = MediaType::from_tag(tag);
                if media_type.is_none() {
                    warn!("Unknown media type {:?} for {}, detecting from file names", tag, path);
                }
                Self::new(path, media_type)
            }
            0 => Self::new(line, None),
            _ => {
                warn!(
                    "Path entry {:?} has more than one '#', using it literally without a forced type",
                    line
                );
                Self::new(line, None)
            }
        }
    }

    /// Whether the root exists on the filesystem
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Split a newline-delimited list, dropping blank lines and `\r` endings
pub fn split_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

/// Parse the configured library paths
pub fn parse_scrape_paths(raw: &str) -> Vec<ScrapePath> {
    split_lines(raw).map(ScrapePath::parse).collect()
}

/// Parse the configured exclusion prefixes
pub fn parse_exclusions(raw: &str) -> ExclusionFilter {
    ExclusionFilter::from_lines(raw)
}

/// Keep the entries whose path exists, logging the others
pub fn resolve_existing(entries: &[ScrapePath]) -> (Vec<ScrapePath>, Vec<ScrapePath>) {
    entries.iter().cloned().partition(|entry| {
        let exists = entry.exists();
        if !exists {
            warn!("Scrape path does not exist: {}", entry.path.display());
        }
        exists
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_forced_type_suffix() {
        assert_eq!(
            ScrapePath::parse("/x/y#movie"),
            ScrapePath::new("/x/y", Some(MediaType::Movie))
        );
        assert_eq!(ScrapePath::parse("/x/y"), ScrapePath::new("/x/y", None));
        assert_eq!(ScrapePath::parse("/x/y#bogus"), ScrapePath::new("/x/y", None));
        assert_eq!(
            ScrapePath::parse("/x/y#电视剧"),
            ScrapePath::new("/x/y", Some(MediaType::Tv))
        );
    }

    #[test]
    fn test_multiple_separators_kept_literally() {
        assert_eq!(
            ScrapePath::parse("/x/#y#movie"),
            ScrapePath::new("/x/#y#movie", None)
        );
    }

    #[test]
    fn test_parse_scrape_paths_skips_blank_lines() {
        let entries = parse_scrape_paths("/a#tv\r\n\n   \n/b\n");
        assert_eq!(
            entries,
            vec![
                ScrapePath::new("/a", Some(MediaType::Tv)),
                ScrapePath::new("/b", None)
            ]
        );
        assert!(parse_scrape_paths("").is_empty());
    }

    #[test]
    fn test_parse_exclusions() {
        let filter = parse_exclusions("/media/extras\r\n\nsamples\n");
        assert_eq!(filter.prefixes(), &[PathBuf::from("/media/extras")]);
        assert_eq!(filter.rejected(), &["samples".to_string()]);
    }

    #[test]
    fn test_resolve_existing() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            ScrapePath::new(dir.path(), Some(MediaType::Movie)),
            ScrapePath::new(dir.path().join("missing"), None),
        ];
        let (found, missing) = resolve_existing(&entries);
        assert_eq!(found, vec![entries[0].clone()]);
        assert_eq!(missing, vec![entries[1].clone()]);
    }

    proptest! {
        #[test]
        fn prop_entries_without_separator_are_literal(path in "/[a-zA-Z0-9 _./-]{0,40}") {
            let entry = ScrapePath::parse(&path);
            prop_assert_eq!(entry.path, PathBuf::from(&path));
            prop_assert_eq!(entry.media_type, None);
        }

        #[test]
        fn prop_unknown_suffix_matches_no_suffix(
            path in "/[a-z0-9/]{1,30}",
            tag in "[a-z]{1,10}",
        ) {
            prop_assume!(MediaType::from_tag(&tag).is_none());
            let tagged = ScrapePath::parse(&format!("{}#{}", path, tag));
            prop_assert_eq!(tagged, ScrapePath::parse(&path));
        }

        #[test]
        fn prop_line_count_matches_non_blank_lines(lines in prop::collection::vec("/[a-z]{1,8}", 0..8)) {
            let raw = lines.join("\n\n");
            prop_assert_eq!(parse_scrape_paths(&raw).len(), lines.len());
        }
    }
}
