//! Directory traversal and path exclusion

use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ScrapeError, ScrapeErrorKind};
use crate::paths::split_lines;

/// Lazily enumerates media files below a root
///
/// The walk is one-shot: iterate it once, then build a new walker to rescan.
pub struct TreeWalker<'a> {
    root: PathBuf,
    extensions: &'a HashSet<String>,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker for `root` matching the given extensions (lowercase, no dot)
    pub fn new(root: impl Into<PathBuf>, extensions: &'a HashSet<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
        }
    }
}

impl<'a> IntoIterator for TreeWalker<'a> {
    type Item = Result<PathBuf, ScrapeError>;
    type IntoIter = MediaFiles<'a>;

    fn into_iter(self) -> Self::IntoIter {
        let inner = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        MediaFiles {
            inner,
            extensions: self.extensions,
        }
    }
}

/// Iterator returned by [`TreeWalker`]
pub struct MediaFiles<'a> {
    inner: walkdir::IntoIter,
    extensions: &'a HashSet<String>,
}

impl Iterator for MediaFiles<'_> {
    type Item = Result<PathBuf, ScrapeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        continue;
                    }
                    let path = entry.path();
                    // Symlinked files count, symlinked directories are not entered
                    if !path.is_file() {
                        continue;
                    }
                    if has_extension(path, self.extensions) {
                        return Some(Ok(entry.into_path()));
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf());
                    let kind = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScrapeErrorKind::PermissionDenied
                    } else {
                        ScrapeErrorKind::IoError
                    };
                    return Some(Err(ScrapeError::new(kind, path, e.to_string())));
                }
            }
        }
    }
}

/// Case-insensitive check of the final extension against a whitelist
pub fn has_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase()))
        .unwrap_or(false)
}

/// Excluded path prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionFilter {
    prefixes: Vec<PathBuf>,
    rejected: Vec<String>,
}

impl ExclusionFilter {
    /// Build a filter from individual entries
    ///
    /// Blank entries are ignored. Relative or otherwise unusable entries are
    /// logged and never match.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for entry in entries {
            let entry = entry.as_ref();
            if entry.trim().is_empty() {
                continue;
            }
            let path = Path::new(entry);
            if entry.contains('\0') || !path.is_absolute() {
                warn!("Ignoring malformed exclude path: {:?}", entry);
                filter.rejected.push(entry.to_string());
                continue;
            }
            filter.prefixes.push(path.to_path_buf());
        }
        filter
    }

    /// Build a filter from the newline-delimited configuration value
    pub fn from_lines(raw: &str) -> Self {
        Self::new(split_lines(raw))
    }

    /// Whether `path` equals or lies below any excluded prefix
    ///
    /// Comparison is by path component, so `/a/bc` is not under `/a/b`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        match self.prefixes.iter().find(|prefix| path.starts_with(prefix)) {
            Some(prefix) => {
                debug!("{} is under excluded {}, skipping", path.display(), prefix.display());
                true
            }
            None => false,
        }
    }

    /// Usable prefixes
    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    /// Entries that were rejected as malformed
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Whether there is nothing to exclude
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn extensions() -> HashSet<String> {
        ["mkv", "mp4"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_walker_filters_extensions_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Show/Season 1")).unwrap();
        fs::write(root.join("a.MKV"), b"").unwrap();
        fs::write(root.join("a.nfo"), b"").unwrap();
        fs::write(root.join("Show/Season 1/e1.mp4"), b"").unwrap();
        fs::write(root.join("Show/poster.jpg"), b"").unwrap();

        let exts = extensions();
        let files: Vec<PathBuf> = TreeWalker::new(root, &exts)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            files,
            vec![root.join("Show/Season 1/e1.mp4"), root.join("a.MKV")]
        );
    }

    #[test]
    fn test_walker_on_single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        fs::write(&file, b"").unwrap();

        let exts = extensions();
        let files: Vec<PathBuf> = TreeWalker::new(&file, &exts)
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_walker_missing_root_yields_error() {
        let exts = extensions();
        let results: Vec<_> = TreeWalker::new("/definitely/not/here", &exts)
            .into_iter()
            .collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_exclusion_is_component_wise() {
        let filter = ExclusionFilter::from_lines("/media/movies/extras\n\n/media/tmp/");
        assert!(filter.is_excluded(Path::new("/media/movies/extras/a.mkv")));
        assert!(filter.is_excluded(Path::new("/media/movies/extras")));
        assert!(filter.is_excluded(Path::new("/media/tmp/x/y.mp4")));
        assert!(!filter.is_excluded(Path::new("/media/movies/extras2/a.mkv")));
        assert!(!filter.is_excluded(Path::new("/media/movies/a.mkv")));
    }

    #[test]
    fn test_malformed_exclusions_never_match() {
        let filter = ExclusionFilter::new(["relative/dir", "", "/ok"]);
        assert_eq!(filter.prefixes(), &[PathBuf::from("/ok")]);
        assert_eq!(filter.rejected(), &["relative/dir".to_string()]);
        assert!(!filter.is_excluded(Path::new("relative/dir/a.mkv")));
        assert!(!ExclusionFilter::from_lines("").is_excluded(Path::new("/a.mkv")));
    }

    proptest! {
        #[test]
        fn prop_descendants_are_excluded(
            prefix in prop::collection::vec("[a-z]{1,6}", 1..4),
            rest in prop::collection::vec("[a-z]{1,6}", 0..4),
        ) {
            let prefix_path = format!("/{}", prefix.join("/"));
            let mut file = PathBuf::from(&prefix_path);
            for part in &rest {
                file.push(part);
            }
            let filter = ExclusionFilter::from_lines(&prefix_path);
            prop_assert!(filter.is_excluded(&file));
        }

        #[test]
        fn prop_sibling_with_shared_prefix_is_kept(name in "[a-z]{1,6}", suffix in "[a-z0-9]{1,4}") {
            let filter = ExclusionFilter::from_lines(&format!("/lib/{}", name));
            let sibling = PathBuf::from(format!("/lib/{}{}/file.mkv", name, suffix));
            prop_assert!(!filter.is_excluded(&sibling));
        }
    }
}
