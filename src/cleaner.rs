//! Removal of stale sidecar files
//!
//! When an overwrite mode is active, the nfo next to every recently modified
//! video is deleted so the following scrape writes it again.

use chrono::{DateTime, Duration, Local, NaiveDate};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{ScanConfig, ScrapeMode};
use crate::error::{Result, ScrapeError};

/// Extensions treated as video by the cleaner
pub const VIDEO_EXTENSIONS: [&str; 11] = [
    "mp4", "mkv", "flv", "avi", "mov", "wmv", "m4v", "mpg", "mpeg", "3gp", "webm",
];

/// Whether the file has one of [`VIDEO_EXTENSIONS`]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Oldest modification date whose sidecar gets removed
pub fn cutoff_date(today: NaiveDate, offset_days: i64) -> NaiveDate {
    Duration::try_days(offset_days)
        .and_then(|d| today.checked_sub_signed(d))
        .unwrap_or(if offset_days > 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

/// Local modification date of a file
pub fn modification_date(path: &Path) -> Result<NaiveDate> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| ScrapeError::from(e).at(path))?;
    Ok(DateTime::<Local>::from(modified).date_naive())
}

/// Deletes sidecars of recently modified videos, once per directory per pass
///
/// Sidecars of videos already handed to the scraping chain in this pass are
/// never touched, so a freshly written nfo survives a later cleanup of a
/// parent directory.
#[derive(Debug)]
pub struct StaleNfoCleaner {
    mode: ScrapeMode,
    offset_days: i64,
    cleaned: HashSet<PathBuf>,
    scraped: HashSet<PathBuf>,
}

impl StaleNfoCleaner {
    /// Create a cleaner for the given mode and lookback window
    pub fn new(mode: ScrapeMode, offset_days: i64) -> Self {
        Self {
            mode,
            offset_days,
            cleaned: HashSet::new(),
            scraped: HashSet::new(),
        }
    }

    /// Record that `video` was scraped; its sidecar is kept from now on
    pub fn mark_scraped(&mut self, video: &Path) {
        self.scraped.insert(video.to_path_buf());
    }

    /// Create a cleaner from the pass configuration
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.mode, config.offset_days)
    }

    /// Whether the mode asks for any overwrite
    pub fn is_active(&self) -> bool {
        self.mode.overwrites()
    }

    /// Clean `dir` using today's local date
    pub fn clean(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.clean_at(dir, Local::now().date_naive())
    }

    /// Clean `dir` and its subdirectories against the window ending at `today`
    ///
    /// Returns the removed sidecar paths. A sidecar that does not exist is
    /// skipped; any other deletion failure stops this call.
    pub fn clean_at(&mut self, dir: &Path, today: NaiveDate) -> Result<Vec<PathBuf>> {
        if !self.is_active() {
            return Ok(Vec::new());
        }
        if self.cleaned.contains(dir) {
            debug!("{} already cleaned in this pass", dir.display());
            return Ok(Vec::new());
        }

        let cutoff = cutoff_date(today, self.offset_days);
        let mut removed = Vec::new();

        let dirs = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => Some(entry.into_path()),
                Ok(_) => None,
                Err(e) => {
                    warn!("Skipping unreadable entry while cleaning: {}", e);
                    None
                }
            });

        for subdir in dirs {
            if !self.cleaned.insert(subdir.clone()) {
                debug!("{} already cleaned in this pass", subdir.display());
                continue;
            }
            let entries = match fs::read_dir(&subdir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Cannot list {}: {}", subdir.display(), e);
                    continue;
                }
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_video_file(p))
                .collect();
            files.sort();

            for video in files {
                if self.scraped.contains(&video) || modification_date(&video)? < cutoff {
                    continue;
                }
                let nfo = video.with_extension("nfo");
                match fs::remove_file(&nfo) {
                    Ok(()) => {
                        info!("Removed stale nfo {}", nfo.display());
                        removed.push(nfo);
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!("No nfo to remove for {}", video.display());
                    }
                    Err(e) => return Err(ScrapeError::from(e).at(nfo)),
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn touch(path: &Path, days_ago: u64) {
        fs::write(path, b"").unwrap();
        let when = SystemTime::now() - std::time::Duration::from_secs(days_ago * 24 * 3600);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(when)
            .unwrap();
    }

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(Path::new("/a/b.MKV")));
        assert!(is_video_file(Path::new("/a/b.webm")));
        assert!(!is_video_file(Path::new("/a/b.nfo")));
        assert!(!is_video_file(Path::new("/a/b")));
    }

    #[test]
    fn test_cutoff_date() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(cutoff_date(today, 3), NaiveDate::from_ymd_opt(2026, 2, 27).unwrap());
        assert_eq!(cutoff_date(today, 0), today);
        assert_eq!(cutoff_date(today, i64::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_recent_files_lose_their_nfo() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("old")).unwrap();
        touch(&root.join("new.mkv"), 0);
        fs::write(root.join("new.nfo"), b"<movie/>").unwrap();
        touch(&root.join("old/old.mp4"), 10);
        fs::write(root.join("old/old.nfo"), b"<movie/>").unwrap();

        let mut cleaner = StaleNfoCleaner::new(ScrapeMode::ForceAll, 3);
        let removed = cleaner.clean(root).unwrap();

        assert_eq!(removed, vec![root.join("new.nfo")]);
        assert!(!root.join("new.nfo").exists());
        assert!(root.join("old/old.nfo").exists());
    }

    #[test]
    fn test_default_mode_never_deletes() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.mkv"), 0);
        fs::write(dir.path().join("a.nfo"), b"<movie/>").unwrap();

        let mut cleaner = StaleNfoCleaner::new(ScrapeMode::Default, 30);
        assert!(!cleaner.is_active());
        assert!(cleaner.clean(dir.path()).unwrap().is_empty());
        assert!(dir.path().join("a.nfo").exists());
    }

    #[test]
    fn test_missing_nfo_is_tolerated_and_dir_cleaned_once() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("Season 1");
        fs::create_dir(&sub).unwrap();
        touch(&sub.join("e1.mkv"), 0);
        touch(&sub.join("e2.mkv"), 0);
        fs::write(sub.join("e2.nfo"), b"<episodedetails/>").unwrap();

        let mut cleaner = StaleNfoCleaner::new(ScrapeMode::ForceNfo, 1);
        let removed = cleaner.clean(dir.path()).unwrap();
        assert_eq!(removed, vec![sub.join("e2.nfo")]);

        // A second request for the same directory in the pass is a no-op
        fs::write(sub.join("e2.nfo"), b"<episodedetails/>").unwrap();
        assert!(cleaner.clean(dir.path()).unwrap().is_empty());
        assert!(sub.join("e2.nfo").exists());
    }

    #[test]
    fn test_scraped_videos_and_cleaned_subdirs_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let show = dir.path().join("Show");
        let season = show.join("Season 1");
        fs::create_dir_all(&season).unwrap();
        touch(&season.join("e1.mkv"), 0);
        touch(&show.join("special.mkv"), 0);
        touch(&show.join("trailer.mkv"), 0);

        let mut cleaner = StaleNfoCleaner::new(ScrapeMode::ForceAll, 3);
        fs::write(season.join("e1.nfo"), b"<episodedetails/>").unwrap();
        assert_eq!(cleaner.clean(&season).unwrap(), vec![season.join("e1.nfo")]);

        // Regenerated by the scrape that followed
        fs::write(season.join("e1.nfo"), b"<episodedetails/>").unwrap();
        cleaner.mark_scraped(&season.join("e1.mkv"));
        cleaner.mark_scraped(&show.join("special.mkv"));
        fs::write(show.join("special.nfo"), b"<movie/>").unwrap();
        fs::write(show.join("trailer.nfo"), b"<movie/>").unwrap();

        let removed = cleaner.clean(&show).unwrap();
        assert_eq!(removed, vec![show.join("trailer.nfo")]);
        assert!(season.join("e1.nfo").exists());
        assert!(show.join("special.nfo").exists());
    }
}
