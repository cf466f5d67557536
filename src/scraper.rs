//! Scrape pass - walks the configured libraries and hands files to the host chain

use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cleaner::StaleNfoCleaner;
use crate::config::{HostSettings, ScanConfig, ScrapeMode};
use crate::error::ScrapeError;
use crate::host::{MediaChain, TransferHistory};
use crate::models::{MediaFile, ScanResult, ScrapeOutcome, ScrapedFile};
use crate::nfo::identifier_for;
use crate::paths::resolve_existing;
use crate::progress::{ProgressReporter, ScanProgress};
use crate::walker::TreeWalker;

/// Cooperative cancellation flag shared between a pass and its owner
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Recognizes one file and triggers the host scraping chain for it
pub struct ScrapeInvoker<'a> {
    chain: &'a dyn MediaChain,
    history: &'a dyn TransferHistory,
    settings: &'a HostSettings,
    mode: ScrapeMode,
    cleaner: StaleNfoCleaner,
}

impl<'a> ScrapeInvoker<'a> {
    /// Create an invoker for one pass
    pub fn new(
        config: &ScanConfig,
        chain: &'a dyn MediaChain,
        history: &'a dyn TransferHistory,
        settings: &'a HostSettings,
    ) -> Self {
        Self {
            chain,
            history,
            settings,
            mode: config.mode,
            cleaner: StaleNfoCleaner::from_config(config),
        }
    }

    /// Recognize and scrape a single file
    ///
    /// Cleaner results and failures are recorded on `result`; nothing here
    /// aborts the pass.
    pub fn scrape_file(&mut self, file: &MediaFile, result: &mut ScanResult) -> ScrapeOutcome {
        let recognized = match file.tmdbid.as_deref() {
            Some(tmdbid) => {
                info!("Using tmdbid {} from local nfo for {}", tmdbid, file.path.display());
                self.chain.recognize_by_id(tmdbid, file.media_type())
            }
            None => self.chain.recognize_by_meta(&file.meta),
        };
        let Some(mut media) = recognized else {
            warn!("No media recognized for {}", file.path.display());
            return ScrapeOutcome::Unrecognized;
        };

        // Keep the title the media was ingested under
        if !self.settings.follow_upstream_titles {
            if let Some(tmdb_id) = media.tmdb_id {
                if let Some(record) = self.history.get_by_type_tmdbid(tmdb_id, media.media_type) {
                    debug!("Using recorded title {:?} instead of {:?}", record.title, media.title);
                    media.title = record.title;
                }
            }
        }

        if let Some(dir) = file.path.parent() {
            match self.cleaner.clean(dir) {
                Ok(removed) => result.removed_nfos += removed.len() as u64,
                Err(e) => {
                    warn!("Stale nfo cleanup of {} stopped: {}", dir.display(), e);
                    result.errors.push(e);
                }
            }
        }

        let force_nfo = self.mode.force_nfo();
        let force_image = self.mode.force_image();
        self.chain.obtain_images(&mut media);
        self.chain.scrape_metadata(
            &file.path,
            &media,
            &self.settings.transfer_type,
            force_nfo,
            force_image,
        );
        self.cleaner.mark_scraped(&file.path);

        ScrapeOutcome::Scraped(ScrapedFile {
            path: file.path.clone(),
            title: media.title,
            tmdb_id: media.tmdb_id,
            from_nfo: file.tmdbid.is_some(),
            force_nfo,
            force_image,
        })
    }
}

/// Runs scrape passes over the configured libraries
pub struct LibraryScanner<'a> {
    config: &'a ScanConfig,
    chain: &'a dyn MediaChain,
    history: &'a dyn TransferHistory,
    settings: &'a HostSettings,
    reporter: ProgressReporter,
}

impl<'a> LibraryScanner<'a> {
    /// Create a scanner over the host services
    pub fn new(
        config: &'a ScanConfig,
        chain: &'a dyn MediaChain,
        history: &'a dyn TransferHistory,
        settings: &'a HostSettings,
    ) -> Self {
        Self {
            config,
            chain,
            history,
            settings,
            reporter: ProgressReporter::default(),
        }
    }

    /// Report progress through the given reporter
    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    fn record_error(&self, result: &mut ScanResult, error: ScrapeError) {
        self.reporter.report_error(&error);
        result.errors.push(error);
    }

    /// Run one pass
    ///
    /// Never fails: problems are logged and collected in the result. When
    /// `cancel` is set the pass returns at the next file.
    pub fn run(&self, cancel: &CancelToken) -> ScanResult {
        let start = Instant::now();
        let mut result = ScanResult::new();
        if self.config.paths.is_empty() {
            return result;
        }
        self.reporter.report_start(self.config);

        let (roots, missing) = resolve_existing(&self.config.paths);
        for entry in missing {
            result.missing_paths += 1;
            self.record_error(&mut result, ScrapeError::not_found(entry.path));
        }
        for entry in self.config.exclusions.rejected() {
            self.record_error(&mut result, ScrapeError::invalid_path(entry.as_str()));
        }

        let mut invoker = ScrapeInvoker::new(self.config, self.chain, self.history, self.settings);
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut progress = ScanProgress::default();

        'roots: for root in &roots {
            info!(
                "Scraping library {} (type: {})",
                root.path.display(),
                root.media_type.map(|t| t.as_str()).unwrap_or("auto")
            );

            for item in TreeWalker::new(&root.path, &self.config.media_extensions) {
                if cancel.is_cancelled() {
                    info!("Library scrape cancelled");
                    result.cancelled = true;
                    break 'roots;
                }

                let path = match item {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Cannot read entry: {}", e);
                        self.record_error(&mut result, e);
                        continue;
                    }
                };

                result.total_files += 1;
                if self.config.exclusions.is_excluded(&path) {
                    result.excluded_files += 1;
                    continue;
                }
                if !visited.insert(path.clone()) {
                    debug!("{} already scraped in this pass", path.display());
                    continue;
                }

                let file = MediaFile::new(path, root.media_type);
                let tmdbid = identifier_for(&file.path, file.media_type());
                let file = file.with_tmdbid(tmdbid);

                match invoker.scrape_file(&file, &mut result) {
                    ScrapeOutcome::Scraped(scraped) => result.scraped.push(scraped),
                    ScrapeOutcome::Unrecognized => result.unrecognized_files += 1,
                }

                progress.files = result.total_files;
                progress.excluded = result.excluded_files;
                progress.scraped = result.scraped.len() as u64;
                progress.unrecognized = result.unrecognized_files;
                progress.current = file.path.to_string_lossy().to_string();
                progress.elapsed_ms = start.elapsed().as_millis() as u64;
                self.reporter.report_progress(&progress);
            }

            result.scanned_paths += 1;
            info!("Library {} scraped", root.path.display());
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        self.reporter.report_done(&result);
        result
    }
}
