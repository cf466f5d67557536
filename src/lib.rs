//! Scheduled media library scraper
//!
//! Walks configured library roots, recognizes every media file from its
//! local nfo or its filename, and asks the host chain to write missing
//! metadata and artwork.

pub mod cleaner;
pub mod config;
pub mod db;
pub mod error;
pub mod host;
pub mod meta;
pub mod models;
pub mod nfo;
pub mod paths;
pub mod progress;
pub mod schedule;
pub mod scraper;
pub mod walker;

pub use cleaner::StaleNfoCleaner;
pub use config::{HostSettings, ScanConfig, ScrapeMode, ScraperConfig};
pub use db::SqliteTransferHistory;
pub use error::{ScrapeError, ScrapeErrorKind};
pub use host::{MediaChain, NoHistory, OfflineChain, TransferHistory};
pub use models::{
    MediaFile, MediaInfo, MediaType, MetaCandidate, ScanResult, ScrapeOutcome, ScrapedFile,
    TransferRecord,
};
pub use paths::ScrapePath;
pub use progress::{
    DoneMessage, ErrorProgressMessage, ProgressMessage, ProgressReporter, ScanProgress,
    StartMessage,
};
pub use schedule::{
    ConfigStore, CronSpec, JobDescriptor, JsonConfigStore, LibraryScraper, ScrapeJob, Scheduler,
    Trigger,
};
pub use scraper::{CancelToken, LibraryScanner, ScrapeInvoker};
pub use walker::{ExclusionFilter, TreeWalker};
