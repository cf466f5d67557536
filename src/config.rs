//! Configuration for the library scraper
//!
//! [`ScraperConfig`] is the record the host persists for the job.
//! [`ScanConfig`] is the immutable value a scan pass runs with, rebuilt from
//! the record on every (re)initialization.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScrapeError};
use crate::models::MediaType;
use crate::paths::{parse_exclusions, parse_scrape_paths, ScrapePath};
use crate::walker::ExclusionFilter;

/// Cron expression used when the record does not carry one (every 7 days)
pub const DEFAULT_CRON: &str = "0 0 */7 * *";

/// Transfer type passed to the host when none is configured
pub const DEFAULT_TRANSFER_TYPE: &str = "copy";

/// Scrape mode selecting what gets overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScrapeMode {
    /// Only fill in missing metadata and images
    #[default]
    Default,
    /// Overwrite all metadata and images
    ForceAll,
    /// Overwrite all metadata
    ForceNfo,
    /// Overwrite all images
    ForceImage,
}

impl ScrapeMode {
    /// Get the persisted string value
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeMode::Default => "",
            ScrapeMode::ForceAll => "force_all",
            ScrapeMode::ForceNfo => "force_nfo",
            ScrapeMode::ForceImage => "force_image",
        }
    }

    /// Whether metadata files are regenerated
    pub fn force_nfo(&self) -> bool {
        matches!(self, ScrapeMode::ForceAll | ScrapeMode::ForceNfo)
    }

    /// Whether images are re-downloaded
    pub fn force_image(&self) -> bool {
        matches!(self, ScrapeMode::ForceAll | ScrapeMode::ForceImage)
    }

    /// Whether any overwrite behavior is requested
    pub fn overwrites(&self) -> bool {
        *self != ScrapeMode::Default
    }
}

impl From<&str> for ScrapeMode {
    fn from(value: &str) -> Self {
        match value.trim() {
            "force_all" => ScrapeMode::ForceAll,
            "force_nfo" => ScrapeMode::ForceNfo,
            "force_image" => ScrapeMode::ForceImage,
            "" => ScrapeMode::Default,
            other => {
                warn!("Unknown scrape mode {:?}, using default", other);
                ScrapeMode::Default
            }
        }
    }
}

impl From<String> for ScrapeMode {
    fn from(value: String) -> Self {
        ScrapeMode::from(value.as_str())
    }
}

impl From<ScrapeMode> for String {
    fn from(mode: ScrapeMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Persisted configuration record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether the recurring job is registered
    #[serde(deserialize_with = "null_as_default")]
    pub enabled: bool,
    /// Run one pass shortly after initialization, then clear the flag
    #[serde(deserialize_with = "null_as_default")]
    pub onlyonce: bool,
    /// 5-field cron expression; weekly default when absent
    pub cron: Option<String>,
    /// Scrape mode
    #[serde(deserialize_with = "null_as_default")]
    pub mode: ScrapeMode,
    /// Newline-delimited library paths, each optionally suffixed with `#type`
    #[serde(deserialize_with = "null_as_default")]
    pub scraper_paths: String,
    /// Newline-delimited excluded path prefixes
    #[serde(deserialize_with = "null_as_default")]
    pub exclude_paths: String,
    /// Lookback window in days for the stale sidecar cleaner
    #[serde(deserialize_with = "string_or_number")]
    pub offset_days: String,
}

impl ScraperConfig {
    /// Load a record from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| ScrapeError::from(e).at(path))?;
        serde_json::from_str(&data).map_err(|e| ScrapeError::from(e).at(path))
    }

    /// Save the record as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).map_err(|e| ScrapeError::from(e).at(path))
    }

    /// Configured cron expression, ignoring blank values
    pub fn cron_expr(&self) -> Option<&str> {
        self.cron
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Parsed lookback window; blank or invalid values count as 0
    pub fn offset_days(&self) -> i64 {
        let raw = self.offset_days.trim();
        if raw.is_empty() {
            return 0;
        }
        raw.parse().unwrap_or_else(|_| {
            warn!("Invalid offset_days {:?}, using 0", raw);
            0
        })
    }
}

/// Treat an explicit `null` like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `"3"`, `3` or `null` for string-encoded integers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Host application settings the scraper depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Media file extensions (lowercase, without dot)
    pub media_extensions: HashSet<String>,
    /// Whether recognized titles follow upstream changes for ingested media
    pub follow_upstream_titles: bool,
    /// Transfer type passed to the scraping chain
    pub transfer_type: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            media_extensions: Self::default_media_extensions(),
            follow_upstream_titles: true,
            transfer_type: DEFAULT_TRANSFER_TYPE.to_string(),
        }
    }
}

impl HostSettings {
    /// Get the default media extensions
    pub fn default_media_extensions() -> HashSet<String> {
        [
            "mp4", "mkv", "ts", "iso", "rmvb", "avi", "mov", "mpeg", "mpg", "wmv", "3gp", "asf",
            "m4v", "flv", "m2ts", "strm", "tp", "f4v",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

/// Immutable configuration for one scan pass
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Library roots, each with an optional forced media type
    pub paths: Vec<ScrapePath>,

    /// Excluded path prefixes
    pub exclusions: ExclusionFilter,

    /// Scrape mode
    pub mode: ScrapeMode,

    /// Lookback window in days for the stale sidecar cleaner
    pub offset_days: i64,

    /// Media file extensions to visit (whitelist)
    pub media_extensions: HashSet<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            exclusions: ExclusionFilter::default(),
            mode: ScrapeMode::Default,
            offset_days: 0,
            media_extensions: HostSettings::default_media_extensions(),
        }
    }
}

impl ScanConfig {
    /// Build the pass configuration from a persisted record
    pub fn from_record(record: &ScraperConfig, host: &HostSettings) -> Self {
        Self {
            paths: parse_scrape_paths(&record.scraper_paths),
            exclusions: parse_exclusions(&record.exclude_paths),
            mode: record.mode,
            offset_days: record.offset_days(),
            media_extensions: host.media_extensions.clone(),
        }
    }

    /// Create a config builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::new()
    }
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a library root
    pub fn add_path(mut self, path: impl Into<PathBuf>, media_type: Option<MediaType>) -> Self {
        self.config.paths.push(ScrapePath::new(path, media_type));
        self
    }

    /// Set the library roots
    pub fn paths(mut self, paths: Vec<ScrapePath>) -> Self {
        self.config.paths = paths;
        self
    }

    /// Set the excluded prefixes
    pub fn exclusions(mut self, exclusions: ExclusionFilter) -> Self {
        self.config.exclusions = exclusions;
        self
    }

    /// Set the scrape mode
    pub fn mode(mut self, mode: ScrapeMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the lookback window in days
    pub fn offset_days(mut self, days: i64) -> Self {
        self.config.offset_days = days;
        self
    }

    /// Set the extensions whitelist
    pub fn media_extensions(mut self, extensions: HashSet<String>) -> Self {
        self.config.media_extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Build the config
    pub fn build(self) -> ScanConfig {
        self.config
    }
}
