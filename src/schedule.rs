//! Job registration with the host scheduler
//!
//! The host owns timing. This module turns the persisted record into job
//! descriptors whose callback runs one scrape pass, and handles the
//! "run once" switch.

use chrono::{DateTime, Duration, Local};
use croner::Cron;
use log::{error, info};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{HostSettings, ScanConfig, ScraperConfig, DEFAULT_CRON};
use crate::error::{Result, ScrapeError};
use crate::host::{MediaChain, TransferHistory};
use crate::models::ScanResult;
use crate::scraper::{CancelToken, LibraryScanner};

/// Identifier of the recurring job
pub const JOB_ID: &str = "LibraryScraperReconfiguration";

/// Display name of the recurring job
pub const JOB_NAME: &str = "媒体库刮削-重构版";

/// Delay before a "run once" pass starts
pub const ONE_SHOT_DELAY_SECS: i64 = 3;

/// Field count of a crontab expression (`minute hour day month weekday`)
const CRON_FIELD_COUNT: usize = 5;

/// A validated 5-field crontab expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CronSpec(String);

impl CronSpec {
    /// Validate a crontab expression (`minute hour day month weekday`)
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != CRON_FIELD_COUNT {
            return Err(ScrapeError::config_error(
                None,
                format!("cron expression {:?} must have 5 fields, found {}", expr, fields.len()),
            ));
        }
        let normalized = fields.join(" ");
        Cron::new(&normalized).parse().map_err(|e| {
            ScrapeError::config_error(None, format!("invalid cron expression {:?}: {}", expr, e))
        })?;
        Ok(Self(normalized))
    }

    /// The normalized expression
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CronSpec {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// When the host should fire a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Trigger {
    /// Recurring crontab schedule
    Cron {
        /// Crontab expression
        expr: CronSpec,
    },
    /// Single run at a point in time
    Once {
        /// Start time
        at: DateTime<Local>,
    },
}

/// Callback the host invokes to run a pass
pub type JobCallback = Arc<dyn Fn(&CancelToken) -> ScanResult + Send + Sync>;

/// Serializable part of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    /// Job identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Trigger
    pub trigger: Trigger,
}

/// A job handed to the host scheduler
#[derive(Clone)]
pub struct ScrapeJob {
    /// Job identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// When to run
    pub trigger: Trigger,
    /// Pass to run
    pub callback: JobCallback,
    cancel: CancelToken,
}

impl fmt::Debug for ScrapeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeJob")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl ScrapeJob {
    /// Run the pass with the token of the scraper that created the job
    pub fn run(&self) -> ScanResult {
        (self.callback)(&self.cancel)
    }

    /// Id, name and trigger without the callback
    pub fn descriptor(&self) -> JobDescriptor {
        JobDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            trigger: self.trigger.clone(),
        }
    }
}

/// Host scheduler collaborator
pub trait Scheduler {
    /// Register a job
    fn add_job(&mut self, job: ScrapeJob) -> Result<()>;

    /// Drop every job registered by this scraper
    fn remove_all_jobs(&mut self);

    /// Whether a job may currently be executing
    fn is_running(&self) -> bool;
}

/// Persistence of the configuration record
pub trait ConfigStore {
    /// Save the record
    fn save(&self, config: &ScraperConfig) -> Result<()>;
}

/// Stores the record as a JSON file
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the record, or the default record when the file does not exist
    pub fn load(&self) -> Result<ScraperConfig> {
        if !self.path.exists() {
            return Ok(ScraperConfig::default());
        }
        ScraperConfig::load(&self.path)
    }
}

impl ConfigStore for JsonConfigStore {
    fn save(&self, config: &ScraperConfig) -> Result<()> {
        config.save(&self.path)
    }
}

/// The scheduled library scraper
pub struct LibraryScraper {
    chain: Arc<dyn MediaChain>,
    history: Arc<dyn TransferHistory>,
    settings: HostSettings,
    config: ScraperConfig,
    cancel: CancelToken,
}

impl LibraryScraper {
    /// Create a scraper over the host services, with an empty configuration
    pub fn new(
        chain: Arc<dyn MediaChain>,
        history: Arc<dyn TransferHistory>,
        settings: HostSettings,
    ) -> Self {
        Self {
            chain,
            history,
            settings,
            config: ScraperConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Apply a (new) configuration record
    ///
    /// Existing jobs are stopped first. With `onlyonce` set a single pass is
    /// scheduled shortly after, and the flag is cleared and persisted.
    pub fn init(
        &mut self,
        config: ScraperConfig,
        scheduler: &mut dyn Scheduler,
        store: &dyn ConfigStore,
    ) -> Result<()> {
        self.config = config;
        self.stop(scheduler);

        if self.config.onlyonce {
            info!("Library scraper will run once now");
            let at = Local::now() + Duration::seconds(ONE_SHOT_DELAY_SECS);
            let job = self.job(format!("{}-once", JOB_ID), Trigger::Once { at });
            scheduler.add_job(job)?;

            self.config.onlyonce = false;
            store.save(&self.config)?;
        }
        Ok(())
    }

    /// Whether the recurring job is enabled
    pub fn state(&self) -> bool {
        self.config.enabled
    }

    /// Current configuration record
    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Token that cancels passes started by the current jobs
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Recurring job for the host scheduler; empty when disabled
    pub fn services(&self) -> Vec<ScrapeJob> {
        if !self.config.enabled {
            return Vec::new();
        }
        let expr = self.config.cron_expr().unwrap_or(DEFAULT_CRON);
        match CronSpec::parse(expr) {
            Ok(expr) => vec![self.job(JOB_ID.to_string(), Trigger::Cron { expr })],
            Err(e) => {
                error!("Library scraper not scheduled: {}", e.message);
                Vec::new()
            }
        }
    }

    /// Run one pass with the current configuration
    pub fn run_once(&self, cancel: &CancelToken) -> ScanResult {
        (self.callback())(cancel)
    }

    /// Remove jobs and cancel a pass that may be running
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        scheduler.remove_all_jobs();
        if scheduler.is_running() {
            self.cancel.cancel();
        }
        // Jobs created from now on must not inherit the cancellation
        self.cancel = CancelToken::new();
    }

    fn job(&self, id: String, trigger: Trigger) -> ScrapeJob {
        ScrapeJob {
            id,
            name: JOB_NAME.to_string(),
            trigger,
            callback: self.callback(),
            cancel: self.cancel.clone(),
        }
    }

    fn callback(&self) -> JobCallback {
        let chain = Arc::clone(&self.chain);
        let history = Arc::clone(&self.history);
        let settings = self.settings.clone();
        let scan_config = ScanConfig::from_record(&self.config, &self.settings);
        Arc::new(move |cancel: &CancelToken| {
            LibraryScanner::new(&scan_config, chain.as_ref(), history.as_ref(), &settings).run(cancel)
        })
    }
}
