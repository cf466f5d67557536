//! Library Scraper CLI
//!
//! Runs a scrape pass from a configuration record, or shows the job the host
//! would schedule for it.

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use library_scraper::{
    CancelToken, ConfigStore, HostSettings, JobDescriptor, JsonConfigStore, LibraryScanner,
    LibraryScraper, NoHistory, OfflineChain, ProgressReporter, ScanConfig, ScanResult,
    ScrapeError, ScrapeJob, ScraperConfig, Scheduler, SqliteTransferHistory, TransferHistory,
};

const ABOUT: &str = r#"
Library Scraper - 媒体库刮削器

使用示例:
  library_scraper init-config scraper.json          生成默认配置
  library_scraper scan -c scraper.json              按配置执行一次刮削
  library_scraper scan -c scraper.json --json       JSON格式输出
  library_scraper scan -c scraper.json -H history.db  使用整理历史保留标题
  library_scraper job -c scraper.json               显示定时任务
"#;

/// Scheduled media library scraper
#[derive(Parser)]
#[command(name = "library_scraper")]
#[command(author, version, about = ABOUT, long_about = None)]
#[command(help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 显示帮助信息
    #[arg(short = 'h', long = "help", action = clap::ArgAction::Help, global = true)]
    help: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// 按配置执行一次刮削
    #[command(about = "按配置执行一次刮削")]
    Scan {
        /// 配置文件路径
        #[arg(short = 'c', long, help = "JSON配置文件路径")]
        config: PathBuf,

        /// 整理历史数据库
        #[arg(short = 'H', long, help = "整理历史SQLite数据库，用于保留原始标题")]
        history: Option<PathBuf>,

        /// 以 JSON 格式输出结果
        #[arg(long, help = "输出JSON格式的刮削结果")]
        json: bool,

        /// 输出进度
        #[arg(long, help = "向stderr输出JSON进度消息")]
        progress: bool,
    },

    /// 显示定时任务
    #[command(about = "显示宿主将注册的定时任务")]
    Job {
        /// 配置文件路径
        #[arg(short = 'c', long, help = "JSON配置文件路径")]
        config: PathBuf,
    },

    /// 生成默认配置
    #[command(name = "init-config", about = "生成默认配置文件")]
    InitConfig {
        /// 输出文件
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Some(Commands::Scan {
            config,
            history,
            json,
            progress,
        }) => scan(&config, history.as_deref(), json, progress),
        Some(Commands::Job { config }) => job(&config),
        Some(Commands::InitConfig { file }) => init_config(&file),
        None => {
            // 没有子命令时显示帮助
            println!("{}", ABOUT);
            println!("使用 'library_scraper --help' 查看完整帮助信息");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn scan(
    config_path: &Path,
    history: Option<&Path>,
    json: bool,
    progress: bool,
) -> Result<(), ScrapeError> {
    let record = ScraperConfig::load(config_path)?;
    let settings = HostSettings::default();
    let config = ScanConfig::from_record(&record, &settings);

    let history: Box<dyn TransferHistory> = match history {
        Some(path) => Box::new(SqliteTransferHistory::open(path)?),
        None => Box::new(NoHistory),
    };

    info!("Starting library scrape...");
    info!("Paths: {}", config.paths.len());
    info!("Mode: {:?}", config.mode);

    let chain = OfflineChain;
    let result = LibraryScanner::new(&config, &chain, history.as_ref(), &settings)
        .with_progress(ProgressReporter::new(progress, 500))
        .run(&CancelToken::new());

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &ScanResult) {
    println!("Scrape completed:");
    println!("  Paths scanned: {}", result.scanned_paths);
    println!("  Missing paths: {}", result.missing_paths);
    println!("  Total files: {}", result.total_files);
    println!("  Excluded files: {}", result.excluded_files);
    println!("  Scraped files: {}", result.scraped_count());
    println!("  Unrecognized files: {}", result.unrecognized_files);
    println!("  Removed nfo files: {}", result.removed_nfos);
    println!("  Errors: {}", result.error_count());
    println!("  Duration: {}ms", result.duration_ms);
}

fn job(config_path: &Path) -> Result<(), ScrapeError> {
    let record = JsonConfigStore::new(config_path).load()?;
    let mut scraper = LibraryScraper::new(
        Arc::new(OfflineChain),
        Arc::new(NoHistory),
        HostSettings::default(),
    );
    // A detached preview: nothing is scheduled and the record is not rewritten
    scraper.init(
        ScraperConfig {
            onlyonce: false,
            ..record
        },
        &mut PreviewScheduler,
        &PreviewStore,
    )?;

    let jobs: Vec<JobDescriptor> = scraper.services().iter().map(|j| j.descriptor()).collect();
    println!("{}", serde_json::to_string_pretty(&jobs)?);
    Ok(())
}

fn init_config(path: &Path) -> Result<(), ScrapeError> {
    let record = ScraperConfig::default();
    JsonConfigStore::new(path).save(&record)?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

struct PreviewScheduler;

impl Scheduler for PreviewScheduler {
    fn add_job(&mut self, _job: ScrapeJob) -> Result<(), ScrapeError> {
        Ok(())
    }

    fn remove_all_jobs(&mut self) {}

    fn is_running(&self) -> bool {
        false
    }
}

struct PreviewStore;

impl ConfigStore for PreviewStore {
    fn save(&self, _config: &ScraperConfig) -> Result<(), ScrapeError> {
        Ok(())
    }
}
