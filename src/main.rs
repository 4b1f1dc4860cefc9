//! CLI entry point for the vehicle comparison tool.
//!
//! Reads the vehicle ID list, fetches each vehicle's details (through the
//! response cache), and writes one comparison row per purchasable vehicle.

use anyhow::{Context, Result};
use carvana_compare::config::{DEFAULT_ENDPOINT, DEFAULT_EXPIRE_AFTER_SECS, RunConfig};
use carvana_compare::fetch::BasicClient;
use carvana_compare::pipeline::run;
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "carvana_compare")]
#[command(about = "Compare vehicle listings side by side in a CSV table", long_about = None)]
struct Cli {
    /// File with one vehicle ID per line
    #[arg(long, default_value = "carvana_ids.txt")]
    ids: PathBuf,

    /// Feature and highlight titles to leave out of the table
    #[arg(long, default_value = "uninteresting_features.txt")]
    uninteresting: PathBuf,

    /// Feature columns to put first, in order
    #[arg(long, default_value = "feature_priority.txt")]
    priority: PathBuf,

    /// CSV file to write the comparison table to
    #[arg(short, long, default_value = "carvana_result.csv")]
    output: PathBuf,

    /// Directory for per-vehicle JSON snapshots
    #[arg(long, default_value = "json")]
    snapshot_dir: PathBuf,

    /// Directory for the response cache
    #[arg(long, default_value = "web_cache")]
    cache_dir: PathBuf,

    /// Seconds a cached response stays valid
    #[arg(long, default_value_t = DEFAULT_EXPIRE_AFTER_SECS)]
    expire_after: i64,

    /// Vehicle-details API endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            ids_path: self.ids,
            uninteresting_path: self.uninteresting,
            priority_path: self.priority,
            output_path: self.output,
            snapshot_dir: self.snapshot_dir,
            cache_dir: self.cache_dir,
            expire_after: chrono::Duration::seconds(self.expire_after),
            endpoint: self.endpoint,
            ..RunConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/carvana_compare.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("carvana_compare.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = Cli::parse().into_config();
    let client = BasicClient::new().context("failed to build HTTP client")?;

    let summary = run(&config, client).await?;

    info!(
        fetched = summary.fetched,
        excluded = summary.excluded,
        rows = summary.rows_written,
        "Comparison complete"
    );
    println!(
        "wrote {} rows to {}",
        summary.rows_written,
        summary.output_path.display()
    );

    Ok(())
}
