//! CLI entry point for the CCTV vehicle-count dashboard.
//!
//! Provides subcommands for summarizing hourly counts, listing cameras and
//! publishing dashboard JSON to S3.

use anyhow::{Context, Result};
use cctv_dashboard::analyzers::types::HOUR_LABEL_FORMAT;
use cctv_dashboard::config::StoreConfig;
use cctv_dashboard::dashboard::{Dashboard, View};
use cctv_dashboard::fetch::BasicClient;
use cctv_dashboard::output::{export_view, print_json, print_pretty};
use cctv_dashboard::publish::publish_dashboard;
use cctv_dashboard::record::{CameraId, RawRecord};
use cctv_dashboard::store::{DataApiStore, HttpJsonStore, JsonFileStore, RecordStore};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cctv_dashboard")]
#[command(about = "Hourly vehicle counts per CCTV camera", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// JSON/NDJSON export file or URL; defaults to the data API configured in the environment
    #[arg(short, long, value_name = "FILE_OR_URL")]
    source: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate counts per hour, overall and for one camera
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Camera to break out ("unknown" selects records without a camera);
        /// defaults to the first camera seen
        #[arg(short, long)]
        camera: Option<String>,

        /// Directory to export CSV tables to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Gzip compress exported CSV files
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Log the full dashboard as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List cameras and how many records each has
    Cameras {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Upload the overall view, every camera view and an index to S3
    Publish {
        #[command(flatten)]
        source: SourceArgs,

        /// S3 bucket name to upload to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: String,

        /// Key prefix for uploaded objects
        #[arg(long, default_value = "dashboard")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/cctv_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cctv_dashboard.log"));

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

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary {
            source,
            camera,
            output_dir,
            gzip,
            json,
        } => {
            let dashboard = load_dashboard(source.source.as_deref()).await?;
            let selected = camera.as_deref().map(CameraId::from_selection);
            let snapshot = dashboard.snapshot(selected.as_ref());

            log_view(&snapshot.overall);
            if let Some(view) = &snapshot.selected {
                if view.record_count == 0 {
                    warn!(camera = %view_label(view), "Selected camera has no records");
                }
                log_view(view);
            }

            if json {
                print_json(&snapshot)?;
            } else {
                print_pretty(&snapshot);
            }

            if let Some(dir) = output_dir {
                export_view(&dir, &snapshot.overall, gzip)?;
                if let Some(view) = &snapshot.selected {
                    export_view(&dir, view, gzip)?;
                }
            }
        }
        Commands::Cameras { source } => {
            let dashboard = load_dashboard(source.source.as_deref()).await?;

            for summary in dashboard.camera_summaries() {
                info!(
                    camera = %summary.camera_id,
                    record_count = summary.record_count,
                    "Camera"
                );
            }
            info!(
                cameras = dashboard.cameras().len(),
                record_count = dashboard.record_count(),
                "Camera list summary"
            );
        }
        Commands::Publish {
            source,
            s3_bucket,
            prefix,
        } => {
            let dashboard = load_dashboard(source.source.as_deref()).await?;

            let config = aws_config::load_from_env().await;
            let s3 = aws_sdk_s3::Client::new(&config);
            info!(bucket = %s3_bucket, prefix = %prefix, "S3 upload enabled");

            publish_dashboard(&s3, &s3_bucket, &prefix, &dashboard).await?;
        }
    }

    Ok(())
}

/// Fetches every document once and builds the dashboard from them.
#[tracing::instrument]
async fn load_dashboard(source: Option<&str>) -> Result<Dashboard> {
    let records = fetch_records(source).await?;
    let dashboard = Dashboard::from_raw(&records);

    let report = dashboard.report();
    for warning in &report.warnings {
        warn!(%warning, "Dataset warning");
    }
    info!(
        total = report.total_raw,
        kept = report.kept,
        dropped_invalid_time = report.dropped_invalid_time,
        malformed_payloads = report.malformed_payloads,
        "Records loaded"
    );
    Ok(dashboard)
}

/// Reads documents from a local export, a URL, or the configured data API.
async fn fetch_records(source: Option<&str>) -> Result<Vec<RawRecord>> {
    let store: Box<dyn RecordStore> = match source {
        Some(url) if is_url(url) => Box::new(HttpJsonStore::new(BasicClient::new(), url)),
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => {
            let config = StoreConfig::from_env()
                .context("no --source given and the data API is not configured")?;
            Box::new(DataApiStore::from_config(config)?)
        }
    };
    store.fetch_all_records().await
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn view_label(view: &View) -> String {
    view.camera_id
        .as_ref()
        .map_or_else(|| "all".to_string(), ToString::to_string)
}

fn log_view(view: &View) {
    info!(
        camera = %view_label(view),
        record_count = view.record_count,
        hours = view.series.len(),
        "View summary"
    );
    if let Some(busiest) = view.sorted.first() {
        info!(
            camera = %view_label(view),
            hour = %busiest.hour.format(HOUR_LABEL_FORMAT),
            car = busiest.car,
            truck = busiest.truck,
            motorcycle = busiest.motorcycle,
            bus = busiest.bus,
            total = busiest.total,
            "Busiest hour"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_http_schemes_are_urls() {
        assert!(is_url("https://data.example.com/export.json"));
        assert!(is_url("http://localhost:8080/records"));
        assert!(!is_url("http_export.json"));
        assert!(!is_url("exports/https.json"));
    }
}
