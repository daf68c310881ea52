//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use notification_core::{
    resolve_criteria, resolve_diagnostic_aliases, FetchConfig, FilterCriteria, FilterOverrides,
    NotifyResult,
};

use crate::queue::SqsSettings;

#[derive(Parser, Debug, Clone)]
#[command(name = "queue-downloader")]
#[command(about = "Download objects identified in S3 events delivered to an SQS queue")]
pub struct Args {
    /// API key sent with every download
    #[arg(env = "API_KEY")]
    pub api_key: String,

    /// Name of the SQS queue subscribed to the topic
    pub queue_name: String,

    /// Earliest forecast period to download, in hours
    pub start_time: i64,

    /// Latest forecast period to download, in hours
    pub end_time: i64,

    /// Comma-separated diagnostics (temperature, pressure, humidity or full names)
    pub diagnostics: Option<String>,

    /// Retain messages in the queue after processing (useful when debugging)
    #[arg(short, long)]
    pub keep: bool,

    /// Log every decoded notification
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory objects are downloaded to
    #[arg(long, default_value = "objects")]
    pub download_dir: PathBuf,

    /// Directory for the diagnostic catalog CSV
    #[arg(long, default_value = "output")]
    pub catalog_dir: PathBuf,

    /// Do not write a diagnostic catalog
    #[arg(long)]
    pub no_catalog: bool,

    /// YAML file with additional filter criteria
    #[arg(long, env = "FILTER_CONFIG")]
    pub filter_config: Option<PathBuf>,

    /// Long-poll wait per receive
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(i32).range(0..=20))]
    pub wait_time_secs: i32,

    /// Maximum messages per receive
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(i32).range(1..=10))]
    pub max_messages: i32,

    /// Per-download timeout
    #[arg(long, default_value = "600")]
    pub request_timeout_secs: u64,

    /// AWS region (default: from the environment)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Run a single receive cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Filter criteria from the hour window, diagnostics and optional file.
    pub fn criteria(&self) -> NotifyResult<FilterCriteria> {
        let window = FilterCriteria::from_hours(self.start_time, self.end_time, Vec::new())?;

        let requested: Vec<&str> = self
            .diagnostics
            .as_deref()
            .map(|d| d.split(',').collect())
            .unwrap_or_default();

        resolve_criteria(
            self.filter_config.as_deref(),
            FilterOverrides {
                min_forecast_period: window.min_forecast_period,
                max_forecast_period: window.max_forecast_period,
                diagnostics: resolve_diagnostic_aliases(&requested),
            },
        )
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let mut config = FetchConfig::new(self.api_key.clone(), self.download_dir.clone());
        config.request_timeout = Duration::from_secs(self.request_timeout_secs);
        config
    }

    pub fn sqs_settings(&self) -> SqsSettings {
        SqsSettings {
            queue_name: self.queue_name.clone(),
            region: self.region.clone(),
            wait_time_secs: self.wait_time_secs,
            max_messages: self.max_messages,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
