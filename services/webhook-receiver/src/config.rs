//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use notification_core::{
    resolve_criteria, FetchConfig, FilterCriteria, FilterOverrides, NotifyResult,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "webhook-receiver")]
#[command(about = "Download files in response to messages to a web server")]
pub struct Args {
    /// TCP port for the web server
    #[arg(env = "PORT")]
    pub port: u16,

    /// API key sent with every download
    #[arg(env = "API_KEY")]
    pub api_key: String,

    /// Minimum forecast_period
    #[arg(long, value_name = "FORECAST_PERIOD")]
    pub min_fp: Option<i64>,

    /// Maximum forecast_period
    #[arg(long, value_name = "FORECAST_PERIOD")]
    pub max_fp: Option<i64>,

    /// Name(s) of diagnostic parameters, e.g. air_temperature
    #[arg(short = 'd', long = "diagnostic", value_name = "DIAGNOSTIC", num_args = 1..)]
    pub diagnostics: Vec<String>,

    /// Log every decoded request body
    #[arg(short, long)]
    pub verbose: bool,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Directory objects are downloaded to
    #[arg(long, default_value = "objects")]
    pub download_dir: PathBuf,

    /// YAML file with additional filter criteria
    #[arg(long, env = "FILTER_CONFIG")]
    pub filter_config: Option<PathBuf>,

    /// Per-request timeout for downloads and confirmations
    #[arg(long, default_value = "600")]
    pub request_timeout_secs: u64,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Filter criteria from flags, falling back to the optional file.
    pub fn criteria(&self) -> NotifyResult<FilterCriteria> {
        resolve_criteria(
            self.filter_config.as_deref(),
            FilterOverrides {
                min_forecast_period: self.min_fp,
                max_forecast_period: self.max_fp,
                diagnostics: self.diagnostics.clone(),
            },
        )
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let mut config = FetchConfig::new(self.api_key.clone(), self.download_dir.clone());
        config.request_timeout = self.request_timeout();
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "webhook-receiver",
            "8080",
            "key",
            "--min-fp",
            "0",
            "--max-fp",
            "43200",
            "-d",
            "air_temperature",
            "relative_humidity",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.port, 8080);
        assert!(args.verbose);
        let criteria = args.criteria().unwrap();
        assert_eq!(criteria.min_forecast_period, Some(0));
        assert_eq!(criteria.max_forecast_period, Some(43200));
        assert_eq!(criteria.allowed_diagnostics.len(), 2);
    }

    #[test]
    fn test_max_below_min_is_rejected() {
        let args = Args::try_parse_from([
            "webhook-receiver",
            "8080",
            "key",
            "--min-fp",
            "10",
            "--max-fp",
            "5",
        ])
        .unwrap();
        assert!(args.criteria().is_err());
    }

    #[test]
    fn test_no_filters_match_all() {
        let args = Args::try_parse_from(["webhook-receiver", "8080", "key"]).unwrap();
        assert!(args.criteria().unwrap().is_match_all());
        assert_eq!(args.download_dir, PathBuf::from("objects"));
    }
}
