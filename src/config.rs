use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

/// Command-line configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "tui-tracker", version, about = "Epidemic counters dashboard for the terminal")]
pub struct Config {
    /// Base URL of the counter service
    #[arg(long, env = "TRACKER_BASE_URL", default_value = "https://disease.sh/v3/covid-19")]
    pub base_url: Url,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Number of days shown in the chart
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u32).range(2..))]
    pub history_days: u32,

    /// Directory holding Natural Earth GeoJSON files for the basemap
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Write logs to this file (RUST_LOG controls the level)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
