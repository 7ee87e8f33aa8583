//! Configuration loaded from environment variables

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Serial port device path (e.g. /dev/ttyUSB0 or a by-id symlink)
    pub port_path: String,

    /// UART baud rate
    pub baud_rate: u32,

    /// Directory under which per-run output directories are created
    pub data_dir: PathBuf,

    /// Wall-clock capture duration in minutes; capture stops when it
    /// elapses, regardless of frame completion state
    pub run_duration_mins: u64,

    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Interval between periodic statistics log lines, in seconds
    pub stats_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port_path: std::env::var("TDC_PORT")
                .unwrap_or_else(|_| "/dev/ttyUSB0".to_string()),

            baud_rate: std::env::var("TDC_BAUD_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(115_200),

            data_dir: std::env::var("TDC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),

            run_duration_mins: std::env::var("TDC_RUN_DURATION_MINS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),

            read_timeout_ms: std::env::var("TDC_READ_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),

            stats_interval_secs: std::env::var("TDC_STATS_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_mins * 60)
    }
}
