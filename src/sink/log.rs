//! File-backed sink: two index-aligned decimal logs per capture run
//!
//! Each run gets its own timestamped directory containing `fine.txt` and
//! `coarse.txt` (one decimal value per line, line N of both files belonging
//! to the same frame) plus a `manifest.json` describing the capture settings.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;

use super::{MeasurementSink, SinkError};
use crate::tdc::Measurement;

/// Capture settings recorded alongside the logs, so a run directory is
/// self-describing.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub port: String,
    pub baud_rate: u32,
    pub started_at: DateTime<Utc>,
    pub run_duration_secs: u64,
}

/// Appends measurements to per-quantity text logs in a run directory.
pub struct LogSink {
    run_dir: PathBuf,
    fine: BufWriter<File>,
    coarse: BufWriter<File>,
    records_written: u64,
}

impl LogSink {
    /// Create a run directory under `data_dir` named after the local start
    /// time and open both logs inside it.
    pub fn create(data_dir: &Path, manifest: &RunManifest) -> Result<Self, SinkError> {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let run_dir = data_dir.join(format!("coarse_{stamp}"));
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_vec_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        let open = |name: &str| -> Result<BufWriter<File>, std::io::Error> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(run_dir.join(name))?;
            Ok(BufWriter::new(file))
        };

        info!("Writing measurements to {:?}", run_dir);

        Ok(Self {
            fine: open("fine.txt")?,
            coarse: open("coarse.txt")?,
            run_dir,
            records_written: 0,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl MeasurementSink for LogSink {
    fn record(&mut self, measurement: &Measurement) -> Result<(), SinkError> {
        // One line in each log per frame; the logs stay index-aligned.
        writeln!(self.fine, "{}", measurement.fine)?;
        writeln!(self.coarse, "{}", measurement.coarse)?;
        self.records_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.fine.flush()?;
        self.coarse.flush()?;
        Ok(())
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        let _ = self.fine.flush();
        let _ = self.coarse.flush();
    }
}
