//! TDC Capture - serial coarse/fine frame decoder
//!
//! Reads the raw byte stream from an FPGA time-to-digital converter over a
//! UART, decodes 5-byte measurement frames, and appends the fine and coarse
//! values to index-aligned text logs.

mod config;
mod serial;
mod sink;
mod tdc;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::Config;
use serial::{SerialCapture, SerialConfig};
use sink::{LogSink, MeasurementSink, RunManifest};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   TDC Capture - coarse/fine decoder");
    info!("===========================================");

    // Load configuration
    let config = Config::from_env();

    info!("Configuration:");
    info!("  Port: {}", config.port_path);
    info!("  Baud rate: {}", config.baud_rate);
    info!("  Data dir: {:?}", config.data_dir);
    info!("  Run duration: {} min", config.run_duration_mins);

    // Create the run directory and output logs
    let manifest = RunManifest {
        port: config.port_path.clone(),
        baud_rate: config.baud_rate,
        started_at: Utc::now(),
        run_duration_secs: config.run_duration().as_secs(),
    };
    let mut sink = LogSink::create(&config.data_dir, &manifest)?;

    // Start the capture thread
    let capture = SerialCapture::new(SerialConfig {
        port_path: config.port_path.clone(),
        baud_rate: config.baud_rate,
        read_timeout: Duration::from_millis(config.read_timeout_ms),
        ..SerialConfig::default()
    });
    let measurement_rx = capture.start()?;

    // Ctrl+C requests cooperative shutdown
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down...");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    info!("===========================================");
    info!("  Starting capture...");
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    let start_time = Instant::now();
    let deadline = start_time + config.run_duration();
    let stats_interval = Duration::from_secs(config.stats_interval_secs);
    let mut last_stats_report = Instant::now();

    // Main processing loop - receive decoded measurements from the capture
    // thread and append them to the logs, in arrival order.
    loop {
        match measurement_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(measurement) => {
                sink.record(&measurement)?;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // No measurement ready, continue with periodic tasks
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                warn!("Measurement channel disconnected");
                break;
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        // Run-duration bound: stop when wall-clock time is up, whatever
        // phase the decoder is in.
        if Instant::now() >= deadline {
            info!("Run duration elapsed, stopping capture");
            break;
        }

        // Periodic statistics
        if last_stats_report.elapsed() >= stats_interval {
            let stats = capture.stats();
            info!(
                "[Run] Elapsed: {:.0}s | Bytes: {} | Measurements written: {}",
                start_time.elapsed().as_secs_f32(),
                stats.bytes_read.load(Ordering::Relaxed),
                sink.records_written()
            );
            last_stats_report = Instant::now();
        }

        // Check if the capture thread is still alive
        if !capture.is_running() {
            warn!("Capture stopped unexpectedly");
            break;
        }
    }

    // Cleanup: stop reading, drain anything already decoded, flush the logs.
    // A frame still in flight on the capture thread is discarded there.
    capture.stop();
    while let Ok(measurement) = measurement_rx.try_recv() {
        sink.record(&measurement)?;
    }
    sink.flush()?;

    info!(
        "Shutdown complete. Measurements written: {}",
        sink.records_written()
    );
    Ok(())
}
