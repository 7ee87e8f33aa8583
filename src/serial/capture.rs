//! Capture controller: serial port reader plus decoder pump
//!
//! The port is read on a dedicated thread so transport blocking never stalls
//! the rest of the service. Decoding is byte-order driven, not timing driven,
//! so a blocked read simply pauses the decoder at its current phase.

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{error, info, trace, warn};

use crate::tdc::{FrameDecoder, Measurement};

/// Bytes requested per blocking read.
const READ_CHUNK: usize = 4096;

/// Serial transport configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_path: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    /// Capacity of the measurement channel; a full channel blocks the
    /// capture thread (backpressure, not loss).
    pub channel_capacity: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_path: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200, // TDC UART rate, 8 data bits
            read_timeout: Duration::from_millis(500),
            channel_capacity: 1000,
        }
    }
}

/// Statistics for the capture thread (atomic for cross-thread access)
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub bytes_read: AtomicU64,
    pub reads: AtomicU64,
    pub read_timeouts: AtomicU64,
    pub frames_decoded: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Serial capture controller
pub struct SerialCapture {
    config: SerialConfig,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl SerialCapture {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: CaptureStats::new(),
        }
    }

    /// Open the port, start the capture thread, and return the receiver for
    /// decoded measurements.
    pub fn start(&self) -> Result<Receiver<Measurement>> {
        info!("Opening serial port {}", self.config.port_path);
        info!("  Baud rate: {}", self.config.baud_rate);
        info!("  Read timeout: {:?}", self.config.read_timeout);

        let port = serialport::new(&self.config.port_path, self.config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .timeout(self.config.read_timeout)
            .open()
            .with_context(|| {
                format!("Failed to open serial port at {}", self.config.port_path)
            })?;

        let (tx, rx) = bounded::<Measurement>(self.config.channel_capacity);

        let running = self.running.clone();
        let stats = self.stats.clone();
        running.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("tdc-capture".to_string())
            .spawn(move || {
                if let Err(e) = pump(port, &running, &stats, &tx) {
                    error!("Capture error: {:#}", e);
                }
                // Let the main loop's watchdog see that capture ended.
                running.store(false, Ordering::SeqCst);
            })
            .context("Failed to spawn capture thread")?;

        Ok(rx)
    }

    /// Stop capturing
    pub fn stop(&self) {
        info!("Stopping serial capture...");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get statistics
    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }
}

impl Drop for SerialCapture {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Main capture loop: read chunks, feed the decoder, forward measurements.
///
/// Runs until the running flag clears, the reader reports EOF, a hard I/O
/// error occurs, or the measurement receiver is dropped. A frame left
/// incomplete when the stream ends is discarded, never emitted.
fn pump<R: Read>(
    mut reader: R,
    running: &AtomicBool,
    stats: &CaptureStats,
    tx: &Sender<Measurement>,
) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    let mut buf = [0u8; READ_CHUNK];

    let mut last_stats_time = Instant::now();
    let mut last_byte_count = 0u64;

    while running.load(Ordering::SeqCst) {
        match reader.read(&mut buf) {
            Ok(0) => {
                warn!("Byte stream closed (EOF)");
                break;
            }
            Ok(n) => {
                stats.reads.fetch_add(1, Ordering::Relaxed);
                stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);

                for &byte in &buf[..n] {
                    if let Some(measurement) = decoder.feed(byte) {
                        stats.frames_decoded.fetch_add(1, Ordering::Relaxed);
                        trace!(
                            "frame *{}; fine={} coarse={}",
                            decoder.frame_hex(),
                            measurement.fine,
                            measurement.coarse
                        );

                        // Blocking send: a slow sink backpressures the
                        // capture thread rather than dropping frames.
                        if tx.send(measurement).is_err() {
                            warn!("Measurement channel closed, stopping capture");
                            return Ok(());
                        }
                    }
                }

                if last_stats_time.elapsed() >= Duration::from_secs(5) {
                    let bytes = stats.bytes_read.load(Ordering::Relaxed);
                    let elapsed = last_stats_time.elapsed().as_secs_f32();
                    info!(
                        "[Capture] Rate: {:.0} B/s | Bytes: {} | Frames: {} | Timeouts: {}",
                        (bytes - last_byte_count) as f32 / elapsed,
                        bytes,
                        stats.frames_decoded.load(Ordering::Relaxed),
                        stats.read_timeouts.load(Ordering::Relaxed)
                    );
                    last_stats_time = Instant::now();
                    last_byte_count = bytes;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                // Nothing arrived within the read timeout; the decoder holds
                // its phase across the gap.
                stats.read_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(e).context("Error reading from serial port");
            }
        }
    }

    if decoder.in_frame() {
        warn!(
            "Stream ended mid-frame at phase {}, discarding partial frame",
            decoder.phase()
        );
    }

    info!(
        "Capture stopped. Bytes: {}, Frames: {}",
        stats.bytes_read.load(Ordering::Relaxed),
        stats.frames_decoded.load(Ordering::Relaxed)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_pump(bytes: Vec<u8>) -> (Vec<Measurement>, Arc<CaptureStats>) {
        let running = AtomicBool::new(true);
        let stats = CaptureStats::new();
        let (tx, rx) = bounded(1000);

        pump(Cursor::new(bytes), &running, &stats, &tx).unwrap();
        drop(tx);

        (rx.iter().collect(), stats)
    }

    #[test]
    fn test_pump_decodes_frames_in_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x01]);
        bytes.extend_from_slice(&[0xFF, 0x80, 0x00, 0x00, 0x00]);

        let (measurements, stats) = run_pump(bytes);

        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0], Measurement { fine: 1, coarse: 8_388_608 });
        assert_eq!(measurements[1], Measurement { fine: 511, coarse: 0 });
        assert_eq!(stats.frames_decoded.load(Ordering::Relaxed), 2);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_pump_discards_truncated_tail() {
        // One complete frame plus three trailing bytes, then EOF.
        let bytes = vec![0x01, 0x00, 0x00, 0x00, 0x01, 0xAA, 0xBB, 0xCC];
        let (measurements, stats) = run_pump(bytes);

        assert_eq!(measurements.len(), 1);
        assert_eq!(stats.frames_decoded.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_pump_stops_when_receiver_dropped() {
        let running = AtomicBool::new(true);
        let stats = CaptureStats::new();
        let (tx, rx) = bounded(1);
        drop(rx);

        let bytes = vec![0u8; 10];
        pump(Cursor::new(bytes), &running, &stats, &tx).unwrap();
    }

    #[test]
    fn test_pump_respects_running_flag() {
        let running = AtomicBool::new(false);
        let stats = CaptureStats::new();
        let (tx, rx) = bounded(16);

        pump(Cursor::new(vec![0u8; 100]), &running, &stats, &tx).unwrap();
        drop(tx);
        assert_eq!(rx.iter().count(), 0);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 0);
    }
}
