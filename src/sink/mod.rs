//! Measurement persistence

mod log;

pub use log::{LogSink, RunManifest};

use thiserror::Error;

use crate::tdc::Measurement;

/// Errors from recording measurements.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest serialization error: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Destination for decoded measurements.
///
/// Receives each measurement exactly once, in frame-completion order.
/// Implementations must keep the fine and coarse records index-aligned;
/// downstream analysis pairs them by position.
pub trait MeasurementSink {
    fn record(&mut self, measurement: &Measurement) -> Result<(), SinkError>;

    /// Push buffered records to durable storage.
    fn flush(&mut self) -> Result<(), SinkError>;
}

/// In-memory sink, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    measurements: Vec<Measurement>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

impl MeasurementSink for MemorySink {
    fn record(&mut self, measurement: &Measurement) -> Result<(), SinkError> {
        self.measurements.push(*measurement);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_preserves_order() {
        let mut sink = MemorySink::new();
        for i in 0..4 {
            sink.record(&Measurement {
                fine: i,
                coarse: i as u32 * 100,
            })
            .unwrap();
        }
        sink.flush().unwrap();

        let fines: Vec<u16> = sink.measurements().iter().map(|m| m.fine).collect();
        assert_eq!(fines, vec![0, 1, 2, 3]);
    }
}
