//! Serial transport and capture thread
//!
//! Opens the TDC's UART at a fixed baud rate and pumps raw bytes through the
//! frame decoder on a dedicated thread:
//! 1. Blocking chunk reads from the port
//! 2. Byte-by-byte decode through [`crate::tdc::FrameDecoder`]
//! 3. Completed measurements onto a bounded channel

pub mod capture;

pub use capture::{CaptureStats, SerialCapture, SerialConfig};
