//! TDC measurement frame decoding
//!
//! The FPGA streams each time-interval measurement as a fixed 5-byte frame:
//! 1. Low 8 bits of the fine (sub-cycle interpolation) value
//! 2. Overflow bit (MSB) plus the 7 low coarse bits
//! 3.-5. Remaining coarse bits, least-significant chunk first
//!
//! There are no sync markers or checksums on the wire; framing is purely
//! positional. See [`decoder`] for the consequences.

mod decoder;
mod types;

pub use decoder::FrameDecoder;
pub use types::Measurement;

/// Bytes per measurement frame.
pub const FRAME_LEN: usize = 5;
