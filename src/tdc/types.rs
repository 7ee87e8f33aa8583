//! Decoded measurement types

/// One decoded time-interval measurement, reconstructed from a 5-byte frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Sub-cycle interpolation value, 9 bits (0-511).
    ///
    /// 8 bits from the first frame byte, plus 256 when the overflow bit in
    /// the second byte is set.
    pub fine: u16,

    /// Reference-clock cycle counter, 31 bits.
    ///
    /// 7 bits from the second frame byte plus 8 bits from each of the last
    /// three, assembled least-significant chunk first.
    pub coarse: u32,
}
