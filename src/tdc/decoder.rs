//! Frame decoder state machine
//!
//! A byte-synchronous 5-phase FSM. Every 8-bit value is legal payload at
//! every phase, so the decoder has no error path - but it also means a
//! dropped or duplicated byte upstream silently shifts the frame boundary
//! and corrupts all subsequent measurements. The wire protocol carries no
//! sync markers to recover from; this limitation is inherited from the FPGA
//! design and deliberately not masked here.

use super::types::Measurement;
use super::FRAME_LEN;

/// Stateful decoder for the 5-byte coarse+fine framing.
///
/// Owned by a single capture thread; one instance per byte stream. Feed one
/// byte at a time; a [`Measurement`] is returned exactly when the fifth byte
/// of a frame completes it.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Position within the current frame, 0-4.
    phase: u8,
    /// Fine value accumulator; final after phase 1.
    fine: u16,
    /// Coarse value accumulator, built by shift-and-OR.
    coarse: u32,
    /// Raw bytes of the frame in flight, kept for diagnostics.
    raw: [u8; FRAME_LEN],
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            phase: 0,
            fine: 0,
            coarse: 0,
            raw: [0; FRAME_LEN],
        }
    }

    /// Consume one raw byte, returning a measurement when it completes a frame.
    ///
    /// Transitions 0→1→2→3→4→0 unconditionally. Coarse bytes arrive
    /// least-significant chunk first, so each lands at a higher bit offset
    /// than the last: 7 bits at offset 0, then 8 bits at offsets 7, 15, 23.
    pub fn feed(&mut self, byte: u8) -> Option<Measurement> {
        self.raw[self.phase as usize] = byte;

        match self.phase {
            0 => {
                self.fine = byte as u16;
                self.coarse = 0;
                self.phase = 1;
                None
            }
            1 => {
                // MSB extends the fine value by 256; the rest is coarse.
                if byte & 0x80 != 0 {
                    self.fine += 256;
                }
                self.coarse = (byte & 0x7F) as u32;
                self.phase = 2;
                None
            }
            2 => {
                self.coarse |= (byte as u32) << 7;
                self.phase = 3;
                None
            }
            3 => {
                self.coarse |= (byte as u32) << 15;
                self.phase = 4;
                None
            }
            _ => {
                self.coarse |= (byte as u32) << 23;
                self.phase = 0;
                Some(Measurement {
                    fine: self.fine,
                    coarse: self.coarse,
                })
            }
        }
    }

    /// Current position within the frame (0-4).
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Whether a frame is partially accumulated.
    ///
    /// A stream that ends while this is true loses the partial frame; it is
    /// never emitted.
    pub fn in_frame(&self) -> bool {
        self.phase != 0
    }

    /// Hex rendering of the most recently buffered frame bytes.
    ///
    /// Meaningful for logging right after [`feed`](Self::feed) returns a
    /// measurement, when all five slots belong to the completed frame.
    pub fn frame_hex(&self) -> String {
        hex::encode(self.raw)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference assembly, written out independently of the decoder.
    fn reference_decode(b: [u8; 5]) -> Measurement {
        Measurement {
            fine: b[0] as u16 + 256 * ((b[1] >> 7) & 1) as u16,
            coarse: (b[1] & 0x7F) as u32
                | ((b[2] as u32) << 7)
                | ((b[3] as u32) << 15)
                | ((b[4] as u32) << 23),
        }
    }

    fn decode_frame(decoder: &mut FrameDecoder, frame: [u8; 5]) -> Option<Measurement> {
        let mut out = None;
        for byte in frame {
            out = decoder.feed(byte);
        }
        out
    }

    #[test]
    fn test_single_frame_matches_reference() {
        let frames = [
            [0x00, 0x00, 0x00, 0x00, 0x00],
            [0x12, 0x34, 0x56, 0x78, 0x9A],
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF],
            [0xAB, 0x80, 0x01, 0x02, 0x03],
            [0x01, 0x7F, 0x00, 0xFF, 0x00],
        ];
        for frame in frames {
            let mut decoder = FrameDecoder::new();
            let m = decode_frame(&mut decoder, frame).expect("frame should complete");
            assert_eq!(m, reference_decode(frame), "frame {:02X?}", frame);
        }
    }

    #[test]
    fn test_known_frame() {
        // Byte 4 lands at bit offset 23.
        let mut decoder = FrameDecoder::new();
        let m = decode_frame(&mut decoder, [0x01, 0x00, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(m.fine, 1);
        assert_eq!(m.coarse, 1 << 23);
        assert_eq!(m.coarse, 8_388_608);
    }

    #[test]
    fn test_overflow_bit_boundary() {
        // Overflow set, all coarse bits clear.
        let mut decoder = FrameDecoder::new();
        let m = decode_frame(&mut decoder, [0xFF, 0x80, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(m.fine, 511);
        assert_eq!(m.coarse, 0);
    }

    #[test]
    fn test_overflow_clear() {
        let mut decoder = FrameDecoder::new();
        let m = decode_frame(&mut decoder, [0xFF, 0x7F, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(m.fine, 255);
        assert_eq!(m.coarse, 0x7F);
    }

    #[test]
    fn test_coarse_full_width() {
        let mut decoder = FrameDecoder::new();
        let m = decode_frame(&mut decoder, [0x00, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(m.fine, 256);
        assert_eq!(m.coarse, 0x7FFF_FFFF);
    }

    #[test]
    fn test_n_frames_in_order() {
        let frames: Vec<[u8; 5]> = (0..8u8).map(|i| [i, 0x00, i, 0x00, i]).collect();

        let mut decoder = FrameDecoder::new();
        let mut out = Vec::new();
        for frame in &frames {
            for &byte in frame {
                if let Some(m) = decoder.feed(byte) {
                    out.push(m);
                }
            }
        }

        assert_eq!(out.len(), frames.len());
        for (m, frame) in out.iter().zip(&frames) {
            assert_eq!(*m, reference_decode(*frame));
        }
    }

    #[test]
    fn test_partial_tail_not_emitted() {
        for k in 1..FRAME_LEN {
            let mut decoder = FrameDecoder::new();
            let mut emitted = 0;

            // Two complete frames, then k trailing bytes.
            for byte in [0x11, 0x22, 0x33, 0x44, 0x55, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE] {
                if decoder.feed(byte).is_some() {
                    emitted += 1;
                }
            }
            for byte in 0..k as u8 {
                assert!(decoder.feed(byte).is_none());
            }

            assert_eq!(emitted, 2);
            assert!(decoder.in_frame());
            assert_eq!(decoder.phase() as usize, k);
        }
    }

    #[test]
    fn test_determinism_across_instances() {
        let bytes: Vec<u8> = (0..40u8).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();

        let run = |bytes: &[u8]| {
            let mut decoder = FrameDecoder::new();
            bytes.iter().filter_map(|&b| decoder.feed(b)).collect::<Vec<_>>()
        };

        let a = run(&bytes);
        let b = run(&bytes);
        assert_eq!(a.len(), bytes.len() / FRAME_LEN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fine_fixed_after_phase_one() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(0x42);
        decoder.feed(0x80);
        // Coarse bytes must not disturb the fine value.
        decoder.feed(0xFF);
        decoder.feed(0xFF);
        let m = decoder.feed(0xFF).unwrap();
        assert_eq!(m.fine, 0x42 + 256);
    }

    #[test]
    fn test_frame_hex_after_completion() {
        let mut decoder = FrameDecoder::new();
        decode_frame(&mut decoder, [0x01, 0x02, 0x03, 0x04, 0x05]).unwrap();
        assert_eq!(decoder.frame_hex(), "0102030405");
    }
}
