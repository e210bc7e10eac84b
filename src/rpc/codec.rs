//! Length-prefix frame codec.
//!
//! Wire format:
//! ```text
//! ┌──────────────┬─────────┬──────────────────────────┐
//! │ Length (2B)  │ Seq (1B)│ postcard payload (N B)   │
//! │ LE u16       │         │                          │
//! └──────────────┴─────────┴──────────────────────────┘
//! ```
//!
//! The decoder is fed one byte at a time, which is exactly how bytes leave
//! the receive ring.  A single `Transport::read` may return part of a
//! header, part of a payload, or several frames back to back; feeding byte
//! by byte means nothing after a completed frame is ever lost.

/// Maximum frame payload size.
pub const MAX_FRAME_SIZE: usize = 256;

/// Frame header size (2-byte little-endian length + sequence byte).
pub const HEADER_SIZE: usize = 3;

/// Largest encoded frame.
pub const MAX_ENCODED_SIZE: usize = HEADER_SIZE + MAX_FRAME_SIZE;

/// A decoded frame.  Borrowed from the decoder until the next `push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub seq: u8,
    pub payload: &'a [u8],
}

enum DecoderState {
    ReadingHeader { collected: usize },
    ReadingPayload { expected: usize, collected: usize },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    header_buf: [u8; HEADER_SIZE],
    payload_buf: [u8; MAX_FRAME_SIZE],
    rejected: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header_buf: [0; HEADER_SIZE],
            payload_buf: [0; MAX_FRAME_SIZE],
            rejected: 0,
        }
    }

    /// Feed one byte.  Returns the frame it completes, if any.
    pub fn push(&mut self, byte: u8) -> Option<Frame<'_>> {
        match &mut self.state {
            DecoderState::ReadingHeader { collected } => {
                self.header_buf[*collected] = byte;
                *collected += 1;
                if *collected < HEADER_SIZE {
                    return None;
                }

                let expected = u16::from_le_bytes([self.header_buf[0], self.header_buf[1]]) as usize;
                if expected == 0 || expected > MAX_FRAME_SIZE {
                    // Bad length: drop the header and resynchronise.
                    self.rejected = self.rejected.saturating_add(1);
                    self.state = DecoderState::ReadingHeader { collected: 0 };
                } else {
                    self.state = DecoderState::ReadingPayload { expected, collected: 0 };
                }
                None
            }

            DecoderState::ReadingPayload { expected, collected } => {
                self.payload_buf[*collected] = byte;
                *collected += 1;
                if *collected < *expected {
                    return None;
                }

                let len = *expected;
                self.state = DecoderState::ReadingHeader { collected: 0 };
                Some(Frame {
                    seq: self.header_buf[2],
                    payload: &self.payload_buf[..len],
                })
            }
        }
    }

    /// Number of headers discarded for an out-of-range length.
    pub fn rejected_headers(&self) -> u32 {
        self.rejected
    }

    /// `true` when no partial frame is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, DecoderState::ReadingHeader { collected: 0 })
    }

    /// Reset decoder state (e.g. after the co-processor is power-cycled).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
    }
}

/// Encode a payload into a length-prefixed, sequence-tagged frame.
///
/// Returns the total number of bytes written to `out_buf`, or `None` if the
/// payload is empty, oversized, or does not fit.
pub fn encode_frame(seq: u8, payload: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    let total = HEADER_SIZE + payload.len();
    if payload.is_empty() || payload.len() > MAX_FRAME_SIZE || total > out_buf.len() {
        return None;
    }

    let len_bytes = (payload.len() as u16).to_le_bytes();
    out_buf[..2].copy_from_slice(&len_bytes);
    out_buf[2] = seq;
    out_buf[HEADER_SIZE..total].copy_from_slice(payload);

    Some(total)
}
