//! Fuzz target: `FrameDecoder::push`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder and
//! asserts that it never panics, never yields an empty or oversized
//! payload, and behaves identically after a reset.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use heartbeat_node::rpc::codec::{FrameDecoder, MAX_FRAME_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    let mut first = Vec::new();

    for &b in data {
        if let Some(frame) = decoder.push(b) {
            assert!(frame.payload.len() <= MAX_FRAME_SIZE, "payload exceeds MAX_FRAME_SIZE");
            assert!(!frame.payload.is_empty(), "decoder must not yield empty payload");
            first.push((frame.seq, frame.payload.to_vec()));
        }
    }

    // A reset decoder must see exactly the same frames again.
    decoder.reset();
    let mut second = Vec::new();
    for &b in data {
        if let Some(frame) = decoder.push(b) {
            second.push((frame.seq, frame.payload.to_vec()));
        }
    }
    assert_eq!(first, second);
});
