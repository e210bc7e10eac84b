//! Fuzz target: RPC response decoding
//!
//! Any payload handed up by the frame decoder must either decode to a
//! `Response` or fail cleanly; it must never panic.
//!
//! cargo fuzz run fuzz_rpc_response

#![no_main]

use heartbeat_node::rpc::messages::{self, Response};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(resp) = messages::decode::<Response>(data) {
        let mut buf = [0u8; 64];
        let used = messages::encode(&resp, &mut buf).expect("decoded response re-encodes").len();
        assert_eq!(messages::decode::<Response>(&buf[..used]).ok(), Some(resp));
    }
});
