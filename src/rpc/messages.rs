//! Request/response set spoken with the co-processor.
//!
//! Payloads are postcard-encoded; each request gets exactly one response
//! carrying the same frame sequence number.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Host → co-processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Bring up the co-processor's TCP/IP adapter.
    Init,
    /// Join an access point.
    Associate {
        ssid: String<32>,
        password: String<64>,
    },
    /// Read back the DHCP lease.
    GetLeasedAddress,
}

/// Co-processor → host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Completion code.  Zero means success.
    Status(i32),
    /// Leased address triple, network byte order.
    Lease {
        ip: [u8; 4],
        mask: [u8; 4],
        gateway: [u8; 4],
    },
}

impl Request {
    /// Short name for frame logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::Associate { .. } => "Associate",
            Self::GetLeasedAddress => "GetLeasedAddress",
        }
    }
}

/// Serialize `msg` into `buf`, returning the used prefix.
pub fn encode<'b, M: Serialize>(msg: &M, buf: &'b mut [u8]) -> Result<&'b mut [u8], postcard::Error> {
    postcard::to_slice(msg, buf)
}

/// Deserialize one message from a frame payload.
pub fn decode<'de, M: Deserialize<'de>>(payload: &'de [u8]) -> Result<M, postcard::Error> {
    postcard::from_bytes(payload)
}
