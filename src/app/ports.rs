//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Driven adapters (co-processor bridge, broker client, status surface,
//! clocks) implement these traits.  The [`NodeService`](super::service::NodeService)
//! and the bring-up machine consume them via generics, so the domain core
//! never touches hardware directly and every step is testable with fakes.
//!
//! The hardware-facing traits of the byte transport (serial line, receive
//! register, interrupt line) live in [`crate::transport`]; chip-enable and
//! settle delays use `embedded-hal` directly.

use core::fmt;
use core::net::Ipv4Addr;

// ───────────────────────────────────────────────────────────────
// Status sink (driven adapter: domain → operator)
// ───────────────────────────────────────────────────────────────

/// Line-oriented, human-readable progress and error surface.
///
/// One call is one line; the adapter applies the platform line terminator.
pub trait StatusSink {
    fn write_line(&mut self, line: fmt::Arguments<'_>);

    /// Blank the surface.  Called once at boot.
    fn clear(&mut self) {}
}

impl<S: StatusSink + ?Sized> StatusSink for &mut S {
    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        (**self).write_line(line);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

// ───────────────────────────────────────────────────────────────
// Clock (driven adapter: domain ↔ timers)
// ───────────────────────────────────────────────────────────────

/// Foreground time source and the only way the domain suspends.
///
/// Every wait is a bounded sleep that resumes on timer expiry; there is no
/// cancellation.
pub trait Clock {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Wall-clock nanoseconds since the Unix epoch (best effort; falls back
    /// to time since boot when the wall clock is unsynced).
    fn wall_nanos(&self) -> u64;

    /// Suspend the foreground task for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u64);
}

// ───────────────────────────────────────────────────────────────
// Console signal (driven adapter: USB-CDC DTR or equivalent)
// ───────────────────────────────────────────────────────────────

/// Human-confirmation gate used in debug bring-up.
pub trait ConsoleSignal {
    /// `true` once an operator has a console attached.
    fn is_attached(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Co-processor RPC port (driven adapter: domain → Wi-Fi co-processor)
// ───────────────────────────────────────────────────────────────

/// Address triple obtained from the co-processor's DHCP lease.
/// Acquired once per run and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

/// Semantic operations of the co-processor's command/response protocol.
pub trait CoProcessorPort {
    /// Initialise the co-processor's TCP/IP adapter.
    fn init(&mut self) -> Result<(), RpcError>;

    /// Join the access point.
    fn associate(&mut self, ssid: &str, password: &str) -> Result<(), RpcError>;

    /// Query the leased address, mask and gateway.
    fn leased_address(&mut self) -> Result<NetworkIdentity, RpcError>;
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: domain ↔ MQTT client)
// ───────────────────────────────────────────────────────────────

/// Delivery guarantee for publish/subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

pub const MAX_TOPIC_LEN: usize = 64;
pub const MAX_PAYLOAD_LEN: usize = 128;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: heapless::String<MAX_TOPIC_LEN>,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

/// Call contract of the broker client.  Each call is one synchronous
/// request; timeouts are whatever the client enforces internally.
pub trait BrokerPort {
    fn connect(&mut self, address: &str, client_id: &str) -> Result<(), BrokerError>;

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), BrokerError>;

    fn publish(
        &mut self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<(), BrokerError>;

    /// Next message received on a subscribed topic, if any.
    fn poll_inbound(&mut self) -> Option<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`CoProcessorPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcError {
    /// No matching response within the poll budget.
    Timeout,
    /// The byte transport reported a write/flush failure.
    Transport,
    /// Request did not fit the frame buffer.
    Encode,
    /// Response frame could not be decoded.
    Decode,
    /// A well-formed response of the wrong kind arrived.
    UnexpectedResponse,
    /// The co-processor answered with a non-zero status code.
    Remote(i32),
}

/// Errors from [`BrokerPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// CONNACK with a non-zero return code.
    Refused(u8),
    Timeout,
    NotConnected,
    /// Socket-level failure underneath the client.
    Io,
    TopicTooLong,
    PayloadTooLarge,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "rpc timeout"),
            Self::Transport => write!(f, "transport error"),
            Self::Encode => write!(f, "request encode failed"),
            Self::Decode => write!(f, "response decode failed"),
            Self::UnexpectedResponse => write!(f, "unexpected response"),
            Self::Remote(code) => write!(f, "co-processor status {}", code),
        }
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused(code) => write!(f, "connection refused (code {})", code),
            Self::Timeout => write!(f, "broker timeout"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Io => write!(f, "network I/O error"),
            Self::TopicTooLong => write!(f, "topic too long"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}
