//! Node configuration parameters
//!
//! All parameters are boot-time constants.  Credentials and broker details
//! are baked in from the build environment (`WIFI_SSID`, `WIFI_PASSWORD`,
//! `MQTT_BROKER`, `MQTT_CLIENT_ID`); the host binary may additionally load a
//! JSON file once at boot.  There is no runtime reconfiguration.

use heapless::String;
use serde::{Deserialize, Serialize};

// --- Power sequencing (mandated settle delays) ---

/// Chip-enable held low for this long before release.
pub const POWER_OFF_SETTLE_MS: u32 = 100;
/// Wait after chip-enable goes high before touching the serial line.
pub const POWER_ON_SETTLE_MS: u32 = 1000;
/// Poll period of the "console attached" gate in debug mode.
pub const CONSOLE_POLL_MS: u32 = 100;

// --- Transport ---

/// Yield applied by an empty read before returning zero bytes.
pub const READ_YIELD_MS: u32 = 1;
/// Receive ring capacity in bytes.
pub const RX_BUFFER_CAP: usize = 512;

// --- Session ---

/// Longest single sleep inside the heartbeat wait; inbound messages are
/// dispatched between slices.
pub const INBOUND_POLL_MS: u64 = 1000;

const DEFAULT_SSID: &str = match option_env!("WIFI_SSID") {
    Some(s) => s,
    None => "<SSID>",
};
const DEFAULT_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(s) => s,
    None => "<PASSWORD>",
};
const DEFAULT_BROKER: &str = match option_env!("MQTT_BROKER") {
    Some(s) => s,
    None => "tcp://127.0.0.1:1883",
};
const DEFAULT_CLIENT_ID: &str = match option_env!("MQTT_CLIENT_ID") {
    Some(s) => s,
    None => "wio-client",
};

const SSID_CAP: usize = 32;
const PASSWORD_CAP: usize = 64;
const BROKER_URL_CAP: usize = 96;
const CLIENT_ID_CAP: usize = 32;
const TOPIC_CAP: usize = 64;

// Over-long build-time values fail the build instead of being clipped.
const _: () = assert!(fits(DEFAULT_SSID, SSID_CAP), "WIFI_SSID is longer than 32 bytes");
const _: () = assert!(fits(DEFAULT_PASSWORD, PASSWORD_CAP), "WIFI_PASSWORD is longer than 64 bytes");
const _: () = assert!(fits(DEFAULT_BROKER, BROKER_URL_CAP), "MQTT_BROKER is longer than 96 bytes");
const _: () = assert!(fits(DEFAULT_CLIENT_ID, CLIENT_ID_CAP), "MQTT_CLIENT_ID is longer than 32 bytes");

/// `true` if `s` fits a `String<cap>` unchanged.
pub const fn fits(s: &str, cap: usize) -> bool {
    s.len() <= cap
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Wi-Fi ---
    /// Access point SSID
    pub ssid: String<SSID_CAP>,
    /// WPA passphrase (empty for open networks)
    pub password: String<PASSWORD_CAP>,

    // --- Broker ---
    /// Broker URL, e.g. `tcp://192.168.1.10:1883`
    pub broker_url: String<BROKER_URL_CAP>,
    /// MQTT client identifier
    pub client_id: String<CLIENT_ID_CAP>,
    /// Topic heartbeats are published to
    pub topic_publish: String<TOPIC_CAP>,
    /// Topic subscribed for inbound messages
    pub topic_subscribe: String<TOPIC_CAP>,

    // --- Co-processor link ---
    /// Block on the console-attached gate and log every RPC frame
    pub debug: bool,
    /// Serial line rate to the co-processor
    pub baud_rate: u32,
    /// Empty-poll budget for one RPC round trip (milliseconds)
    pub rpc_timeout_ms: u32,

    // --- Timing ---
    /// Heartbeat publish cadence (seconds)
    pub heartbeat_interval_secs: u32,
    /// Halt-and-display repeat period (seconds)
    pub halt_retry_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        // Build-time values are length-checked above, so nothing is clipped.
        Self {
            ssid: truncated(DEFAULT_SSID),
            password: truncated(DEFAULT_PASSWORD),

            broker_url: truncated(DEFAULT_BROKER),
            client_id: truncated(DEFAULT_CLIENT_ID),
            topic_publish: truncated("heartbeat"),
            topic_subscribe: truncated("heartbeat"),

            debug: false,
            baud_rate: 614_400,
            rpc_timeout_ms: 5_000,

            heartbeat_interval_secs: 30,
            halt_retry_secs: 5,
        }
    }
}

/// Reasons a configuration is rejected at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID must be 1-32 printable ASCII bytes.
    InvalidSsid,
    BrokerUrlEmpty,
    ClientIdEmpty,
    TopicEmpty,
    /// An interval or rate was zero.
    ZeroTiming(&'static str),
    /// JSON document could not be parsed into a config.
    Malformed,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::BrokerUrlEmpty => write!(f, "broker URL is empty"),
            Self::ClientIdEmpty => write!(f, "client id is empty"),
            Self::TopicEmpty => write!(f, "topic is empty"),
            Self::ZeroTiming(field) => write!(f, "{} must be non-zero", field),
            Self::Malformed => write!(f, "config document malformed"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl NodeConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range/emptiness checks.  Credentials are not checked against WPA
    /// length rules; the co-processor is the authority on those.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || !is_printable_ascii(&self.ssid) {
            return Err(ConfigError::InvalidSsid);
        }
        if self.broker_url.is_empty() {
            return Err(ConfigError::BrokerUrlEmpty);
        }
        if self.client_id.is_empty() {
            return Err(ConfigError::ClientIdEmpty);
        }
        if self.topic_publish.is_empty() || self.topic_subscribe.is_empty() {
            return Err(ConfigError::TopicEmpty);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroTiming("baud_rate"));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ZeroTiming("heartbeat_interval_secs"));
        }
        if self.halt_retry_secs == 0 {
            return Err(ConfigError::ZeroTiming("halt_retry_secs"));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(ConfigError::ZeroTiming("rpc_timeout_ms"));
        }
        Ok(())
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        u64::from(self.heartbeat_interval_secs) * 1000
    }

    pub fn halt_retry_ms(&self) -> u64 {
        u64::from(self.halt_retry_secs) * 1000
    }
}

/// Copy as much of `s` as fits, cutting on a char boundary.
pub(crate) fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
