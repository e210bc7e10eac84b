//! Broker session manager.
//!
//! Owns the broker client for the life of the run: one connection, one
//! subscription, then a heartbeat publish per tick.  Every failure is
//! returned to the caller untouched; there is no retry here.

use core::fmt;

use heapless::String;
use log::{info, warn};

use super::ports::{BrokerError, BrokerPort, InboundMessage, QoS, StatusSink};
use crate::error::Error;

/// Heartbeats are fire-and-forget.
pub const HEARTBEAT_QOS: QoS = QoS::AtMostOnce;
/// Heartbeats are never retained by the broker.
pub const HEARTBEAT_RETAIN: bool = false;

/// Longest decimal rendering of a `u64`.
const HEARTBEAT_DIGITS: usize = 20;

/// Callback run for each message received on the subscribed topic.
pub type MessageHandler = fn(&InboundMessage, &mut dyn StatusSink);

/// Default handler: echo the topic and payload to the status surface.
pub fn report_inbound(msg: &InboundMessage, sink: &mut dyn StatusSink) {
    sink.write_line(format_args!("Received:"));
    sink.write_line(format_args!("[{}]  {}", msg.topic, Lossy(&msg.payload)));
}

/// Payload bytes as text; invalid UTF-8 sequences become U+FFFD.
struct Lossy<'a>(&'a [u8]);

impl fmt::Display for Lossy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

/// Connection flags.  Only ever move from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerSession {
    pub connected: bool,
    pub subscribed: bool,
}

/// One published heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatMessage {
    /// Nanosecond timestamp carried by the payload.
    pub value: u64,
    payload: String<HEARTBEAT_DIGITS>,
}

impl HeartbeatMessage {
    fn new(value: u64) -> Self {
        let mut payload = String::new();
        // 20 digits always fit.
        let _ = fmt::write(&mut payload, format_args!("{}", value));
        Self { value, payload }
    }

    /// Decimal ASCII rendering of `value`.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.payload
    }
}

/// Produces heartbeat values that never go backwards within a run, even if
/// the wall clock is stepped.
#[derive(Debug, Default)]
pub struct HeartbeatGenerator {
    last: u64,
}

impl HeartbeatGenerator {
    pub fn next(&mut self, now_nanos: u64) -> HeartbeatMessage {
        self.last = self.last.max(now_nanos);
        HeartbeatMessage::new(self.last)
    }
}

pub struct SessionManager<K: BrokerPort> {
    broker: K,
    session: BrokerSession,
    handler: Option<MessageHandler>,
    heartbeat: HeartbeatGenerator,
    published: u32,
}

impl<K: BrokerPort> SessionManager<K> {
    pub fn new(broker: K) -> Self {
        Self {
            broker,
            session: BrokerSession::default(),
            handler: None,
            heartbeat: HeartbeatGenerator::default(),
            published: 0,
        }
    }

    pub fn session(&self) -> BrokerSession {
        self.session
    }

    /// Heartbeats successfully handed to the broker.
    pub fn published_count(&self) -> u32 {
        self.published
    }

    pub fn broker(&self) -> &K {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut K {
        &mut self.broker
    }

    pub fn connect_broker<S>(&mut self, address: &str, client_id: &str, sink: &mut S) -> Result<(), Error>
    where
        S: StatusSink + ?Sized,
    {
        sink.write_line(format_args!("Connecting to MQTT: {} ...", address));
        self.broker
            .connect(address, client_id)
            .map_err(Error::BrokerConnect)?;
        self.session.connected = true;
        info!("Session: connected to {} as {}", address, client_id);
        Ok(())
    }

    /// Register the single subscription.
    pub fn subscribe(&mut self, topic: &str, handler: MessageHandler) -> Result<(), Error> {
        if !self.session.connected {
            return Err(Error::Subscribe(BrokerError::NotConnected));
        }
        if self.session.subscribed {
            warn!("Session: already subscribed, ignoring {}", topic);
            return Ok(());
        }
        self.broker
            .subscribe(topic, HEARTBEAT_QOS)
            .map_err(Error::Subscribe)?;
        self.handler = Some(handler);
        self.session.subscribed = true;
        info!("Session: subscribed to {}", topic);
        Ok(())
    }

    /// Build and publish one heartbeat.  One attempt only.
    pub fn publish_heartbeat(&mut self, topic: &str, now_nanos: u64) -> Result<HeartbeatMessage, Error> {
        if !self.session.connected {
            return Err(Error::Publish(BrokerError::NotConnected));
        }
        let msg = self.heartbeat.next(now_nanos);
        self.broker
            .publish(topic, HEARTBEAT_QOS, HEARTBEAT_RETAIN, msg.payload())
            .map_err(Error::Publish)?;
        self.published = self.published.wrapping_add(1);
        info!("Session: heartbeat #{} -> {} ({})", self.published, topic, msg.as_str());
        Ok(msg)
    }

    /// Run the registered handler over every pending inbound message.
    /// Returns how many were handled.
    pub fn dispatch_inbound<S: StatusSink>(&mut self, sink: &mut S) -> usize {
        let Some(handler) = self.handler else {
            return 0;
        };
        let mut handled = 0;
        while let Some(msg) = self.broker.poll_inbound() {
            handler(&msg, sink);
            handled += 1;
        }
        handled
    }
}
