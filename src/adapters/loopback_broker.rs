//! In-memory broker.
//!
//! Implements [`BrokerPort`] without a network: a publish on a subscribed
//! topic comes straight back as an inbound message, which is what a device
//! that publishes and subscribes on the same topic sees from a real broker.
//! Used by the host simulation binary.

use std::collections::VecDeque;

use heapless::String;
use log::debug;

use crate::app::ports::{
    BrokerError, BrokerPort, InboundMessage, MAX_PAYLOAD_LEN, MAX_TOPIC_LEN, QoS,
};

/// Maximum distinct subscriptions.
const MAX_SUBSCRIPTIONS: usize = 4;
/// Undelivered inbound messages beyond this are dropped (oldest first).
const INBOX_CAP: usize = 16;

#[derive(Default)]
pub struct LoopbackBroker {
    connected: bool,
    subscriptions: heapless::Vec<String<MAX_TOPIC_LEN>, MAX_SUBSCRIPTIONS>,
    inbox: VecDeque<InboundMessage>,
    published: u32,
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

/// `scheme://host[:port]` with a non-empty host.
fn valid_address(address: &str) -> bool {
    match address.split_once("://") {
        Some((scheme, rest)) => !scheme.is_empty() && !rest.is_empty() && !rest.starts_with(':'),
        None => false,
    }
}

impl BrokerPort for LoopbackBroker {
    fn connect(&mut self, address: &str, client_id: &str) -> Result<(), BrokerError> {
        if !valid_address(address) {
            return Err(BrokerError::Io);
        }
        if client_id.is_empty() {
            // MQTT 3.1.1 "identifier rejected"
            return Err(BrokerError::Refused(2));
        }
        self.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, _qos: QoS) -> Result<(), BrokerError> {
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        let topic = String::try_from(topic).map_err(|()| BrokerError::TopicTooLong)?;
        if !self.subscriptions.contains(&topic) {
            self.subscriptions
                .push(topic)
                .map_err(|_| BrokerError::Io)?;
        }
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        _qos: QoS,
        _retain: bool,
        payload: &[u8],
    ) -> Result<(), BrokerError> {
        if !self.connected {
            return Err(BrokerError::NotConnected);
        }
        let topic: String<MAX_TOPIC_LEN> =
            String::try_from(topic).map_err(|()| BrokerError::TopicTooLong)?;
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(BrokerError::PayloadTooLarge);
        }
        self.published = self.published.wrapping_add(1);

        if self.subscriptions.contains(&topic) {
            if self.inbox.len() == INBOX_CAP {
                self.inbox.pop_front();
            }
            let payload = heapless::Vec::from_slice(payload).map_err(|()| BrokerError::PayloadTooLarge)?;
            self.inbox.push_back(InboundMessage { topic, payload });
            debug!("Loopback: queued message for subscriber");
        }
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<InboundMessage> {
        self.inbox.pop_front()
    }
}
