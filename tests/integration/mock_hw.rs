//! Mock adapters for integration tests.
//!
//! Each fake records what it was asked to do so tests can assert on the
//! full call history without hardware, a network, or real time passing.

use core::fmt;
use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use heartbeat_node::app::ports::{
    BrokerError, BrokerPort, Clock, CoProcessorPort, InboundMessage, NetworkIdentity, QoS,
    RpcError, StatusSink,
};
use heartbeat_node::app::service::NodeService;
use heartbeat_node::config::NodeConfig;
use heartbeat_node::error::SequencerError;
use heartbeat_node::sequencer::PowerSequence;

/// Wall-clock origin of the fake clock (2024-01-01T00:00:00Z).
pub const WALL_EPOCH_NS: u64 = 1_704_067_200 * 1_000_000_000;

// ── Clock ─────────────────────────────────────────────────────

/// Time only moves when someone sleeps.
#[derive(Default)]
pub struct FakeClock {
    pub now_ms: u64,
    pub sleeps: Vec<u64>,
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn wall_nanos(&self) -> u64 {
        WALL_EPOCH_NS + self.now_ms * 1_000_000
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now_ms += ms;
    }
}

/// `DelayNs` that returns immediately.
#[derive(Default, Clone, Copy)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Status sink ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
    pub clears: u32,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, line: &str) -> usize {
        self.lines.iter().filter(|l| l.as_str() == line).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.lines.iter().filter(|l| l.starts_with(prefix)).count()
    }
}

impl StatusSink for RecordingSink {
    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        self.lines.push(line.to_string());
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

// ── Co-processor + power sequence ─────────────────────────────

pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

/// Which step, if any, the fake hardware fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    pub power: Option<SequencerError>,
    pub attach: Option<SequencerError>,
    pub init: Option<RpcError>,
    pub associate: Option<RpcError>,
    pub lease: Option<RpcError>,
}

pub struct FakeCoProcessor {
    log: CallLog,
    faults: Faults,
    pub credentials: Option<(String, String)>,
}

impl CoProcessorPort for FakeCoProcessor {
    fn init(&mut self) -> Result<(), RpcError> {
        self.log.borrow_mut().push("init");
        self.faults.init.map_or(Ok(()), Err)
    }

    fn associate(&mut self, ssid: &str, password: &str) -> Result<(), RpcError> {
        self.log.borrow_mut().push("associate");
        self.credentials = Some((ssid.into(), password.into()));
        self.faults.associate.map_or(Ok(()), Err)
    }

    fn leased_address(&mut self) -> Result<NetworkIdentity, RpcError> {
        self.log.borrow_mut().push("lease");
        match self.faults.lease {
            Some(e) => Err(e),
            None => Ok(NetworkIdentity {
                ip: Ipv4Addr::new(10, 0, 0, 7),
                mask: Ipv4Addr::new(255, 255, 255, 0),
                gateway: Ipv4Addr::new(10, 0, 0, 1),
            }),
        }
    }
}

pub struct FakePowerSequence {
    pub log: CallLog,
    faults: Faults,
}

impl FakePowerSequence {
    pub fn new(faults: Faults) -> Self {
        Self { log: CallLog::default(), faults }
    }
}

impl PowerSequence for FakePowerSequence {
    type Bridge = FakeCoProcessor;

    fn power_cycle(&mut self, _debug: bool) -> Result<(), SequencerError> {
        self.log.borrow_mut().push("power_cycle");
        self.faults.power.map_or(Ok(()), Err)
    }

    fn attach(&mut self) -> Result<FakeCoProcessor, SequencerError> {
        self.log.borrow_mut().push("attach");
        match self.faults.attach {
            Some(e) => Err(e),
            None => Ok(FakeCoProcessor { log: self.log.clone(), faults: self.faults, credentials: None }),
        }
    }
}

// ── Broker ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: Vec<u8>,
}

#[allow(dead_code)]
impl Published {
    /// Fake-clock milliseconds encoded in a heartbeat payload.
    pub fn at_ms(&self) -> u64 {
        let nanos: u64 = std::str::from_utf8(&self.payload).unwrap().parse().unwrap();
        (nanos - WALL_EPOCH_NS) / 1_000_000
    }
}

#[derive(Default)]
pub struct FakeBroker {
    pub refuse_connect: Option<BrokerError>,
    pub refuse_subscribe: Option<BrokerError>,
    /// 1-based publish attempt that fails; every later attempt fails too.
    pub fail_publish_from: Option<u32>,

    pub connects: Vec<(String, String)>,
    pub subscriptions: Vec<(String, QoS)>,
    pub publish_attempts: u32,
    pub published: Vec<Published>,
    pub inbox: Vec<InboundMessage>,
}

impl BrokerPort for FakeBroker {
    fn connect(&mut self, address: &str, client_id: &str) -> Result<(), BrokerError> {
        self.connects.push((address.into(), client_id.into()));
        self.refuse_connect.map_or(Ok(()), Err)
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), BrokerError> {
        self.subscriptions.push((topic.into(), qos));
        self.refuse_subscribe.map_or(Ok(()), Err)
    }

    fn publish(&mut self, topic: &str, qos: QoS, retain: bool, payload: &[u8]) -> Result<(), BrokerError> {
        self.publish_attempts += 1;
        if self.fail_publish_from.is_some_and(|n| self.publish_attempts >= n) {
            return Err(BrokerError::Timeout);
        }
        self.published.push(Published { topic: topic.into(), qos, retain, payload: payload.to_vec() });
        Ok(())
    }

    fn poll_inbound(&mut self) -> Option<InboundMessage> {
        if self.inbox.is_empty() { None } else { Some(self.inbox.remove(0)) }
    }
}

// ── Service assembly ──────────────────────────────────────────

pub type TestService = NodeService<FakePowerSequence, FakeBroker, FakeClock, RecordingSink>;

#[allow(dead_code)]
pub fn config(ssid: &str, password: &str) -> NodeConfig {
    let mut c = NodeConfig::default();
    c.ssid = heapless::String::try_from(ssid).unwrap();
    c.password = heapless::String::try_from(password).unwrap();
    c.broker_url = heapless::String::try_from("tcp://10.0.0.2:1883").unwrap();
    c
}

#[allow(dead_code)]
pub fn service(faults: Faults, broker: FakeBroker) -> TestService {
    NodeService::new(
        config("home", "secret"),
        FakePowerSequence::new(faults),
        broker,
        FakeClock::default(),
        RecordingSink::default(),
    )
}

/// Tick until the service leaves the bring-up/connect/subscribe states.
#[allow(dead_code)]
pub fn tick_until_subscribed(svc: &mut TestService) {
    for _ in 0..3 {
        svc.tick();
        if svc.session().subscribed || svc.is_halted() {
            return;
        }
    }
}
