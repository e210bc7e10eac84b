//! Broker session, heartbeat cadence, and halt-and-display.

use std::cell::Cell;

use heartbeat_node::app::ports::{BrokerError, Clock, InboundMessage, QoS};
use heartbeat_node::app::service::NodeService;
use heartbeat_node::error::Error;
use heartbeat_node::fsm::RunState;

use crate::mock_hw::{
    FakeBroker, FakePowerSequence, Faults, RecordingSink, WALL_EPOCH_NS, config, service,
    tick_until_subscribed,
};

const INTERVAL_MS: u64 = 30_000;
const HALT_MS: u64 = 5_000;

#[test]
fn connect_and_subscribe_use_configured_values() {
    let mut svc = service(Faults::default(), FakeBroker::default());
    tick_until_subscribed(&mut svc);

    assert_eq!(svc.state(), RunState::Subscribed);
    assert_eq!(
        svc.broker().connects,
        [("tcp://10.0.0.2:1883".to_string(), "wio-client".to_string())]
    );
    assert_eq!(svc.broker().subscriptions, [("heartbeat".to_string(), QoS::AtMostOnce)]);
    assert!(svc.session().connected && svc.session().subscribed);
    assert!(svc.broker().published.is_empty());
}

#[test]
fn n_ticks_give_n_publishes_spaced_by_interval() {
    let mut svc = service(Faults::default(), FakeBroker::default());
    tick_until_subscribed(&mut svc);

    let n = 6;
    for i in 0..n {
        let before = svc.clock().now_ms;
        svc.tick();
        assert_eq!(svc.broker().published.len(), i + 1);
        // The next tick is not due until the full interval has elapsed.
        assert_eq!(svc.clock().now_ms - before, INTERVAL_MS);
    }
    assert_eq!(svc.state(), RunState::Publishing);
    assert_eq!(svc.heartbeats_sent(), n as u32);

    let times: Vec<u64> = svc.broker().published.iter().map(|p| p.at_ms()).collect();
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], INTERVAL_MS);
    }
    for p in &svc.broker().published {
        assert_eq!(p.topic, "heartbeat");
        assert_eq!(p.qos, QoS::AtMostOnce);
        assert!(!p.retain);
    }
}

#[test]
fn fourth_publish_failure_halts_with_repeating_error() {
    let broker = FakeBroker { fail_publish_from: Some(4), ..FakeBroker::default() };
    let mut svc = service(Faults::default(), broker);
    tick_until_subscribed(&mut svc);

    for _ in 0..4 {
        svc.tick();
    }
    assert_eq!(svc.state(), RunState::Halted);
    assert_eq!(svc.broker().published.len(), 3);
    assert_eq!(svc.broker().publish_attempts, 4);
    assert_eq!(svc.halt_error(), Some(Error::Publish(BrokerError::Timeout)));

    let error_line = svc.sink().lines.last().unwrap().clone();
    assert_eq!(error_line, "error: publish: broker timeout");
    assert_eq!(svc.sink().count(&error_line), 1);

    let halted_at = svc.clock().now_ms;
    for k in 1..=4u64 {
        svc.tick();
        assert_eq!(svc.clock().now_ms, halted_at + k * HALT_MS);
        assert_eq!(svc.sink().lines.last().unwrap(), &error_line);
    }
    assert_eq!(svc.sink().count(&error_line), 5);
    assert_eq!(svc.halt_reports(), 5);

    // No further publish attempts once halted.
    assert_eq!(svc.broker().publish_attempts, 4);
    assert_eq!(svc.state(), RunState::Halted);
}

#[test]
fn broker_refusal_halts_with_capitalised_error() {
    let broker = FakeBroker { refuse_connect: Some(BrokerError::Refused(5)), ..FakeBroker::default() };
    let mut svc = service(Faults::default(), broker);

    assert_eq!(svc.tick(), RunState::Halted);
    let line = svc.sink().lines.last().unwrap().clone();
    assert_eq!(line, "Error: broker connect: connection refused (code 5)");

    svc.tick();
    svc.tick();
    assert_eq!(svc.sink().count(&line), 3);
    assert_eq!(svc.clock().sleeps, [HALT_MS, HALT_MS]);
    assert!(svc.broker().subscriptions.is_empty());
}

#[test]
fn subscribe_failure_halts_before_any_publish() {
    let broker = FakeBroker { refuse_subscribe: Some(BrokerError::NotConnected), ..FakeBroker::default() };
    let mut svc = service(Faults::default(), broker);
    tick_until_subscribed(&mut svc);

    assert!(svc.is_halted());
    assert_eq!(svc.halt_error(), Some(Error::Subscribe(BrokerError::NotConnected)));
    svc.tick();
    assert!(svc.broker().published.is_empty());
    assert!(svc.sink().lines.last().unwrap().starts_with("Error: subscribe"));
}

#[test]
fn inbound_messages_are_reported_during_wait() {
    let mut broker = FakeBroker::default();
    broker.inbox.push(InboundMessage {
        topic: heapless::String::try_from("heartbeat").unwrap(),
        payload: heapless::Vec::from_slice(b"hello").unwrap(),
    });
    let mut svc = service(Faults::default(), broker);
    tick_until_subscribed(&mut svc);
    assert_eq!(svc.sink().count("Received:"), 0);

    svc.tick();
    assert_eq!(svc.sink().count("Received:"), 1);
    assert_eq!(svc.sink().count("[heartbeat]  hello"), 1);
    assert!(svc.broker().inbox.is_empty());
}

#[test]
fn heartbeat_wait_is_sliced() {
    let mut svc = service(Faults::default(), FakeBroker::default());
    tick_until_subscribed(&mut svc);
    svc.tick();
    let sleeps = &svc.clock().sleeps;
    assert_eq!(sleeps.iter().sum::<u64>(), INTERVAL_MS);
    assert!(sleeps.iter().all(|&s| s <= 1_000));
}

/// Clock that loses `lag_ms` every time a heartbeat timestamp is taken,
/// standing in for a broker that is slow to accept the publish.
struct LaggyClock {
    now: Cell<u64>,
    lag_ms: u64,
    sleeps: Vec<u64>,
}

impl Clock for LaggyClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn wall_nanos(&self) -> u64 {
        self.now.set(self.now.get() + self.lag_ms);
        WALL_EPOCH_NS + self.now.get() * 1_000_000
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now.set(self.now.get() + ms);
    }
}

#[test]
fn heartbeat_wait_absorbs_publish_time() {
    let clock = LaggyClock { now: Cell::new(0), lag_ms: 250, sleeps: Vec::new() };
    let mut svc = NodeService::new(
        config("home", "secret"),
        FakePowerSequence::new(Faults::default()),
        FakeBroker::default(),
        clock,
        RecordingSink::default(),
    );
    assert_eq!(svc.tick(), RunState::Connected);
    assert_eq!(svc.tick(), RunState::Subscribed);

    for _ in 0..3 {
        svc.tick();
    }
    let times: Vec<u64> = svc.broker().published.iter().map(|p| p.at_ms()).collect();
    assert_eq!(times.len(), 3);
    assert!(times.windows(2).all(|w| w[1] - w[0] == INTERVAL_MS));
    assert_eq!(svc.clock().sleeps.iter().sum::<u64>(), 3 * (INTERVAL_MS - 250));
    assert_eq!(svc.clock().now.get(), 3 * INTERVAL_MS);
}
