//! Full stack on the simulated board: real sequencer, UART link, receive
//! ring, and RPC client; loopback broker; fake clock.

use heartbeat_node::adapters::loopback_broker::LoopbackBroker;
use heartbeat_node::adapters::sim::{STATUS_AUTH_FAILED, SimBoard};
use heartbeat_node::app::ports::RpcError;
use heartbeat_node::app::service::NodeService;
use heartbeat_node::config::RX_BUFFER_CAP;
use heartbeat_node::error::{AssociationError, Error};
use heartbeat_node::fsm::RunState;
use heartbeat_node::fsm::bringup::CoProcessorState;
use heartbeat_node::rpc::RpcClient;
use heartbeat_node::sequencer::Sequencer;
use heartbeat_node::transport::{ReceiveBuffer, UartLink};

use crate::mock_hw::{FakeClock, NoDelay, RecordingSink, config};

#[test]
fn simulated_node_publishes_and_receives_its_own_heartbeats() {
    let rx: ReceiveBuffer<RX_BUFFER_CAP> = ReceiveBuffer::new();
    let board = SimBoard::new("home", "secret");
    let link = UartLink::new(board.uart, board.irq, &rx, NoDelay, |t| RpcClient::new(t, 20, true));
    let power = Sequencer::new(board.chip_enable, NoDelay, board.console, link, 614_400);

    let mut svc = NodeService::new(
        config("home", "secret"),
        power,
        LoopbackBroker::new(),
        FakeClock::default(),
        RecordingSink::default(),
    );

    assert_eq!(svc.tick(), RunState::Connected);
    assert_eq!(svc.coprocessor_state(), CoProcessorState::IpAcquired);
    assert_eq!(svc.sink().count("IP Address : 192.168.1.42"), 1);

    assert_eq!(svc.tick(), RunState::Subscribed);
    for _ in 0..3 {
        svc.tick();
    }
    assert_eq!(svc.state(), RunState::Publishing);
    assert_eq!(svc.broker().published(), 3);
    // Same topic in and out: every heartbeat comes back.
    assert_eq!(svc.sink().count("Received:"), 3);
    assert_eq!(svc.broker().pending(), 0);
    assert!(rx.is_empty());
    assert_eq!(rx.overrun_count(), 0);
}

#[test]
fn wrong_password_halts_at_association() {
    let rx: ReceiveBuffer<RX_BUFFER_CAP> = ReceiveBuffer::new();
    let board = SimBoard::new("home", "not-the-password");
    let link = UartLink::new(board.uart, board.irq, &rx, NoDelay, |t| RpcClient::new(t, 20, false));
    let power = Sequencer::new(board.chip_enable, NoDelay, board.console, link, 614_400);

    let mut svc = NodeService::new(
        config("home", "secret"),
        power,
        LoopbackBroker::new(),
        FakeClock::default(),
        RecordingSink::default(),
    );

    assert_eq!(svc.tick(), RunState::Halted);
    assert_eq!(
        svc.halt_error(),
        Some(Error::Association(AssociationError::Join(RpcError::Remote(STATUS_AUTH_FAILED))))
    );
    assert_eq!(svc.sink().count_prefix("error: association failed"), 1);
    assert!(!svc.broker().is_connected());
}
