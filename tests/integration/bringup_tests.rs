//! Bring-up through the node service: ordering, fail-stop, status lines.

use heartbeat_node::app::ports::RpcError;
use heartbeat_node::error::{AssociationError, Error, SequencerError};
use heartbeat_node::fsm::RunState;
use heartbeat_node::fsm::bringup::CoProcessorState;

use crate::mock_hw::{FakeBroker, Faults, service};

#[test]
fn happy_path_reports_progress_and_identity() {
    let mut svc = service(Faults::default(), FakeBroker::default());
    assert_eq!(svc.tick(), RunState::Connected);

    assert_eq!(svc.coprocessor_state(), CoProcessorState::IpAcquired);
    assert_eq!(*svc.power().log.borrow(), ["power_cycle", "attach", "init", "associate", "lease"]);
    assert_eq!(
        svc.sink().lines,
        [
            "Connecting to: home...",
            "Get IP ...",
            "IP Address : 10.0.0.7",
            "Mask       : 255.255.255.0",
            "Gateway    : 10.0.0.1",
            "Connecting to MQTT: tcp://10.0.0.2:1883 ...",
        ]
    );
    assert_eq!(svc.sink().clears, 1);
    assert_eq!(svc.identity().unwrap().gateway.octets(), [10, 0, 0, 1]);
    assert_eq!(
        svc.bridge().unwrap().credentials,
        Some(("home".to_string(), "secret".to_string()))
    );
}

#[test]
fn association_failure_shows_one_error_line_and_skips_lease() {
    let faults = Faults { associate: Some(RpcError::Remote(-1)), ..Faults::default() };
    let mut svc = service(faults, FakeBroker::default());

    assert_eq!(svc.tick(), RunState::Halted);

    let log = svc.power().log.borrow().clone();
    assert_eq!(log, ["power_cycle", "attach", "init", "associate"]);
    assert!(!log.contains(&"lease"));

    assert_eq!(svc.sink().count_prefix("error: "), 1);
    let error_line = svc.sink().lines.last().unwrap();
    assert!(error_line.contains("association failed"), "{error_line}");
    assert!(!svc.sink().lines.iter().any(|l| l.starts_with("Get IP")));

    assert_eq!(
        svc.halt_error(),
        Some(Error::Association(AssociationError::Join(RpcError::Remote(-1))))
    );
    assert_eq!(svc.coprocessor_state(), CoProcessorState::Failed);
    assert!(svc.broker().connects.is_empty());
    assert!(svc.bridge().is_none());
}

#[test]
fn init_failure_stops_before_association() {
    let faults = Faults { init: Some(RpcError::Timeout), ..Faults::default() };
    let mut svc = service(faults, FakeBroker::default());
    svc.tick();

    assert!(svc.is_halted());
    assert_eq!(*svc.power().log.borrow(), ["power_cycle", "attach", "init"]);
    assert_eq!(
        svc.halt_error(),
        Some(Error::HardwareSequencing(SequencerError::Init(RpcError::Timeout)))
    );
    assert!(!svc.bringup_history().contains(&CoProcessorState::Initialized));
}

#[test]
fn serial_failure_is_hardware_sequencing() {
    let faults = Faults { attach: Some(SequencerError::SerialConfig), ..Faults::default() };
    let mut svc = service(faults, FakeBroker::default());
    svc.tick();

    assert_eq!(*svc.power().log.borrow(), ["power_cycle", "attach"]);
    assert_eq!(
        svc.halt_error(),
        Some(Error::HardwareSequencing(SequencerError::SerialConfig))
    );
    assert!(svc.sink().lines.last().unwrap().starts_with("error: hardware sequencing"));
}

#[test]
fn lease_failure_never_connects_broker() {
    let faults = Faults { lease: Some(RpcError::Remote(-3)), ..Faults::default() };
    let mut svc = service(faults, FakeBroker::default());
    svc.tick();

    assert!(svc.bringup_history().contains(&CoProcessorState::Associated));
    assert!(!svc.bringup_history().contains(&CoProcessorState::IpAcquired));
    assert!(svc.identity().is_none());
    assert!(svc.broker().connects.is_empty());
}

#[test]
fn halted_bringup_never_retries() {
    let faults = Faults { associate: Some(RpcError::Remote(-1)), ..Faults::default() };
    let mut svc = service(faults, FakeBroker::default());
    for _ in 0..10 {
        svc.tick();
    }
    assert_eq!(svc.power().log.borrow().iter().filter(|c| **c == "power_cycle").count(), 1);
    assert_eq!(svc.power().log.borrow().iter().filter(|c| **c == "associate").count(), 1);
}
