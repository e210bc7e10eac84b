//! Application core: domain logic behind port traits.
//!
//! Bring-up orchestration, the broker session, and the heartbeat cadence.
//! All interaction with hardware and the network happens through the
//! traits in [`ports`], keeping this layer testable without peripherals.

pub mod ports;
pub mod service;
pub mod session;
