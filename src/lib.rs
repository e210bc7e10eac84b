//! Heartbeat node library.
//!
//! Brings a serial-attached Wi-Fi co-processor out of reset, joins an access
//! point, connects to an MQTT broker, and publishes a timestamp heartbeat at
//! a fixed cadence.  Every failure ends in a terminal halt state that keeps
//! the error on the status surface.
//!
//! Hardware is reached only through `embedded-hal` and the traits in
//! [`transport`] and [`app::ports`]; host adapters live in [`adapters`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod rpc;
pub mod sequencer;
pub mod transport;

#[cfg(not(target_os = "espidf"))]
pub mod adapters;
