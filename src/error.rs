//! Unified error types for the heartbeat node.
//!
//! A single `Error` enum that every stage of the run converts into, so the
//! run-level driver handles failures uniformly.  All variants are `Copy`
//! and allocation-free; each carries the collaborator error that caused it.
//!
//! Receive-ring overrun is not an error here: dropped bytes are counted
//! by [`ReceiveBuffer`](crate::transport::ReceiveBuffer) and never surfaced.

use core::fmt;

use crate::app::ports::{BrokerError, RpcError};

// ---------------------------------------------------------------------------
// Top-level run error
// ---------------------------------------------------------------------------

/// Every failure that can end a run funnels into this type.  None of them
/// are retried within the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Power sequencing, serial setup, or protocol init failed.
    HardwareSequencing(SequencerError),
    /// Wi-Fi association or IP lease failed.
    Association(AssociationError),
    /// The broker refused or never answered the connection.
    BrokerConnect(BrokerError),
    /// The single subscription could not be registered.
    Subscribe(BrokerError),
    /// A steady-state heartbeat publish failed.
    Publish(BrokerError),
}

impl Error {
    /// Name of the failing stage, used as a log tag.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::HardwareSequencing(_) => "sequencer",
            Self::Association(_) => "association",
            Self::BrokerConnect(_) => "broker-connect",
            Self::Subscribe(_) => "subscribe",
            Self::Publish(_) => "publish",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareSequencing(e) => write!(f, "hardware sequencing: {e}"),
            Self::Association(e) => write!(f, "{e}"),
            Self::BrokerConnect(e) => write!(f, "broker connect: {e}"),
            Self::Subscribe(e) => write!(f, "subscribe: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sequencer errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerError {
    /// Driving the chip-enable line failed.
    ChipEnable,
    /// The serial line rejected its configuration.
    SerialConfig,
    /// The receive interrupt could not be installed.
    InterruptInstall,
    /// The co-processor rejected or never answered protocol init.
    Init(RpcError),
}

impl fmt::Display for SequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChipEnable => write!(f, "chip-enable drive failed"),
            Self::SerialConfig => write!(f, "serial configuration failed"),
            Self::InterruptInstall => write!(f, "receive interrupt install failed"),
            Self::Init(e) => write!(f, "protocol init failed ({e})"),
        }
    }
}

impl From<SequencerError> for Error {
    fn from(e: SequencerError) -> Self {
        Self::HardwareSequencing(e)
    }
}

// ---------------------------------------------------------------------------
// Association errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationError {
    /// The access point join was refused or timed out.
    Join(RpcError),
    /// Joined, but no address lease was obtained.
    Lease(RpcError),
}

impl fmt::Display for AssociationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join(e) => write!(f, "association failed ({e})"),
            Self::Lease(e) => write!(f, "IP lease failed ({e})"),
        }
    }
}

impl From<AssociationError> for Error {
    fn from(e: AssociationError) -> Self {
        Self::Association(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
