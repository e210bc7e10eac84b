//! Co-processor bring-up sequence.
//!
//! ```text
//!  PoweredOff ─▶ Resetting ─▶ Ready ─▶ Initialized ─▶ Associated ─▶ IpAcquired
//!       │            │          │           │              │
//!       └────────────┴──────────┴───────────┴──────────────┴──▶ Failed
//! ```
//!
//! Strictly forward.  Any failure ends the sequence in `Failed` and nothing
//! after the failing step runs; the only way back is a full restart.

use core::fmt;

use log::{error, info};

use crate::app::ports::{CoProcessorPort, NetworkIdentity, StatusSink};
use crate::config::NodeConfig;
use crate::error::{AssociationError, Error};
use crate::sequencer::{PowerSequence, SetupPhase};

/// Co-processor lifecycle as observed from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CoProcessorState {
    PoweredOff = 0,
    Resetting = 1,
    Ready = 2,
    Initialized = 3,
    Associated = 4,
    IpAcquired = 5,
    Failed = 6,
}

impl CoProcessorState {
    /// The only state reachable on success, or `None` for terminal states.
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::PoweredOff => Some(Self::Resetting),
            Self::Resetting => Some(Self::Ready),
            Self::Ready => Some(Self::Initialized),
            Self::Initialized => Some(Self::Associated),
            Self::Associated => Some(Self::IpAcquired),
            Self::IpAcquired | Self::Failed => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PoweredOff => "PoweredOff",
            Self::Resetting => "Resetting",
            Self::Ready => "Ready",
            Self::Initialized => "Initialized",
            Self::Associated => "Associated",
            Self::IpAcquired => "IpAcquired",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.successor().is_none()
    }
}

impl fmt::Display for CoProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every state the bring-up can visit fits.
const HISTORY_CAP: usize = 8;

/// Bring-up driver.  Records every state it enters.
pub struct Bringup {
    state: CoProcessorState,
    history: heapless::Vec<CoProcessorState, HISTORY_CAP>,
}

impl Default for Bringup {
    fn default() -> Self {
        Self::new()
    }
}

impl Bringup {
    pub fn new() -> Self {
        let mut history = heapless::Vec::new();
        let _ = history.push(CoProcessorState::PoweredOff);
        Self { state: CoProcessorState::PoweredOff, history }
    }

    pub fn state(&self) -> CoProcessorState {
        self.state
    }

    /// States entered so far, oldest first, starting with `PoweredOff`.
    pub fn history(&self) -> &[CoProcessorState] {
        &self.history
    }

    /// Run the whole sequence.  On success returns the bridge (kept for the
    /// life of the process) and the leased identity.  Progress lines go to
    /// `sink`; the failure itself is left to the caller to display.
    pub fn run<Q, S>(
        &mut self,
        power: &mut Q,
        config: &NodeConfig,
        sink: &mut S,
    ) -> Result<(Q::Bridge, NetworkIdentity), Error>
    where
        Q: PowerSequence,
        S: StatusSink + ?Sized,
    {
        match self.steps(power, config, sink) {
            Ok(done) => Ok(done),
            Err(e) => {
                error!("Bring-up failed in {}: {}", self.state, e);
                self.enter(CoProcessorState::Failed);
                Err(e)
            }
        }
    }

    fn steps<Q, S>(
        &mut self,
        power: &mut Q,
        config: &NodeConfig,
        sink: &mut S,
    ) -> Result<(Q::Bridge, NetworkIdentity), Error>
    where
        Q: PowerSequence,
        S: StatusSink + ?Sized,
    {
        sink.write_line(format_args!("Connecting to: {}...", config.ssid));

        let mut bridge = power.setup(config.debug, |phase| {
            self.advance(match phase {
                SetupPhase::Resetting => CoProcessorState::Resetting,
                SetupPhase::Ready => CoProcessorState::Ready,
                SetupPhase::Initialized => CoProcessorState::Initialized,
            });
        })?;

        bridge
            .associate(&config.ssid, &config.password)
            .map_err(AssociationError::Join)?;
        self.advance(CoProcessorState::Associated);

        sink.write_line(format_args!("Get IP ..."));
        let identity = bridge.leased_address().map_err(AssociationError::Lease)?;
        self.advance(CoProcessorState::IpAcquired);

        sink.write_line(format_args!("IP Address : {}", identity.ip));
        sink.write_line(format_args!("Mask       : {}", identity.mask));
        sink.write_line(format_args!("Gateway    : {}", identity.gateway));

        Ok((bridge, identity))
    }

    fn advance(&mut self, next: CoProcessorState) {
        debug_assert_eq!(self.state.successor(), Some(next), "bring-up must move forward");
        self.enter(next);
    }

    fn enter(&mut self, next: CoProcessorState) {
        info!("Bring-up: {} -> {}", self.state, next);
        self.state = next;
        let _ = self.history.push(next);
    }
}
