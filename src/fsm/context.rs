//! Shared mutable context threaded through every run-state handler.
//!
//! `NodeContext` is the "blackboard": configuration, the bring-up driver
//! and its power sequencer, the RPC bridge and leased identity once they
//! exist, the broker session, the clock, the status surface, and the error
//! that halted the run.

use crate::app::ports::{BrokerPort, Clock, NetworkIdentity, StatusSink};
use crate::app::session::{MessageHandler, SessionManager, report_inbound};
use crate::config::NodeConfig;
use crate::error::Error;
use crate::sequencer::PowerSequence;

use super::bringup::Bringup;

pub struct NodeContext<Q, K, C, S>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    pub config: NodeConfig,
    pub bringup: Bringup,
    pub power: Q,
    /// Held for the life of the process once bring-up succeeds.
    pub bridge: Option<Q::Bridge>,
    pub identity: Option<NetworkIdentity>,
    pub session: SessionManager<K>,
    /// Handler registered with the subscription.
    pub on_message: MessageHandler,
    pub clock: C,
    pub sink: S,
    /// Set exactly once, by the edge into `Halted`.
    pub halt_error: Option<Error>,
    /// Times the halt line has been written.
    pub halt_reports: u32,
}

impl<Q, K, C, S> NodeContext<Q, K, C, S>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    pub fn new(config: NodeConfig, power: Q, broker: K, clock: C, sink: S) -> Self {
        Self {
            config,
            bringup: Bringup::new(),
            power,
            bridge: None,
            identity: None,
            session: SessionManager::new(broker),
            on_message: report_inbound,
            clock,
            sink,
            halt_error: None,
            halt_reports: 0,
        }
    }

    /// Record the run-ending error.  The first one wins.
    pub fn fail(&mut self, e: Error) {
        if self.halt_error.is_none() {
            self.halt_error = Some(e);
        }
    }
}
