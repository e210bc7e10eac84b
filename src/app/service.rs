//! Node service: the hexagonal core.
//!
//! [`NodeService`] owns the run-state FSM and the shared context.  All I/O
//! flows through the port traits the context was built with, so the whole
//! run (bring-up, session, heartbeat cadence, halt) is testable with fakes
//! and a fake clock.
//!
//! ```text
//!  PowerSequence ──▶ ┌────────────────────────┐ ──▶ StatusSink
//!                    │      NodeService       │
//!     BrokerPort ◀──▶│  Bring-up · Session    │◀── Clock
//!                    └────────────────────────┘
//! ```

use log::info;

use crate::config::NodeConfig;
use crate::error::Error;
use crate::fsm::bringup::CoProcessorState;
use crate::fsm::context::NodeContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, RunState};
use crate::sequencer::PowerSequence;

use super::ports::{BrokerPort, Clock, NetworkIdentity, StatusSink};
use super::session::{BrokerSession, MessageHandler};

pub struct NodeService<Q, K, C, S>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    fsm: Fsm<NodeContext<Q, K, C, S>>,
    ctx: NodeContext<Q, K, C, S>,
    started: bool,
}

impl<Q, K, C, S> NodeService<Q, K, C, S>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    /// Assemble the service.  Does **not** start the FSM; call [`start`](Self::start).
    pub fn new(config: NodeConfig, power: Q, broker: K, clock: C, sink: S) -> Self {
        let ctx = NodeContext::new(config, power, broker, clock, sink);
        let fsm = Fsm::new(build_state_table(), RunState::Bringup);
        Self { fsm, ctx, started: false }
    }

    /// Replace the subscription handler.  Only effective before the
    /// subscription is registered.
    pub fn with_message_handler(mut self, handler: MessageHandler) -> Self {
        self.ctx.on_message = handler;
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.fsm.start(&mut self.ctx);
        info!("NodeService started in {:?}", self.fsm.current_state());
    }

    /// Run one step of the current state.  Starts the FSM on first use.
    pub fn tick(&mut self) -> RunState {
        self.start();
        self.fsm.tick(&mut self.ctx);
        self.fsm.current_state()
    }

    /// Production driver: tick forever.  `Halted` is terminal, so a failed
    /// run keeps re-displaying its error here.
    pub fn run_forever(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> RunState {
        self.fsm.current_state()
    }

    pub fn is_halted(&self) -> bool {
        self.state() == RunState::Halted
    }

    pub fn halt_error(&self) -> Option<Error> {
        self.ctx.halt_error
    }

    pub fn coprocessor_state(&self) -> CoProcessorState {
        self.ctx.bringup.state()
    }

    pub fn bringup_history(&self) -> &[CoProcessorState] {
        self.ctx.bringup.history()
    }

    pub fn identity(&self) -> Option<NetworkIdentity> {
        self.ctx.identity
    }

    pub fn session(&self) -> BrokerSession {
        self.ctx.session.session()
    }

    pub fn heartbeats_sent(&self) -> u32 {
        self.ctx.session.published_count()
    }

    pub fn halt_reports(&self) -> u32 {
        self.ctx.halt_reports
    }

    pub fn config(&self) -> &NodeConfig {
        &self.ctx.config
    }

    pub fn broker(&self) -> &K {
        self.ctx.session.broker()
    }

    pub fn clock(&self) -> &C {
        &self.ctx.clock
    }

    pub fn sink(&self) -> &S {
        &self.ctx.sink
    }

    pub fn power(&self) -> &Q {
        &self.ctx.power
    }

    pub fn bridge(&self) -> Option<&Q::Bridge> {
        self.ctx.bridge.as_ref()
    }
}
