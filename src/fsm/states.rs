//! Run-state handler functions and table builder.
//!
//! Each state is three plain `fn` pointers, instantiated for the concrete
//! adapter types when the table is built.
//!
//! ```text
//!  BRINGUP ──[up + broker connected]──▶ CONNECTED ──[subscribed]──▶ SUBSCRIBED
//!     │                                     │                          │
//!     │                                     │                   [1st heartbeat]
//!     │                                     │                          ▼
//!     │                                     │                     PUBLISHING ◀─┐
//!     │                                     │                          │  [ok]─┘
//!     └──────────────[any error]────────────┴──────────────────────────┴──▶ HALTED
//! ```
//!
//! `HALTED` is terminal: it re-displays the error every `halt_retry_secs`
//! and never leaves.

use log::{error, info};

use super::context::NodeContext;
use super::{RunState, StateDescriptor};
use crate::app::ports::{BrokerPort, Clock, StatusSink};
use crate::config::INBOUND_POLL_MS;
use crate::error::{Error, Result};
use crate::sequencer::PowerSequence;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table for one set of adapters.  Called once at startup.
pub fn build_state_table<Q, K, C, S>() -> [StateDescriptor<NodeContext<Q, K, C, S>>; RunState::COUNT]
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    [
        StateDescriptor {
            id: RunState::Bringup,
            name: "Bringup",
            on_enter: Some(bringup_enter::<Q, K, C, S>),
            on_exit: None,
            on_update: bringup_update::<Q, K, C, S>,
        },
        StateDescriptor {
            id: RunState::Connected,
            name: "Connected",
            on_enter: None,
            on_exit: None,
            on_update: connected_update::<Q, K, C, S>,
        },
        StateDescriptor {
            id: RunState::Subscribed,
            name: "Subscribed",
            on_enter: None,
            on_exit: None,
            on_update: subscribed_update::<Q, K, C, S>,
        },
        StateDescriptor {
            id: RunState::Publishing,
            name: "Publishing",
            on_enter: None,
            on_exit: None,
            on_update: publishing_update::<Q, K, C, S>,
        },
        StateDescriptor {
            id: RunState::Halted,
            name: "Halted",
            on_enter: Some(halted_enter::<Q, K, C, S>),
            on_exit: None,
            on_update: halted_update::<Q, K, C, S>,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  BRINGUP: co-processor up, address leased, broker connected
// ═══════════════════════════════════════════════════════════════════════════

fn bringup_enter<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>)
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    ctx.sink.clear();
}

fn bringup_update<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>) -> Option<RunState>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    match ctx.bringup.run(&mut ctx.power, &ctx.config, &mut ctx.sink) {
        Ok((bridge, identity)) => {
            ctx.bridge = Some(bridge);
            ctx.identity = Some(identity);
        }
        Err(e) => return Some(halt(ctx, e)),
    }

    match ctx
        .session
        .connect_broker(&ctx.config.broker_url, &ctx.config.client_id, &mut ctx.sink)
    {
        Ok(()) => Some(RunState::Connected),
        Err(e) => Some(halt(ctx, e)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED: register the single subscription
// ═══════════════════════════════════════════════════════════════════════════

fn connected_update<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>) -> Option<RunState>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    match ctx.session.subscribe(&ctx.config.topic_subscribe, ctx.on_message) {
        Ok(()) => Some(RunState::Subscribed),
        Err(e) => Some(halt(ctx, e)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SUBSCRIBED / PUBLISHING: one heartbeat per tick
// ═══════════════════════════════════════════════════════════════════════════

fn subscribed_update<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>) -> Option<RunState>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    match heartbeat_cycle(ctx) {
        Ok(()) => Some(RunState::Publishing),
        Err(e) => Some(halt(ctx, e)),
    }
}

fn publishing_update<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>) -> Option<RunState>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    match heartbeat_cycle(ctx) {
        Ok(()) => None,
        Err(e) => Some(halt(ctx, e)),
    }
}

/// Publish one heartbeat, then sit out the rest of the interval while
/// handing inbound messages to the subscription handler.  The interval runs
/// from the start of the publish, so a slow broker does not stretch it.
fn heartbeat_cycle<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>) -> Result<()>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    let deadline = ctx.clock.now_ms() + ctx.config.heartbeat_interval_ms();
    let now = ctx.clock.wall_nanos();
    ctx.session.publish_heartbeat(&ctx.config.topic_publish, now)?;

    loop {
        let now_ms = ctx.clock.now_ms();
        if now_ms >= deadline {
            break;
        }
        ctx.clock.sleep_ms((deadline - now_ms).min(INBOUND_POLL_MS));
        ctx.session.dispatch_inbound(&mut ctx.sink);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
//  HALTED: terminal; display the error forever
// ═══════════════════════════════════════════════════════════════════════════

fn halt<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>, e: Error) -> RunState
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    error!("Run failed at {}: {}", e.stage(), e);
    ctx.fail(e);
    RunState::Halted
}

fn halted_enter<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>)
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    info!("HALTED: repeating error every {}s", ctx.config.halt_retry_secs);
    write_halt_line(ctx);
}

fn halted_update<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>) -> Option<RunState>
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    ctx.clock.sleep_ms(ctx.config.halt_retry_ms());
    write_halt_line(ctx);
    None
}

fn write_halt_line<Q, K, C, S>(ctx: &mut NodeContext<Q, K, C, S>)
where
    Q: PowerSequence,
    K: BrokerPort,
    C: Clock,
    S: StatusSink,
{
    let halt_error = ctx.halt_error;
    match halt_error {
        // Broker-side failures keep their own capitalised prefix on the display.
        Some(e @ (Error::BrokerConnect(_) | Error::Subscribe(_))) => {
            ctx.sink.write_line(format_args!("Error: {}", e));
        }
        Some(e) => ctx.sink.write_line(format_args!("error: {}", e)),
        None => ctx.sink.write_line(format_args!("error: halted")),
    }
    ctx.halt_reports = ctx.halt_reports.saturating_add(1);
}
