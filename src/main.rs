//! Heartbeat node: host simulation entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimBoard (CE, console, UART+IRQ)   LoopbackBroker  StdClock   │
//! │  UartLink → RpcClient               TerminalSink    StdDelay   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeService (pure logic)                  │    │
//! │  │  Bring-up · Session · Heartbeat · Halt                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status lines go to stdout, the log to stderr.  `HEARTBEAT_CONFIG` names
//! an optional JSON config file; `HEARTBEAT_SIM_PASSWORD` makes the
//! simulated access point expect a different password.

use std::{env, fs};

use anyhow::{Context, Result};
use log::info;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use heartbeat_node::adapters::loopback_broker::LoopbackBroker;
use heartbeat_node::adapters::sim::SimBoard;
use heartbeat_node::adapters::terminal::TerminalSink;
use heartbeat_node::adapters::time::{StdClock, StdDelay};
use heartbeat_node::app::service::NodeService;
use heartbeat_node::config::{NodeConfig, RX_BUFFER_CAP};
use heartbeat_node::rpc::RpcClient;
use heartbeat_node::sequencer::Sequencer;
use heartbeat_node::transport::{ReceiveBuffer, UartLink};

/// Receive ring shared by the UART interrupt handler and the RPC client.
static RX_BUFFER: ReceiveBuffer<RX_BUFFER_CAP> = ReceiveBuffer::new();

fn load_config() -> Result<NodeConfig> {
    match env::var("HEARTBEAT_CONFIG") {
        Ok(path) => {
            let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            NodeConfig::from_json(&json).with_context(|| format!("parsing {path}"))
        }
        Err(_) => {
            let config = NodeConfig::default();
            config.validate().context("built-in configuration")?;
            Ok(config)
        }
    }
}

fn main() -> Result<()> {
    let config = load_config()?;

    let level = if config.debug { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;

    info!("Heartbeat node v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Broker {} as {}, heartbeat every {}s on '{}'",
        config.broker_url, config.client_id, config.heartbeat_interval_secs, config.topic_publish
    );

    let ap_password = env::var("HEARTBEAT_SIM_PASSWORD").unwrap_or_else(|_| config.password.to_string());
    let board = SimBoard::new(&config.ssid, &ap_password);

    let rpc_timeout_ms = config.rpc_timeout_ms;
    let debug = config.debug;
    let link = UartLink::new(board.uart, board.irq, &RX_BUFFER, StdDelay, move |transport| {
        RpcClient::new(transport, rpc_timeout_ms, debug)
    });
    let power = Sequencer::new(board.chip_enable, StdDelay, board.console, link, config.baud_rate);

    let mut service = NodeService::new(
        config,
        power,
        LoopbackBroker::new(),
        StdClock::new(),
        TerminalSink::stdout(),
    );
    service.run_forever()
}
