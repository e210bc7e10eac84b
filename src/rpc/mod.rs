//! Co-processor RPC bridge.
//!
//! Request/response protocol layered over the interrupt-fed transport.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      RPC Stack                             │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ RpcClient │──▶│  Codec   │──▶│ Transport (write)     │  │
//! │  │ (port)    │   │ (framing)│   └───────────────────────┘  │
//! │  └───────────┘   └──────────┘                              │
//! │       ▲               ▲         ┌───────────────────────┐  │
//! │       │               └─────────│ Transport (read/poll) │  │
//! │       │                         └───────────────────────┘  │
//! │  bring-up FSM                                              │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod codec;
pub mod messages;

pub use client::RpcClient;
