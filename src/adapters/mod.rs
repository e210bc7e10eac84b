//! Adapters: concrete implementations of the port and hardware traits
//! for the host.
//!
//! | Adapter           | Implements                           | Connects to               |
//! |-------------------|--------------------------------------|---------------------------|
//! | `loopback_broker` | BrokerPort                           | in-memory topic loopback  |
//! | `sim`             | OutputPin, ConsoleSignal, SerialLine | simulated board + co-proc |
//! |                   | RxRegister, RxInterruptLine          |                           |
//! | `terminal`        | StatusSink                           | stdout / any `io::Write`  |
//! | `time`            | Clock, DelayNs                       | `std::time`, `thread`     |

pub mod loopback_broker;
pub mod sim;
pub mod terminal;
pub mod time;
