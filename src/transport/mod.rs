//! Interrupt-fed byte transport to the co-processor.
//!
//! ```text
//!  ┌───────────────┐  1 byte / IRQ  ┌────────────────┐  read()  ┌────────────┐
//!  │ RX data reg   │───────────────▶│ ReceiveBuffer  │─────────▶│ RPC bridge │
//!  │ (RxRegister)  │   RxHandler    │ (ring, cs)     │  yields  │ (polls)    │
//!  └───────────────┘                └────────────────┘  on empty└────────────┘
//!         ▲                                                          │
//!         └──────────── SerialLine::write ◀──────────────────────────┘
//! ```
//!
//! The receive ring is never a global: the interrupt handler is handed a
//! shared reference to it when it is installed on the interrupt line, and
//! the [`TransportHandle`] keeps the other reference for the read side.

mod handle;
mod ring;

pub use handle::{RxHandler, TransportHandle, UartLink};
pub use ring::ReceiveBuffer;

use core::fmt;

/// Byte-oriented transport channel.
///
/// The RPC bridge is generic over `Transport`, so the framed client works
/// identically over the interrupt-fed UART and over test doubles.
pub trait Transport {
    /// Error type for this transport.
    type Error: fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns `Ok(0)` when nothing is buffered, after a short bounded yield.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Hardware seams
// ───────────────────────────────────────────────────────────────

/// Errors reported by the serial hardware seams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// Baud rate or framing not supported.
    Config,
    /// The transmitter rejected the write.
    Write,
    /// The receive side was already handed out or the vector is taken.
    Unavailable,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "serial configuration rejected"),
            Self::Write => write!(f, "serial write failed"),
            Self::Unavailable => write!(f, "serial resource unavailable"),
        }
    }
}

/// The physical serial line (transmit side and configuration).
pub trait SerialLine {
    /// Receive-side register access, handed to the interrupt handler.
    type Rx: RxRegister;

    fn configure(&mut self, baud_rate: u32) -> Result<(), SerialError>;

    /// Hand out the receive register.  Succeeds once.
    fn take_rx(&mut self) -> Option<Self::Rx>;

    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError>;

    fn flush(&mut self) -> Result<(), SerialError>;
}

/// Receive data register plus its interrupt flag.
///
/// Both operations run in interrupt context: fixed latency, no allocation.
pub trait RxRegister {
    /// Read the received byte out of the data register.
    fn read_data(&mut self) -> u8;

    /// Acknowledge the receive-complete interrupt.
    fn clear_rx_flag(&mut self);
}

/// An interrupt vector that can be granted a receive handler.
pub trait RxInterruptLine<'a, R: RxRegister, const N: usize> {
    /// Register `handler` as the receive interrupt service routine and
    /// enable the interrupt.
    fn install(&mut self, handler: RxHandler<'a, R, N>) -> Result<(), SerialError>;
}
