//! Transport handle, receive ISR object, and the link that wires them up.

use core::marker::PhantomData;

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use super::ring::ReceiveBuffer;
use super::{RxInterruptLine, RxRegister, SerialError, SerialLine, Transport};
use crate::config::READ_YIELD_MS;
use crate::error::SequencerError;

// ───────────────────────────────────────────────────────────────
// Interrupt handler
// ───────────────────────────────────────────────────────────────

/// Receive interrupt service routine.
///
/// Owns the receive register and a shared reference to the ring granted at
/// construction.  `on_interrupt` does exactly three things: read the data
/// register, push the byte, clear the flag.  It never allocates and never
/// blocks; a full ring drops the byte.
pub struct RxHandler<'a, R: RxRegister, const N: usize> {
    buffer: &'a ReceiveBuffer<N>,
    register: R,
}

impl<'a, R: RxRegister, const N: usize> RxHandler<'a, R, N> {
    pub fn new(buffer: &'a ReceiveBuffer<N>, register: R) -> Self {
        Self { buffer, register }
    }

    /// Service one receive-complete interrupt.
    #[inline]
    pub fn on_interrupt(&mut self) {
        let byte = self.register.read_data();
        let _ = self.buffer.push_from_isr(byte);
        self.register.clear_rx_flag();
    }
}

// ───────────────────────────────────────────────────────────────
// Transport handle
// ───────────────────────────────────────────────────────────────

/// The foreground end of the co-processor link: transmit through the line,
/// receive from the ring the interrupt handler fills.
///
/// Created once during bring-up and kept for the life of the process.
pub struct TransportHandle<'a, S: SerialLine, D: DelayNs, const N: usize> {
    line: S,
    rx: &'a ReceiveBuffer<N>,
    delay: D,
}

impl<'a, S: SerialLine, D: DelayNs, const N: usize> TransportHandle<'a, S, D, N> {
    /// `delay` provides the bounded yield taken by an empty read.
    pub fn new(line: S, rx: &'a ReceiveBuffer<N>, delay: D) -> Self {
        Self { line, rx, delay }
    }

    /// Prepare the line hardware.
    pub fn configure(&mut self, baud_rate: u32) -> Result<(), SerialError> {
        self.line.configure(baud_rate)
    }

    /// Bytes lost to ring overrun since boot.
    pub fn overruns(&self) -> u32 {
        self.rx.overrun_count()
    }
}

impl<S: SerialLine, D: DelayNs, const N: usize> Transport for TransportHandle<'_, S, D, N> {
    type Error = SerialError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.rx.is_empty() {
            // Cooperative yield; the caller polls again.
            self.delay.delay_ms(READ_YIELD_MS);
            return Ok(0);
        }
        Ok(self.rx.pop_into(buf))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        self.line.write(data)
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        self.line.flush()
    }

    fn available(&self) -> bool {
        !self.rx.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Link assembly
// ───────────────────────────────────────────────────────────────

/// Everything needed to bring the serial link up, consumed on first open.
///
/// Opening configures the line, grants the receive handler the ring on the
/// interrupt line, builds the [`TransportHandle`], and hands it to the
/// bridge constructor.  The bridge type `B` is whatever RPC layer speaks
/// over the transport.
pub struct UartLink<'a, S, I, D, F, B, const N: usize>
where
    S: SerialLine,
    I: RxInterruptLine<'a, S::Rx, N>,
    D: DelayNs,
    F: FnOnce(TransportHandle<'a, S, D, N>) -> B,
{
    parts: Option<(S, D, F)>,
    irq: I,
    rx_buffer: &'a ReceiveBuffer<N>,
    _bridge: PhantomData<fn() -> B>,
}

impl<'a, S, I, D, F, B, const N: usize> UartLink<'a, S, I, D, F, B, N>
where
    S: SerialLine,
    I: RxInterruptLine<'a, S::Rx, N>,
    D: DelayNs,
    F: FnOnce(TransportHandle<'a, S, D, N>) -> B,
{
    pub fn new(line: S, irq: I, rx_buffer: &'a ReceiveBuffer<N>, yield_delay: D, make_bridge: F) -> Self {
        Self {
            parts: Some((line, yield_delay, make_bridge)),
            irq,
            rx_buffer,
            _bridge: PhantomData,
        }
    }

    /// Whether [`open`](Self::open) has already consumed the parts.
    pub fn is_open(&self) -> bool {
        self.parts.is_none()
    }

    /// Configure the line, install the receive handler, and build the bridge.
    pub fn open(&mut self, baud_rate: u32) -> Result<B, SequencerError> {
        let (mut line, yield_delay, make_bridge) =
            self.parts.take().ok_or(SequencerError::SerialConfig)?;

        line.configure(baud_rate)
            .map_err(|_| SequencerError::SerialConfig)?;
        let register = line.take_rx().ok_or(SequencerError::InterruptInstall)?;

        // Stale bytes from before the power pulse are meaningless.
        self.rx_buffer.clear();
        self.irq
            .install(RxHandler::new(self.rx_buffer, register))
            .map_err(|_| SequencerError::InterruptInstall)?;
        info!("Link: serial up at {} baud, RX interrupt installed", baud_rate);

        let transport = TransportHandle::new(line, self.rx_buffer, yield_delay);
        debug!("Link: transport ready ({} byte ring)", self.rx_buffer.capacity());
        Ok(make_bridge(transport))
    }
}
