//! Power/reset sequencer for the Wi-Fi co-processor.
//!
//! ```text
//!  CE ──┐           ┌──────────────────────────── ...
//!       └───────────┘
//!       |◀─ 100 ms ─▶|◀────── 1000 ms ──────▶| [console gate] | attach | init
//! ```
//!
//! Low pulse on chip-enable, settle, release, settle again, optionally wait
//! for an operator console, then bring the serial link up and issue the
//! protocol init call.  There is no retry at this layer.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::{ConsoleSignal, CoProcessorPort};
use crate::config::{CONSOLE_POLL_MS, POWER_OFF_SETTLE_MS, POWER_ON_SETTLE_MS};
use crate::error::SequencerError;
use crate::transport::{RxInterruptLine, SerialLine, TransportHandle, UartLink};

/// Something that can bring the serial link up and hand back an RPC bridge.
pub trait SerialLink {
    type Bridge: CoProcessorPort;

    fn open(&mut self, baud_rate: u32) -> Result<Self::Bridge, SequencerError>;
}

impl<'a, S, I, D, F, B, const N: usize> SerialLink for UartLink<'a, S, I, D, F, B, N>
where
    S: SerialLine,
    I: RxInterruptLine<'a, S::Rx, N>,
    D: DelayNs,
    F: FnOnce(TransportHandle<'a, S, D, N>) -> B,
    B: CoProcessorPort,
{
    type Bridge = B;

    fn open(&mut self, baud_rate: u32) -> Result<B, SequencerError> {
        UartLink::open(self, baud_rate)
    }
}

/// Phase `setup` is about to start or has just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPhase {
    /// About to pulse chip-enable.
    Resetting,
    /// Serial link up, bridge built.
    Ready,
    /// Protocol init acknowledged.
    Initialized,
}

/// Power/reset steps for the co-processor.
pub trait PowerSequence {
    type Bridge: CoProcessorPort;

    /// Timed chip-enable pulse plus the optional console gate.
    fn power_cycle(&mut self, debug: bool) -> Result<(), SequencerError>;

    /// Configure the serial line, install the receive handler, build the bridge.
    fn attach(&mut self) -> Result<Self::Bridge, SequencerError>;

    /// Full sequence: power cycle, attach, protocol init.  `on_phase` sees
    /// each phase in order; nothing after a failure runs, and an init
    /// failure drops the bridge.
    fn setup<F>(&mut self, debug: bool, mut on_phase: F) -> Result<Self::Bridge, SequencerError>
    where
        F: FnMut(SetupPhase),
    {
        on_phase(SetupPhase::Resetting);
        self.power_cycle(debug)?;
        let mut bridge = self.attach()?;
        on_phase(SetupPhase::Ready);
        bridge.init().map_err(SequencerError::Init)?;
        on_phase(SetupPhase::Initialized);
        Ok(bridge)
    }
}

pub struct Sequencer<P, D, C, L> {
    chip_enable: P,
    delay: D,
    console: C,
    link: L,
    baud_rate: u32,
}

impl<P, D, C, L> Sequencer<P, D, C, L>
where
    P: OutputPin,
    D: DelayNs,
    C: ConsoleSignal,
    L: SerialLink,
{
    pub fn new(chip_enable: P, delay: D, console: C, link: L, baud_rate: u32) -> Self {
        Self { chip_enable, delay, console, link, baud_rate }
    }

    fn wait_for_console(&mut self) {
        if self.console.is_attached() {
            return;
        }
        info!("Sequencer: waiting for console");
        while !self.console.is_attached() {
            self.delay.delay_ms(CONSOLE_POLL_MS);
        }
    }
}

impl<P, D, C, L> PowerSequence for Sequencer<P, D, C, L>
where
    P: OutputPin,
    D: DelayNs,
    C: ConsoleSignal,
    L: SerialLink,
{
    type Bridge = L::Bridge;

    fn power_cycle(&mut self, debug: bool) -> Result<(), SequencerError> {
        self.chip_enable.set_low().map_err(|_| SequencerError::ChipEnable)?;
        self.delay.delay_ms(POWER_OFF_SETTLE_MS);
        self.chip_enable.set_high().map_err(|_| SequencerError::ChipEnable)?;
        self.delay.delay_ms(POWER_ON_SETTLE_MS);

        if debug {
            self.wait_for_console();
        }
        info!("Sequencer: co-processor released from reset");
        Ok(())
    }

    fn attach(&mut self) -> Result<L::Bridge, SequencerError> {
        self.link.open(self.baud_rate).inspect_err(|e| {
            warn!("Sequencer: link open failed: {}", e);
        })
    }
}
