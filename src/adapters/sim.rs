//! Host simulation board.
//!
//! Stand-ins for the hardware the sequencer and transport drive, plus a
//! behavioural model of the co-processor's RPC service, so the full run can
//! execute on a workstation:
//!
//! | Part            | Implements                 | Models                          |
//! |-----------------|----------------------------|---------------------------------|
//! | `SimChipEnable` | `OutputPin`                | chip-enable / power rail        |
//! | `SimConsole`    | `ConsoleSignal`            | USB console DTR                 |
//! | `SimUart`       | `SerialLine`               | UART TX + co-processor firmware |
//! | `SimRxRegister` | `RxRegister`               | UART RX data register           |
//! | `SimIrq`        | `RxInterruptLine`          | RX-complete interrupt vector    |
//!
//! Response bytes produced by the model are "received" one interrupt per
//! byte, so they travel through the real `RxHandler` and `ReceiveBuffer`.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::String;
use log::{debug, info};

use crate::app::ports::ConsoleSignal;
use crate::config::RX_BUFFER_CAP;
use crate::rpc::codec::{FrameDecoder, MAX_ENCODED_SIZE, encode_frame};
use crate::rpc::messages::{self, Request, Response};
use crate::transport::{RxHandler, RxInterruptLine, RxRegister, SerialError, SerialLine};

/// Status codes returned by the modelled firmware.
pub const STATUS_OK: i32 = 0;
pub const STATUS_AUTH_FAILED: i32 = -1;
pub const STATUS_NOT_INITIALISED: i32 = -2;
pub const STATUS_NOT_ASSOCIATED: i32 = -3;

/// Lease handed out by the modelled DHCP server.
pub const SIM_IP: [u8; 4] = [192, 168, 1, 42];
pub const SIM_MASK: [u8; 4] = [255, 255, 255, 0];
pub const SIM_GATEWAY: [u8; 4] = [192, 168, 1, 1];

type RxFifo = Rc<RefCell<VecDeque<u8>>>;
type HandlerSlot<'a> = Rc<RefCell<Option<RxHandler<'a, SimRxRegister, RX_BUFFER_CAP>>>>;

// ───────────────────────────────────────────────────────────────
// Chip enable
// ───────────────────────────────────────────────────────────────

/// Chip-enable line.  High = co-processor powered.
pub struct SimChipEnable {
    powered: Rc<Cell<bool>>,
    resets: Rc<Cell<u32>>,
}

impl SimChipEnable {
    pub fn is_high(&self) -> bool {
        self.powered.get()
    }

    /// Low pulses seen so far.
    pub fn resets(&self) -> u32 {
        self.resets.get()
    }
}

impl ErrorType for SimChipEnable {
    type Error = Infallible;
}

impl OutputPin for SimChipEnable {
    fn set_low(&mut self) -> Result<(), Infallible> {
        if self.powered.replace(false) {
            self.resets.set(self.resets.get() + 1);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.powered.set(true);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Console
// ───────────────────────────────────────────────────────────────

/// Console that reports attached after a fixed number of polls.
pub struct SimConsole {
    polls_until_attached: u32,
}

impl SimConsole {
    pub fn attached() -> Self {
        Self { polls_until_attached: 0 }
    }

    pub fn after_polls(polls: u32) -> Self {
        Self { polls_until_attached: polls }
    }
}

impl ConsoleSignal for SimConsole {
    fn is_attached(&mut self) -> bool {
        if self.polls_until_attached == 0 {
            return true;
        }
        self.polls_until_attached -= 1;
        false
    }
}

// ───────────────────────────────────────────────────────────────
// Co-processor model
// ───────────────────────────────────────────────────────────────

/// Behavioural model of the co-processor's RPC service.
pub struct SimCoProcessor {
    ssid: String<32>,
    password: String<64>,
    powered: Rc<Cell<bool>>,
    resets: Rc<Cell<u32>>,
    seen_resets: u32,
    decoder: FrameDecoder,
    initialised: bool,
    associated: bool,
}

impl SimCoProcessor {
    fn new(ssid: &str, password: &str, powered: Rc<Cell<bool>>, resets: Rc<Cell<u32>>) -> Self {
        Self {
            ssid: crate::config::truncated(ssid),
            password: crate::config::truncated(password),
            powered,
            resets,
            seen_resets: 0,
            decoder: FrameDecoder::new(),
            initialised: false,
            associated: false,
        }
    }

    /// Feed one byte from the host.  Returns an encoded response frame when
    /// the byte completes a request.
    fn on_byte(&mut self, byte: u8) -> Option<heapless::Vec<u8, MAX_ENCODED_SIZE>> {
        if self.seen_resets != self.resets.get() {
            self.seen_resets = self.resets.get();
            self.decoder.reset();
            self.initialised = false;
            self.associated = false;
        }
        if !self.powered.get() {
            // Held in reset: the byte goes nowhere.
            return None;
        }
        let frame = self.decoder.push(byte)?;
        let seq = frame.seq;
        let request: Request = messages::decode(frame.payload).ok()?;
        let response = self.handle(&request);
        debug!("SimCoProcessor: {} -> {:?}", request.name(), response);

        let mut payload = [0u8; 32];
        let used = messages::encode(&response, &mut payload).ok()?.len();
        let mut out = [0u8; MAX_ENCODED_SIZE];
        let n = encode_frame(seq, &payload[..used], &mut out)?;
        heapless::Vec::from_slice(&out[..n]).ok()
    }

    fn handle(&mut self, request: &Request) -> Response {
        match request {
            Request::Init => {
                self.initialised = true;
                self.associated = false;
                Response::Status(STATUS_OK)
            }
            Request::Associate { ssid, password } => {
                if !self.initialised {
                    Response::Status(STATUS_NOT_INITIALISED)
                } else if *ssid == self.ssid && *password == self.password {
                    self.associated = true;
                    Response::Status(STATUS_OK)
                } else {
                    Response::Status(STATUS_AUTH_FAILED)
                }
            }
            Request::GetLeasedAddress => {
                if self.associated {
                    Response::Lease { ip: SIM_IP, mask: SIM_MASK, gateway: SIM_GATEWAY }
                } else {
                    Response::Status(STATUS_NOT_ASSOCIATED)
                }
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// UART
// ───────────────────────────────────────────────────────────────

/// Receive data register: pops the oldest byte on the simulated wire.
pub struct SimRxRegister {
    fifo: RxFifo,
}

impl RxRegister for SimRxRegister {
    fn read_data(&mut self) -> u8 {
        self.fifo.borrow_mut().pop_front().unwrap_or(0)
    }

    fn clear_rx_flag(&mut self) {}
}

/// Receive interrupt vector.  Fires the installed handler once per byte
/// waiting on the wire.
#[derive(Clone)]
pub struct SimIrq<'a> {
    slot: HandlerSlot<'a>,
    fifo: RxFifo,
}

impl<'a> SimIrq<'a> {
    pub fn is_installed(&self) -> bool {
        self.slot.borrow().is_some()
    }

    fn raise(&self) {
        let mut slot = self.slot.borrow_mut();
        let Some(handler) = slot.as_mut() else {
            // Interrupt not enabled: bytes stay on the wire.
            return;
        };
        while !self.fifo.borrow().is_empty() {
            handler.on_interrupt();
        }
    }
}

impl<'a> RxInterruptLine<'a, SimRxRegister, RX_BUFFER_CAP> for SimIrq<'a> {
    fn install(&mut self, handler: RxHandler<'a, SimRxRegister, RX_BUFFER_CAP>) -> Result<(), SerialError> {
        *self.slot.borrow_mut() = Some(handler);
        info!("SimIrq: RX handler installed");
        // Anything that arrived before the vector was live is delivered now.
        self.raise();
        Ok(())
    }
}

/// Transmit side of the UART, wired to the co-processor model.
pub struct SimUart<'a> {
    device: SimCoProcessor,
    fifo: RxFifo,
    irq: SimIrq<'a>,
    rx_taken: bool,
    baud_rate: Option<u32>,
}

impl<'a> SerialLine for SimUart<'a> {
    type Rx = SimRxRegister;

    fn configure(&mut self, baud_rate: u32) -> Result<(), SerialError> {
        if baud_rate == 0 {
            return Err(SerialError::Config);
        }
        self.baud_rate = Some(baud_rate);
        Ok(())
    }

    fn take_rx(&mut self) -> Option<SimRxRegister> {
        if self.rx_taken {
            return None;
        }
        self.rx_taken = true;
        Some(SimRxRegister { fifo: self.fifo.clone() })
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        if self.baud_rate.is_none() {
            return Err(SerialError::Unavailable);
        }
        for &byte in data {
            if let Some(reply) = self.device.on_byte(byte) {
                self.fifo.borrow_mut().extend(reply);
            }
        }
        self.irq.raise();
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Board
// ───────────────────────────────────────────────────────────────

/// All simulated parts, wired together.  `ssid`/`password` are the
/// credentials the modelled access point accepts.
pub struct SimBoard<'a> {
    pub chip_enable: SimChipEnable,
    pub console: SimConsole,
    pub uart: SimUart<'a>,
    pub irq: SimIrq<'a>,
}

impl SimBoard<'_> {
    pub fn new(ssid: &str, password: &str) -> Self {
        let powered = Rc::new(Cell::new(false));
        let resets: Rc<Cell<u32>> = Rc::default();
        let fifo: RxFifo = Rc::default();
        let irq = SimIrq { slot: Rc::default(), fifo: fifo.clone() };
        Self {
            chip_enable: SimChipEnable { powered: powered.clone(), resets: resets.clone() },
            console: SimConsole::attached(),
            uart: SimUart {
                device: SimCoProcessor::new(ssid, password, powered, resets),
                fifo,
                irq: irq.clone(),
                rx_taken: false,
                baud_rate: None,
            },
            irq,
        }
    }
}
