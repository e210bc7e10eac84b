//! Fixed-capacity receive ring shared between the RX interrupt and the
//! foreground reader.
//!
//! ```text
//! ┌─────────────┐ push_from_isr ┌──────────────────┐ pop_into ┌────────────┐
//! │ RX ISR      │──────────────▶│ Deque<u8, N>     │─────────▶│ Foreground │
//! │ (producer)  │               │ (critical sect.) │          │ (consumer) │
//! └─────────────┘               └──────────────────┘          └────────────┘
//! ```
//!
//! ## Overflow policy
//!
//! **Drop newest.**  When the ring is full the incoming byte is discarded
//! and the bytes already queued are left untouched.  Each drop bumps an
//! overrun counter that is kept for diagnostics only; overrun is accepted
//! data loss and is never reported as an error.  Higher layers see it as a
//! frame that fails to decode or never completes.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

struct Ring<const N: usize> {
    bytes: Deque<u8, N>,
    overruns: u32,
}

/// Byte ring written from interrupt context and drained by the foreground.
///
/// Head/tail updates happen only inside `critical_section::with`, and each
/// critical section moves at most one byte.
pub struct ReceiveBuffer<const N: usize> {
    ring: Mutex<RefCell<Ring<N>>>,
}

impl<const N: usize> Default for ReceiveBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ReceiveBuffer<N> {
    /// An empty ring.  `const` so it can live in a `static`.
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(Ring {
                bytes: Deque::new(),
                overruns: 0,
            })),
        }
    }

    /// Total capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Producer side.  Called once per received byte from the interrupt
    /// handler.  Returns `false` if the byte was dropped because the ring
    /// is full.
    pub fn push_from_isr(&self, byte: u8) -> bool {
        critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            if ring.bytes.push_back(byte).is_ok() {
                true
            } else {
                ring.overruns = ring.overruns.saturating_add(1);
                false
            }
        })
    }

    /// Consumer side.  Moves up to `buf.len()` bytes out in FIFO order and
    /// returns how many were moved.
    pub fn pop_into(&self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            let next = critical_section::with(|cs| self.ring.borrow_ref_mut(cs).bytes.pop_front());
            match next {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.ring.borrow_ref(cs).bytes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Bytes dropped on a full ring since boot (saturating).
    pub fn overrun_count(&self) -> u32 {
        critical_section::with(|cs| self.ring.borrow_ref(cs).overruns)
    }

    /// Discard everything buffered.  Used when the link is re-attached.
    pub fn clear(&self) {
        critical_section::with(|cs| self.ring.borrow_ref_mut(cs).bytes.clear());
    }
}
