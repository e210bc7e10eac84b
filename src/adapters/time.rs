//! Host time adapters.
//!
//! - [`StdClock`] implements the [`Clock`] port with `std::time`.
//! - [`StdDelay`] implements `embedded-hal`'s `DelayNs` with
//!   `std::thread::sleep`, for the sequencer's settle delays and the
//!   transport's read yield.

use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

/// Monotonic + wall clock for the host.
pub struct StdClock {
    start: Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StdClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn wall_nanos(&self) -> u64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as u64,
            // Clock set before 1970: fall back to time since boot.
            Err(_) => self.start.elapsed().as_nanos() as u64,
        }
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Blocking delay backed by the OS scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
