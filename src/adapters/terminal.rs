//! Terminal status sink.
//!
//! Implements [`StatusSink`] over any `std::io::Write`.  Lines are
//! terminated with `\r\n` so raw serial terminals render them the same as a
//! host console.  Write failures are logged once and otherwise ignored: the
//! status surface has no error channel.

use std::io::{self, Write};

use core::fmt;
use log::warn;

use crate::app::ports::StatusSink;

/// ANSI erase-display + cursor-home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub struct TerminalSink<W: Write> {
    out: W,
    failed: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if !self.failed {
                warn!("Terminal: status write failed: {}", e);
            }
            self.failed = true;
        }
    }
}

impl<W: Write> StatusSink for TerminalSink<W> {
    fn write_line(&mut self, line: fmt::Arguments<'_>) {
        let result = self
            .out
            .write_fmt(line)
            .and_then(|()| self.out.write_all(b"\r\n"))
            .and_then(|()| self.out.flush());
        self.emit(result);
    }

    fn clear(&mut self) {
        let result = self
            .out
            .write_all(CLEAR_SCREEN.as_bytes())
            .and_then(|()| self.out.flush());
        self.emit(result);
    }
}
