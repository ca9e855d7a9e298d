//! Console snapshot sink.
//!
//! Implements [`SnapshotSink`] by writing each record as one line on stdout.
//! Diagnostics go through `log` to stderr, so stdout carries nothing but
//! the snapshot stream and can be piped straight into another tool.

use std::io::{self, Write};

use log::debug;

use crate::app::ports::SnapshotSink;

/// Adapter that prints every snapshot record to standard output.
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SnapshotSink for ConsoleSink<W> {
    fn emit(&mut self, line: &str) {
        // Flush per record so a pipe sees each tick immediately.
        let result = writeln!(self.out, "{line}").and_then(|()| self.out.flush());
        if let Err(e) = result {
            debug!("console sink: write failed: {}", e);
        }
    }
}
