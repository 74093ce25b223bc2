#![forbid(unsafe_code)]

//! The JSON-lines loop between stdin, a [`WebSession`] and stdout.

use core::time::Duration;
use std::io::Write;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Instant;

use fglk_runtime::Vm;
use fglk_web::{WebError, WebSession};
use tracing::{debug, info, warn};

/// How long to block on stdin before checking the VM timer.
const POLL: Duration = Duration::from_millis(50);

/// Feeds lines into a session and writes what comes back.
#[derive(Debug)]
pub struct Host<V: Vm, W: Write> {
    web: WebSession<V>,
    out: W,
    lines_in: u64,
    records_out: u64,
}

impl<V: Vm, W: Write> Host<V, W> {
    pub fn new(web: WebSession<V>, out: W) -> Self {
        Self {
            web,
            out,
            lines_in: 0,
            records_out: 0,
        }
    }

    #[must_use]
    pub const fn web(&self) -> &WebSession<V> {
        &self.web
    }

    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.web.session().is_exited()
    }

    /// Handle one stdin line. Blank and malformed lines are skipped.
    pub fn handle_line(&mut self, line: &str) -> Result<(), WebError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        self.lines_in += 1;
        match self.web.accept_json(line) {
            Ok(records) => self.emit(&records),
            Err(WebError::Json(err)) => {
                warn!(line = self.lines_in, error = %err, "skipping malformed event");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Advance the session clock by `dt`, emitting a timer update if due.
    pub fn tick(&mut self, dt: Duration) -> Result<(), WebError> {
        let records = self.web.advance_time(dt)?;
        self.emit(&records)
    }

    fn emit(&mut self, records: &[String]) -> Result<(), WebError> {
        for record in records {
            self.out.write_all(record.as_bytes())?;
            self.out.write_all(b"\n")?;
            self.records_out += 1;
        }
        if !records.is_empty() {
            self.out.flush()?;
        }
        Ok(())
    }

    /// Run until the VM exits or `lines` closes.
    ///
    /// The session clock follows wall time; the loop wakes every [`POLL`]
    /// so a VM timer fires even while stdin is idle.
    pub fn run(&mut self, lines: &Receiver<String>) -> Result<(), WebError> {
        let mut last = Instant::now();
        while !self.is_exited() {
            let received = lines.recv_timeout(POLL);
            let now = Instant::now();
            self.tick(now.duration_since(last))?;
            last = now;
            match received {
                Ok(line) => self.handle_line(&line)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input closed");
                    break;
                }
            }
        }
        info!(
            lines = self.lines_in,
            records = self.records_out,
            exited = self.is_exited(),
            "host loop finished"
        );
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
