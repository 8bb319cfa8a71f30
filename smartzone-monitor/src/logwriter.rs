//! Event log sink.
//!
//! Writes rendered event lines to stdout or an append-mode file, optionally
//! prefixed with the wall-clock date. Repeat suppression drops a line when
//! the identical line was written (or suppressed) less than a second before,
//! measured on the caller's clock.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;

/// Lines younger than this are candidates for repeat suppression.
const REPEAT_WINDOW: f64 = 1.0;

pub struct LogWriter<W: Write> {
    out: W,
    include_date: bool,
    suppress_repeats: bool,
    history: VecDeque<(f64, String)>,
}

impl LogWriter<Box<dyn Write + Send>> {
    pub fn stdout(include_date: bool, suppress_repeats: bool) -> Self {
        LogWriter::new(Box::new(io::stdout()), include_date, suppress_repeats)
    }

    /// Append to `path`, creating it if needed.
    pub fn append(path: &Path, include_date: bool, suppress_repeats: bool) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(LogWriter::new(Box::new(file), include_date, suppress_repeats))
    }
}

impl<W: Write> LogWriter<W> {
    pub fn new(out: W, include_date: bool, suppress_repeats: bool) -> Self {
        LogWriter {
            out,
            include_date,
            suppress_repeats,
            history: VecDeque::new(),
        }
    }

    /// Write one line at caller time `now`. Returns false if suppressed.
    pub fn write_line(&mut self, line: &str, now: f64) -> io::Result<bool> {
        if self.suppress_repeats && self.seen_recently(line, now) {
            return Ok(false);
        }
        if self.include_date {
            // asctime layout
            let stamp = Local::now().format("%a %b %e %H:%M:%S %Y");
            writeln!(self.out, "{stamp}:   {line}")?;
        } else {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(true)
    }

    /// Expire old history, then refresh or record `line`.
    fn seen_recently(&mut self, line: &str, now: f64) -> bool {
        self.history.retain(|(t, _)| now <= t + REPEAT_WINDOW);
        if let Some(entry) = self.history.iter_mut().find(|(_, s)| s == line) {
            entry.0 = now;
            return true;
        }
        self.history.push_back((now, line.to_string()));
        false
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
