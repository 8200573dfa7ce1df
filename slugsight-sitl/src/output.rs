//! Host-side sinks: bridge lines to a writer, flight log rows to a CSV file.

use std::io::Write;

use slugsight_core::{
    decode_verified, LineSink, LogBuffer, LogEntry, LogObserver, PacketSink, PhaseTransition,
    TransitionObserver, MAX_LOG_LINE_LEN,
};

/// Writes bridge lines to any `io::Write` (stdout, a file, a serial port).
pub struct WriterSink<W: Write> {
    out: W,
    lines: u64,
    errors: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            lines: 0,
            errors: 0,
        }
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) {
        match self.out.write_all(line.as_bytes()) {
            Ok(()) => self.lines += 1,
            Err(e) => {
                // Only the first failure is worth a log line.
                if self.errors == 0 {
                    log::warn!("bridge output failed: {}", e);
                }
                self.errors += 1;
            }
        }
    }
}

/// Persists every record the flight computer stores as a CSV flight log,
/// one bounded row at a time like the on-board logger.
pub struct CsvFlightLog<W: Write> {
    out: W,
    row: LogBuffer<MAX_LOG_LINE_LEN>,
    rows: u64,
    rejected: u64,
}

impl<W: Write> CsvFlightLog<W> {
    pub fn new(mut out: W) -> std::io::Result<Self> {
        let mut schema = String::new();
        LogEntry::write_schema(&mut schema).map_err(std::io::Error::other)?;
        out.write_all(schema.as_bytes())?;
        Ok(Self {
            out,
            row: LogBuffer::new(),
            rows: 0,
            rejected: 0,
        })
    }

    pub fn log(&mut self, entry: &LogEntry) {
        self.row.clear();
        if self.row.push_entry(entry).is_err() {
            log::error!(
                "dropping {}ms row longer than {} bytes",
                entry.timestamp_ms(),
                MAX_LOG_LINE_LEN
            );
            return;
        }
        match self.out.write_all(self.row.as_bytes()) {
            Ok(()) => self.rows += 1,
            Err(e) => log::warn!("flight log write failed: {}", e),
        }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> PacketSink for CsvFlightLog<W> {
    fn write(&mut self, record_bytes: &[u8]) {
        match decode_verified(record_bytes) {
            Ok(record) => self.log(&LogEntry::Telemetry(record)),
            Err(e) => {
                self.rejected += 1;
                log::error!("refusing to persist record: {}", e);
            }
        }
    }
}

/// Logs transitions and keeps them for the end-of-run summary.
#[derive(Default)]
pub struct SessionObserver {
    log: LogObserver,
    pub transitions: Vec<PhaseTransition>,
}

impl TransitionObserver for SessionObserver {
    fn on_transition(&mut self, event: &PhaseTransition) {
        self.log.on_transition(event);
        self.transitions.push(*event);
    }
}
