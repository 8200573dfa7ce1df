use std::io::{self, Write};

use clap::ValueEnum;
use slugsight_core::LogEntry;

use crate::session::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Flight log rows with the `# SCHEMA DEFINITION` header.
    #[default]
    Csv,
    /// One JSON object per event.
    Jsonl,
}

/// Destination for session events.
pub trait EventWriter {
    fn write_event(&mut self, event: &SessionEvent) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

pub struct CsvWriter<W: Write> {
    out: W,
    row: String,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        let mut schema = String::new();
        LogEntry::write_schema(&mut schema).map_err(io::Error::other)?;
        out.write_all(schema.as_bytes())?;
        Ok(Self {
            out,
            row: String::new(),
        })
    }
}

impl<W: Write> EventWriter for CsvWriter<W> {
    fn write_event(&mut self, event: &SessionEvent) -> io::Result<()> {
        let entry = match event {
            SessionEvent::Record(received) => LogEntry::Telemetry(received.record),
            SessionEvent::Transition(transition) => LogEntry::Transition(*transition),
            SessionEvent::Heartbeat(heartbeat) => LogEntry::Heartbeat(*heartbeat),
        };
        self.row.clear();
        entry.format_to(&mut self.row).map_err(io::Error::other)?;
        self.out.write_all(self.row.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventWriter for JsonLinesWriter<W> {
    fn write_event(&mut self, event: &SessionEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

pub fn writer<'a, W: Write + 'a>(
    format: OutputFormat,
    out: W,
) -> io::Result<Box<dyn EventWriter + 'a>> {
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvWriter::new(out)?),
        OutputFormat::Jsonl => Box::new(JsonLinesWriter::new(out)),
    })
}
