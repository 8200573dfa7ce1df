use core::fmt::Write;

use crate::framing::ground::Heartbeat;
use crate::state_machine::PhaseTransition;
use crate::telemetry::TelemetryRecord;
use crate::types::Millis;

/// Longest row any [`LogEntry`] formats to, newline included.
pub const MAX_LOG_LINE_LEN: usize = 256;

/// A row in the flight log: `TAG,timestamp_ms,payload...\n`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogEntry {
    Telemetry(TelemetryRecord),
    Transition(PhaseTransition),
    Heartbeat(Heartbeat),
}

impl LogEntry {
    pub fn write_schema<W: Write>(cursor: &mut W) -> core::fmt::Result {
        writeln!(cursor, "# SCHEMA DEFINITION")?;
        writeln!(cursor, "# METADATA,time_unit,ms")?;
        writeln!(
            cursor,
            "# {},timestamp_ms,{}",
            TelemetryRecord::TAG,
            TelemetryRecord::CSV_HEADER
        )?;
        writeln!(
            cursor,
            "# {},timestamp_ms,{}",
            PhaseTransition::TAG,
            PhaseTransition::CSV_HEADER
        )?;
        writeln!(cursor, "# {},timestamp_ms,{}", Heartbeat::TAG, Heartbeat::CSV_HEADER)?;
        Ok(())
    }

    pub fn timestamp_ms(&self) -> Millis {
        match self {
            LogEntry::Telemetry(data) => data.timestamp_ms,
            LogEntry::Transition(data) => data.at_ms,
            LogEntry::Heartbeat(data) => data.now_ms,
        }
    }

    pub fn format_to<W: Write>(&self, cursor: &mut W) -> core::fmt::Result {
        let ts = self.timestamp_ms();
        match self {
            LogEntry::Telemetry(data) => write_line(ts, data, cursor),
            LogEntry::Transition(data) => write_line(ts, data, cursor),
            LogEntry::Heartbeat(data) => write_line(ts, data, cursor),
        }
    }
}

// Every row has the same shape: TAG, TIMESTAMP, PAYLOAD... \n
fn write_line<T: Loggable, W: Write>(ts: Millis, data: &T, cursor: &mut W) -> core::fmt::Result {
    write!(cursor, "{},{},", T::TAG, ts)?;
    data.format_payload(cursor)?;
    writeln!(cursor)
}

/// A type that can be written as one flight-log row.
pub trait Loggable {
    /// The tag that identifies this row (e.g. `T`, `S`, `HB`).
    const TAG: &'static str;
    /// Column names of the payload, comma separated.
    const CSV_HEADER: &'static str;

    /// Writes the payload columns only; the row prefix and newline are added by the caller.
    fn format_payload<W: Write>(&self, cursor: &mut W) -> core::fmt::Result;
}

impl Loggable for TelemetryRecord {
    const TAG: &'static str = "T";
    const CSV_HEADER: &'static str = "seq,phase,altitude_m,pressure_pa,temperature_c,\
accel_x,accel_y,accel_z,gyro_x,gyro_y,gyro_z,mag_x,mag_y,mag_z,\
gps_lat,gps_lon,gps_alt_m,satellites,checksum";

    fn format_payload<W: Write>(&self, cursor: &mut W) -> core::fmt::Result {
        write!(
            cursor,
            "{},{},{:.2},{:.1},{:.2},",
            self.sequence,
            self.phase.name(),
            self.altitude_m,
            self.pressure_pa,
            self.temperature_c
        )?;
        for axis in self.accel.iter().chain(&self.gyro).chain(&self.mag) {
            write!(cursor, "{:.3},", axis)?;
        }
        write!(
            cursor,
            "{:.6},{:.6},{:.1},{},{:04X}",
            self.gps_lat, self.gps_lon, self.gps_alt_m, self.satellites, self.checksum
        )
    }
}

impl Loggable for PhaseTransition {
    const TAG: &'static str = "S";
    const CSV_HEADER: &'static str = "from,to";

    fn format_payload<W: Write>(&self, cursor: &mut W) -> core::fmt::Result {
        write!(cursor, "{},{}", self.from.name(), self.to.name())
    }
}

impl Loggable for Heartbeat {
    const TAG: &'static str = "HB";
    const CSV_HEADER: &'static str = "total_packets";

    fn format_payload<W: Write>(&self, cursor: &mut W) -> core::fmt::Result {
        write!(cursor, "{}", self.total_packets)
    }
}

/// Fixed-capacity row buffer for targets without an allocator. Rows are
/// appended whole or not at all.
#[derive(Debug, Default, Clone)]
pub struct LogBuffer<const SIZE: usize> {
    bytes: heapless::Vec<u8, SIZE>,
}

impl<const SIZE: usize> Write for LogBuffer<SIZE> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.bytes
            .extend_from_slice(s.as_bytes())
            .map_err(|_| core::fmt::Error)
    }
}

impl<const SIZE: usize> LogBuffer<SIZE> {
    pub const fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
        }
    }

    /// Appends one row and returns its length. On overflow the buffer is
    /// left as it was.
    pub fn push_entry(&mut self, entry: &LogEntry) -> Result<usize, core::fmt::Error> {
        let start = self.bytes.len();
        if let Err(e) = entry.format_to(self) {
            self.bytes.truncate(start);
            return Err(e);
        }
        Ok(self.bytes.len() - start)
    }

    pub fn remaining(&self) -> usize {
        SIZE - self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
