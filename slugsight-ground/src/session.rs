//! Turns bridge lines into verified records and keeps the session counters.

use serde::{Deserialize, Serialize};
use slugsight_core::{
    decode_verified, parse_line, BridgeLine, CodecError, FlightPhase, Heartbeat, Millis,
    PhaseTransition, TelemetryRecord, TransportFrame,
};

use crate::stats::{SequenceCheck, SequenceTracker, SessionStats};

/// Inclusive `[min, max]` bounds.
pub type Range = [f32; 2];

/// Plausibility bounds for decoded records. Out-of-range records are kept
/// but flagged and counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub altitude_m: Range,
    pub pressure_pa: Range,
    pub temperature_c: Range,
    /// Applies to each accelerometer axis.
    pub accel: Range,
    /// Applies to each gyro axis.
    pub gyro: Range,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            altitude_m: [-100.0, 50_000.0],
            pressure_pa: [10_000.0, 110_000.0],
            temperature_c: [-50.0, 100.0],
            accel: [-200.0, 200.0],
            gyro: [-2_000.0, 2_000.0],
        }
    }
}

fn within(range: Range, value: f32) -> bool {
    range[0] <= value && value <= range[1]
}

impl ValidationConfig {
    /// Name of the first field outside its bounds, if any.
    ///
    /// The barometer bounds are skipped for records carrying the barometer
    /// sentinel, which is out of range on purpose.
    pub fn first_violation(&self, record: &TelemetryRecord) -> Option<&'static str> {
        if !self.enabled {
            return None;
        }
        if record.has_baro() {
            if !within(self.altitude_m, record.altitude_m) {
                return Some("altitude_m");
            }
            if !within(self.pressure_pa, record.pressure_pa) {
                return Some("pressure_pa");
            }
            if !within(self.temperature_c, record.temperature_c) {
                return Some("temperature_c");
            }
        }
        if !record.accel.iter().all(|&a| within(self.accel, a)) {
            return Some("accel");
        }
        if !record.gyro.iter().all(|&g| within(self.gyro, g)) {
            return Some("gyro");
        }
        None
    }
}

/// A record together with how it reached the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Received {
    pub arrival_seq: u32,
    pub arrival_ms: Millis,
    pub rssi: i16,
    /// Set when a field is outside the plausibility bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implausible: Option<&'static str>,
    pub record: TelemetryRecord,
}

/// What one line contributed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Record(Received),
    /// The phase carried by received records changed.
    Transition(PhaseTransition),
    Heartbeat(Heartbeat),
}

#[derive(Debug, Default)]
pub struct GroundSession {
    validation: ValidationConfig,
    sequence: SequenceTracker,
    last_phase: Option<FlightPhase>,
    stats: SessionStats,
}

impl GroundSession {
    pub fn new(validation: ValidationConfig) -> Self {
        Self {
            validation,
            ..Default::default()
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Feeds one bridge line. Errors are counted, logged and swallowed so a
    /// corrupt line never ends the session.
    pub fn ingest(&mut self, line: &str) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.stats.lines += 1;
        match parse_line(line) {
            Ok(BridgeLine::Packet(frame)) => self.on_frame(&frame, &mut events),
            Ok(BridgeLine::Heartbeat(heartbeat)) => {
                self.stats.heartbeats += 1;
                self.stats.bridge_total = heartbeat.total_packets;
                log::debug!("{}", heartbeat);
                events.push(SessionEvent::Heartbeat(heartbeat));
            }
            Ok(BridgeLine::Other(text)) => {
                if !text.trim().is_empty() {
                    log::debug!("ignoring line: {}", text);
                }
            }
            Err(e) => {
                self.stats.malformed_lines += 1;
                log::warn!("line {}: {}", self.stats.lines, e);
            }
        }
        events
    }

    /// Feeds one raw line as read from the capture. Bytes that are not
    /// UTF-8 (serial noise) count as a malformed line.
    pub fn ingest_bytes(&mut self, raw: &[u8]) -> Vec<SessionEvent> {
        match std::str::from_utf8(raw) {
            Ok(line) => self.ingest(line),
            Err(e) => {
                self.stats.lines += 1;
                self.stats.malformed_lines += 1;
                log::warn!("line {}: not UTF-8 ({})", self.stats.lines, e);
                Vec::new()
            }
        }
    }

    fn on_frame(&mut self, frame: &TransportFrame, events: &mut Vec<SessionEvent>) {
        self.stats.packets += 1;
        self.stats.bridge_total = frame.arrival_seq;
        self.stats.record_rssi(frame.rssi);

        let record = match decode_verified(&frame.payload) {
            Ok(record) => record,
            Err(e @ CodecError::ChecksumMismatch { .. }) => {
                self.stats.checksum_failures += 1;
                log::warn!("packet {}: {}", frame.arrival_seq, e);
                return;
            }
            Err(e) => {
                self.stats.format_failures += 1;
                log::warn!("packet {}: {}", frame.arrival_seq, e);
                return;
            }
        };

        match self.sequence.observe(record.sequence) {
            SequenceCheck::First | SequenceCheck::InOrder => {}
            SequenceCheck::Gap { missing } => {
                self.stats.gaps += 1;
                self.stats.missing_records += u64::from(missing);
                log::info!("{} records lost before seq {}", missing, record.sequence);
            }
            SequenceCheck::Stale => {
                self.stats.stale_records += 1;
                log::warn!("dropping stale or duplicate seq {}", record.sequence);
                return;
            }
        }

        self.stats.decoded += 1;
        self.stats.per_phase[record.phase as usize] += 1;

        let implausible = self.validation.first_violation(&record);
        if let Some(field) = implausible {
            self.stats.implausible_records += 1;
            log::warn!("seq {}: {} out of range", record.sequence, field);
        }

        events.push(SessionEvent::Record(Received {
            arrival_seq: frame.arrival_seq,
            arrival_ms: frame.arrival_ms,
            rssi: frame.rssi,
            implausible,
            record,
        }));

        if let Some(from) = self.last_phase.filter(|&p| p != record.phase) {
            let transition = PhaseTransition {
                from,
                to: record.phase,
                at_ms: record.timestamp_ms,
            };
            log::info!("{} -> {} at {}ms", from, record.phase, record.timestamp_ms);
            events.push(SessionEvent::Transition(transition));
        }
        self.last_phase = Some(record.phase);
    }
}
