use crate::sensors::SensorSnapshot;
use crate::telemetry::{seal, TelemetryRecord};
use crate::types::{FlightPhase, Millis};

/// Builds one sealed record per tick from the sensor snapshot and phase.
///
/// Sequence numbers start at 0 and wrap at `u16::MAX`. Timestamps never go
/// backwards: a clock that steps back is clamped to the previous stamp.
/// "Back" is judged with wrapping arithmetic, so the `u32` rollover counts
/// as moving forward.
#[derive(Debug, Default, Clone)]
pub struct TelemetryAssembler {
    next_sequence: u16,
    last_timestamp_ms: Option<Millis>,
}

impl TelemetryAssembler {
    pub const fn new() -> Self {
        Self {
            next_sequence: 0,
            last_timestamp_ms: None,
        }
    }

    pub fn assemble(
        &mut self,
        now_ms: Millis,
        phase: FlightPhase,
        snapshot: &SensorSnapshot,
    ) -> TelemetryRecord {
        let timestamp_ms = match self.last_timestamp_ms {
            // More than half the range "ahead" means the clock went backwards.
            Some(last) if now_ms.wrapping_sub(last) > Millis::MAX / 2 => {
                crate::warn!("clock stepped back from {} to {}ms", last, now_ms);
                last
            }
            _ => now_ms,
        };
        self.last_timestamp_ms = Some(timestamp_ms);

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        seal(TelemetryRecord {
            sequence,
            timestamp_ms,
            phase,
            altitude_m: snapshot.baro.altitude_m,
            pressure_pa: snapshot.baro.pressure_pa,
            temperature_c: snapshot.baro.temperature_c,
            accel: snapshot.imu.accel,
            gyro: snapshot.imu.gyro,
            mag: snapshot.mag.field,
            gps_lat: snapshot.gps.lat_deg,
            gps_lon: snapshot.gps.lon_deg,
            gps_alt_m: snapshot.gps.alt_m,
            satellites: snapshot.gps.satellites,
            checksum: 0,
        })
    }

    /// Sequence number the next record will carry.
    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }
}
