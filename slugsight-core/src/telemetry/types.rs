// telemetry/types.rs
use crate::types::{FlightPhase, Millis};

/// Altitude reported when the barometer read fails (m).
pub const SENTINEL_ALTITUDE_M: f32 = 0.0;
/// Pressure reported when the barometer read fails. No real reading is 0 Pa.
pub const SENTINEL_PRESSURE_PA: f32 = 0.0;
/// Temperature reported when the barometer read fails. Absolute zero is unreachable.
pub const SENTINEL_TEMPERATURE_C: f32 = -273.15;
/// Inertial and magnetic axes are zeroed on read failure. A live accelerometer
/// always sees gravity, so an all-zero triad is distinguishable from a reading.
pub const SENTINEL_AXES: [f32; 3] = [0.0; 3];

/// One telemetry sample as assembled on the rocket and decoded on the ground.
///
/// Field order here matches the wire layout in [`crate::telemetry::codec`].
/// Reordering or resizing fields is a protocol change and must bump
/// [`crate::telemetry::codec::WIRE_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    /// Per-session sequence number, wraps at `u16::MAX`.
    pub sequence: u16,
    /// Tick time in milliseconds since boot.
    pub timestamp_ms: Millis,
    pub phase: FlightPhase,

    // Barometer
    pub altitude_m: f32,
    pub pressure_pa: f32,
    pub temperature_c: f32,

    // IMU
    /// m/s², sensor frame.
    pub accel: [f32; 3],
    /// deg/s, sensor frame.
    pub gyro: [f32; 3],

    // Magnetometer
    /// µT, sensor frame.
    pub mag: [f32; 3],

    // GPS
    pub gps_lat: f32,
    pub gps_lon: f32,
    pub gps_alt_m: f32,
    pub satellites: u8,

    /// CRC-16 over every preceding wire byte.
    pub checksum: u16,
}

impl TelemetryRecord {
    /// A record with every sensor field at its sentinel and a zero checksum.
    pub const fn empty(sequence: u16, timestamp_ms: Millis, phase: FlightPhase) -> Self {
        Self {
            sequence,
            timestamp_ms,
            phase,
            altitude_m: SENTINEL_ALTITUDE_M,
            pressure_pa: SENTINEL_PRESSURE_PA,
            temperature_c: SENTINEL_TEMPERATURE_C,
            accel: SENTINEL_AXES,
            gyro: SENTINEL_AXES,
            mag: SENTINEL_AXES,
            gps_lat: 0.0,
            gps_lon: 0.0,
            gps_alt_m: 0.0,
            satellites: 0,
            checksum: 0,
        }
    }

    /// Zero coordinates together with zero satellites is the "no fix" sentinel.
    pub fn has_gps_fix(&self) -> bool {
        !(self.satellites == 0 && self.gps_lat == 0.0 && self.gps_lon == 0.0)
    }

    /// The barometer sentinel carries a physically impossible 0 Pa.
    pub fn has_baro(&self) -> bool {
        self.pressure_pa != SENTINEL_PRESSURE_PA
    }
}
