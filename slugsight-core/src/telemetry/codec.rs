//! Fixed-layout binary codec for [`TelemetryRecord`].
//!
//! # Wire Layout
//!
//! All multi-byte fields are little-endian and there is no padding.
//!
//! | Offset | Field            | Type      |
//! |--------|------------------|-----------|
//! | 0      | version          | `u8`      |
//! | 1      | sequence         | `u16`     |
//! | 3      | timestamp_ms     | `u32`     |
//! | 7      | phase            | `u8`      |
//! | 8      | altitude_m       | `f32`     |
//! | 12     | pressure_pa      | `f32`     |
//! | 16     | temperature_c    | `f32`     |
//! | 20     | accel x/y/z      | `3 × f32` |
//! | 32     | gyro x/y/z       | `3 × f32` |
//! | 44     | mag x/y/z        | `3 × f32` |
//! | 56     | gps_lat          | `f32`     |
//! | 60     | gps_lon          | `f32`     |
//! | 64     | gps_alt_m        | `f32`     |
//! | 68     | satellites       | `u8`      |
//! | 69     | checksum         | `u16`     |
//!
//! The checksum is CRC-16/MODBUS (reflected poly `0xA001`, init `0xFFFF`)
//! over bytes `[0, 69)`. [`compute_checksum`] is the only routine that
//! decides which bytes are covered; [`encode`], [`verify`], [`verify_bytes`]
//! and [`decode_verified`] all go through it.

use core::fmt;

use crc::{Crc, CRC_16_MODBUS};
use zerocopy::byteorder::little_endian::{F32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::telemetry::types::TelemetryRecord;
use crate::types::FlightPhase;

/// Protocol version carried in byte 0. Bump on any layout change.
pub const WIRE_VERSION: u8 = 1;

/// Encoded size of one record, checksum included.
pub const RECORD_LEN: usize = 71;

/// Number of leading bytes covered by the checksum.
pub const CHECKSUMMED_LEN: usize = RECORD_LEN - 2;

pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
struct WireRecord {
    version: u8,
    sequence: U16,
    timestamp_ms: U32,
    phase: u8,
    altitude_m: F32,
    pressure_pa: F32,
    temperature_c: F32,
    accel: [F32; 3],
    gyro: [F32; 3],
    mag: [F32; 3],
    gps_lat: F32,
    gps_lon: F32,
    gps_alt_m: F32,
    satellites: u8,
    checksum: U16,
}

const _: () = assert!(
    core::mem::size_of::<WireRecord>() == RECORD_LEN,
    "WireRecord layout drifted from RECORD_LEN"
);

fn axes(values: [f32; 3]) -> [F32; 3] {
    values.map(F32::new)
}

fn axes_back(values: [F32; 3]) -> [f32; 3] {
    values.map(|v| v.get())
}

impl WireRecord {
    /// Serializes every field. The checksum slot copies the record's stored value.
    fn from_record(record: &TelemetryRecord) -> Self {
        Self {
            version: WIRE_VERSION,
            sequence: U16::new(record.sequence),
            timestamp_ms: U32::new(record.timestamp_ms),
            phase: record.phase as u8,
            altitude_m: F32::new(record.altitude_m),
            pressure_pa: F32::new(record.pressure_pa),
            temperature_c: F32::new(record.temperature_c),
            accel: axes(record.accel),
            gyro: axes(record.gyro),
            mag: axes(record.mag),
            gps_lat: F32::new(record.gps_lat),
            gps_lon: F32::new(record.gps_lon),
            gps_alt_m: F32::new(record.gps_alt_m),
            satellites: record.satellites,
            checksum: U16::new(record.checksum),
        }
    }

    fn checksummed(&self) -> &[u8] {
        &self.as_bytes()[..CHECKSUMMED_LEN]
    }

    fn to_record(self, phase: FlightPhase) -> TelemetryRecord {
        TelemetryRecord {
            sequence: self.sequence.get(),
            timestamp_ms: self.timestamp_ms.get(),
            phase,
            altitude_m: self.altitude_m.get(),
            pressure_pa: self.pressure_pa.get(),
            temperature_c: self.temperature_c.get(),
            accel: axes_back(self.accel),
            gyro: axes_back(self.gyro),
            mag: axes_back(self.mag),
            gps_lat: self.gps_lat.get(),
            gps_lon: self.gps_lon.get(),
            gps_alt_m: self.gps_alt_m.get(),
            satellites: self.satellites,
            checksum: self.checksum.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Buffer length does not match [`RECORD_LEN`].
    Format { expected: usize, actual: usize },
    /// Version byte does not match [`WIRE_VERSION`].
    UnsupportedVersion(u8),
    /// Phase byte is outside the five known phases.
    InvalidPhase(u8),
    /// Stored checksum does not match the recomputed one.
    ChecksumMismatch { stored: u16, computed: u16 },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Format { expected, actual } => {
                write!(f, "record must be {} bytes, got {}", expected, actual)
            }
            CodecError::UnsupportedVersion(v) => {
                write!(f, "wire version {} (expected {})", v, WIRE_VERSION)
            }
            CodecError::InvalidPhase(p) => write!(f, "invalid flight phase {}", p),
            CodecError::ChecksumMismatch { stored, computed } => {
                write!(f, "checksum mismatch: stored {:#06x}, computed {:#06x}", stored, computed)
            }
        }
    }
}

impl core::error::Error for CodecError {}

/// CRC-16/MODBUS of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Checksum of `record` as it would be serialized, ignoring its stored checksum.
pub fn compute_checksum(record: &TelemetryRecord) -> u16 {
    crc16(WireRecord::from_record(record).checksummed())
}

/// Returns `record` with its checksum field set to the computed value.
pub fn seal(mut record: TelemetryRecord) -> TelemetryRecord {
    record.checksum = compute_checksum(&record);
    record
}

/// Recomputes the checksum and compares it against the stored one.
pub fn verify(record: &TelemetryRecord) -> bool {
    compute_checksum(record) == record.checksum
}

/// Checks a raw buffer: it must decode and carry the checksum
/// [`compute_checksum`] assigns to its contents.
pub fn verify_bytes(bytes: &[u8]) -> bool {
    decode(bytes).is_ok_and(|record| verify(&record))
}

/// Serializes `record`, always writing a freshly computed checksum.
pub fn encode(record: &TelemetryRecord) -> [u8; RECORD_LEN] {
    let wire = WireRecord::from_record(&seal(*record));

    let mut out = [0u8; RECORD_LEN];
    out.copy_from_slice(wire.as_bytes());
    out
}

/// Structural decode: length, version and phase range. Does not check the CRC.
pub fn decode(bytes: &[u8]) -> Result<TelemetryRecord, CodecError> {
    let wire = WireRecord::read_from_bytes(bytes).map_err(|_| CodecError::Format {
        expected: RECORD_LEN,
        actual: bytes.len(),
    })?;

    if wire.version != WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(wire.version));
    }
    let phase = FlightPhase::from_u8(wire.phase).ok_or(CodecError::InvalidPhase(wire.phase))?;

    Ok(wire.to_record(phase))
}

/// [`decode`] followed by [`verify`]. The only decode path that may feed
/// flight decisions or the flight log.
pub fn decode_verified(bytes: &[u8]) -> Result<TelemetryRecord, CodecError> {
    let record = decode(bytes)?;
    let computed = compute_checksum(&record);
    if computed != record.checksum {
        return Err(CodecError::ChecksumMismatch {
            stored: record.checksum,
            computed,
        });
    }
    Ok(record)
}
