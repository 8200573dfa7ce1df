// sensors.rs
//! Boundary to the sensor drivers.
//!
//! Drivers live outside this crate and hand over calibrated values. A driver
//! that fails a read returns `None`; the suite substitutes the documented
//! sentinel so every tick still produces a full record.

use crate::telemetry::types::{
    SENTINEL_ALTITUDE_M, SENTINEL_AXES, SENTINEL_PRESSURE_PA, SENTINEL_TEMPERATURE_C,
};
use crate::types::Millis;

/// A sensor collaborator. `None` means the reading is not valid this tick.
pub trait Sensor {
    type Sample: Copy;

    fn read(&mut self) -> Option<Self::Sample>;
}

impl<S: Sensor + ?Sized> Sensor for &mut S {
    type Sample = S::Sample;

    fn read(&mut self) -> Option<Self::Sample> {
        (**self).read()
    }
}

/// Samples that can tell whether they hold usable numbers.
pub trait Finite {
    fn is_finite(&self) -> bool;
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaroSample {
    pub altitude_m: f32,
    pub pressure_pa: f32,
    pub temperature_c: f32,
}

impl BaroSample {
    pub const SENTINEL: Self = Self {
        altitude_m: SENTINEL_ALTITUDE_M,
        pressure_pa: SENTINEL_PRESSURE_PA,
        temperature_c: SENTINEL_TEMPERATURE_C,
    };
}

impl Finite for BaroSample {
    fn is_finite(&self) -> bool {
        all_finite(&[self.altitude_m, self.pressure_pa, self.temperature_c])
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuSample {
    /// m/s²; index 2 is the rocket's long axis, positive toward the nose.
    pub accel: [f32; 3],
    /// deg/s
    pub gyro: [f32; 3],
}

impl ImuSample {
    pub const SENTINEL: Self = Self {
        accel: SENTINEL_AXES,
        gyro: SENTINEL_AXES,
    };
}

impl Finite for ImuSample {
    fn is_finite(&self) -> bool {
        all_finite(&self.accel) && all_finite(&self.gyro)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MagSample {
    /// µT
    pub field: [f32; 3],
}

impl MagSample {
    pub const SENTINEL: Self = Self {
        field: SENTINEL_AXES,
    };
}

impl Finite for MagSample {
    fn is_finite(&self) -> bool {
        all_finite(&self.field)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsSample {
    pub lat_deg: f32,
    pub lon_deg: f32,
    pub alt_m: f32,
    pub satellites: u8,
}

impl GpsSample {
    /// Zero position with zero satellites: "no fix", not a real coordinate.
    pub const NO_FIX: Self = Self {
        lat_deg: 0.0,
        lon_deg: 0.0,
        alt_m: 0.0,
        satellites: 0,
    };
}

impl Finite for GpsSample {
    fn is_finite(&self) -> bool {
        all_finite(&[self.lat_deg, self.lon_deg, self.alt_m])
    }
}

/// Everything sampled in one tick, sentinels already substituted.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    pub baro: BaroSample,
    pub imu: ImuSample,
    pub mag: MagSample,
    pub gps: GpsSample,
    pub baro_valid: bool,
    pub imu_valid: bool,
    pub mag_valid: bool,
    pub gps_valid: bool,
}

impl SensorSnapshot {
    /// A snapshot where every sensor failed.
    pub const fn sentinel() -> Self {
        Self {
            baro: BaroSample::SENTINEL,
            imu: ImuSample::SENTINEL,
            mag: MagSample::SENTINEL,
            gps: GpsSample::NO_FIX,
            baro_valid: false,
            imu_valid: false,
            mag_valid: false,
            gps_valid: false,
        }
    }

    /// Altitude for the classifier; NaN when the barometer failed so that
    /// altitude guards stay unsatisfied instead of seeing the sentinel.
    pub fn classifier_altitude(&self) -> f32 {
        if self.baro_valid {
            self.baro.altitude_m
        } else {
            f32::NAN
        }
    }

    /// Long-axis acceleration for the classifier; NaN when the IMU failed.
    pub fn classifier_accel_z(&self) -> f32 {
        if self.imu_valid {
            self.imu.accel[2]
        } else {
            f32::NAN
        }
    }
}

/// Running count of `SensorReadFailure`s per sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorFailures {
    pub baro: u32,
    pub imu: u32,
    pub mag: u32,
    pub gps: u32,
}

impl SensorFailures {
    pub fn total(&self) -> u32 {
        self.baro + self.imu + self.mag + self.gps
    }
}

/// Reads one sensor, substituting `sentinel` on failure or non-finite data.
fn read_or<S>(
    sensor: &mut S,
    sentinel: S::Sample,
    failures: &mut u32,
    name: &str,
) -> (S::Sample, bool)
where
    S: Sensor,
    S::Sample: Finite,
{
    match sensor.read() {
        Some(sample) if sample.is_finite() => (sample, true),
        Some(_) => {
            *failures += 1;
            crate::debug!("{} returned non-finite data", name);
            (sentinel, false)
        }
        None => {
            *failures += 1;
            crate::debug!("{} read failed", name);
            (sentinel, false)
        }
    }
}

/// The four sensor collaborators sampled together once per tick.
pub struct SensorSuite<B, I, M, G> {
    pub baro: B,
    pub imu: I,
    pub mag: M,
    pub gps: G,
    failures: SensorFailures,
}

impl<B, I, M, G> SensorSuite<B, I, M, G>
where
    B: Sensor<Sample = BaroSample>,
    I: Sensor<Sample = ImuSample>,
    M: Sensor<Sample = MagSample>,
    G: Sensor<Sample = GpsSample>,
{
    pub fn new(baro: B, imu: I, mag: M, gps: G) -> Self {
        Self {
            baro,
            imu,
            mag,
            gps,
            failures: SensorFailures::default(),
        }
    }

    /// Reads every sensor once. Never fails: bad reads become sentinels.
    pub fn sample(&mut self) -> SensorSnapshot {
        let (baro, baro_valid) =
            read_or(&mut self.baro, BaroSample::SENTINEL, &mut self.failures.baro, "barometer");
        let (imu, imu_valid) =
            read_or(&mut self.imu, ImuSample::SENTINEL, &mut self.failures.imu, "imu");
        let (mag, mag_valid) =
            read_or(&mut self.mag, MagSample::SENTINEL, &mut self.failures.mag, "magnetometer");
        let (gps, gps_valid) =
            read_or(&mut self.gps, GpsSample::NO_FIX, &mut self.failures.gps, "gps");

        // A receiver that reports a sample without satellites has no fix.
        let gps = if gps_valid && gps.satellites > 0 {
            gps
        } else {
            GpsSample::NO_FIX
        };

        SensorSnapshot {
            baro,
            imu,
            mag,
            gps,
            baro_valid,
            imu_valid,
            mag_valid,
            gps_valid: gps_valid && gps.satellites > 0,
        }
    }

    pub fn failures(&self) -> SensorFailures {
        self.failures
    }
}

/// Vertical velocity as the finite difference of consecutive valid altitudes.
///
/// Yields NaN until two valid samples exist, across a barometer dropout, or
/// when two samples share a timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct AltitudeRate {
    last: Option<(Millis, f32)>,
}

impl AltitudeRate {
    pub const fn new() -> Self {
        Self { last: None }
    }

    pub fn update(&mut self, now_ms: Millis, altitude: f32) -> f32 {
        if !altitude.is_finite() {
            self.last = None;
            return f32::NAN;
        }
        let rate = match self.last {
            Some((then, previous)) => {
                let dt_ms = now_ms.wrapping_sub(then);
                if dt_ms == 0 {
                    f32::NAN
                } else {
                    (altitude - previous) * 1000.0 / dt_ms as f32
                }
            }
            None => f32::NAN,
        };
        self.last = Some((now_ms, altitude));
        rate
    }
}
