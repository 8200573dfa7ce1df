//! Simulated sensors. Each one samples the shared ground truth and adds
//! seeded gaussian noise, and can be forced to fail during a dropout window.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use slugsight_core::{
    BaroSample, GpsSample, ImuSample, MagSample, Millis, Sensor, SensorSuite,
};

use crate::sim::Truth;

/// Launch site used for the simulated GPS (UCSC).
const SITE_LAT: f64 = 36.9914;
const SITE_LON: f64 = -122.0609;
const METERS_PER_DEG: f64 = 111_320.0;
/// Local field in the body frame, rocket vertical (µT).
const MAG_FIELD: [f32; 3] = [22.9, 5.1, 41.3];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub baro_alt_std: f64,   // m
    pub accel_std: f64,      // m/s²
    pub gyro_std: f64,       // deg/s
    pub mag_std: f64,        // µT
    pub gps_pos_std: f64,    // m
    pub gps_satellites: u8,
    /// Time after start before the GPS reports a fix.
    pub gps_fix_ms: Millis,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            baro_alt_std: 0.03,
            accel_std: 0.2,
            gyro_std: 0.5,
            mag_std: 0.5,
            gps_pos_std: 2.0,
            gps_satellites: 8,
            gps_fix_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Baro,
    Imu,
    Mag,
    Gps,
}

/// A span of simulated time during which something is forced off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start_ms: Millis,
    pub duration_ms: Millis,
}

impl Window {
    pub fn contains(&self, now_ms: Millis) -> bool {
        now_ms >= self.start_ms && now_ms - self.start_ms < self.duration_ms
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutConfig {
    pub sensors: Vec<SensorKind>,
    pub window: Option<Window>,
}

impl DropoutConfig {
    fn applies(&self, kind: SensorKind) -> Option<Window> {
        self.window.filter(|_| self.sensors.contains(&kind))
    }
}

/// The simulation's view of "now", shared by every simulated device.
#[derive(Clone, Default)]
pub struct SimClock(Rc<Cell<(Millis, Truth)>>);

impl SimClock {
    pub fn set(&self, now_ms: Millis, truth: Truth) {
        self.0.set((now_ms, truth));
    }

    pub fn now_ms(&self) -> Millis {
        self.0.get().0
    }

    pub fn truth(&self) -> Truth {
        self.0.get().1
    }
}

/// Common state of one simulated device.
struct Device {
    clock: SimClock,
    rng: StdRng,
    noise: Normal<f64>,
    dropout: Option<Window>,
}

impl Device {
    fn new(clock: &SimClock, seed: u64, std_dev: f64, dropout: Option<Window>) -> Result<Self> {
        Ok(Self {
            clock: clock.clone(),
            rng: StdRng::seed_from_u64(seed),
            noise: Normal::new(0.0, std_dev)
                .with_context(|| format!("invalid noise standard deviation {}", std_dev))?,
            dropout,
        })
    }

    /// Ground truth, or `None` while dropped out.
    fn truth(&self) -> Option<Truth> {
        let now = self.clock.now_ms();
        match self.dropout {
            Some(window) if window.contains(now) => None,
            _ => Some(self.clock.truth()),
        }
    }

    fn noise(&mut self) -> f64 {
        self.noise.sample(&mut self.rng)
    }

    fn noisy3(&mut self, base: [f32; 3]) -> [f32; 3] {
        base.map(|v| v + self.noise() as f32)
    }
}

pub struct SimBaro(Device);

impl Sensor for SimBaro {
    type Sample = BaroSample;

    fn read(&mut self) -> Option<BaroSample> {
        let truth = self.0.truth()?;
        let altitude = truth.altitude + self.0.noise();
        // International standard atmosphere up to the tropopause.
        let pressure = 101_325.0 * (1.0 - 2.255_77e-5 * altitude).powf(5.255_88);
        Some(BaroSample {
            altitude_m: altitude as f32,
            pressure_pa: pressure as f32,
            temperature_c: (15.0 - 0.0065 * altitude) as f32,
        })
    }
}

pub struct SimImu {
    device: Device,
    gyro_noise: Normal<f64>,
}

impl Sensor for SimImu {
    type Sample = ImuSample;

    fn read(&mut self) -> Option<ImuSample> {
        let truth = self.device.truth()?;
        let accel = self.device.noisy3([0.0, 0.0, truth.specific_force as f32]);
        // No attitude in the model: the airframe never rotates.
        let gyro = [(); 3].map(|_| self.gyro_noise.sample(&mut self.device.rng) as f32);
        Some(ImuSample { accel, gyro })
    }
}

pub struct SimMag(Device);

impl Sensor for SimMag {
    type Sample = MagSample;

    fn read(&mut self) -> Option<MagSample> {
        self.0.truth()?;
        Some(MagSample {
            field: self.0.noisy3(MAG_FIELD),
        })
    }
}

pub struct SimGps {
    device: Device,
    satellites: u8,
    fix_ms: Millis,
}

impl Sensor for SimGps {
    type Sample = GpsSample;

    fn read(&mut self) -> Option<GpsSample> {
        let truth = self.device.truth()?;
        if self.device.clock.now_ms() < self.fix_ms {
            // Receiver is up but still searching.
            return Some(GpsSample::NO_FIX);
        }
        let north = self.device.noise();
        let east = self.device.noise();
        Some(GpsSample {
            lat_deg: (SITE_LAT + north / METERS_PER_DEG) as f32,
            lon_deg: (SITE_LON + east / (METERS_PER_DEG * SITE_LAT.to_radians().cos())) as f32,
            alt_m: (truth.altitude + self.device.noise()) as f32,
            satellites: self.satellites,
        })
    }
}

pub type SimSuite = SensorSuite<SimBaro, SimImu, SimMag, SimGps>;

/// Builds the four simulated sensors, each with its own seeded noise stream.
pub fn sensor_suite(
    clock: &SimClock,
    noise: &NoiseConfig,
    dropout: &DropoutConfig,
    seed: u64,
) -> Result<SimSuite> {
    let baro = SimBaro(Device::new(
        clock,
        seed,
        noise.baro_alt_std,
        dropout.applies(SensorKind::Baro),
    )?);
    let imu = SimImu {
        device: Device::new(
            clock,
            seed.wrapping_add(1),
            noise.accel_std,
            dropout.applies(SensorKind::Imu),
        )?,
        gyro_noise: Normal::new(0.0, noise.gyro_std)
            .with_context(|| format!("invalid gyro noise {}", noise.gyro_std))?,
    };
    let mag = SimMag(Device::new(
        clock,
        seed.wrapping_add(2),
        noise.mag_std,
        dropout.applies(SensorKind::Mag),
    )?);
    let gps = SimGps {
        device: Device::new(
            clock,
            seed.wrapping_add(3),
            noise.gps_pos_std,
            dropout.applies(SensorKind::Gps),
        )?,
        satellites: noise.gps_satellites,
        fix_ms: noise.gps_fix_ms,
    };
    Ok(SensorSuite::new(baro, imu, mag, gps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(now_ms: Millis, altitude: f64) -> SimClock {
        let clock = SimClock::default();
        clock.set(
            now_ms,
            Truth {
                t: now_ms as f64 / 1000.0,
                altitude,
                velocity: 0.0,
                specific_force: 9.8,
            },
        );
        clock
    }

    #[test]
    fn test_noise_free_readings_match_truth() {
        let clock = clock_at(5_000, 250.0);
        let noise = NoiseConfig {
            baro_alt_std: 0.0,
            accel_std: 0.0,
            mag_std: 0.0,
            gps_pos_std: 0.0,
            ..Default::default()
        };
        let mut suite = sensor_suite(&clock, &noise, &DropoutConfig::default(), 7).unwrap();
        let snapshot = suite.sample();

        assert!(snapshot.baro_valid && snapshot.imu_valid && snapshot.gps_valid);
        assert_eq!(snapshot.baro.altitude_m, 250.0);
        assert!((snapshot.baro.pressure_pa - 98_357.0).abs() < 50.0);
        assert_eq!(snapshot.imu.accel[2], 9.8);
        assert_eq!(snapshot.gps.satellites, 8);
        assert!((snapshot.gps.lat_deg as f64 - SITE_LAT).abs() < 1e-4);
    }

    #[test]
    fn test_gps_has_no_fix_at_start() {
        let clock = clock_at(0, 250.0);
        let mut suite =
            sensor_suite(&clock, &NoiseConfig::default(), &DropoutConfig::default(), 7).unwrap();
        let snapshot = suite.sample();
        assert!(!snapshot.gps_valid);
        assert_eq!(snapshot.gps, GpsSample::NO_FIX);
    }

    #[test]
    fn test_dropout_window_fails_selected_sensors() {
        let clock = clock_at(0, 250.0);
        let dropout = DropoutConfig {
            sensors: vec![SensorKind::Baro, SensorKind::Mag],
            window: Some(Window {
                start_ms: 1_000,
                duration_ms: 500,
            }),
        };
        let mut suite = sensor_suite(&clock, &NoiseConfig::default(), &dropout, 7).unwrap();

        let before = suite.sample();
        assert!(before.baro_valid && before.mag_valid);

        clock.set(1_200, clock.truth());
        let during = suite.sample();
        assert!(!during.baro_valid && !during.mag_valid);
        assert!(during.imu_valid);

        clock.set(1_500, clock.truth());
        assert!(suite.sample().baro_valid);
        assert_eq!(suite.failures().baro, 1);
        assert_eq!(suite.failures().mag, 1);
    }

    #[test]
    fn test_same_seed_same_readings() {
        let clock = clock_at(2_000, 300.0);
        let mut a = sensor_suite(&clock, &NoiseConfig::default(), &DropoutConfig::default(), 99).unwrap();
        let mut b = sensor_suite(&clock, &NoiseConfig::default(), &DropoutConfig::default(), 99).unwrap();
        assert_eq!(a.sample(), b.sample());
    }
}
