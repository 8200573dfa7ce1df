//! Vertical-only flight model standing in for the real vehicle.

use serde::{Deserialize, Serialize};

const DT: f64 = 0.001; // 1kHz physics
const H_SCALE: f64 = 8500.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    pub dry_mass: f64,        // kg
    pub propellant_mass: f64, // kg
    pub thrust: f64,          // N, constant over the burn
    pub burn_time: f64,       // s
    pub drag_coeff: f64,
    pub ref_area: f64,        // m²
    /// Cd·A of the recovery chute, deployed at apogee (m²).
    pub chute_cd_area: f64,
    pub gravity: f64,               // m/s²
    pub air_density_sea_level: f64, // kg/m³
    /// Launch site elevation above sea level (m).
    pub pad_altitude: f64,
    /// Time on the pad before ignition (s).
    pub launch_delay: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            dry_mass: 1.2,
            propellant_mass: 0.2,
            thrust: 120.0,
            burn_time: 1.6,
            drag_coeff: 0.5,
            ref_area: 0.0045,
            chute_cd_area: 0.6,
            gravity: 9.8,
            air_density_sea_level: 1.225,
            pad_altitude: 250.0,
            launch_delay: 2.0,
        }
    }
}

/// Ground truth at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Truth {
    pub t: f64,
    /// Altitude above sea level (m).
    pub altitude: f64,
    pub velocity: f64,
    /// What an ideal accelerometer on the long axis reads (m/s², ~g at rest).
    pub specific_force: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStage {
    OnPad,
    Burning,
    Coasting,
    UnderChute,
    Landed,
}

pub struct FlightSim {
    params: VehicleParams,
    t: f64,
    height: f64, // above the pad
    velocity: f64,
    specific_force: f64,
    stage: SimStage,
    apogee: f64,
}

impl FlightSim {
    pub fn new(params: VehicleParams) -> Self {
        let specific_force = params.gravity;
        Self {
            params,
            t: 0.0,
            height: 0.0,
            velocity: 0.0,
            specific_force,
            stage: SimStage::OnPad,
            apogee: 0.0,
        }
    }

    fn mass(&self) -> f64 {
        let burnt = ((self.t - self.params.launch_delay) / self.params.burn_time).clamp(0.0, 1.0);
        self.params.dry_mass + self.params.propellant_mass * (1.0 - burnt)
    }

    fn step(&mut self) {
        let p = &self.params;
        let since_ignition = self.t - p.launch_delay;

        self.stage = match self.stage {
            SimStage::OnPad if since_ignition >= 0.0 => SimStage::Burning,
            SimStage::Burning if since_ignition >= p.burn_time => SimStage::Coasting,
            SimStage::Coasting if self.velocity < 0.0 => SimStage::UnderChute,
            stage => stage,
        };

        let thrust = if self.stage == SimStage::Burning {
            p.thrust
        } else {
            0.0
        };
        let cd_area = match self.stage {
            SimStage::UnderChute => p.drag_coeff * p.ref_area + p.chute_cd_area,
            _ => p.drag_coeff * p.ref_area,
        };
        let rho = p.air_density_sea_level * (-(p.pad_altitude + self.height) / H_SCALE).exp();
        let drag = 0.5 * rho * cd_area * self.velocity * self.velocity.abs();

        let mass = self.mass();
        let specific_force = (thrust - drag) / mass;
        let accel = specific_force - p.gravity;

        match self.stage {
            // The rail holds the vehicle until thrust beats weight.
            SimStage::OnPad | SimStage::Landed => {
                self.velocity = 0.0;
                self.specific_force = p.gravity;
            }
            SimStage::Burning if self.height <= 0.0 && accel <= 0.0 => {
                self.specific_force = p.gravity;
            }
            _ => {
                self.velocity += accel * DT;
                self.height += self.velocity * DT;
                self.specific_force = specific_force;
                if self.height > self.apogee {
                    self.apogee = self.height;
                }
                if self.height <= 0.0 && self.velocity < 0.0 {
                    self.height = 0.0;
                    self.velocity = 0.0;
                    self.specific_force = p.gravity;
                    self.stage = SimStage::Landed;
                }
            }
        }
        self.t += DT;
    }

    /// Advances the model to `t` seconds.
    pub fn advance_to(&mut self, t: f64) -> Truth {
        while self.t + DT / 2.0 < t {
            self.step();
        }
        self.truth()
    }

    pub fn truth(&self) -> Truth {
        Truth {
            t: self.t,
            altitude: self.params.pad_altitude + self.height,
            velocity: self.velocity,
            specific_force: self.specific_force,
        }
    }

    pub fn stage(&self) -> SimStage {
        self.stage
    }

    /// Highest point reached so far, above the pad.
    pub fn apogee(&self) -> f64 {
        self.apogee
    }
}
