use core::fmt;

use crate::types::{FlightPhase, Millis, STANDARD_GRAVITY};

/// Per-airframe detection thresholds.
///
/// Defaults are tuned for a mid-power motor with ~1.5 s burn.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct ClassifierConfig {
    /// Vertical acceleration (m/s²) above which launch is declared.
    pub launch_accel: f32,
    /// Vertical acceleration (m/s²) below which the motor is considered burnt out.
    pub burnout_accel: f32,
    /// Minimum time in BOOST before burnout may be declared.
    pub min_boost_ms: Millis,
    /// Vertical velocity (m/s, negative = down) below which apogee has passed.
    pub apogee_velocity: f32,
    /// Height above the pad (m) below which landing may be declared.
    pub landing_altitude: f32,
    /// Allowed |accel - gravity| (m/s²) while resting on the ground.
    pub landing_accel_tolerance: f32,
    /// Landing conditions must hold continuously for this long.
    pub landing_stable_ms: Millis,
    /// Local gravity (m/s²) as seen by the accelerometer at rest.
    pub gravity: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            launch_accel: 20.0,    // ~2G
            burnout_accel: 15.0,   // back to ~1.5G
            min_boost_ms: 500,
            apogee_velocity: -2.0, // falling
            landing_altitude: 50.0,
            landing_accel_tolerance: 2.0,
            landing_stable_ms: 3000,
            gravity: STANDARD_GRAVITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A threshold is NaN or infinite.
    NonFinite(&'static str),
    /// A tolerance or altitude band is zero or negative.
    NotPositive(&'static str),
    /// Apogee velocity must point downward.
    ApogeeVelocityNotNegative,
    /// Burnout threshold above launch threshold would re-trigger immediately.
    BurnoutAboveLaunch,
    /// Pad altitude passed to `begin` is not finite.
    NonFiniteGroundAltitude,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonFinite(field) => write!(f, "{} is not finite", field),
            ConfigError::NotPositive(field) => write!(f, "{} must be positive", field),
            ConfigError::ApogeeVelocityNotNegative => f.write_str("apogee_velocity must be negative"),
            ConfigError::BurnoutAboveLaunch => {
                f.write_str("burnout_accel must not exceed launch_accel")
            }
            ConfigError::NonFiniteGroundAltitude => f.write_str("ground altitude is not finite"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("launch_accel", self.launch_accel),
            ("burnout_accel", self.burnout_accel),
            ("apogee_velocity", self.apogee_velocity),
            ("landing_altitude", self.landing_altitude),
            ("landing_accel_tolerance", self.landing_accel_tolerance),
            ("gravity", self.gravity),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if self.landing_altitude <= 0.0 {
            return Err(ConfigError::NotPositive("landing_altitude"));
        }
        if self.landing_accel_tolerance <= 0.0 {
            return Err(ConfigError::NotPositive("landing_accel_tolerance"));
        }
        if self.apogee_velocity >= 0.0 {
            return Err(ConfigError::ApogeeVelocityNotNegative);
        }
        if self.burnout_accel > self.launch_accel {
            return Err(ConfigError::BurnoutAboveLaunch);
        }
        Ok(())
    }
}

/// One sampling tick's worth of classifier input.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClassifierInput {
    pub now_ms: Millis,
    /// Vertical specific force (m/s², positive = up, ~gravity at rest).
    pub accel_z: f32,
    /// Barometric altitude (m), same datum as the pad altitude.
    pub altitude: f32,
    /// Vertical velocity (m/s, positive = up).
    pub velocity: f32,
}

/// Emitted once per phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseTransition {
    pub from: FlightPhase,
    pub to: FlightPhase,
    pub at_ms: Millis,
}

/// Subscriber for phase transitions. The classifier itself does no I/O.
pub trait TransitionObserver {
    fn on_transition(&mut self, event: &PhaseTransition);
}

impl TransitionObserver for () {
    fn on_transition(&mut self, _event: &PhaseTransition) {}
}

impl<T: TransitionObserver + ?Sized> TransitionObserver for &mut T {
    fn on_transition(&mut self, event: &PhaseTransition) {
        (**self).on_transition(event)
    }
}

/// Reports every transition through the crate logging macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransitionObserver for LogObserver {
    fn on_transition(&mut self, event: &PhaseTransition) {
        crate::info!(
            "State transition: {} -> {} at {}ms",
            event.from.name(),
            event.to.name(),
            event.at_ms
        );
    }
}

/// FlightClassifier owns the flight phase state machine.
///
/// Transitions are strictly ordered PAD -> BOOST -> COAST -> DESCENT -> LANDED,
/// at most one per `update`, and LANDED is terminal. The only way to reset
/// the machine is to build a new one with [`FlightClassifier::begin`].
#[derive(Debug, Clone)]
pub struct FlightClassifier {
    config: ClassifierConfig,
    phase: FlightPhase,
    /// Tick time the current phase was entered.
    phase_entered_ms: Millis,
    /// Ground reference captured at session start.
    pad_altitude: f32,
    /// Running peak of the barometric altitude.
    max_altitude: f32,
    launch_detected: bool,
    /// Start of the current uninterrupted run of landing conditions.
    landing_stable_since: Option<Millis>,
}

impl FlightClassifier {
    /// Starts a session on the pad at `ground_altitude`.
    pub fn begin(
        config: ClassifierConfig,
        ground_altitude: f32,
        now_ms: Millis,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if !ground_altitude.is_finite() {
            return Err(ConfigError::NonFiniteGroundAltitude);
        }
        Ok(Self {
            config,
            phase: FlightPhase::Pad,
            phase_entered_ms: now_ms,
            pad_altitude: ground_altitude,
            max_altitude: ground_altitude,
            launch_detected: false,
            landing_stable_since: None,
        })
    }

    /// Advances the state machine by one tick.
    ///
    /// Returns the phase after this tick and the transition taken, if any.
    pub fn update(&mut self, input: ClassifierInput) -> (FlightPhase, Option<PhaseTransition>) {
        let now = input.now_ms;

        let accel_ok = input.accel_z.is_finite();

        // --- 1. Peak Tracking ---
        if input.altitude.is_finite() && input.altitude > self.max_altitude {
            self.max_altitude = input.altitude;
        }

        // --- 2. Guard Evaluation ---
        // A non-finite input fails every guard it takes part in.
        let next = match self.phase {
            FlightPhase::Pad => {
                // No duration guard: launch latency costs flight data.
                (accel_ok && input.accel_z > self.config.launch_accel).then_some(FlightPhase::Boost)
            }
            FlightPhase::Boost => {
                let burned_long_enough = self.time_in_phase(now) >= self.config.min_boost_ms;
                let low_accel = accel_ok && input.accel_z < self.config.burnout_accel;
                (burned_long_enough && low_accel).then_some(FlightPhase::Coast)
            }
            FlightPhase::Coast => {
                let falling =
                    input.velocity.is_finite() && input.velocity < self.config.apogee_velocity;
                falling.then_some(FlightPhase::Descent)
            }
            FlightPhase::Descent => {
                if self.landing_conditions(&input) {
                    let since = *self.landing_stable_since.get_or_insert(now);
                    (now.wrapping_sub(since) >= self.config.landing_stable_ms)
                        .then_some(FlightPhase::Landed)
                } else {
                    // Stability must be contiguous; any dropout restarts the timer.
                    self.landing_stable_since = None;
                    None
                }
            }
            FlightPhase::Landed => None,
        };

        // --- 3. Transition ---
        let transition = next.map(|to| self.transition_to(to, now));
        (self.phase, transition)
    }

    fn landing_conditions(&self, input: &ClassifierInput) -> bool {
        if !(input.altitude.is_finite() && input.accel_z.is_finite()) {
            return false;
        }
        let height = input.altitude - self.pad_altitude;
        let accel_error = input.accel_z - self.config.gravity;
        let tolerance = self.config.landing_accel_tolerance;
        height < self.config.landing_altitude && accel_error < tolerance && accel_error > -tolerance
    }

    fn transition_to(&mut self, to: FlightPhase, now: Millis) -> PhaseTransition {
        debug_assert_eq!(self.phase.successor(), Some(to));
        let event = PhaseTransition {
            from: self.phase,
            to,
            at_ms: now,
        };
        if to == FlightPhase::Boost {
            self.launch_detected = true;
        }
        self.phase = to;
        self.phase_entered_ms = now;
        self.landing_stable_since = None;
        event
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn phase_entered_ms(&self) -> Millis {
        self.phase_entered_ms
    }

    pub fn time_in_phase(&self, now_ms: Millis) -> Millis {
        now_ms.wrapping_sub(self.phase_entered_ms)
    }

    pub fn max_altitude(&self) -> f32 {
        self.max_altitude
    }

    /// Peak height above the pad.
    pub fn max_altitude_agl(&self) -> f32 {
        self.max_altitude - self.pad_altitude
    }

    pub fn pad_altitude(&self) -> f32 {
        self.pad_altitude
    }

    pub fn launch_detected(&self) -> bool {
        self.launch_detected
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests;
