//! The flight-side tick loop body.
//!
//! One call to [`FlightComputer::tick`] samples the sensors, advances the
//! classifier, assembles and persists a record, and offers it to the radio.
//! Nothing in a tick can fail the loop; failures are counted and logged.

use crate::assembler::TelemetryAssembler;
use crate::framing::flight::{FlightFramer, FramerStats, SendOutcome};
use crate::radio::RadioTx;
use crate::sensors::{
    AltitudeRate, BaroSample, GpsSample, ImuSample, MagSample, Sensor, SensorFailures, SensorSuite,
};
use crate::state_machine::{
    ClassifierConfig, ClassifierInput, ConfigError, FlightClassifier, PhaseTransition,
    TransitionObserver,
};
use crate::telemetry::{encode, TelemetryRecord};
use crate::types::{FlightPhase, Millis};

/// Persistence collaborator (SD card, flash, host file).
pub trait PacketSink {
    /// Stores one encoded record. No acknowledgement is expected.
    fn write(&mut self, record_bytes: &[u8]);
}

impl PacketSink for () {
    fn write(&mut self, _record_bytes: &[u8]) {}
}

impl<P: PacketSink + ?Sized> PacketSink for &mut P {
    fn write(&mut self, record_bytes: &[u8]) {
        (**self).write(record_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct FlightConfig {
    pub classifier: ClassifierConfig,
    /// Minimum interval between radio transmissions.
    pub tx_cadence_ms: Millis,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            tx_cadence_ms: 100, // 10 Hz
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub record: TelemetryRecord,
    pub transition: Option<PhaseTransition>,
    pub send: SendOutcome,
    /// Vertical velocity fed to the classifier; NaN when unavailable.
    pub velocity: f32,
    /// Sensors that failed this tick.
    pub sensor_failures: u8,
}

pub struct FlightComputer<B, I, M, G, R, P, O> {
    sensors: SensorSuite<B, I, M, G>,
    classifier: FlightClassifier,
    rate: AltitudeRate,
    assembler: TelemetryAssembler,
    framer: FlightFramer,
    radio: R,
    sink: P,
    observer: O,
}

impl<B, I, M, G, R, P, O> FlightComputer<B, I, M, G, R, P, O>
where
    B: Sensor<Sample = BaroSample>,
    I: Sensor<Sample = ImuSample>,
    M: Sensor<Sample = MagSample>,
    G: Sensor<Sample = GpsSample>,
    R: RadioTx,
    P: PacketSink,
    O: TransitionObserver,
{
    /// Starts a session on the pad. `ground_altitude` is the barometric
    /// reference all landing decisions are made against.
    pub fn begin(
        sensors: SensorSuite<B, I, M, G>,
        radio: R,
        sink: P,
        observer: O,
        config: FlightConfig,
        ground_altitude: f32,
        now_ms: Millis,
    ) -> Result<Self, ConfigError> {
        let classifier = FlightClassifier::begin(config.classifier, ground_altitude, now_ms)?;
        crate::info!(
            "session started at {}ms, pad altitude {}m, tx every {}ms",
            now_ms,
            ground_altitude,
            config.tx_cadence_ms
        );
        Ok(Self {
            sensors,
            classifier,
            rate: AltitudeRate::new(),
            assembler: TelemetryAssembler::new(),
            framer: FlightFramer::new(config.tx_cadence_ms),
            radio,
            sink,
            observer,
        })
    }

    pub fn tick(&mut self, now_ms: Millis) -> TickReport {
        let failures_before = self.sensors.failures().total();
        let snapshot = self.sensors.sample();
        let sensor_failures = (self.sensors.failures().total() - failures_before) as u8;

        let altitude = snapshot.classifier_altitude();
        let velocity = self.rate.update(now_ms, altitude);
        let (phase, transition) = self.classifier.update(ClassifierInput {
            now_ms,
            accel_z: snapshot.classifier_accel_z(),
            altitude,
            velocity,
        });
        if let Some(event) = &transition {
            self.observer.on_transition(event);
        }

        let record = self.assembler.assemble(now_ms, phase, &snapshot);
        self.sink.write(&encode(&record));
        let send = self.framer.offer(now_ms, &record, &mut self.radio);

        TickReport {
            record,
            transition,
            send,
            velocity,
            sensor_failures,
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.classifier.phase()
    }

    pub fn classifier(&self) -> &FlightClassifier {
        &self.classifier
    }

    pub fn sensor_failures(&self) -> SensorFailures {
        self.sensors.failures()
    }

    pub fn framer_stats(&self) -> FramerStats {
        self.framer.stats()
    }

    pub fn sensors_mut(&mut self) -> &mut SensorSuite<B, I, M, G> {
        &mut self.sensors
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }
}

#[cfg(test)]
mod tests;
