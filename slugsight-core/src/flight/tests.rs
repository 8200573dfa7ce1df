// flight/tests.rs
#[cfg(test)]
mod tests {
    use crate::flight::{FlightComputer, FlightConfig, PacketSink};
    use crate::framing::flight::SendOutcome;
    use crate::radio::RadioTx;
    use crate::sensors::{BaroSample, GpsSample, ImuSample, MagSample, Sensor, SensorSuite};
    use crate::state_machine::{PhaseTransition, TransitionObserver};
    use crate::telemetry::{decode_verified, RECORD_LEN};
    use crate::types::FlightPhase;
    use std::vec::Vec;

    /// Returns `value` until it is cleared.
    struct Fixed<T>(Option<T>);

    impl<T: Copy> Sensor for Fixed<T> {
        type Sample = T;

        fn read(&mut self) -> Option<T> {
            self.0
        }
    }

    #[derive(Default)]
    struct Radio {
        sent: Vec<Vec<u8>>,
    }

    impl RadioTx for Radio {
        fn send(&mut self, bytes: &[u8]) -> bool {
            self.sent.push(bytes.to_vec());
            true
        }
    }

    #[derive(Default)]
    struct Storage(Vec<Vec<u8>>);

    impl PacketSink for Storage {
        fn write(&mut self, record_bytes: &[u8]) {
            self.0.push(record_bytes.to_vec());
        }
    }

    #[derive(Default)]
    struct Events(Vec<PhaseTransition>);

    impl TransitionObserver for Events {
        fn on_transition(&mut self, event: &PhaseTransition) {
            self.0.push(*event);
        }
    }

    type Computer = FlightComputer<
        Fixed<BaroSample>,
        Fixed<ImuSample>,
        Fixed<MagSample>,
        Fixed<GpsSample>,
        Radio,
        Storage,
        Events,
    >;

    fn baro(altitude_m: f32) -> BaroSample {
        BaroSample {
            altitude_m,
            pressure_pa: 101_000.0,
            temperature_c: 20.0,
        }
    }

    fn imu(accel_z: f32) -> ImuSample {
        ImuSample {
            accel: [0.0, 0.0, accel_z],
            gyro: [0.0; 3],
        }
    }

    fn computer() -> Computer {
        let sensors = SensorSuite::new(
            Fixed(Some(baro(100.0))),
            Fixed(Some(imu(9.8))),
            Fixed(Some(MagSample {
                field: [20.0, 0.0, 40.0],
            })),
            Fixed(None),
        );
        FlightComputer::begin(
            sensors,
            Radio::default(),
            Storage::default(),
            Events::default(),
            FlightConfig::default(),
            100.0,
            0,
        )
        .unwrap()
    }

    fn set(c: &mut Computer, altitude: Option<f32>, accel_z: f32) {
        c.sensors_mut().baro.0 = altitude.map(baro);
        c.sensors_mut().imu.0 = Some(imu(accel_z));
    }

    #[test]
    fn test_every_tick_is_persisted_and_rate_limited_on_air() {
        let mut c = computer();
        for t in (0..1_000).step_by(20) {
            let report = c.tick(t);
            assert_eq!(report.record.phase, FlightPhase::Pad);
        }
        assert_eq!(c.sink().0.len(), 50);
        assert_eq!(c.framer_stats().sent, 10);
        assert_eq!(c.radio_mut().sent.len(), 10);
        assert!(c.sink().0.iter().all(|r| r.len() == RECORD_LEN));

        let stored: Vec<u16> = c
            .sink()
            .0
            .iter()
            .map(|b| decode_verified(b).unwrap().sequence)
            .collect();
        assert_eq!(stored, (0..50).collect::<Vec<u16>>());
    }

    #[test]
    fn test_full_flight_sequence() {
        let mut c = computer();
        let mut t = 0;
        let mut step = |c: &mut Computer, altitude: Option<f32>, accel: f32| {
            set(c, altitude, accel);
            let report = c.tick(t);
            t += 100;
            report
        };

        step(&mut c, Some(100.0), 9.8);
        let launch = step(&mut c, Some(100.5), 45.0);
        assert_eq!(launch.record.phase, FlightPhase::Boost);

        let mut altitude = 100.0;
        for _ in 0..10 {
            altitude += 20.0;
            step(&mut c, Some(altitude), 5.0);
        }
        assert_eq!(c.phase(), FlightPhase::Coast);

        for _ in 0..5 {
            altitude -= 5.0;
            step(&mut c, Some(altitude), -1.0);
        }
        assert_eq!(c.phase(), FlightPhase::Descent);

        for _ in 0..40 {
            step(&mut c, Some(110.0), 9.8);
        }
        assert_eq!(c.phase(), FlightPhase::Landed);

        let phases: Vec<(FlightPhase, FlightPhase)> =
            c.observer().0.iter().map(|e| (e.from, e.to)).collect();
        assert_eq!(
            phases,
            [
                (FlightPhase::Pad, FlightPhase::Boost),
                (FlightPhase::Boost, FlightPhase::Coast),
                (FlightPhase::Coast, FlightPhase::Descent),
                (FlightPhase::Descent, FlightPhase::Landed),
            ]
        );
        assert_eq!(c.classifier().max_altitude_agl(), 200.0);
    }

    #[test]
    fn test_failed_sensors_still_produce_records() {
        let mut c = computer();
        set(&mut c, None, 9.8);
        c.sensors_mut().imu.0 = None;

        let report = c.tick(0);
        assert_eq!(report.sensor_failures, 3);
        assert!(report.velocity.is_nan());
        assert_eq!(report.send, SendOutcome::Sent);
        assert!(!report.record.has_baro());
        assert!(!report.record.has_gps_fix());
        assert_eq!(report.record.accel, [0.0; 3]);
        assert_eq!(c.sensor_failures().total(), 3);
        assert_eq!(c.phase(), FlightPhase::Pad);
    }

    #[test]
    fn test_velocity_from_altitude_changes() {
        let mut c = computer();
        set(&mut c, Some(100.0), 9.8);
        assert!(c.tick(0).velocity.is_nan());
        set(&mut c, Some(110.0), 9.8);
        assert_eq!(c.tick(100).velocity, 100.0);
    }
}
