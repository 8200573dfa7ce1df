// state_machine/tests.rs
#[cfg(test)]
mod tests {
    use crate::{
        ClassifierConfig, ClassifierInput, ConfigError, FlightClassifier, FlightPhase,
        PhaseTransition,
    };

    const G: f32 = 9.8;

    fn input(now_ms: u32, accel_z: f32, altitude: f32, velocity: f32) -> ClassifierInput {
        ClassifierInput {
            now_ms,
            accel_z,
            altitude,
            velocity,
        }
    }

    fn on_pad() -> FlightClassifier {
        FlightClassifier::begin(ClassifierConfig::default(), 0.0, 0).unwrap()
    }

    /// Drives a fresh classifier into DESCENT at t=600ms.
    fn in_descent() -> FlightClassifier {
        let mut sm = on_pad();
        sm.update(input(0, 25.0, 0.0, 0.0));
        sm.update(input(500, 5.0, 300.0, 80.0));
        sm.update(input(600, 0.0, 800.0, -5.0));
        assert_eq!(sm.phase(), FlightPhase::Descent);
        sm
    }

    #[test]
    fn test_initial_state() {
        let sm = on_pad();
        assert_eq!(sm.phase(), FlightPhase::Pad);
        assert!(!sm.launch_detected());
        assert_eq!(sm.max_altitude(), 0.0);
    }

    #[test]
    fn test_launch_on_first_tick() {
        let mut sm = on_pad();
        let (phase, transition) = sm.update(input(0, 25.0, 0.0, 0.0));
        assert_eq!(phase, FlightPhase::Boost);
        assert_eq!(
            transition,
            Some(PhaseTransition {
                from: FlightPhase::Pad,
                to: FlightPhase::Boost,
                at_ms: 0
            })
        );
        assert!(sm.launch_detected());
    }

    #[test]
    fn test_pad_ignores_rest_acceleration() {
        let mut sm = on_pad();
        for t in (0..10_000).step_by(100) {
            let (phase, transition) = sm.update(input(t, G, 0.0, 0.0));
            assert_eq!(phase, FlightPhase::Pad);
            assert!(transition.is_none());
        }
    }

    #[test]
    fn test_burnout_waits_for_min_boost_time() {
        let mut sm = on_pad();
        sm.update(input(0, 25.0, 0.0, 0.0));

        // Acceleration drops below burnout at t=200ms, well inside the burn window.
        for t in [200, 300, 400, 499] {
            let (phase, _) = sm.update(input(t, 10.0, 50.0, 60.0));
            assert_eq!(phase, FlightPhase::Boost, "left BOOST early at {}ms", t);
        }

        let (phase, transition) = sm.update(input(500, 10.0, 80.0, 60.0));
        assert_eq!(phase, FlightPhase::Coast);
        assert_eq!(transition.map(|t| t.at_ms), Some(500));
        assert_eq!(sm.phase_entered_ms(), 500);
    }

    #[test]
    fn test_burnout_needs_low_acceleration() {
        let mut sm = on_pad();
        sm.update(input(0, 25.0, 0.0, 0.0));
        let (phase, _) = sm.update(input(2_000, 30.0, 400.0, 150.0));
        assert_eq!(phase, FlightPhase::Boost);
    }

    #[test]
    fn test_apogee_detection() {
        let mut sm = on_pad();
        sm.update(input(0, 25.0, 0.0, 0.0));
        sm.update(input(500, 5.0, 300.0, 80.0));
        assert_eq!(sm.phase(), FlightPhase::Coast);

        // Slowing but still rising, then hovering within the noise band.
        assert_eq!(sm.update(input(600, -9.0, 900.0, 5.0)).0, FlightPhase::Coast);
        assert_eq!(sm.update(input(700, -9.0, 901.0, -1.5)).0, FlightPhase::Coast);
        assert_eq!(sm.update(input(800, -9.0, 899.0, -2.5)).0, FlightPhase::Descent);
        assert_eq!(sm.max_altitude(), 901.0);
    }

    #[test]
    fn test_landing_after_stable_window() {
        let mut sm = in_descent();

        // Still high up: no stability accumulates.
        for t in [700, 800, 900] {
            sm.update(input(t, G, 200.0, -6.0));
        }

        let mut landed_at = None;
        for t in (1_000..=4_000).step_by(100) {
            let (phase, transition) = sm.update(input(t, G + 0.5, 10.0, 0.0));
            if let Some(event) = transition {
                assert_eq!(event.to, FlightPhase::Landed);
                landed_at = Some(t);
                break;
            }
            assert_eq!(phase, FlightPhase::Descent);
        }
        assert_eq!(landed_at, Some(4_000));
    }

    #[test]
    fn test_landing_timer_restarts_on_dropout() {
        let mut sm = in_descent();

        let mut landed_at = None;
        for t in (1_000..=6_000).step_by(100) {
            // One spike out of tolerance at t=2000.
            let accel = if t == 2_000 { G + 5.0 } else { G };
            let (_, transition) = sm.update(input(t, accel, 10.0, 0.0));
            if transition.is_some() {
                landed_at = Some(t);
                break;
            }
        }
        let landed_at = landed_at.expect("never landed");
        assert!(landed_at >= 5_000, "landed at {}ms", landed_at);
        assert_eq!(landed_at, 5_100);
    }

    #[test]
    fn test_landing_needs_low_altitude() {
        let mut sm = in_descent();
        for t in (1_000..=10_000).step_by(100) {
            sm.update(input(t, G, 60.0, 0.0));
        }
        assert_eq!(sm.phase(), FlightPhase::Descent);
    }

    #[test]
    fn test_landed_is_terminal() {
        let mut sm = in_descent();
        for t in (1_000..=4_000).step_by(100) {
            sm.update(input(t, G, 0.0, 0.0));
        }
        assert_eq!(sm.phase(), FlightPhase::Landed);

        // A second "launch" must not move the machine.
        let (phase, transition) = sm.update(input(5_000, 40.0, 500.0, 100.0));
        assert_eq!(phase, FlightPhase::Landed);
        assert!(transition.is_none());
        // Peak tracking continues regardless of phase.
        assert_eq!(sm.max_altitude(), 800.0);
        let (_, _) = sm.update(input(5_100, G, 900.0, 0.0));
        assert_eq!(sm.max_altitude(), 900.0);
    }

    #[test]
    fn test_one_transition_per_tick() {
        let mut sm = on_pad();
        // Satisfies launch, burnout-by-accel and apogee at once.
        let (phase, _) = sm.update(input(0, 25.0, 0.0, -50.0));
        assert_eq!(phase, FlightPhase::Boost);

        // Past min boost time with a falling velocity: only COAST, not DESCENT.
        let (phase, _) = sm.update(input(600, 0.0, 10.0, -50.0));
        assert_eq!(phase, FlightPhase::Coast);
        let (phase, _) = sm.update(input(700, 0.0, 10.0, -50.0));
        assert_eq!(phase, FlightPhase::Descent);
    }

    #[test]
    fn test_non_finite_inputs_do_not_transition() {
        let mut sm = on_pad();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            sm.update(input(0, bad, bad, bad));
        }
        // +inf compares above any threshold but is not a valid reading.
        assert_eq!(sm.phase(), FlightPhase::Pad);
        assert_eq!(sm.max_altitude(), 0.0);

        let mut sm = on_pad();
        sm.update(input(0, f32::NAN, 0.0, 0.0));
        assert_eq!(sm.phase(), FlightPhase::Pad);
        sm.update(input(100, 25.0, f32::NAN, f32::NAN));
        assert_eq!(sm.phase(), FlightPhase::Boost);
        assert_eq!(sm.max_altitude(), 0.0);

        sm.update(input(700, f32::NAN, 100.0, 50.0));
        assert_eq!(sm.phase(), FlightPhase::Boost);
        sm.update(input(800, 0.0, 100.0, 50.0));
        assert_eq!(sm.phase(), FlightPhase::Coast);

        sm.update(input(900, 0.0, 100.0, f32::NAN));
        assert_eq!(sm.phase(), FlightPhase::Coast);
    }

    #[test]
    fn test_nan_breaks_landing_stability() {
        let mut sm = in_descent();
        let mut landed_at = None;
        for t in (1_000..=8_000).step_by(100) {
            let altitude = if t == 3_000 { f32::NAN } else { 5.0 };
            if sm.update(input(t, G, altitude, 0.0)).1.is_some() {
                landed_at = Some(t);
                break;
            }
        }
        assert_eq!(landed_at, Some(6_100));
    }

    #[test]
    fn test_phases_are_monotonic() {
        // Deterministic pseudo-random walk over the input space.
        let mut seed: u32 = 0x1234_5678;
        let mut next = move |lo: f32, hi: f32| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            lo + (hi - lo) * ((seed >> 8) as f32 / (1u32 << 24) as f32)
        };

        for _ in 0..20 {
            let mut sm = on_pad();
            let mut last = sm.phase();
            for tick in 0..2_000u32 {
                let sample = input(tick * 50, next(-20.0, 40.0), next(-10.0, 400.0), next(-30.0, 30.0));
                let (phase, transition) = sm.update(sample);
                assert!(phase >= last);
                if last == FlightPhase::Landed {
                    assert_eq!(phase, FlightPhase::Landed);
                }
                if let Some(event) = transition {
                    assert_eq!(event.from, last);
                    assert_eq!(last.successor(), Some(event.to));
                } else {
                    assert_eq!(phase, last);
                }
                last = phase;
            }
        }
    }

    #[test]
    fn test_time_in_phase_wraps() {
        let mut sm = FlightClassifier::begin(ClassifierConfig::default(), 12.0, u32::MAX - 99).unwrap();
        assert_eq!(sm.time_in_phase(100), 200);
        assert_eq!(sm.pad_altitude(), 12.0);

        // The burn window also spans the wrap.
        sm.update(input(u32::MAX - 99, 25.0, 12.0, 0.0));
        assert_eq!(sm.update(input(300, 0.0, 50.0, 20.0)).0, FlightPhase::Boost);
        assert_eq!(sm.update(input(400, 0.0, 60.0, 20.0)).0, FlightPhase::Coast);
        assert_eq!(sm.max_altitude_agl(), 48.0);
    }

    #[test]
    fn test_begin_rejects_bad_configuration() {
        let bad_ground = FlightClassifier::begin(ClassifierConfig::default(), f32::NAN, 0);
        assert_eq!(bad_ground.err(), Some(ConfigError::NonFiniteGroundAltitude));

        let mut config = ClassifierConfig::default();
        config.burnout_accel = 25.0;
        assert_eq!(config.validate(), Err(ConfigError::BurnoutAboveLaunch));

        let mut config = ClassifierConfig::default();
        config.apogee_velocity = 1.0;
        assert_eq!(config.validate(), Err(ConfigError::ApogeeVelocityNotNegative));

        let mut config = ClassifierConfig::default();
        config.gravity = f32::INFINITY;
        assert_eq!(config.validate(), Err(ConfigError::NonFinite("gravity")));

        let mut config = ClassifierConfig::default();
        config.landing_accel_tolerance = 0.0;
        assert!(FlightClassifier::begin(config, 0.0, 0).is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{ "launch_accel": 30.0, "landing_stable_ms": 5000 }"#).unwrap();
        assert_eq!(config.launch_accel, 30.0);
        assert_eq!(config.landing_stable_ms, 5000);
        assert_eq!(config.burnout_accel, ClassifierConfig::default().burnout_accel);
        assert!(config.validate().is_ok());
    }
}
