mod hardware;
mod link;
mod output;
mod sim;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use slugsight_core::{
    BridgeConfig, FlightComputer, FlightConfig, FlightPhase, GroundBridge, LineSink, LogEntry,
    Millis, PollOutcome,
};

use hardware::{DropoutConfig, NoiseConfig, SensorKind, SimClock, Window};
use link::LinkConfig;
use output::{CsvFlightLog, SessionObserver, WriterSink};
use sim::{FlightSim, SimStage, VehicleParams};

const CALIBRATION_SAMPLES: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "slugsight-sitl")]
#[command(about = "Flies the flight computer and ground bridge against a simulated rocket")]
#[command(version)]
struct Args {
    /// JSON run configuration; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bridge line output (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CSV flight log written by the flight computer's persistence sink
    #[arg(long)]
    flight_log: Option<PathBuf>,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Stop after this much simulated time (s)
    #[arg(long, default_value_t = 300.0)]
    max_time: f64,

    /// Keep running this long after touchdown (s)
    #[arg(long, default_value_t = 10.0)]
    after_landing: f64,

    /// Override the packet loss probability
    #[arg(long)]
    loss: Option<f64>,

    /// Sensors to fail during the dropout window
    #[arg(long, value_enum, value_delimiter = ',')]
    dropout: Vec<SensorKind>,

    #[arg(long, default_value_t = 0)]
    dropout_start_ms: Millis,

    #[arg(long, default_value_t = 0)]
    dropout_ms: Millis,

    /// Pace the loop to wall-clock time
    #[arg(long)]
    realtime: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SitlConfig {
    /// Flight computer loop period.
    tick_ms: Millis,
    vehicle: VehicleParams,
    noise: NoiseConfig,
    dropout: DropoutConfig,
    link: LinkConfig,
    flight: FlightConfig,
    bridge: BridgeConfig,
}

impl Default for SitlConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            vehicle: VehicleParams::default(),
            noise: NoiseConfig::default(),
            dropout: DropoutConfig::default(),
            link: LinkConfig::default(),
            flight: FlightConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SitlConfig> {
    let Some(path) = path else {
        return Ok(SitlConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn apply_args(config: &mut SitlConfig, args: &Args) -> Result<()> {
    if let Some(loss) = args.loss {
        config.link.loss = loss;
    }
    if !args.dropout.is_empty() {
        config.dropout = DropoutConfig {
            sensors: args.dropout.clone(),
            window: Some(Window {
                start_ms: args.dropout_start_ms,
                duration_ms: args.dropout_ms,
            }),
        };
    }
    if !(0.0..=1.0).contains(&config.link.loss) {
        bail!("packet loss must be within 0..=1, got {}", config.link.loss);
    }
    if config.tick_ms == 0 {
        bail!("tick_ms must be positive");
    }
    config.flight.classifier.validate()?;
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    apply_args(&mut config, &args)?;
    log::debug!("run configuration: {:?}", config);

    let mut sim = FlightSim::new(config.vehicle.clone());
    let clock = SimClock::default();
    let mut now: Millis = 0;
    let tick_s = config.tick_ms as f64 / 1000.0;
    clock.set(now, sim.truth());

    let mut sensors = hardware::sensor_suite(&clock, &config.noise, &config.dropout, args.seed)?;

    log::info!("SITL active. Calibrating ground level...");
    let mut alt_sum = 0.0;
    let mut calibration_samples = 0;
    for _ in 0..CALIBRATION_SAMPLES {
        let snapshot = sensors.sample();
        if snapshot.baro_valid {
            alt_sum += snapshot.baro.altitude_m;
            calibration_samples += 1;
        }
        now += config.tick_ms;
        clock.set(now, sim.advance_to(now as f64 / 1000.0));
    }
    if calibration_samples == 0 {
        bail!("barometer produced no valid sample during calibration");
    }
    let ground_level = alt_sum / calibration_samples as f32;
    log::info!("Calibration complete: {:.1}m. Ready for launch!", ground_level);

    let (tx, rx) = link::link(config.link.clone(), &clock, args.seed.wrapping_add(100));
    let flight_log = match &args.flight_log {
        Some(path) => Some(CsvFlightLog::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ))?),
        None => None,
    };
    let mut computer = FlightComputer::begin(
        sensors,
        tx,
        OptionalLog(flight_log),
        SessionObserver::default(),
        config.flight,
        ground_level,
        now,
    )?;
    let mut bridge = GroundBridge::start(
        rx,
        WriterSink::new(open_output(args.output.as_deref())?),
        config.bridge,
        now,
    );

    let mut landed_at: Option<f64> = None;
    let mut peak_velocity: f64 = 0.0;
    loop {
        let truth = sim.advance_to(now as f64 / 1000.0);
        clock.set(now, truth);
        peak_velocity = peak_velocity.max(truth.velocity);

        let report = computer.tick(now);
        if let (Some(event), Some(log)) = (report.transition, computer.sink_mut().0.as_mut()) {
            log.log(&LogEntry::Transition(event));
        }

        // Drain everything that arrived this tick.
        loop {
            match bridge.poll(now) {
                PollOutcome::Packet { .. } => continue,
                PollOutcome::Heartbeat { total_packets } => {
                    log::debug!("heartbeat with {} packets received", total_packets);
                    break;
                }
                PollOutcome::Idle => break,
            }
        }

        if sim.stage() == SimStage::Landed && landed_at.is_none() {
            landed_at = Some(truth.t);
        }
        let done = landed_at.is_some_and(|t| truth.t >= t + args.after_landing);
        if done || truth.t >= args.max_time {
            break;
        }

        now = now.wrapping_add(config.tick_ms);
        if args.realtime {
            sleep(Duration::from_secs_f64(tick_s));
        }
    }

    bridge.sink_mut().flush().context("flushing bridge output")?;
    if let Some(log) = computer.sink_mut().0.as_mut() {
        log.flush().context("flushing flight log")?;
        log::info!("flight log: {} rows, {} rejected", log.rows(), log.rejected());
    }
    log::info!("bridge wrote {} lines", bridge.sink().lines());
    let link = computer.radio_mut().stats();
    log::info!(
        "link: {} offered, {} lost, {} delivered; true peak velocity {:.1}m/s",
        link.offered,
        link.lost,
        link.delivered,
        peak_velocity
    );
    summarize(&computer, &bridge, &sim);
    Ok(())
}

/// The flight log is optional; without one records are not persisted.
struct OptionalLog<W: Write>(Option<CsvFlightLog<W>>);

impl<W: Write> slugsight_core::PacketSink for OptionalLog<W> {
    fn write(&mut self, record_bytes: &[u8]) {
        if let Some(log) = self.0.as_mut() {
            log.write(record_bytes);
        }
    }
}

fn summarize<R, P, S: LineSink>(
    computer: &FlightComputer<
        hardware::SimBaro,
        hardware::SimImu,
        hardware::SimMag,
        hardware::SimGps,
        R,
        P,
        SessionObserver,
    >,
    bridge: &GroundBridge<link::LinkRx, S>,
    sim: &FlightSim,
) where
    R: slugsight_core::RadioTx,
    P: slugsight_core::PacketSink,
{
    let classifier = computer.classifier();
    log::info!("=== SITL summary ===");
    log::info!(
        "true apogee {:.1}m, detected peak {:.1}m AGL",
        sim.apogee(),
        classifier.max_altitude_agl()
    );
    for event in &computer.observer().transitions {
        log::info!("  {:>8}ms  {} -> {}", event.at_ms, event.from, event.to);
    }
    if classifier.phase() != FlightPhase::Landed {
        log::warn!("run ended in {}", classifier.phase());
    }
    let stats = computer.framer_stats();
    log::info!(
        "radio: {} sent, {} busy, {} failed; bridge received {}",
        stats.sent,
        stats.busy,
        stats.failed,
        bridge.framer().total_received()
    );
    let failures = computer.sensor_failures();
    log::info!(
        "sensor failures: baro {}, imu {}, mag {}, gps {}",
        failures.baro,
        failures.imu,
        failures.mag,
        failures.gps
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_config() {
        let config: SitlConfig = serde_json::from_str(
            r#"{ "tick_ms": 20, "link": { "loss": 0.5 }, "flight": { "tx_cadence_ms": 200 } }"#,
        )
        .unwrap();
        assert_eq!(config.tick_ms, 20);
        assert_eq!(config.link.loss, 0.5);
        assert_eq!(config.link.air_time_ms, LinkConfig::default().air_time_ms);
        assert_eq!(config.flight.tx_cadence_ms, 200);
        assert_eq!(config.bridge.silence_window_ms, 5000);
    }

    #[test]
    fn test_args_override_and_validate() {
        let args = Args::parse_from([
            "slugsight-sitl",
            "--loss",
            "0.1",
            "--dropout",
            "baro,imu",
            "--dropout-start-ms",
            "3000",
            "--dropout-ms",
            "400",
        ]);
        let mut config = SitlConfig::default();
        apply_args(&mut config, &args).unwrap();
        assert_eq!(config.link.loss, 0.1);
        assert_eq!(config.dropout.sensors, [SensorKind::Baro, SensorKind::Imu]);
        assert_eq!(
            config.dropout.window,
            Some(Window {
                start_ms: 3000,
                duration_ms: 400
            })
        );

        let args = Args::parse_from(["slugsight-sitl", "--loss", "1.5"]);
        assert!(apply_args(&mut SitlConfig::default(), &args).is_err());
    }
}
