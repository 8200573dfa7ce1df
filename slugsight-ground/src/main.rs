mod output;
mod session;
mod stats;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use output::{EventWriter, OutputFormat};
use session::{GroundSession, ValidationConfig};

#[derive(Parser, Debug)]
#[command(name = "slugsight-ground")]
#[command(about = "Decodes ground bridge output into a verified flight log")]
#[command(version)]
struct Args {
    /// Bridge capture to read (default: stdin)
    input: Option<PathBuf>,

    /// Flight log destination (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// JSON file with plausibility bounds; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Accept every verified record without plausibility checks
    #[arg(long)]
    no_range_check: bool,
}

fn load_validation(args: &Args) -> Result<ValidationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ValidationConfig::default(),
    };
    if args.no_range_check {
        config.enabled = false;
    }
    Ok(config)
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

/// Reads every line, writing each session event as it happens. Lines are
/// read as raw bytes so serial noise only costs the line it lands on.
fn run(
    mut input: impl BufRead,
    session: &mut GroundSession,
    out: &mut dyn EventWriter,
) -> Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = input
            .read_until(b'\n', &mut line)
            .context("reading bridge input")?;
        if read == 0 {
            break;
        }
        for event in session.ingest_bytes(&line) {
            out.write_event(&event).context("writing flight log")?;
        }
    }
    out.flush().context("flushing flight log")
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = GroundSession::new(load_validation(&args)?);
    let input = open_input(args.input.as_deref())?;
    let mut out = output::writer(args.format, open_output(args.output.as_deref())?)
        .context("writing flight log header")?;

    run(input, &mut session, out.as_mut())?;

    let stats = session.stats();
    eprintln!("=== session summary ===");
    eprint!("{}", stats);
    if stats.checksum_failures + stats.format_failures > 0 {
        log::warn!(
            "{} packets failed verification",
            stats.checksum_failures + stats.format_failures
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugsight_core::telemetry::hex::write_hex_upper;
    use slugsight_core::{encode, seal, FlightPhase, TelemetryRecord};

    fn capture() -> String {
        let mut text = String::from("---PACKET_START---\n");
        for (arrival, seq, phase) in [
            (1u32, 0u16, FlightPhase::Pad),
            (2, 1, FlightPhase::Pad),
            (3, 3, FlightPhase::Boost),
        ] {
            let bytes = encode(&seal(TelemetryRecord::empty(seq, u32::from(seq) * 100, phase)));
            let mut hex = String::new();
            write_hex_upper(&mut hex, &bytes).unwrap();
            text += &format!("PKT:{},{},{},-60,{}\n", arrival, arrival * 100, bytes.len(), hex);
        }
        text += "HB:9000,3\n";
        text
    }

    #[test]
    fn test_run_writes_csv_and_counts() {
        let mut session = GroundSession::default();
        let mut out = Vec::new();
        {
            let mut writer = output::CsvWriter::new(&mut out).unwrap();
            run(capture().as_bytes(), &mut session, &mut writer).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let tags: Vec<&str> = text
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(tags, ["T", "T", "T", "S", "HB"]);

        let stats = session.stats();
        assert_eq!(stats.lines, 5);
        assert_eq!(stats.decoded, 3);
        assert_eq!(stats.missing_records, 1);
        assert_eq!(stats.heartbeats, 1);
        assert_eq!(stats.per_phase[FlightPhase::Boost as usize], 1);
    }

    #[test]
    fn test_run_survives_serial_noise() {
        let mut capture = b"---PACKET_START---\nHB:5000,0\n".to_vec();
        capture.extend_from_slice(b"\xFF\xFEnoise\n");
        capture.extend_from_slice(b"HB:10000,0\n");

        let mut session = GroundSession::default();
        let mut out = Vec::new();
        {
            let mut writer = output::CsvWriter::new(&mut out).unwrap();
            run(capture.as_slice(), &mut session, &mut writer).unwrap();
        }
        let stats = session.stats();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.heartbeats, 2);
        assert_eq!(stats.malformed_lines, 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("HB,10000,0\n"));
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from(["slugsight-ground", "capture.txt", "-f", "jsonl", "--no-range-check"]);
        assert_eq!(args.input.as_deref(), Some(Path::new("capture.txt")));
        assert_eq!(args.format, OutputFormat::Jsonl);
        assert!(!load_validation(&args).unwrap().enabled);

        let args = Args::parse_from(["slugsight-ground"]);
        assert!(args.input.is_none());
        assert_eq!(args.format, OutputFormat::Csv);
        assert!(load_validation(&args).unwrap().enabled);
    }
}
