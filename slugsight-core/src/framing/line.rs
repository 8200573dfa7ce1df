//! Parser for the bridge's text protocol, used by downstream consumers.

use core::fmt;
use core::str::FromStr;

use crate::framing::ground::{Heartbeat, TransportFrame, HEARTBEAT_PREFIX, PACKET_PREFIX};
use crate::radio::MAX_PAYLOAD_LEN;
use crate::telemetry::hex::{decode_hex, HexError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeLine<'a> {
    Packet(TransportFrame),
    Heartbeat(Heartbeat),
    /// Banners, markers and anything else that is not a bridge record.
    Other(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Wrong number of comma-separated fields.
    Malformed,
    /// Field index (0-based, after the prefix) that is not a valid number.
    BadNumber(usize),
    BadHex(HexError),
    /// The length field disagrees with the hex payload.
    LengthMismatch { declared: usize, actual: usize },
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Malformed => f.write_str("malformed bridge line"),
            LineError::BadNumber(field) => write!(f, "field {} is not a number", field),
            LineError::BadHex(e) => write!(f, "bad hex payload: {:?}", e),
            LineError::LengthMismatch { declared, actual } => {
                write!(f, "declared {} payload bytes, found {}", declared, actual)
            }
        }
    }
}

impl core::error::Error for LineError {}

impl From<HexError> for LineError {
    fn from(e: HexError) -> Self {
        LineError::BadHex(e)
    }
}

fn number<T: FromStr>(fields: &[&str], index: usize) -> Result<T, LineError> {
    fields[index]
        .trim()
        .parse()
        .map_err(|_| LineError::BadNumber(index))
}

/// Classifies one line. Trailing `\r`/`\n` are ignored.
pub fn parse_line(line: &str) -> Result<BridgeLine<'_>, LineError> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix(PACKET_PREFIX) {
        let fields: heapless::Vec<&str, 5> = rest.splitn(5, ',').collect();
        if fields.len() != 5 {
            return Err(LineError::Malformed);
        }
        let arrival_seq = number(&fields, 0)?;
        let arrival_ms = number(&fields, 1)?;
        let declared: usize = number(&fields, 2)?;
        let rssi = number(&fields, 3)?;
        let payload = decode_hex::<MAX_PAYLOAD_LEN>(fields[4].trim())?;
        if payload.len() != declared {
            return Err(LineError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }
        return Ok(BridgeLine::Packet(TransportFrame {
            arrival_seq,
            arrival_ms,
            rssi,
            payload,
        }));
    }

    if let Some(rest) = line.strip_prefix(HEARTBEAT_PREFIX) {
        let fields: heapless::Vec<&str, 2> = rest.splitn(2, ',').collect();
        if fields.len() != 2 {
            return Err(LineError::Malformed);
        }
        return Ok(BridgeLine::Heartbeat(Heartbeat {
            now_ms: number(&fields, 0)?,
            total_packets: number(&fields, 1)?,
        }));
    }

    Ok(BridgeLine::Other(line))
}
