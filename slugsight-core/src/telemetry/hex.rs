// telemetry/hex.rs
use core::fmt::{self, Write};

use heapless::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    OddLength,
    /// Byte offset of the first character that is not a hex digit.
    InvalidDigit(usize),
    /// Decoded bytes do not fit the destination buffer.
    Overflow,
}

/// Writes `bytes` as uppercase hex, two characters per byte.
pub fn write_hex_upper<W: Write>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(out, "{:02X}", b)?;
    }
    Ok(())
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Decodes hex of either case into a bounded buffer.
pub fn decode_hex<const N: usize>(hex: &str) -> Result<Vec<u8, N>, HexError> {
    let raw = hex.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }

    let mut out = Vec::new();
    for (i, pair) in raw.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(HexError::InvalidDigit(i * 2))?;
        let lo = nibble(pair[1]).ok_or(HexError::InvalidDigit(i * 2 + 1))?;
        out.push((hi << 4) | lo).map_err(|_| HexError::Overflow)?;
    }
    Ok(out)
}
