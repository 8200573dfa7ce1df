// types.rs
use core::fmt;

/// Milliseconds since boot. Wraps after ~49 days; all differences use wrapping arithmetic.
pub type Millis = u32;

/// Standard gravity used when no airframe override is configured (m/s²).
pub const STANDARD_GRAVITY: f32 = 9.8;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightPhase {
    Pad = 0,     // On the rail, waiting for launch
    Boost = 1,   // Motor is burning, high acceleration
    Coast = 2,   // Motor out, gaining altitude via momentum
    Descent = 3, // Past apogee, falling under parachute
    Landed = 4,  // Back on the ground, terminal
}

impl FlightPhase {
    pub const ALL: [FlightPhase; 5] = [
        FlightPhase::Pad,
        FlightPhase::Boost,
        FlightPhase::Coast,
        FlightPhase::Descent,
        FlightPhase::Landed,
    ];

    /// Display name used on the wire-facing tooling and in logs.
    pub const fn name(self) -> &'static str {
        match self {
            FlightPhase::Pad => "PAD",
            FlightPhase::Boost => "BOOST",
            FlightPhase::Coast => "COAST",
            FlightPhase::Descent => "DESCENT",
            FlightPhase::Landed => "LANDED",
        }
    }

    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(FlightPhase::Pad),
            1 => Some(FlightPhase::Boost),
            2 => Some(FlightPhase::Coast),
            3 => Some(FlightPhase::Descent),
            4 => Some(FlightPhase::Landed),
            _ => None,
        }
    }

    /// The only phase reachable from `self`, or `None` once landed.
    pub const fn successor(self) -> Option<Self> {
        match self {
            FlightPhase::Pad => Some(FlightPhase::Boost),
            FlightPhase::Boost => Some(FlightPhase::Coast),
            FlightPhase::Coast => Some(FlightPhase::Descent),
            FlightPhase::Descent => Some(FlightPhase::Landed),
            FlightPhase::Landed => None,
        }
    }
}

impl TryFrom<u8> for FlightPhase {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_u8(raw).ok_or(raw)
    }
}

impl From<FlightPhase> for u8 {
    fn from(phase: FlightPhase) -> u8 {
        phase as u8
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a raw phase discriminant to its display name.
///
/// Out-of-range values map to `"UNKNOWN"`. A decoded record can never carry
/// such a value, so seeing `"UNKNOWN"` downstream means the bytes bypassed
/// the codec.
pub fn phase_name(raw: u8) -> &'static str {
    match FlightPhase::from_u8(raw) {
        Some(phase) => phase.name(),
        None => "UNKNOWN",
    }
}
