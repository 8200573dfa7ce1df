//! Flight-side framer: rate-limits encoded records onto the radio.
//!
//! At most one send attempt per cadence interval. A busy radio means the
//! record is dropped, never queued, and the slot is still spent.

use crate::radio::RadioTx;
use crate::telemetry::{encode, TelemetryRecord};
use crate::types::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendOutcome {
    Sent,
    /// The cadence interval since the last attempt has not elapsed.
    NotDue,
    /// The previous packet was still on air; this record was skipped.
    Busy,
    /// The radio rejected the packet.
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramerStats {
    pub sent: u32,
    pub not_due: u32,
    pub busy: u32,
    pub failed: u32,
}

#[derive(Debug, Clone)]
pub struct FlightFramer {
    cadence_ms: Millis,
    last_attempt_ms: Option<Millis>,
    stats: FramerStats,
}

impl FlightFramer {
    pub const fn new(cadence_ms: Millis) -> Self {
        Self {
            cadence_ms,
            last_attempt_ms: None,
            stats: FramerStats {
                sent: 0,
                not_due: 0,
                busy: 0,
                failed: 0,
            },
        }
    }

    pub fn is_due(&self, now_ms: Millis) -> bool {
        match self.last_attempt_ms {
            Some(last) => now_ms.wrapping_sub(last) >= self.cadence_ms,
            None => true,
        }
    }

    /// Offers a sealed record for transmission at `now_ms`.
    pub fn offer<R: RadioTx>(
        &mut self,
        now_ms: Millis,
        record: &TelemetryRecord,
        radio: &mut R,
    ) -> SendOutcome {
        if !self.is_due(now_ms) {
            self.stats.not_due += 1;
            return SendOutcome::NotDue;
        }
        self.last_attempt_ms = Some(now_ms);

        if radio.is_busy() {
            self.stats.busy += 1;
            crate::debug!("radio busy, skipping record {}", record.sequence);
            return SendOutcome::Busy;
        }

        let bytes = encode(record);
        if radio.send(&bytes) {
            self.stats.sent += 1;
            SendOutcome::Sent
        } else {
            self.stats.failed += 1;
            crate::warn!("radio send failed for record {}", record.sequence);
            SendOutcome::Failed
        }
    }

    pub fn cadence_ms(&self) -> Millis {
        self.cadence_ms
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }
}
