use std::fmt;

use slugsight_core::FlightPhase;

/// Sequence numbers this far "behind" the last one are treated as stale
/// duplicates instead of a forward jump across the wrap.
const REORDER_WINDOW: u16 = u16::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    First,
    InOrder,
    /// `missing` records were skipped between the previous and this one.
    Gap { missing: u16 },
    /// Same or older sequence number than one already seen.
    Stale,
}

/// Follows the flight-side `u16` sequence across wraparound.
#[derive(Debug, Default, Clone)]
pub struct SequenceTracker {
    last: Option<u16>,
}

impl SequenceTracker {
    pub fn observe(&mut self, seq: u16) -> SequenceCheck {
        let Some(last) = self.last else {
            self.last = Some(seq);
            return SequenceCheck::First;
        };
        let ahead = seq.wrapping_sub(last);
        if ahead == 0 || ahead > REORDER_WINDOW {
            return SequenceCheck::Stale;
        }
        self.last = Some(seq);
        if ahead == 1 {
            SequenceCheck::InOrder
        } else {
            SequenceCheck::Gap { missing: ahead - 1 }
        }
    }
}

/// Counters for one ground session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub lines: u64,
    pub packets: u64,
    pub decoded: u64,
    pub checksum_failures: u64,
    pub format_failures: u64,
    pub malformed_lines: u64,
    pub gaps: u64,
    pub missing_records: u64,
    pub stale_records: u64,
    pub implausible_records: u64,
    pub heartbeats: u64,
    /// Bridge arrival count from the latest packet or heartbeat line.
    pub bridge_total: u32,
    pub per_phase: [u64; 5],
    pub rssi_min: Option<i16>,
    pub rssi_max: Option<i16>,
}

impl SessionStats {
    pub fn record_rssi(&mut self, rssi: i16) {
        self.rssi_min = Some(self.rssi_min.map_or(rssi, |m| m.min(rssi)));
        self.rssi_max = Some(self.rssi_max.map_or(rssi, |m| m.max(rssi)));
    }

    /// Fraction of flight-side records that reached the log.
    pub fn delivery_ratio(&self) -> Option<f64> {
        let expected = self.decoded + self.missing_records;
        (expected > 0).then(|| self.decoded as f64 / expected as f64)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lines read:          {}", self.lines)?;
        writeln!(f, "packets:             {}", self.packets)?;
        writeln!(f, "  decoded:           {}", self.decoded)?;
        writeln!(f, "  checksum failures: {}", self.checksum_failures)?;
        writeln!(f, "  format failures:   {}", self.format_failures)?;
        writeln!(f, "  stale/duplicate:   {}", self.stale_records)?;
        writeln!(f, "  implausible:       {}", self.implausible_records)?;
        writeln!(f, "malformed lines:     {}", self.malformed_lines)?;
        writeln!(
            f,
            "sequence gaps:       {} ({} records missing)",
            self.gaps, self.missing_records
        )?;
        if let Some(ratio) = self.delivery_ratio() {
            writeln!(f, "delivery:            {:.1}%", ratio * 100.0)?;
        }
        writeln!(f, "heartbeats:          {}", self.heartbeats)?;
        writeln!(f, "bridge total:        {}", self.bridge_total)?;
        if let (Some(min), Some(max)) = (self.rssi_min, self.rssi_max) {
            writeln!(f, "rssi:                {} .. {} dBm", min, max)?;
        }
        for phase in FlightPhase::ALL {
            writeln!(f, "  {:<8} {}", phase.name(), self.per_phase[phase as usize])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order_and_gaps() {
        let mut tracker = SequenceTracker::default();
        assert_eq!(tracker.observe(10), SequenceCheck::First);
        assert_eq!(tracker.observe(11), SequenceCheck::InOrder);
        assert_eq!(tracker.observe(15), SequenceCheck::Gap { missing: 3 });
        assert_eq!(tracker.observe(15), SequenceCheck::Stale);
        assert_eq!(tracker.observe(12), SequenceCheck::Stale);
        assert_eq!(tracker.observe(16), SequenceCheck::InOrder);
    }

    #[test]
    fn test_gap_across_wrap() {
        let mut tracker = SequenceTracker::default();
        tracker.observe(u16::MAX - 1);
        assert_eq!(tracker.observe(u16::MAX), SequenceCheck::InOrder);
        assert_eq!(tracker.observe(0), SequenceCheck::InOrder);
        // An older record straight after the wrap is not a forward jump.
        assert_eq!(tracker.observe(u16::MAX - 2), SequenceCheck::Stale);

        let mut tracker = SequenceTracker::default();
        tracker.observe(u16::MAX - 2);
        assert_eq!(tracker.observe(2), SequenceCheck::Gap { missing: 4 });
    }

    #[test]
    fn test_summary_mentions_every_phase() {
        let mut stats = SessionStats::default();
        stats.decoded = 9;
        stats.missing_records = 1;
        stats.per_phase[1] = 4;
        stats.record_rssi(-80);
        stats.record_rssi(-40);
        let text = stats.to_string();
        assert!(text.contains("delivery:            90.0%"));
        assert!(text.contains("rssi:                -80 .. -40 dBm"));
        assert!(text.contains("  BOOST    4"));
        assert!(text.contains("LANDED"));
    }
}
