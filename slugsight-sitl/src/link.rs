//! Simulated radio link between the flight computer and the ground bridge.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use slugsight_core::{Millis, RadioRx, RadioTx, RxPacket};

use crate::hardware::{SimClock, Window};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Probability that a packet is lost on air.
    pub loss: f64,
    /// Time the transmitter stays busy after each send.
    pub air_time_ms: Millis,
    /// Horizontal distance from the pad to the ground station (m).
    pub range_m: f64,
    /// Ground station antenna elevation above sea level (m).
    pub station_altitude_m: f64,
    /// RSSI at 1 m (dBm).
    pub rssi_at_1m: f64,
    /// Nothing gets through during this window.
    pub blackout: Option<Window>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            loss: 0.02,
            air_time_ms: 60,
            range_m: 400.0,
            station_altitude_m: 250.0,
            rssi_at_1m: -30.0,
            blackout: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub offered: u32,
    pub lost: u32,
    pub delivered: u32,
}

struct Air {
    in_flight: VecDeque<RxPacket>,
    stats: LinkStats,
}

/// Creates the two ends of one link.
pub fn link(config: LinkConfig, clock: &SimClock, seed: u64) -> (LinkTx, LinkRx) {
    let air = Rc::new(RefCell::new(Air {
        in_flight: VecDeque::new(),
        stats: LinkStats::default(),
    }));
    let tx = LinkTx {
        config,
        clock: clock.clone(),
        rng: StdRng::seed_from_u64(seed),
        busy_until: None,
        air: air.clone(),
    };
    (tx, LinkRx { air })
}

pub struct LinkTx {
    config: LinkConfig,
    clock: SimClock,
    rng: StdRng,
    busy_until: Option<Millis>,
    air: Rc<RefCell<Air>>,
}

impl LinkTx {
    fn rssi(&self) -> i16 {
        let height = self.clock.truth().altitude - self.config.station_altitude_m;
        let distance = self.config.range_m.hypot(height).max(1.0);
        let rssi = self.config.rssi_at_1m - 20.0 * distance.log10();
        rssi.round().clamp(-140.0, 0.0) as i16
    }

    pub fn stats(&self) -> LinkStats {
        self.air.borrow().stats
    }
}

impl RadioTx for LinkTx {
    fn send(&mut self, bytes: &[u8]) -> bool {
        let now = self.clock.now_ms();
        let Some(packet) = RxPacket::new(bytes, self.rssi()) else {
            return false;
        };
        self.busy_until = Some(now.wrapping_add(self.config.air_time_ms));

        let blacked_out = self.config.blackout.is_some_and(|w| w.contains(now));
        let lost = blacked_out || self.rng.gen_bool(self.config.loss.clamp(0.0, 1.0));

        let mut air = self.air.borrow_mut();
        air.stats.offered += 1;
        if lost {
            air.stats.lost += 1;
        } else {
            air.in_flight.push_back(packet);
        }
        // The radio reports success once the packet is on air.
        true
    }

    fn is_busy(&self) -> bool {
        self.busy_until
            .is_some_and(|until| (until.wrapping_sub(self.clock.now_ms()) as i32) > 0)
    }
}

pub struct LinkRx {
    air: Rc<RefCell<Air>>,
}

impl RadioRx for LinkRx {
    fn try_receive(&mut self) -> Option<RxPacket> {
        let mut air = self.air.borrow_mut();
        let packet = air.in_flight.pop_front()?;
        air.stats.delivered += 1;
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Truth;

    fn clock() -> SimClock {
        let clock = SimClock::default();
        clock.set(
            0,
            Truth {
                altitude: 250.0,
                ..Default::default()
            },
        );
        clock
    }

    #[test]
    fn test_lossless_link_delivers_in_order() {
        let clock = clock();
        let config = LinkConfig {
            loss: 0.0,
            ..Default::default()
        };
        let (mut tx, mut rx) = link(config, &clock, 1);
        assert!(tx.send(&[1]));
        clock.set(100, clock.truth());
        assert!(tx.send(&[2]));

        assert_eq!(rx.try_receive().unwrap().payload.as_slice(), &[1]);
        assert_eq!(rx.try_receive().unwrap().payload.as_slice(), &[2]);
        assert!(rx.try_receive().is_none());
        assert_eq!(
            tx.stats(),
            LinkStats {
                offered: 2,
                lost: 0,
                delivered: 2
            }
        );
    }

    #[test]
    fn test_busy_during_air_time() {
        let clock = clock();
        let (mut tx, _rx) = link(LinkConfig::default(), &clock, 1);
        assert!(!tx.is_busy());
        tx.send(&[0; 71]);
        assert!(tx.is_busy());
        clock.set(59, clock.truth());
        assert!(tx.is_busy());
        clock.set(60, clock.truth());
        assert!(!tx.is_busy());
    }

    #[test]
    fn test_blackout_drops_everything() {
        let clock = clock();
        let config = LinkConfig {
            loss: 0.0,
            blackout: Some(Window {
                start_ms: 0,
                duration_ms: 1_000,
            }),
            ..Default::default()
        };
        let (mut tx, mut rx) = link(config, &clock, 1);
        tx.send(&[1]);
        assert!(rx.try_receive().is_none());
        clock.set(1_000, clock.truth());
        tx.send(&[2]);
        assert!(rx.try_receive().is_some());
        assert_eq!(tx.stats().lost, 1);
    }

    #[test]
    fn test_rssi_falls_with_distance() {
        let clock = clock();
        let (tx, _rx) = link(LinkConfig::default(), &clock, 1);
        let near = tx.rssi();
        clock.set(
            0,
            Truth {
                altitude: 3_000.0,
                ..Default::default()
            },
        );
        assert!(tx.rssi() < near);
        assert_eq!(near, -82);
    }
}
