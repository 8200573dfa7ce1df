//! Ground-side bridge: wraps every received payload in a `PKT:` line and
//! emits `HB:` liveness lines while the link is silent.
//!
//! Payloads are forwarded as opaque bytes; nothing here decodes telemetry.

use core::fmt::{self, Write};

use crate::radio::{Payload, RadioRx, RxPacket};
use crate::telemetry::hex::write_hex_upper;
use crate::types::Millis;

/// Longest rendered line: a full 255-byte payload plus the numeric fields.
pub const MAX_LINE_LEN: usize = 576;

pub type Line = heapless::String<MAX_LINE_LEN>;

pub const PACKET_PREFIX: &str = "PKT:";
pub const HEARTBEAT_PREFIX: &str = "HB:";
/// Marker written once at bridge start, after which only bridge lines follow.
pub const START_MARKER: &str = "---PACKET_START---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct BridgeConfig {
    /// Silence (ms) after which a heartbeat is due.
    pub silence_window_ms: Millis,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            silence_window_ms: 5000,
        }
    }
}

/// One received radio packet plus its arrival metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportFrame {
    pub arrival_seq: u32,
    pub arrival_ms: Millis,
    pub rssi: i16,
    pub payload: Payload,
}

impl TransportFrame {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// `PKT:<seq>,<time>,<len>,<rssi>,<HEX>` without a line terminator.
    pub fn render(&self) -> Result<Line, fmt::Error> {
        let mut line = Line::new();
        write!(line, "{}", self)?;
        Ok(line)
    }
}

impl fmt::Display for TransportFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{},{},{},{},",
            PACKET_PREFIX,
            self.arrival_seq,
            self.arrival_ms,
            self.payload.len(),
            self.rssi
        )?;
        write_hex_upper(f, &self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Heartbeat {
    pub now_ms: Millis,
    pub total_packets: u32,
}

impl Heartbeat {
    /// `HB:<now>,<total>` without a line terminator.
    pub fn render(&self) -> Result<Line, fmt::Error> {
        let mut line = Line::new();
        write!(line, "{}", self)?;
        Ok(line)
    }
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{},{}", HEARTBEAT_PREFIX, self.now_ms, self.total_packets)
    }
}

/// Arrival bookkeeping for the bridge. Owns nothing but counters.
#[derive(Debug, Clone)]
pub struct GroundFramer {
    config: BridgeConfig,
    total_received: u32,
    /// Last packet arrival, or bridge start before the first packet.
    last_arrival_ms: Millis,
    last_heartbeat_ms: Option<Millis>,
}

impl GroundFramer {
    pub fn new(config: BridgeConfig, now_ms: Millis) -> Self {
        Self {
            config,
            total_received: 0,
            last_arrival_ms: now_ms,
            last_heartbeat_ms: None,
        }
    }

    /// Tags a received payload. Arrival sequence numbers start at 1.
    pub fn on_packet(&mut self, now_ms: Millis, payload: &Payload, rssi: i16) -> TransportFrame {
        self.total_received = self.total_received.wrapping_add(1);
        self.last_arrival_ms = now_ms;
        TransportFrame {
            arrival_seq: self.total_received,
            arrival_ms: now_ms,
            rssi,
            payload: payload.clone(),
        }
    }

    /// Returns a heartbeat if both the link and the heartbeat output have
    /// been quiet for a full silence window.
    pub fn poll_heartbeat(&mut self, now_ms: Millis) -> Option<Heartbeat> {
        let window = self.config.silence_window_ms;
        let link_silent = now_ms.wrapping_sub(self.last_arrival_ms) >= window;
        let heartbeat_quiet = self
            .last_heartbeat_ms
            .map_or(true, |last| now_ms.wrapping_sub(last) >= window);

        if link_silent && heartbeat_quiet {
            self.last_heartbeat_ms = Some(now_ms);
            Some(Heartbeat {
                now_ms,
                total_packets: self.total_received,
            })
        } else {
            None
        }
    }

    pub fn total_received(&self) -> u32 {
        self.total_received
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

/// Destination for rendered bridge lines (USB serial on hardware).
pub trait LineSink {
    /// Writes one complete line, terminator included. Fire-and-forget.
    fn write_line(&mut self, line: &str);
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line)
    }
}

/// What one `GroundBridge::poll` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollOutcome {
    Packet { arrival_seq: u32 },
    Heartbeat { total_packets: u32 },
    Idle,
}

/// Receive loop body: radio in, text lines out.
pub struct GroundBridge<R, S> {
    radio: R,
    sink: S,
    framer: GroundFramer,
}

impl<R: RadioRx, S: LineSink> GroundBridge<R, S> {
    /// Creates the bridge and writes the start marker.
    pub fn start(radio: R, sink: S, config: BridgeConfig, now_ms: Millis) -> Self {
        crate::info!("bridge listening, silence window {}ms", config.silence_window_ms);
        let mut bridge = Self {
            radio,
            sink,
            framer: GroundFramer::new(config, now_ms),
        };
        bridge.emit(&START_MARKER);
        bridge
    }

    /// Handles at most one received packet, then checks the heartbeat.
    pub fn poll(&mut self, now_ms: Millis) -> PollOutcome {
        if let Some(RxPacket { payload, rssi }) = self.radio.try_receive() {
            let frame = self.framer.on_packet(now_ms, &payload, rssi);
            self.emit(&frame);
            return PollOutcome::Packet {
                arrival_seq: frame.arrival_seq,
            };
        }

        match self.framer.poll_heartbeat(now_ms) {
            Some(heartbeat) => {
                self.emit(&heartbeat);
                PollOutcome::Heartbeat {
                    total_packets: heartbeat.total_packets,
                }
            }
            None => PollOutcome::Idle,
        }
    }

    fn emit<T: fmt::Display>(&mut self, item: &T) {
        let mut line = Line::new();
        // Every rendered line fits MAX_LINE_LEN; a failure here is a bug.
        if writeln!(line, "{}", item).is_err() {
            crate::error!("bridge line overflowed {} bytes", MAX_LINE_LEN);
            return;
        }
        self.sink.write_line(&line);
    }

    pub fn framer(&self) -> &GroundFramer {
        &self.framer
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
