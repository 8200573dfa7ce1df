// lib.rs
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod assembler;
pub mod flight;
pub mod framing;
pub mod log;
pub mod radio;
pub mod sensors;
pub mod state_machine;
pub mod telemetry;
pub mod types;

pub use assembler::TelemetryAssembler;
pub use flight::{FlightComputer, FlightConfig, PacketSink, TickReport};
pub use framing::*;
pub use self::log::{LogBuffer, LogEntry, Loggable, MAX_LOG_LINE_LEN};
pub use radio::{Payload, RadioRx, RadioTx, RxPacket, MAX_PAYLOAD_LEN};
pub use sensors::*;
pub use state_machine::*;
pub use telemetry::*;
pub use types::*;
