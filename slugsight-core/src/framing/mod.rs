pub mod flight;
pub mod ground;
pub mod line;

pub use flight::{FlightFramer, FramerStats, SendOutcome};
pub use ground::{
    BridgeConfig, GroundBridge, GroundFramer, Heartbeat, LineSink, PollOutcome, TransportFrame,
};
pub use line::{parse_line, BridgeLine, LineError};
