// telemetry/mod.rs
pub mod codec;
pub mod hex;
pub mod types;

pub use codec::*;
pub use types::*;
