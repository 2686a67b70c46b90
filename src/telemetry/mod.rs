//! Telemetry frame codec and synthetic source
//!
//! - Pure decoder for the fixed 67-byte frame
//! - Matching encoder
//! - Simulator emitting encoded frames at a fixed cadence

pub mod encode;
pub mod frame;
pub mod simulator;

pub use encode::encode;
pub use frame::{decode, DecodeError, TelemetryFrame, FRAME_LEN};
pub use simulator::FrameSimulator;
