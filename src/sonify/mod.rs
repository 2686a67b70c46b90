//! Telemetry sonification: bank angle and vertical rate to tone parameters

pub mod channels;
pub mod mapper;

pub use channels::{
    RollChannel, RollConfig, VerticalChannel, VerticalConfig, VerticalSource, EFFECTIVELY_INFINITE,
};
pub use mapper::TelemetryMapper;
