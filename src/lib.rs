pub mod audio;
pub mod config;
pub mod logging;
pub mod sonify;
pub mod telemetry;
pub mod transport;

pub use config::SonifierConfig;
