//! Error types for the audio engine

use thiserror::Error;

pub type AudioResult<T> = Result<T, AudioError>;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default output device found")]
    NoOutputDevice,

    #[error("output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("failed to query output device: {0}")]
    DeviceQuery(String),

    #[error("failed to build output stream: {0}")]
    BuildStream(String),

    #[error("failed to start output stream: {0}")]
    PlayStream(String),

    /// The voice cannot start because nothing is consuming its samples
    #[error("audio output is not running")]
    OutputNotRunning,

    /// Voices must be created before the output stream is built
    #[error("audio engine already started; voices can no longer be added")]
    EngineAlreadyStarted,
}
