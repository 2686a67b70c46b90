//! Real-time tone engine
//!
//! Provides pulsed sine voices with:
//! - Non-blocking, tear-free parameter hand-off from the control thread
//! - Click-free pulse edges (10ms linear ramps)
//! - Linear pan law: the far channel attenuates, the near one holds
//! - A cpal output stream mixing all running voices

pub mod device;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod params;
pub mod pulse;
pub mod voice;

pub use device::{list_output_devices, open_output_device, AudioConfig, AudioDeviceInfo};
pub use engine::{AudioEngine, EngineState, Lifecycle, OutputStream};
pub use error::{AudioError, AudioResult};
pub use mixer::Mixer;
pub use params::{ParamUpdate, PulseParameters, MAX_FREQUENCY_HZ, MIN_PULSE_DURATION};
pub use voice::{OutputStatus, ToneVoice, VoiceRenderer};
