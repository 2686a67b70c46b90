//! Main audio engine using cpal for real-time audio output
//!
//! Lifecycle is explicit: create the engine, create its voices, start the
//! output stream, stop it, drop it. Voices are fixed once a stream has been
//! built. A failed build leaves the engine configurable so `start` can be
//! retried.

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use super::device::{native_stereo_config, open_output_device, AudioConfig};
use super::error::{AudioError, AudioResult};
use super::mixer::Mixer;
use super::params::PulseParameters;
use super::voice::{OutputStatus, ToneVoice};

/// Current state of the audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Accepting new voices, no stream yet
    Configuring,
    Running,
    Stopped,
}

/// The parts of an output stream the lifecycle drives
pub trait OutputStream {
    fn play(&self) -> AudioResult<()>;
    fn pause(&self) -> AudioResult<()>;
}

impl OutputStream for cpal::Stream {
    fn play(&self) -> AudioResult<()> {
        StreamTrait::play(self).map_err(|e| AudioError::PlayStream(e.to_string()))
    }

    fn pause(&self) -> AudioResult<()> {
        StreamTrait::pause(self).map_err(|e| AudioError::PlayStream(e.to_string()))
    }
}

/// Device-independent half of the engine: voices, mixer, stream state.
pub struct Lifecycle<S> {
    mixer: Arc<Mutex<Mixer>>,
    voices: Vec<ToneVoice>,
    output: OutputStatus,
    sample_rate: u32,
    stream: Option<S>,
}

impl<S: OutputStream> Lifecycle<S> {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(channels))),
            voices: Vec::new(),
            output: OutputStatus::new(false),
            sample_rate,
            stream: None,
        }
    }

    pub fn state(&self) -> EngineState {
        match (&self.stream, self.output.is_running()) {
            (None, _) => EngineState::Configuring,
            (Some(_), true) => EngineState::Running,
            (Some(_), false) => EngineState::Stopped,
        }
    }

    /// Liveness flag shared with every voice and the stream error callback
    pub fn output(&self) -> &OutputStatus {
        &self.output
    }

    pub fn create_voice(&mut self, name: &str, initial: PulseParameters) -> AudioResult<ToneVoice> {
        if self.stream.is_some() {
            return Err(AudioError::EngineAlreadyStarted);
        }
        let (voice, renderer) = ToneVoice::new(name, initial, self.sample_rate, self.output.clone());
        self.mixer.lock().add(renderer);
        self.voices.push(voice.clone());
        log::debug!("Created voice '{}'", name);
        Ok(voice)
    }

    /// Build the stream on first use, then play it. `build` receives the
    /// shared mixer; if it fails nothing is consumed and the next call
    /// builds again.
    pub fn start<F>(&mut self, build: F) -> AudioResult<()>
    where
        F: FnOnce(Arc<Mutex<Mixer>>) -> AudioResult<S>,
    {
        if self.stream.is_none() {
            self.stream = Some(build(Arc::clone(&self.mixer))?);
        }
        if let Some(stream) = &self.stream {
            stream.play()?;
        }
        self.output.set_running(true);
        log::info!("Audio engine started with {} voice(s)", self.voices.len());
        Ok(())
    }

    /// Stop every voice and pause the stream. Samples already handed to the
    /// device still play out.
    pub fn stop(&mut self) {
        for voice in &self.voices {
            voice.stop();
        }
        self.output.set_running(false);
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause output stream: {}", e);
            }
        }
        log::info!("Audio engine stopped");
    }
}

/// The main audio engine. Owns the output stream; not `Send` on every
/// platform, so keep it on the thread that created it and hand out
/// [`ToneVoice`] handles instead.
pub struct AudioEngine {
    device: cpal::Device,
    stream_config: cpal::StreamConfig,
    lifecycle: Lifecycle<cpal::Stream>,
}

impl AudioEngine {
    /// Open the configured output device. No audio flows until [`start`](Self::start).
    pub fn new(config: &AudioConfig) -> AudioResult<Self> {
        let device = open_output_device(config.device.as_deref())?;
        let stream_config = native_stereo_config(&device, config)?;

        log::info!(
            "Audio output: {} ({} Hz, {} channels)",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            stream_config.sample_rate.0,
            stream_config.channels
        );

        let lifecycle = Lifecycle::new(stream_config.sample_rate.0, stream_config.channels as usize);
        Ok(Self {
            device,
            stream_config,
            lifecycle,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.stream_config.channels
    }

    pub fn state(&self) -> EngineState {
        self.lifecycle.state()
    }

    /// Add a stopped voice. Only allowed until a stream has been built.
    pub fn create_voice(&mut self, name: &str, initial: PulseParameters) -> AudioResult<ToneVoice> {
        self.lifecycle.create_voice(name, initial)
    }

    /// Build (first successful call) or resume the output stream.
    pub fn start(&mut self) -> AudioResult<()> {
        let device = &self.device;
        let stream_config = &self.stream_config;
        let error_status = self.lifecycle.output().clone();
        self.lifecycle
            .start(|mixer| build_stream(device, stream_config, mixer, error_status))
    }

    pub fn stop(&mut self) {
        self.lifecycle.stop();
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if self.lifecycle.output().is_running() {
            self.stop();
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
    error_status: OutputStatus,
) -> AudioResult<cpal::Stream> {
    let epoch = Instant::now();

    device
        .build_output_stream(
            stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Never block the audio thread; the mixer is only contended
                // while voices are being created.
                match mixer.try_lock() {
                    Some(mut mixer) => mixer.render(epoch.elapsed().as_secs_f64(), data),
                    None => data.fill(0.0),
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    error_status.set_running(false);
                }
            },
            None, // No timeout
        )
        .map_err(|e| AudioError::BuildStream(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeStream {
        playing: Rc<Cell<bool>>,
        fail_play: bool,
    }

    impl OutputStream for FakeStream {
        fn play(&self) -> AudioResult<()> {
            if self.fail_play {
                return Err(AudioError::PlayStream("device busy".to_string()));
            }
            self.playing.set(true);
            Ok(())
        }

        fn pause(&self) -> AudioResult<()> {
            self.playing.set(false);
            Ok(())
        }
    }

    fn lifecycle() -> Lifecycle<FakeStream> {
        Lifecycle::new(48_000, 2)
    }

    #[test]
    fn test_configure_start_stop() {
        let mut engine = lifecycle();
        assert_eq!(engine.state(), EngineState::Configuring);
        let voice = engine.create_voice("roll", PulseParameters::default()).unwrap();
        assert!(voice.start().is_err());

        let playing = Rc::new(Cell::new(false));
        let stream = FakeStream {
            playing: Rc::clone(&playing),
            fail_play: false,
        };
        engine.start(move |mixer| {
            assert_eq!(mixer.lock().len(), 1);
            Ok(stream)
        })
        .unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert!(playing.get());
        voice.start().unwrap();

        assert!(matches!(
            engine.create_voice("late", PulseParameters::default()),
            Err(AudioError::EngineAlreadyStarted)
        ));

        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(!playing.get());
        assert!(!voice.is_running());
    }

    #[test]
    fn test_failed_build_can_be_retried() {
        let mut engine = lifecycle();
        engine.create_voice("roll", PulseParameters::default()).unwrap();

        let err = engine
            .start(|_| Err(AudioError::BuildStream("no device".to_string())))
            .unwrap_err();
        assert!(matches!(err, AudioError::BuildStream(_)));
        assert_eq!(engine.state(), EngineState::Configuring);

        // The error comes back again, not EngineAlreadyStarted
        let err = engine
            .start(|_| Err(AudioError::BuildStream("still no device".to_string())))
            .unwrap_err();
        assert!(matches!(err, AudioError::BuildStream(_)));

        // Voices survive the failures and can still be added
        engine.create_voice("vertical", PulseParameters::default()).unwrap();
        engine
            .start(|mixer| {
                assert_eq!(mixer.lock().len(), 2);
                Ok(FakeStream::default())
            })
            .unwrap();
        assert_eq!(engine.state(), EngineState::Running);
    }

    #[test]
    fn test_failed_play_keeps_stream() {
        let mut engine = lifecycle();
        let err = engine
            .start(|_| {
                Ok(FakeStream {
                    fail_play: true,
                    ..Default::default()
                })
            })
            .unwrap_err();
        assert!(matches!(err, AudioError::PlayStream(_)));
        assert_eq!(engine.state(), EngineState::Stopped);

        // Build is not repeated; the kept stream is played again
        let err = engine
            .start(|_| panic!("stream already built"))
            .unwrap_err();
        assert!(matches!(err, AudioError::PlayStream(_)));
    }

    #[test]
    fn test_mixer_renders_running_voices() {
        let mut engine = lifecycle();
        let voice = engine.create_voice("roll", PulseParameters::default()).unwrap();
        let mut shared = None;
        engine
            .start(|mixer| {
                shared = Some(mixer);
                Ok(FakeStream::default())
            })
            .unwrap();
        voice.start().unwrap();

        let mixer = shared.unwrap();
        let mut data = vec![0.0f32; 2048 * 2];
        mixer.lock().render(0.0, &mut data);
        assert!(data.iter().any(|&s| s.abs() > 0.1));
    }
}
