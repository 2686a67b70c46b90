//! Pulse-modulated sine voice
//!
//! A voice is split in two halves:
//! - [`ToneVoice`]: the control handle. Cheap to clone, safe to use from any
//!   thread. Publishes parameters and starts/stops the voice.
//! - [`VoiceRenderer`]: owned by the audio callback. Holds the oscillator
//!   phase and pulse state, which the control side never touches.
//!
//! Start/stop cross over as atomics. A start bumps a generation counter so
//! the renderer knows to reset its runtime state on the next callback.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::error::{AudioError, AudioResult};
use super::params::{param_channel, ParamReader, ParamUpdate, ParamWriter, PulseParameters};
use super::pulse::{phase_increment, PulseState};

/// Whether the output stream feeding the voices is currently running.
/// Shared by the engine and every voice it created.
#[derive(Debug, Clone, Default)]
pub struct OutputStatus(Arc<AtomicBool>);

impl OutputStatus {
    pub fn new(running: bool) -> Self {
        Self(Arc::new(AtomicBool::new(running)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.0.store(running, Ordering::SeqCst);
    }
}

/// State shared between the two halves of a voice
struct VoiceShared {
    name: String,
    is_running: AtomicBool,
    start_generation: AtomicU32,
    writer: Mutex<ParamWriter>,
    output: OutputStatus,
}

/// Control handle for one voice
#[derive(Clone)]
pub struct ToneVoice {
    shared: Arc<VoiceShared>,
}

impl ToneVoice {
    /// Create a stopped voice and the renderer that plays it.
    ///
    /// The renderer belongs in the audio callback; `output` tells the
    /// handle whether that callback is actually running.
    pub fn new(
        name: &str,
        initial: PulseParameters,
        sample_rate: u32,
        output: OutputStatus,
    ) -> (Self, VoiceRenderer) {
        let (writer, reader) = param_channel(initial);
        let shared = Arc::new(VoiceShared {
            name: name.to_string(),
            is_running: AtomicBool::new(false),
            start_generation: AtomicU32::new(0),
            writer: Mutex::new(writer),
            output,
        });

        let renderer = VoiceRenderer {
            shared: Arc::clone(&shared),
            reader,
            snapshot: initial.clamped(),
            pulse: PulseState::new(0.0),
            seen_generation: 0,
            sample_rate: sample_rate.max(1) as f64,
        };

        (Self { shared }, renderer)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Begin contributing to the mix. The pulse restarts in its "on" phase.
    ///
    /// Fails, leaving the voice stopped, if the output stream is not running.
    pub fn start(&self) -> AudioResult<()> {
        if self.is_running() {
            return Ok(());
        }
        if !self.shared.output.is_running() {
            log::warn!("Voice '{}': cannot start, output not running", self.shared.name);
            return Err(AudioError::OutputNotRunning);
        }

        // Generation first so a renderer that observes the running flag
        // also observes the new generation.
        self.shared.start_generation.fetch_add(1, Ordering::Release);
        self.shared.is_running.store(true, Ordering::Release);
        log::debug!("Voice '{}' started", self.shared.name);
        Ok(())
    }

    /// Stop contributing from the next callback on. Parameters are kept.
    pub fn stop(&self) {
        if self.shared.is_running.swap(false, Ordering::AcqRel) {
            log::debug!("Voice '{}' stopped", self.shared.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running.load(Ordering::Acquire)
    }

    /// Apply a partial update and publish the merged value as a whole
    pub fn update(&self, update: ParamUpdate) -> PulseParameters {
        if update.is_empty() {
            return self.params();
        }
        self.shared.writer.lock().update(&update)
    }

    /// Replace every parameter at once
    pub fn set(&self, params: PulseParameters) -> PulseParameters {
        self.shared.writer.lock().set(params)
    }

    /// Last published parameters
    pub fn params(&self) -> PulseParameters {
        self.shared.writer.lock().current()
    }
}

/// Render half of a voice. Never blocks, allocates, or fails.
pub struct VoiceRenderer {
    shared: Arc<VoiceShared>,
    reader: ParamReader,
    snapshot: PulseParameters,
    pulse: PulseState,
    seen_generation: u32,
    sample_rate: f64,
}

impl VoiceRenderer {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Parameters used by the most recent callback
    pub fn snapshot(&self) -> PulseParameters {
        self.snapshot
    }

    pub fn pulse(&self) -> &PulseState {
        &self.pulse
    }

    /// Add this voice's output for one buffer into `out`.
    ///
    /// `out` is interleaved with `channels` samples per frame, `now` is the
    /// wall-clock time of its first frame in seconds. Stopped voices add
    /// nothing. A non-finite sample is dropped, leaving silence.
    pub fn render_add(&mut self, now: f64, out: &mut [f32], channels: usize) {
        // One snapshot per callback, taken even while stopped so a restart
        // begins from the latest values.
        self.snapshot = self.reader.read();

        if channels == 0 || !self.shared.is_running.load(Ordering::Acquire) {
            return;
        }

        let generation = self.shared.start_generation.load(Ordering::Acquire);
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.pulse.reset(now);
        }

        let params = self.snapshot;
        self.pulse
            .advance(now, params.on_duration, params.off_duration);

        let (left_gain, right_gain) = params.channel_gains();
        let increment = phase_increment(params.frequency_hz, self.sample_rate);

        for (i, frame) in out.chunks_mut(channels).enumerate() {
            let t = now + i as f64 / self.sample_rate;
            let amplitude = self.pulse.envelope(t);
            let sine = self.pulse.next_sine(increment) * amplitude;

            let left = (sine * left_gain) as f32;
            let right = (sine * right_gain) as f32;
            if !left.is_finite() || !right.is_finite() {
                continue;
            }

            match frame {
                [l, r, ..] => {
                    *l += left;
                    *r += right;
                }
                [mono] => *mono += (left + right) * 0.5,
                [] => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    fn running_output() -> OutputStatus {
        OutputStatus::new(true)
    }

    fn steady(volume: f64, pan: f64) -> PulseParameters {
        PulseParameters {
            frequency_hz: 441.0,
            volume,
            pan,
            on_duration: 999_999.0,
            off_duration: 0.02,
        }
    }

    fn peak(buf: &[f32], channel: usize) -> f32 {
        buf.chunks(2).map(|f| f[channel].abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_stopped_voice_is_silent() {
        let (_voice, mut renderer) = ToneVoice::new("t", steady(1.0, 0.0), RATE, running_output());
        let mut buf = vec![0.0f32; 1024];
        renderer.render_add(0.0, &mut buf, 2);
        assert!(buf.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_start_fails_without_output() {
        let output = OutputStatus::new(false);
        let (voice, _renderer) = ToneVoice::new("t", steady(1.0, 0.0), RATE, output.clone());
        assert!(matches!(voice.start(), Err(AudioError::OutputNotRunning)));
        assert!(!voice.is_running());

        output.set_running(true);
        voice.start().unwrap();
        assert!(voice.is_running());
    }

    #[test]
    fn test_start_resets_runtime_state() {
        let (voice, mut renderer) = ToneVoice::new(
            "t",
            PulseParameters {
                on_duration: 0.05,
                off_duration: 0.05,
                ..steady(1.0, 0.0)
            },
            RATE,
            running_output(),
        );
        let mut buf = vec![0.0f32; 512 * 2];

        voice.start().unwrap();
        renderer.render_add(10.0, &mut buf, 2);
        assert!(renderer.pulse().is_on());
        assert_eq!(renderer.pulse().last_transition(), 10.0);

        // Run into the off leg, then restart
        renderer.render_add(10.06, &mut buf, 2);
        assert!(!renderer.pulse().is_on());
        voice.stop();
        voice.start().unwrap();
        renderer.render_add(20.0, &mut buf, 2);
        assert!(renderer.pulse().is_on());
        assert_eq!(renderer.pulse().last_transition(), 20.0);
        assert_eq!(renderer.pulse().elapsed_in_state(), 0.0);
    }

    #[test]
    fn test_transition_to_off_after_on_duration() {
        let (voice, mut renderer) = ToneVoice::new(
            "t",
            PulseParameters {
                on_duration: 0.05,
                off_duration: 0.2,
                ..steady(1.0, 0.0)
            },
            RATE,
            running_output(),
        );
        voice.start().unwrap();
        let mut buf = vec![0.0f32; 256 * 2];
        renderer.render_add(0.0, &mut buf, 2);
        renderer.render_add(0.03, &mut buf, 2);
        assert!(renderer.pulse().is_on());
        renderer.render_add(0.05, &mut buf, 2);
        assert!(!renderer.pulse().is_on());
    }

    #[test]
    fn test_pan_routes_to_one_side() {
        let (voice, mut renderer) = ToneVoice::new("t", steady(0.8, -1.0), RATE, running_output());
        voice.start().unwrap();

        let mut buf = vec![0.0f32; 2048 * 2];
        renderer.render_add(0.0, &mut buf, 2);
        assert!(peak(&buf, 0) > 0.7);
        assert_eq!(peak(&buf, 1), 0.0);

        voice.update(ParamUpdate::new().pan(1.0));
        buf.fill(0.0);
        renderer.render_add(1.0, &mut buf, 2);
        assert_eq!(peak(&buf, 0), 0.0);
        assert!(peak(&buf, 1) > 0.7);
    }

    #[test]
    fn test_attack_ramp_starts_from_silence() {
        let (voice, mut renderer) = ToneVoice::new("t", steady(1.0, 0.0), RATE, running_output());
        voice.start().unwrap();
        let mut buf = vec![0.0f32; 2048 * 2];
        renderer.render_add(0.0, &mut buf, 2);

        // First 10ms (441 frames) are inside the ramp
        let early = buf[..40 * 2].iter().map(|s| s.abs()).fold(0.0, f32::max);
        let late = buf[1000 * 2..].iter().map(|s| s.abs()).fold(0.0, f32::max);
        assert!(early < 0.1, "early peak {}", early);
        assert!(late > 0.9, "late peak {}", late);
    }

    #[test]
    fn test_mono_output_folds_channels() {
        let (voice, mut renderer) = ToneVoice::new("t", steady(1.0, -1.0), RATE, running_output());
        voice.start().unwrap();
        let mut buf = vec![0.0f32; 2048];
        renderer.render_add(0.0, &mut buf, 1);
        let p = buf[1000..].iter().map(|s| s.abs()).fold(0.0, f32::max);
        assert!(p > 0.45 && p <= 0.5 + 1e-6);
    }

    #[test]
    fn test_update_is_seen_whole_on_next_callback() {
        let (voice, mut renderer) = ToneVoice::new("t", steady(0.2, 0.0), RATE, running_output());
        voice.start().unwrap();
        let mut buf = vec![0.0f32; 64];
        renderer.render_add(0.0, &mut buf, 2);
        assert_eq!(renderer.snapshot().volume, 0.2);

        voice.update(ParamUpdate::new().frequency(600.0).volume(0.9).pan(0.5));
        renderer.render_add(0.01, &mut buf, 2);
        let seen = renderer.snapshot();
        assert_eq!(seen.frequency_hz, 600.0);
        assert_eq!(seen.volume, 0.9);
        assert_eq!(seen.pan, 0.5);
        assert_eq!(seen, voice.params());
    }

    #[test]
    fn test_out_of_range_frequency_does_not_silence_voice() {
        let (voice, mut renderer) = ToneVoice::new("t", steady(1.0, 0.0), RATE, running_output());
        voice.start().unwrap();
        let mut buf = vec![0.0f32; 2048 * 2];
        renderer.render_add(0.0, &mut buf, 2);

        voice.update(ParamUpdate::new().frequency(f64::MAX));
        voice.update(ParamUpdate::new().frequency(f64::INFINITY));
        buf.fill(0.0);
        renderer.render_add(0.5, &mut buf, 2);
        assert!(renderer.snapshot().frequency_hz.is_finite());
        assert!(renderer.pulse().phase().is_finite());

        voice.update(ParamUpdate::new().frequency(440.0));
        buf.fill(0.0);
        renderer.render_add(1.0, &mut buf, 2);
        assert_eq!(renderer.snapshot().frequency_hz, 440.0);
        assert!(peak(&buf, 0) > 0.9);
        assert!(peak(&buf, 1) > 0.9);
    }

    #[test]
    fn test_stop_keeps_parameters() {
        let (voice, _renderer) = ToneVoice::new("t", steady(0.2, 0.0), RATE, running_output());
        voice.start().unwrap();
        voice.update(ParamUpdate::new().volume(0.7));
        voice.stop();
        assert!(!voice.is_running());
        assert_eq!(voice.params().volume, 0.7);
    }
}
