//! Pulse parameters and their hand-off to the audio thread
//!
//! The control side pushes whole [`PulseParameters`] values into a ring
//! buffer; the render side drains it to the most recent value at the start
//! of each callback, using try_lock so it never waits. A reader can never
//! see a value that mixes fields from two different publishes.

use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shortest on/off duration accepted. Anything shorter clicks audibly.
pub const MIN_PULSE_DURATION: f64 = 0.02;

/// Highest tone frequency accepted
pub const MAX_FREQUENCY_HZ: f64 = 20_000.0;

/// Target parameters for one tone voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseParameters {
    pub frequency_hz: f64,
    /// 0.0 - 1.0
    pub volume: f64,
    /// -1.0 (full left) to 1.0 (full right)
    pub pan: f64,
    pub on_duration: f64,
    pub off_duration: f64,
}

impl Default for PulseParameters {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            volume: 0.5,
            pan: 0.0,
            on_duration: 0.5,
            off_duration: 0.5,
        }
    }
}

impl PulseParameters {
    /// Force every field into its legal range.
    pub fn clamped(self) -> Self {
        ParamUpdate::from(self).apply_to(Self::default())
    }

    /// Per-channel gains `(left, right)` for the current volume and pan
    #[inline]
    pub fn channel_gains(&self) -> (f64, f64) {
        let left = self.volume * (1.0 - self.pan.max(0.0));
        let right = self.volume * (1.0 + self.pan.min(0.0));
        (left, right)
    }
}

/// A partial parameter change. Fields left as `None` keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamUpdate {
    pub frequency_hz: Option<f64>,
    pub volume: Option<f64>,
    pub pan: Option<f64>,
    pub on_duration: Option<f64>,
    pub off_duration: Option<f64>,
}

impl ParamUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frequency(mut self, hz: f64) -> Self {
        self.frequency_hz = Some(hz);
        self
    }

    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn pan(mut self, pan: f64) -> Self {
        self.pan = Some(pan);
        self
    }

    pub fn on_duration(mut self, secs: f64) -> Self {
        self.on_duration = Some(secs);
        self
    }

    pub fn off_duration(mut self, secs: f64) -> Self {
        self.off_duration = Some(secs);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `base`, clamping each supplied value. Non-finite
    /// frequency, volume or pan is ignored, as is a NaN duration, so a bad
    /// sample can never reach the render thread. An infinite duration
    /// simply never elapses.
    pub fn apply_to(&self, base: PulseParameters) -> PulseParameters {
        let finite = |update: Option<f64>, current: f64| match update {
            Some(v) if v.is_finite() => v,
            _ => current,
        };
        let duration = |update: Option<f64>, current: f64| match update {
            Some(v) if !v.is_nan() => v,
            _ => current,
        };

        PulseParameters {
            frequency_hz: finite(self.frequency_hz, base.frequency_hz).clamp(0.0, MAX_FREQUENCY_HZ),
            volume: finite(self.volume, base.volume).clamp(0.0, 1.0),
            pan: finite(self.pan, base.pan).clamp(-1.0, 1.0),
            on_duration: duration(self.on_duration, base.on_duration).max(MIN_PULSE_DURATION),
            off_duration: duration(self.off_duration, base.off_duration).max(MIN_PULSE_DURATION),
        }
    }
}

impl From<PulseParameters> for ParamUpdate {
    fn from(p: PulseParameters) -> Self {
        Self {
            frequency_hz: Some(p.frequency_hz),
            volume: Some(p.volume),
            pan: Some(p.pan),
            on_duration: Some(p.on_duration),
            off_duration: Some(p.off_duration),
        }
    }
}

/// Pending updates held between two callbacks. Overflow drops the oldest.
const QUEUE_CAPACITY: usize = 16;

/// Control-side end of the hand-off. Keeps the last published value so
/// partial updates can be merged.
pub struct ParamWriter {
    queue: Arc<Mutex<HeapRb<PulseParameters>>>,
    current: PulseParameters,
}

/// Render-side end of the hand-off
pub struct ParamReader {
    queue: Arc<Mutex<HeapRb<PulseParameters>>>,
    latest: PulseParameters,
}

/// Create a connected writer/reader pair seeded with `initial` (clamped).
pub fn param_channel(initial: PulseParameters) -> (ParamWriter, ParamReader) {
    let initial = initial.clamped();
    let queue = Arc::new(Mutex::new(HeapRb::new(QUEUE_CAPACITY)));

    let writer = ParamWriter {
        queue: Arc::clone(&queue),
        current: initial,
    };
    let reader = ParamReader {
        queue,
        latest: initial,
    };
    (writer, reader)
}

impl ParamWriter {
    /// Merge `update` into the last published value and publish the result
    pub fn update(&mut self, update: &ParamUpdate) -> PulseParameters {
        let next = update.apply_to(self.current);
        self.publish(next);
        next
    }

    /// Replace every field at once
    pub fn set(&mut self, params: PulseParameters) -> PulseParameters {
        let next = params.clamped();
        self.publish(next);
        next
    }

    /// Last value handed to the reader
    pub fn current(&self) -> PulseParameters {
        self.current
    }

    fn publish(&mut self, params: PulseParameters) {
        // Values go in whole; a full queue loses its oldest entry, never
        // the newest.
        if self.queue.lock().push_overwrite(params).is_some() {
            log::trace!("Parameter queue full, oldest update replaced");
        }
        self.current = params;
    }
}

impl ParamReader {
    /// Latest complete value. Never blocks or allocates.
    ///
    /// If the writer holds the queue right now, the previous value is
    /// returned and the new one is picked up on the next call.
    #[inline]
    pub fn read(&mut self) -> PulseParameters {
        // CRITICAL: try_lock only, the audio thread must not wait
        if let Some(mut queue) = self.queue.try_lock() {
            while let Some(params) = queue.try_pop() {
                self.latest = params;
            }
        }
        self.latest
    }
}
