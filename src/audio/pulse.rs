//! Pulse on/off state machine and edge envelope
//!
//! Lives entirely on the render thread. Time is wall-clock seconds supplied
//! by the caller so the machine can be driven deterministically in tests.

use std::f64::consts::TAU;

/// Length of the linear fade at every pulse edge (10ms)
pub const EDGE_RAMP_SECS: f64 = 0.01;

/// Render-only runtime state of one voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseState {
    /// Oscillator phase in radians, kept in [0, 2π)
    phase: f64,
    pulse_on: bool,
    last_transition: f64,
    elapsed_in_state: f64,
}

impl PulseState {
    /// Fresh state: pulse on, phase zero, transition stamped at `now`
    pub fn new(now: f64) -> Self {
        Self {
            phase: 0.0,
            pulse_on: true,
            last_transition: now,
            elapsed_in_state: 0.0,
        }
    }

    pub fn reset(&mut self, now: f64) {
        *self = Self::new(now);
    }

    pub fn is_on(&self) -> bool {
        self.pulse_on
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn elapsed_in_state(&self) -> f64 {
        self.elapsed_in_state
    }

    pub fn last_transition(&self) -> f64 {
        self.last_transition
    }

    /// Advance the on/off machine to `now`. Returns true if it flipped.
    pub fn advance(&mut self, now: f64, on_duration: f64, off_duration: f64) -> bool {
        self.elapsed_in_state = (now - self.last_transition).max(0.0);

        let limit = if self.pulse_on {
            on_duration
        } else {
            off_duration
        };
        if self.elapsed_in_state >= limit {
            self.pulse_on = !self.pulse_on;
            self.last_transition = now;
            self.elapsed_in_state = 0.0;
            return true;
        }
        false
    }

    /// Amplitude envelope at time `t`: a linear ramp for the first
    /// [`EDGE_RAMP_SECS`] after a flip, flat 1 or 0 afterwards.
    #[inline]
    pub fn envelope(&self, t: f64) -> f64 {
        let since = (t - self.last_transition).max(0.0);
        let ramp = since / EDGE_RAMP_SECS;
        match (self.pulse_on, since < EDGE_RAMP_SECS) {
            (true, true) => ramp,
            (true, false) => 1.0,
            (false, true) => 1.0 - ramp,
            (false, false) => 0.0,
        }
    }

    /// Sine value at the current phase, then step the phase by `increment`.
    /// A non-finite step restarts the phase at zero.
    #[inline]
    pub fn next_sine(&mut self, increment: f64) -> f64 {
        let value = self.phase.sin();
        self.phase = (self.phase + increment).rem_euclid(TAU);
        if !self.phase.is_finite() {
            self.phase = 0.0;
        }
        value
    }
}

/// Per-sample phase increment in radians
#[inline]
pub fn phase_increment(frequency_hz: f64, sample_rate: f64) -> f64 {
    TAU * frequency_hz / sample_rate
}
