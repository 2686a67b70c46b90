//! The two telemetry-to-tone mapping rules
//!
//! Each rule turns one telemetry value into a [`ParamUpdate`]. Neither
//! touches a voice directly; the mapper pushes the result.

use serde::{Deserialize, Serialize};

use crate::audio::{ParamUpdate, PulseParameters};
use crate::telemetry::TelemetryFrame;

/// Duration long enough to never elapse during a flight
pub const EFFECTIVELY_INFINITE: f64 = 999_999.0;

/// Frame field feeding the vertical channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalSource {
    /// Pitch angle, degrees
    #[default]
    Pitch,
    /// Flight path angle, degrees
    FlightPath,
    /// Rate of climb, raw units
    RateOfClimb,
}

impl VerticalSource {
    pub fn read(&self, frame: &TelemetryFrame) -> f64 {
        match self {
            Self::Pitch => frame.pitch,
            Self::FlightPath => frame.flight_path,
            Self::RateOfClimb => frame.rate_of_climb,
        }
    }

    pub fn write(&self, frame: &mut TelemetryFrame, value: f64) {
        match self {
            Self::Pitch => frame.pitch = value,
            Self::FlightPath => frame.flight_path = value,
            Self::RateOfClimb => frame.rate_of_climb = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollConfig {
    pub enabled: bool,
    pub frequency_hz: f64,
    /// Bank angle at which volume reaches 1.0 and beeping begins
    pub max_angle_deg: f64,
    pub beep_on_sec: f64,
    pub beep_off_sec: f64,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency_hz: 360.0,
            max_angle_deg: 30.0,
            beep_on_sec: 0.05,
            beep_off_sec: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerticalConfig {
    pub enabled: bool,
    pub source: VerticalSource,
    /// Below this magnitude the channel is silent
    pub dead_zone: f64,
    /// At or above this magnitude the tone is continuous
    pub saturation: f64,
    /// Off time at the edge of the dead zone
    pub max_off_sec: f64,
    pub on_sec: f64,
    pub volume: f64,
    pub descend_hz: f64,
    pub climb_hz: f64,
}

impl Default for VerticalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: VerticalSource::Pitch,
            dead_zone: 1.0,
            saturation: 5.0,
            max_off_sec: 1.0,
            on_sec: 0.05,
            volume: 0.5,
            descend_hz: 300.0,
            climb_hz: 600.0,
        }
    }
}

/// Bank angle rule: loudness grows with angle, pan follows the side,
/// and a latch switches to fast beeping past the limit.
#[derive(Debug, Clone)]
pub struct RollChannel {
    config: RollConfig,
    beeping: bool,
}

impl RollChannel {
    pub fn new(config: RollConfig) -> Self {
        Self {
            config,
            beeping: false,
        }
    }

    pub fn config(&self) -> &RollConfig {
        &self.config
    }

    pub fn is_beeping(&self) -> bool {
        self.beeping
    }

    /// Steady, silent tone until the first angle arrives
    pub fn initial_params(&self) -> PulseParameters {
        PulseParameters {
            frequency_hz: self.config.frequency_hz,
            volume: 0.0,
            pan: 0.0,
            on_duration: EFFECTIVELY_INFINITE,
            off_duration: 0.0,
        }
    }

    /// Durations are only part of the update when the latch flips.
    pub fn map(&mut self, angle: f64) -> ParamUpdate {
        if !angle.is_finite() {
            return ParamUpdate::new();
        }

        let magnitude = angle.abs();
        let volume = (magnitude / self.config.max_angle_deg).min(1.0);
        let pan = if angle < 0.0 { -1.0 } else { 1.0 };
        let mut update = ParamUpdate::new().volume(volume).pan(pan);

        let beeping = magnitude >= self.config.max_angle_deg;
        if beeping != self.beeping {
            self.beeping = beeping;
            update = if beeping {
                update
                    .on_duration(self.config.beep_on_sec)
                    .off_duration(self.config.beep_off_sec)
            } else {
                update.on_duration(EFFECTIVELY_INFINITE).off_duration(0.0)
            };
        }
        update
    }
}

/// Vertical rule: the sign picks the pitch, the magnitude shortens the gap
/// between beeps.
#[derive(Debug, Clone)]
pub struct VerticalChannel {
    config: VerticalConfig,
}

impl VerticalChannel {
    pub fn new(config: VerticalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VerticalConfig {
        &self.config
    }

    /// Short beeps, silent until the value leaves the dead zone
    pub fn initial_params(&self) -> PulseParameters {
        PulseParameters {
            frequency_hz: self.config.climb_hz,
            volume: self.config.volume,
            pan: 0.0,
            on_duration: self.config.on_sec,
            off_duration: EFFECTIVELY_INFINITE,
        }
    }

    pub fn map(&self, rate: f64) -> ParamUpdate {
        if !rate.is_finite() {
            return ParamUpdate::new();
        }

        let frequency = if rate < 0.0 {
            self.config.descend_hz
        } else {
            self.config.climb_hz
        };

        ParamUpdate::new()
            .frequency(frequency)
            .volume(self.config.volume)
            .off_duration(self.off_duration(rate.abs()))
    }

    /// Off time for a magnitude: silent in the dead zone, continuous at
    /// saturation, linear in between.
    pub fn off_duration(&self, magnitude: f64) -> f64 {
        let VerticalConfig {
            dead_zone,
            saturation,
            max_off_sec,
            ..
        } = self.config;

        if magnitude < dead_zone {
            EFFECTIVELY_INFINITE
        } else if magnitude >= saturation {
            0.0
        } else {
            let normalized = (magnitude - dead_zone) / (saturation - dead_zone);
            max_off_sec * (1.0 - normalized)
        }
    }
}
