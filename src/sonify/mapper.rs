//! Telemetry mapper: decoded frames in, voice parameter pushes out
//!
//! Single-writer. Drive it from one context (the frame-arrival loop);
//! callers with several telemetry sources must serialize access.

use crate::audio::{AudioResult, ParamUpdate, ToneVoice};
use crate::telemetry::TelemetryFrame;

use super::channels::{RollChannel, RollConfig, VerticalChannel, VerticalConfig};

pub struct TelemetryMapper {
    roll: RollChannel,
    vertical: VerticalChannel,
    roll_voice: ToneVoice,
    vertical_voice: ToneVoice,
    roll_enabled: bool,
    vertical_enabled: bool,
    last_roll: f64,
    previous_roll: f64,
    last_vertical: f64,
    previous_vertical: f64,
}

impl TelemetryMapper {
    /// Take ownership of the control side of two voices. Their parameters
    /// are reset to each channel's starting point. Both channels start
    /// disabled.
    pub fn new(
        roll_voice: ToneVoice,
        vertical_voice: ToneVoice,
        roll: RollConfig,
        vertical: VerticalConfig,
    ) -> Self {
        let roll = RollChannel::new(roll);
        let vertical = VerticalChannel::new(vertical);
        roll_voice.set(roll.initial_params());
        vertical_voice.set(vertical.initial_params());

        Self {
            roll,
            vertical,
            roll_voice,
            vertical_voice,
            roll_enabled: false,
            vertical_enabled: false,
            last_roll: 0.0,
            previous_roll: 0.0,
            last_vertical: 0.0,
            previous_vertical: 0.0,
        }
    }

    /// Record the frame's values and update every enabled channel.
    ///
    /// A voice that fails to start is left stopped and retried on the next
    /// frame.
    pub fn process_frame(&mut self, frame: &TelemetryFrame) {
        self.previous_roll = self.last_roll;
        self.last_roll = frame.roll;
        self.previous_vertical = self.last_vertical;
        self.last_vertical = self.vertical.config().source.read(frame);

        if self.roll_enabled {
            if let Err(e) = self.apply_roll() {
                log::debug!("Roll voice not started: {}", e);
            }
        }
        if self.vertical_enabled {
            if let Err(e) = self.apply_vertical() {
                log::debug!("Vertical voice not started: {}", e);
            }
        }
    }

    /// Enable the bank-angle channel and start its voice right away
    pub fn enable_roll(&mut self) -> AudioResult<()> {
        self.roll_enabled = true;
        log::info!("Roll sonification enabled");
        self.apply_roll()
    }

    pub fn disable_roll(&mut self) {
        self.roll_enabled = false;
        silence(&self.roll_voice);
        log::info!("Roll sonification disabled");
    }

    /// Enable the vertical channel and start its voice right away
    pub fn enable_vertical(&mut self) -> AudioResult<()> {
        self.vertical_enabled = true;
        log::info!("Vertical sonification enabled");
        self.apply_vertical()
    }

    pub fn disable_vertical(&mut self) {
        self.vertical_enabled = false;
        silence(&self.vertical_voice);
        log::info!("Vertical sonification disabled");
    }

    pub fn is_roll_enabled(&self) -> bool {
        self.roll_enabled
    }

    pub fn is_vertical_enabled(&self) -> bool {
        self.vertical_enabled
    }

    pub fn is_beeping(&self) -> bool {
        self.roll.is_beeping()
    }

    pub fn last_roll(&self) -> f64 {
        self.last_roll
    }

    pub fn previous_roll(&self) -> f64 {
        self.previous_roll
    }

    pub fn last_vertical(&self) -> f64 {
        self.last_vertical
    }

    pub fn previous_vertical(&self) -> f64 {
        self.previous_vertical
    }

    pub fn roll_voice(&self) -> &ToneVoice {
        &self.roll_voice
    }

    pub fn vertical_voice(&self) -> &ToneVoice {
        &self.vertical_voice
    }

    fn apply_roll(&mut self) -> AudioResult<()> {
        let update = self.roll.map(self.last_roll);
        self.roll_voice.update(update);
        ensure_started(&self.roll_voice)
    }

    fn apply_vertical(&mut self) -> AudioResult<()> {
        let update = self.vertical.map(self.last_vertical);
        self.vertical_voice.update(update);
        ensure_started(&self.vertical_voice)
    }
}

fn ensure_started(voice: &ToneVoice) -> AudioResult<()> {
    if voice.is_running() {
        return Ok(());
    }
    voice.start()
}

/// Stop a voice and zero its volume; the voice itself stays alive
fn silence(voice: &ToneVoice) {
    voice.stop();
    voice.update(ParamUpdate::new().volume(0.0));
}
