//! Fixed-order mix of voice renderers into one interleaved buffer

use super::voice::VoiceRenderer;

/// Owns every voice renderer of an engine. Lives inside the audio callback.
pub struct Mixer {
    voices: Vec<VoiceRenderer>,
    channels: usize,
}

impl Mixer {
    pub fn new(channels: usize) -> Self {
        Self {
            voices: Vec::new(),
            channels,
        }
    }

    /// Register a renderer. Mixing order is registration order.
    pub fn add(&mut self, voice: VoiceRenderer) {
        self.voices.push(voice);
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn voices(&self) -> &[VoiceRenderer] {
        &self.voices
    }

    /// Render one buffer of any length. Output is a plain sum of running
    /// voices; values outside [-1, 1] are left for the device to clip.
    pub fn render(&mut self, now: f64, data: &mut [f32]) {
        data.fill(0.0);
        for voice in self.voices.iter_mut() {
            voice.render_add(now, data, self.channels);
        }
    }
}
