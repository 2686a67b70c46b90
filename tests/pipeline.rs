//! Frame bytes in, rendered samples out, without an audio device.

use flight_sonifier::audio::{Mixer, OutputStatus, ToneVoice};
use flight_sonifier::sonify::{
    RollChannel, RollConfig, TelemetryMapper, VerticalChannel, VerticalConfig, VerticalSource,
    EFFECTIVELY_INFINITE,
};
use flight_sonifier::telemetry::{decode, DecodeError, FrameSimulator};

const RATE: u32 = 44_100;
const BLOCK: usize = 1024;

struct Pipeline {
    simulator: FrameSimulator,
    mapper: TelemetryMapper,
    mixer: Mixer,
}

impl Pipeline {
    fn new(source: VerticalSource) -> Self {
        let roll_config = RollConfig::default();
        let vertical_config = VerticalConfig {
            source,
            ..VerticalConfig::default()
        };

        let output = OutputStatus::new(true);
        let (roll, roll_r) = ToneVoice::new(
            "roll",
            RollChannel::new(roll_config.clone()).initial_params(),
            RATE,
            output.clone(),
        );
        let (vertical, vertical_r) = ToneVoice::new(
            "vertical",
            VerticalChannel::new(vertical_config.clone()).initial_params(),
            RATE,
            output,
        );
        let mut mixer = Mixer::new(2);
        mixer.add(roll_r);
        mixer.add(vertical_r);

        let mut mapper = TelemetryMapper::new(roll, vertical, roll_config, vertical_config);
        mapper.enable_roll().unwrap();
        mapper.enable_vertical().unwrap();

        Self {
            simulator: FrameSimulator::new(source),
            mapper,
            mixer,
        }
    }

    fn feed(&mut self, roll: f64, vertical: f64) {
        self.simulator.set_roll(roll);
        self.simulator.set_vertical(vertical);
        let buffer = self.simulator.next_buffer();
        let frame = decode(&buffer).unwrap();
        self.mapper.process_frame(&frame);
    }

    fn render(&mut self, now: f64) -> Vec<f32> {
        let mut data = vec![0.0f32; BLOCK * 2];
        self.mixer.render(now, &mut data);
        data
    }
}

fn peak(buf: &[f32], channel: usize) -> f32 {
    buf.chunks(2).map(|f| f[channel].abs()).fold(0.0, f32::max)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn steep_left_bank_beeps_in_left_ear() {
    let mut p = Pipeline::new(VerticalSource::Pitch);
    p.feed(-40.0, 0.0);

    assert!(p.mapper.is_beeping());
    let roll = p.mapper.roll_voice().params();
    assert!(approx(roll.volume, 1.0));
    assert!(approx(roll.pan, -1.0));
    assert!(approx(roll.on_duration, 0.05));
    assert!(approx(roll.off_duration, 0.2));

    let vertical = p.mapper.vertical_voice().params();
    assert_eq!(vertical.off_duration, EFFECTIVELY_INFINITE);

    // Both voices open with an "on" pulse
    p.render(0.0);
    // Both flip off at 0.1
    p.render(0.1);
    let quiet = p.render(0.2);
    assert_eq!(peak(&quiet, 0), 0.0);
    assert_eq!(peak(&quiet, 1), 0.0);

    // Roll comes back on after its 0.2s gap; vertical stays in its dead zone
    let beep = p.render(0.31);
    assert!(peak(&beep, 0) > 0.9);
    assert_eq!(peak(&beep, 1), 0.0);
}

#[test]
fn leaving_the_limit_restores_a_steady_tone() {
    let mut p = Pipeline::new(VerticalSource::Pitch);
    p.feed(35.0, 0.0);
    assert!(p.mapper.is_beeping());

    p.feed(10.0, 0.0);
    assert!(!p.mapper.is_beeping());
    let roll = p.mapper.roll_voice().params();
    assert!(approx(roll.volume, 10.0 / 30.0));
    assert!(approx(roll.pan, 1.0));
    assert_eq!(roll.on_duration, EFFECTIVELY_INFINITE);
    assert!(approx(roll.off_duration, 0.02));
    assert!(approx(p.mapper.previous_roll(), 35.0));
    assert!(approx(p.mapper.last_roll(), 10.0));
}

#[test]
fn vertical_rate_sets_pitch_and_gap() {
    let mut p = Pipeline::new(VerticalSource::FlightPath);

    p.feed(0.0, 3.0);
    let climb = p.mapper.vertical_voice().params();
    assert!(approx(climb.frequency_hz, 600.0));
    assert!(approx(climb.off_duration, 0.5));
    assert!(approx(climb.volume, 0.5));

    p.feed(0.0, -6.0);
    let dive = p.mapper.vertical_voice().params();
    assert!(approx(dive.frequency_hz, 300.0));
    // Zero off time is raised to the minimum pulse length
    assert!(approx(dive.off_duration, 0.02));
    assert!(approx(p.mapper.previous_vertical(), 3.0));
}

#[test]
fn disabled_channels_render_silence() {
    let mut p = Pipeline::new(VerticalSource::Pitch);
    p.feed(-20.0, 4.0);
    p.mapper.disable_roll();
    p.mapper.disable_vertical();

    assert!(!p.mapper.roll_voice().is_running());
    assert_eq!(p.mapper.roll_voice().params().volume, 0.0);
    assert_eq!(p.mapper.vertical_voice().params().volume, 0.0);

    let data = p.render(0.0);
    assert!(data.iter().all(|&s| s == 0.0));

    // Frames keep being recorded while disabled
    p.feed(-25.0, 4.0);
    assert!(approx(p.mapper.last_roll(), -25.0));
    assert_eq!(p.mapper.roll_voice().params().volume, 0.0);
}

#[test]
fn truncated_buffer_is_rejected() {
    let simulator = FrameSimulator::new(VerticalSource::Pitch);
    let buffer = simulator.next_buffer();
    let err = decode(&buffer[..40]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InsufficientLength {
            expected: 67,
            actual: 40
        }
    ));
}
