//! Synthetic frame generator for running without hardware
//!
//! Produces frames that satisfy the same 67-byte contract as the real
//! source. Bank angle and vertical rate are user controlled; everything
//! else holds a fixed, plausible value.

use chrono::{Datelike, Timelike, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::encode::encode;
use super::frame::{TelemetryFrame, FRAME_LEN};
use crate::sonify::VerticalSource;

/// Default frame cadence (50 Hz)
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

/// Helper to store f64 in AtomicU64
#[inline]
fn f64_to_u64(f: f64) -> u64 {
    f.to_bits()
}

/// Helper to load f64 from AtomicU64
#[inline]
fn u64_to_f64(u: u64) -> f64 {
    f64::from_bits(u)
}

/// Frame simulator. Cheap to share: setters are lock-free.
pub struct FrameSimulator {
    roll: AtomicU64,
    vertical: AtomicU64,
    vertical_source: VerticalSource,
    interval: Duration,
    is_running: AtomicBool,
    started: Instant,
}

impl FrameSimulator {
    pub fn new(vertical_source: VerticalSource) -> Self {
        Self {
            roll: AtomicU64::new(f64_to_u64(0.0)),
            vertical: AtomicU64::new(f64_to_u64(0.0)),
            vertical_source,
            interval: DEFAULT_INTERVAL,
            is_running: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn set_roll(&self, degrees: f64) {
        self.roll.store(f64_to_u64(degrees), Ordering::Relaxed);
    }

    pub fn set_vertical(&self, rate: f64) {
        self.vertical.store(f64_to_u64(rate), Ordering::Relaxed);
    }

    pub fn roll(&self) -> f64 {
        u64_to_f64(self.roll.load(Ordering::Relaxed))
    }

    pub fn vertical(&self) -> f64 {
        u64_to_f64(self.vertical.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Ask a running [`run`](Self::run) loop to finish after its current tick
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    /// Build the frame for the current moment
    pub fn frame(&self) -> TelemetryFrame {
        let now = Utc::now();
        let elapsed_ms = self.started.elapsed().as_millis().min(u32::MAX as u128) as u32;

        let mut frame = TelemetryFrame {
            version: 1,
            status: [0, 0],
            cpu_temp: 45,
            imu_temp: 38,
            mag_temp: 36,
            pressure_temp: 35,
            position_uncertainty: 0.4,
            vertical_uncertainty: 0.5,
            velocity_uncertainty: 0.3,
            gnss_satellites: 12,
            year: now.year().clamp(1970, 1970 + 255) as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
            second: now.second() as u8,
            pitch: 2.5,
            roll: self.roll(),
            magnetic_variation: 0.0,
            yaw: 355.5,
            ground_speed: 120.5,
            ground_track: 355.2,
            flight_path: 0.0,
            rate_of_climb: 0.0,
            load_factor: 1.0,
            gyro_y: 0.0,
            gyro_x: 0.0,
            gyro_z: 0.0,
            accel_x: 0.0,
            accel_y: 0.0,
            accel_z: 1.0,
            altitude_wgs84: 1520.0,
            altitude: 1500.0,
            pressure_altitude: 1480.0,
            pressure: 84_500.0,
            latitude: 37.12345,
            longitude: -122.54321,
            ms_since_start: elapsed_ms,
        };
        self.vertical_source.write(&mut frame, self.vertical());
        frame
    }

    /// Encoded form of [`frame`](Self::frame)
    pub fn next_buffer(&self) -> [u8; FRAME_LEN] {
        encode(&self.frame())
    }

    /// Emit one encoded frame per interval until stopped or the receiver
    /// is dropped.
    pub async fn run(self: Arc<Self>, tx: mpsc::Sender<Vec<u8>>) {
        self.is_running.store(true, Ordering::SeqCst);
        log::info!("Simulation started ({:?} per frame)", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        while self.is_running() {
            ticker.tick().await;
            if tx.send(self.next_buffer().to_vec()).await.is_err() {
                log::debug!("Simulator receiver closed");
                break;
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        log::info!("Simulation stopped");
    }
}
