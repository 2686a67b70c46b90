//! Fixed-layout binary telemetry frame decoder
//!
//! A frame is 67 bytes, multi-byte fields little-endian. Decoding is a pure
//! function of the input slice: no shared state, safe to run on any thread.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{self, Read};
use thiserror::Error;

/// Fixed byte length of one frame. Bytes past this offset are ignored.
pub const FRAME_LEN: usize = 67;

/// Bias subtracted from altitude-class fields to recover signed meters
pub const ALTITUDE_BIAS: f64 = 10_000.0;

/// Year field is stored as an offset from this epoch year
pub const YEAR_EPOCH: u16 = 1970;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    InsufficientLength { expected: usize, actual: usize },
}

/// One decoded telemetry record, values already in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryFrame {
    pub version: u8,
    /// Raw status bitmap bytes (offsets 1-2)
    pub status: [u8; 2],
    /// Degrees Celsius
    pub cpu_temp: i8,
    pub imu_temp: i8,
    pub mag_temp: i8,
    pub pressure_temp: i8,
    /// Position uncertainty, meters (tenths on the wire)
    pub position_uncertainty: f64,
    /// Vertical uncertainty, meters (tenths on the wire)
    pub vertical_uncertainty: f64,
    /// Velocity uncertainty, m/s (tenths on the wire)
    pub velocity_uncertainty: f64,
    pub gnss_satellites: u8,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Degrees, hundredths on the wire
    pub pitch: f64,
    /// Bank angle, degrees, hundredths on the wire
    pub roll: f64,
    pub magnetic_variation: f64,
    /// Unsigned heading, degrees
    pub yaw: f64,
    pub ground_speed: f64,
    pub ground_track: f64,
    pub flight_path: f64,
    /// Rate of climb, raw signed integer units
    pub rate_of_climb: f64,
    /// g, thousandths on the wire
    pub load_factor: f64,
    /// Angular rates, deg/s, tenths on the wire
    pub gyro_y: f64,
    pub gyro_x: f64,
    pub gyro_z: f64,
    /// Accelerations, g, thousandths on the wire
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    /// Meters, stored with a +10000 bias
    pub altitude_wgs84: f64,
    pub altitude: f64,
    pub pressure_altitude: f64,
    /// Static pressure, stored halved on the wire
    pub pressure: f64,
    /// Degrees, 1e-7 on the wire
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds since the source started, unscaled
    pub ms_since_start: u32,
}

impl TelemetryFrame {
    /// Status bitmap assembled little-endian
    pub fn status_bits(&self) -> u16 {
        u16::from_le_bytes(self.status)
    }
}

/// Decode one frame from the front of `buffer`.
///
/// Fails without producing a partial record when fewer than [`FRAME_LEN`]
/// bytes are supplied.
pub fn decode(buffer: &[u8]) -> Result<TelemetryFrame, DecodeError> {
    let short = DecodeError::InsufficientLength {
        expected: FRAME_LEN,
        actual: buffer.len(),
    };
    if buffer.len() < FRAME_LEN {
        return Err(short);
    }

    let mut reader = &buffer[..FRAME_LEN];
    // Only reachable on a truncated read, which the length check excludes
    read_fields(&mut reader).map_err(|_| short)
}

fn read_fields<R: Read>(r: &mut R) -> io::Result<TelemetryFrame> {
    Ok(TelemetryFrame {
        version: r.read_u8()?,
        status: [r.read_u8()?, r.read_u8()?],
        cpu_temp: r.read_i8()?,
        imu_temp: r.read_i8()?,
        mag_temp: r.read_i8()?,
        pressure_temp: r.read_i8()?,
        position_uncertainty: r.read_u8()? as f64 / 10.0,
        vertical_uncertainty: r.read_u8()? as f64 / 10.0,
        velocity_uncertainty: r.read_u8()? as f64 / 10.0,
        gnss_satellites: r.read_u8()?,
        year: YEAR_EPOCH + r.read_u8()? as u16,
        month: r.read_u8()?,
        day: r.read_u8()?,
        hour: r.read_u8()?,
        minute: r.read_u8()?,
        second: r.read_u8()?,
        pitch: signed16(r, 100.0)?,
        roll: signed16(r, 100.0)?,
        magnetic_variation: signed16(r, 100.0)?,
        yaw: unsigned16(r, 100.0)?,
        ground_speed: unsigned16(r, 100.0)?,
        ground_track: unsigned16(r, 100.0)?,
        flight_path: signed16(r, 100.0)?,
        rate_of_climb: signed16(r, 1.0)?,
        load_factor: signed16(r, 1000.0)?,
        gyro_y: signed16(r, 10.0)?,
        gyro_x: signed16(r, 10.0)?,
        gyro_z: signed16(r, 10.0)?,
        accel_x: signed16(r, 1000.0)?,
        accel_y: signed16(r, 1000.0)?,
        accel_z: signed16(r, 1000.0)?,
        altitude_wgs84: biased_altitude(r)?,
        altitude: biased_altitude(r)?,
        pressure_altitude: biased_altitude(r)?,
        pressure: r.read_u16::<LittleEndian>()? as f64 * 2.0,
        latitude: r.read_i32::<LittleEndian>()? as f64 * 1e-7,
        longitude: r.read_i32::<LittleEndian>()? as f64 * 1e-7,
        ms_since_start: r.read_u32::<LittleEndian>()?,
    })
}

#[inline]
fn signed16<R: Read>(r: &mut R, scale: f64) -> io::Result<f64> {
    Ok(r.read_i16::<LittleEndian>()? as f64 / scale)
}

#[inline]
fn unsigned16<R: Read>(r: &mut R, scale: f64) -> io::Result<f64> {
    Ok(r.read_u16::<LittleEndian>()? as f64 / scale)
}

#[inline]
fn biased_altitude<R: Read>(r: &mut R) -> io::Result<f64> {
    Ok(r.read_u16::<LittleEndian>()? as f64 - ALTITUDE_BIAS)
}
