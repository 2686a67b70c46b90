//! Frame encoder, the inverse of [`decode`](super::frame::decode)
//!
//! Values are rounded to their wire scale. Float-to-int `as` casts saturate,
//! so out-of-range values pin to the field's limits instead of wrapping.

use byteorder::{ByteOrder, LittleEndian};

use super::frame::{TelemetryFrame, ALTITUDE_BIAS, FRAME_LEN, YEAR_EPOCH};

/// Serialize a frame into its 67-byte wire form.
pub fn encode(frame: &TelemetryFrame) -> [u8; FRAME_LEN] {
    let mut buf = [0u8; FRAME_LEN];

    buf[0] = frame.version;
    buf[1..3].copy_from_slice(&frame.status);
    buf[3] = frame.cpu_temp as u8;
    buf[4] = frame.imu_temp as u8;
    buf[5] = frame.mag_temp as u8;
    buf[6] = frame.pressure_temp as u8;
    buf[7] = (frame.position_uncertainty * 10.0).round() as u8;
    buf[8] = (frame.vertical_uncertainty * 10.0).round() as u8;
    buf[9] = (frame.velocity_uncertainty * 10.0).round() as u8;
    buf[10] = frame.gnss_satellites;
    buf[11] = frame.year.saturating_sub(YEAR_EPOCH).min(u8::MAX as u16) as u8;
    buf[12] = frame.month;
    buf[13] = frame.day;
    buf[14] = frame.hour;
    buf[15] = frame.minute;
    buf[16] = frame.second;

    let signed = [
        (17, frame.pitch, 100.0),
        (19, frame.roll, 100.0),
        (21, frame.magnetic_variation, 100.0),
        (29, frame.flight_path, 100.0),
        (31, frame.rate_of_climb, 1.0),
        (33, frame.load_factor, 1000.0),
        (35, frame.gyro_y, 10.0),
        (37, frame.gyro_x, 10.0),
        (39, frame.gyro_z, 10.0),
        (41, frame.accel_x, 1000.0),
        (43, frame.accel_y, 1000.0),
        (45, frame.accel_z, 1000.0),
    ];
    for (offset, value, scale) in signed {
        LittleEndian::write_i16(&mut buf[offset..offset + 2], (value * scale).round() as i16);
    }

    let unsigned = [
        (23, frame.yaw * 100.0),
        (25, frame.ground_speed * 100.0),
        (27, frame.ground_track * 100.0),
        (47, frame.altitude_wgs84 + ALTITUDE_BIAS),
        (49, frame.altitude + ALTITUDE_BIAS),
        (51, frame.pressure_altitude + ALTITUDE_BIAS),
        (53, frame.pressure / 2.0),
    ];
    for (offset, raw) in unsigned {
        LittleEndian::write_u16(&mut buf[offset..offset + 2], raw.round() as u16);
    }

    LittleEndian::write_i32(&mut buf[55..59], (frame.latitude * 1e7).round() as i32);
    LittleEndian::write_i32(&mut buf[59..63], (frame.longitude * 1e7).round() as i32);
    LittleEndian::write_u32(&mut buf[63..67], frame.ms_since_start);

    buf
}
