//! Binary-generation decoder (X-Plane RPOS/RADR dataout).
//!
//! Datagram shape: 4-byte ASCII tag plus one header byte, then a
//! fixed-offset little-endian record. Truncated records decode missing
//! fields to `NAN`; unknown tags are unrecognized and dropped upstream.
//!
//! `RPOS` layout (69 bytes):
//!
//! | offset | type | field |
//! |--------|------|-------|
//! | 5  | f64 | longitude (deg) |
//! | 13 | f64 | latitude (deg) |
//! | 21 | f64 | elevation MSL (m) |
//! | 29 | f32 | height AGL (m) |
//! | 33 | f32 | pitch (deg) |
//! | 37 | f32 | yaw/true heading (deg) |
//! | 41 | f32 | roll (deg) |
//! | 45 | f32 | vx (m/s, east) |
//! | 49 | f32 | vy (m/s, up) |
//! | 53 | f32 | vz (m/s, south) |
//! | 57 | f32 | P (rad/s) |
//! | 61 | f32 | Q (rad/s) |
//! | 65 | f32 | R (rad/s) |
//!
//! `RADR` layout (29 bytes): six f32 at offsets 5, 9, 13, 17, 21, 25:
//! longitude, latitude, cloud bases (m), cloud tops (m), cloud ratio,
//! precipitation ratio.

use crate::telemetry::record::{Position, Radar, TelemetryRecord};

/// Tag plus one header byte.
const HEADER_LEN: usize = 5;

pub(super) fn decode(bytes: &[u8]) -> TelemetryRecord {
    if bytes.len() < HEADER_LEN {
        return TelemetryRecord::Unrecognized;
    }
    match &bytes[..4] {
        b"RPOS" => TelemetryRecord::Position(parse_rpos(bytes)),
        b"RADR" => TelemetryRecord::Radar(parse_radr(bytes)),
        _ => TelemetryRecord::Unrecognized,
    }
}

fn parse_rpos(bytes: &[u8]) -> Position {
    let vx = read_f32(bytes, 45);
    let vz = read_f32(bytes, 53);
    // Ground-relative speed is the horizontal velocity magnitude; NaN
    // components propagate to a NaN speed.
    let speed = (vx * vx + vz * vz).sqrt().round();

    Position {
        longitude: read_f64(bytes, 5),
        latitude: read_f64(bytes, 13),
        altitude_msl: read_f64(bytes, 21),
        altitude_agl: read_f32(bytes, 29),
        pitch: read_f32(bytes, 33),
        yaw: read_f32(bytes, 37),
        roll: read_f32(bytes, 41),
        speed,
        vx,
        vy: read_f32(bytes, 49),
        vz,
        p: read_f32(bytes, 57),
        q: read_f32(bytes, 61),
        r: read_f32(bytes, 65),
    }
}

fn parse_radr(bytes: &[u8]) -> Radar {
    Radar {
        longitude: read_f32(bytes, 5),
        latitude: read_f32(bytes, 9),
        bases: read_f32(bytes, 13),
        tops: read_f32(bytes, 17),
        clouds: read_f32(bytes, 21),
        precip: read_f32(bytes, 25),
    }
}

fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    match bytes.get(offset..offset + 8) {
        Some(field) => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(field);
            f64::from_le_bytes(buf)
        }
        None => f64::NAN,
    }
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    match bytes.get(offset..offset + 4) {
        Some(field) => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(field);
            f32::from_le_bytes(buf)
        }
        None => f32::NAN,
    }
}
