//! Typed telemetry records and their JSON wire encoding.
//!
//! Every decoded datagram becomes one [`TelemetryRecord`]. Records are
//! ephemeral: the decoder builds one, the hub serializes and fans it out,
//! and it is discarded. Missing numeric fields carry `NAN`, which
//! `serde_json` writes as `null` - the same shape the viewer application
//! has always consumed.

use serde::Serialize;
use serde_json::json;

/// One decoded telemetry datagram.
///
/// The first three variants belong to the text protocol generation
/// (ForeFlight-style broadcast), the next two to the binary generation
/// (X-Plane RPOS/RADR dataout). `Unrecognized` is never forwarded to
/// viewer sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    /// `XGPS` position fix.
    Gps(GpsFix),
    /// `XATT` attitude sample.
    Attitude(Attitude),
    /// Catch-all text record (canonically `XTRA` multiplayer traffic).
    /// The original tag is preserved for the wire envelope.
    Traffic { header: String, data: Traffic },
    /// `RPOS` position/attitude sample.
    Position(Position),
    /// `RADR` weather radar sample.
    Radar(Radar),
    /// Unknown tag or unparseable datagram; dropped, never published.
    Unrecognized,
}

/// Fields of an `XGPS` datagram, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsFix {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: f64,
    pub bearing: f64,
    pub speed: f64,
}

/// Fields of an `XATT` datagram, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attitude {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub p: f64,
    pub q: f64,
    pub r: f64,
    pub speed_east: f64,
    pub speed_up: f64,
    pub speed_south: f64,
    pub gload_side: f64,
    pub gload_normal: f64,
    pub gload_axial: f64,
}

/// Fields of the generic 9-field text record, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Traffic {
    pub index: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub vertical_speed: f64,
    pub ground: f64,
    pub heading: f64,
    pub speed: f64,
    pub tail_number: f64,
}

/// Fields of an `RPOS` datagram.
///
/// Longitude, latitude and MSL elevation are 8-byte doubles on the wire;
/// everything else is a 4-byte float. `speed` is derived by the decoder as
/// `round(sqrt(vx^2 + vz^2))`, the horizontal ground-relative speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(rename = "altitudeMSL")]
    pub altitude_msl: f64,
    #[serde(rename = "altitudeAGL")]
    pub altitude_agl: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
    pub speed: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub p: f32,
    pub q: f32,
    pub r: f32,
}

/// Fields of a `RADR` datagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Radar {
    pub longitude: f32,
    pub latitude: f32,
    /// Cloud bases in meters.
    pub bases: f32,
    /// Cloud tops in meters.
    pub tops: f32,
    /// Cloud cover ratio, 0..1.
    pub clouds: f32,
    /// Precipitation ratio, 0..1.
    pub precip: f32,
}

impl TelemetryRecord {
    /// Serialize this record into the viewer wire message.
    ///
    /// Text-generation records use the `{"header": TAG, "data": {..}}`
    /// envelope; binary-generation records use `{"type": KIND, "data": {..}}`.
    /// Returns `None` for [`TelemetryRecord::Unrecognized`].
    pub fn to_message(&self) -> Option<String> {
        let value = match self {
            TelemetryRecord::Gps(data) => json!({ "header": "XGPS", "data": data }),
            TelemetryRecord::Attitude(data) => json!({ "header": "XATT", "data": data }),
            TelemetryRecord::Traffic { header, data } => {
                json!({ "header": header, "data": data })
            }
            TelemetryRecord::Position(data) => json!({ "type": "position", "data": data }),
            TelemetryRecord::Radar(data) => json!({ "type": "radar", "data": data }),
            TelemetryRecord::Unrecognized => return None,
        };
        Some(value.to_string())
    }

    /// Short record kind name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryRecord::Gps(_) => "gps",
            TelemetryRecord::Attitude(_) => "attitude",
            TelemetryRecord::Traffic { .. } => "traffic",
            TelemetryRecord::Position(_) => "position",
            TelemetryRecord::Radar(_) => "radar",
            TelemetryRecord::Unrecognized => "unrecognized",
        }
    }
}
