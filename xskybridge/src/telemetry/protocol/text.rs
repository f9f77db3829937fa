//! Text-generation decoder (ForeFlight-style broadcast).
//!
//! Datagram shape: 4-byte ASCII tag, 2 bytes of framing (generation digit
//! plus separator), then a comma-separated list of decimal numbers with one
//! trailing byte. `XGPS` carries 5 fields, `XATT` 12; any other printable
//! tag maps to the generic 9-field traffic record with its tag preserved.
//!
//! Fields that are absent or non-numeric decode to `NAN` so a truncated
//! datagram still yields a best-effort partial record.

use crate::telemetry::record::{Attitude, GpsFix, Traffic, TelemetryRecord};

/// Length of the record tag.
const TAG_LEN: usize = 4;

/// Offset of the first payload byte (tag + generation digit + separator).
const PAYLOAD_START: usize = 6;

pub(super) fn decode(bytes: &[u8]) -> TelemetryRecord {
    if bytes.len() < TAG_LEN {
        return TelemetryRecord::Unrecognized;
    }

    let tag = &bytes[..TAG_LEN];
    let Ok(header) = std::str::from_utf8(tag) else {
        return TelemetryRecord::Unrecognized;
    };
    if !header.chars().all(|c| c.is_ascii_alphanumeric()) {
        return TelemetryRecord::Unrecognized;
    }

    let fields = split_fields(bytes);

    match tag {
        b"XGPS" => TelemetryRecord::Gps(GpsFix {
            longitude: field(&fields, 0),
            latitude: field(&fields, 1),
            elevation: field(&fields, 2),
            bearing: field(&fields, 3),
            speed: field(&fields, 4),
        }),
        b"XATT" => TelemetryRecord::Attitude(Attitude {
            yaw: field(&fields, 0),
            pitch: field(&fields, 1),
            roll: field(&fields, 2),
            p: field(&fields, 3),
            q: field(&fields, 4),
            r: field(&fields, 5),
            speed_east: field(&fields, 6),
            speed_up: field(&fields, 7),
            speed_south: field(&fields, 8),
            gload_side: field(&fields, 9),
            gload_normal: field(&fields, 10),
            gload_axial: field(&fields, 11),
        }),
        _ => TelemetryRecord::Traffic {
            header: header.to_string(),
            data: Traffic {
                index: field(&fields, 0),
                latitude: field(&fields, 1),
                longitude: field(&fields, 2),
                elevation: field(&fields, 3),
                vertical_speed: field(&fields, 4),
                ground: field(&fields, 5),
                heading: field(&fields, 6),
                speed: field(&fields, 7),
                tail_number: field(&fields, 8),
            },
        },
    }
}

/// Split the payload region into numeric fields.
///
/// The payload starts after the 6-byte header region and drops the one
/// trailing byte the simulator appends.
fn split_fields(bytes: &[u8]) -> Vec<f64> {
    let payload: &[u8] = if bytes.len() > PAYLOAD_START + 1 {
        &bytes[PAYLOAD_START..bytes.len() - 1]
    } else {
        &[]
    };
    String::from_utf8_lossy(payload)
        .split(',')
        .map(|s| s.trim().parse().unwrap_or(f64::NAN))
        .collect()
}

/// Positional field access with a `NAN` sentinel for missing fields.
fn field(fields: &[f64], index: usize) -> f64 {
    fields.get(index).copied().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xgps_five_fields() {
        let datagram = b"XGPS1,-122.5,45.5,1523.0,270.5,77.2\0";
        let record = decode(datagram);

        let TelemetryRecord::Gps(fix) = record else {
            panic!("expected GPS record, got {record:?}");
        };
        assert_eq!(fix.longitude, -122.5);
        assert_eq!(fix.latitude, 45.5);
        assert_eq!(fix.elevation, 1523.0);
        assert_eq!(fix.bearing, 270.5);
        assert_eq!(fix.speed, 77.2);
    }

    #[test]
    fn test_xatt_twelve_fields() {
        let datagram = b"XATT1,180.1,2.5,-1.2,0.01,0.02,0.03,10.0,0.5,-60.0,0.0,1.0,0.1\0";
        let record = decode(datagram);

        let TelemetryRecord::Attitude(att) = record else {
            panic!("expected attitude record, got {record:?}");
        };
        assert_eq!(att.yaw, 180.1);
        assert_eq!(att.pitch, 2.5);
        assert_eq!(att.roll, -1.2);
        assert_eq!(att.speed_east, 10.0);
        assert_eq!(att.gload_axial, 0.1);
    }

    #[test]
    fn test_unknown_tag_maps_to_generic_record() {
        let datagram = b"XTRA1,3,45.1,-122.2,2000,500,0,90,120,N12345\0";
        let record = decode(datagram);

        let TelemetryRecord::Traffic { header, data } = record else {
            panic!("expected traffic record, got {record:?}");
        };
        assert_eq!(header, "XTRA");
        assert_eq!(data.index, 3.0);
        assert_eq!(data.latitude, 45.1);
        assert_eq!(data.heading, 90.0);
        // "N12345" is not numeric - best-effort NaN, not a decode failure
        assert!(data.tail_number.is_nan());
    }

    #[test]
    fn test_truncated_payload_yields_nan_tail() {
        let datagram = b"XGPS1,-122.5,45.5\0";
        let TelemetryRecord::Gps(fix) = decode(datagram) else {
            panic!("expected GPS record");
        };
        assert_eq!(fix.longitude, -122.5);
        assert_eq!(fix.latitude, 45.5);
        assert!(fix.elevation.is_nan());
        assert!(fix.bearing.is_nan());
        assert!(fix.speed.is_nan());
    }

    #[test]
    fn test_tag_only_datagram() {
        let TelemetryRecord::Gps(fix) = decode(b"XGPS") else {
            panic!("expected GPS record");
        };
        assert!(fix.longitude.is_nan());
        assert!(fix.speed.is_nan());
    }

    #[test]
    fn test_short_and_binary_garbage_is_unrecognized() {
        assert_eq!(decode(b""), TelemetryRecord::Unrecognized);
        assert_eq!(decode(b"XG"), TelemetryRecord::Unrecognized);
        assert_eq!(
            decode(&[0xff, 0xfe, 0xfd, 0xfc, 0x00]),
            TelemetryRecord::Unrecognized
        );
    }
}
