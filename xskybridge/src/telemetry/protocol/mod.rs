//! Telemetry datagram decoding.
//!
//! Two mutually-exclusive upstream protocol generations exist; a deployment
//! speaks exactly one, selected by configuration:
//!
//! - [`ProtocolGeneration::Text`] - ForeFlight-style comma-separated ASCII
//!   datagrams (`XGPS`/`XATT` plus a catch-all), broadcast by the simulator.
//! - [`ProtocolGeneration::Binary`] - fixed-offset little-endian records
//!   (`RPOS`/`RADR`) requested via subscription datagrams.
//!
//! Both decoders produce the same [`TelemetryRecord`] type. Decoding is
//! total: arbitrary byte strings yield a record or
//! [`TelemetryRecord::Unrecognized`], never a panic.

mod binary;
mod text;

use super::record::TelemetryRecord;

/// Upstream wire format generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolGeneration {
    /// Comma-separated ASCII datagrams (`XGPS`, `XATT`, catch-all).
    Text,
    /// Fixed-offset little-endian binary datagrams (`RPOS`, `RADR`).
    Binary,
}

/// Decode one raw datagram according to the configured generation.
pub fn decode(generation: ProtocolGeneration, bytes: &[u8]) -> TelemetryRecord {
    match generation {
        ProtocolGeneration::Text => text::decode(bytes),
        ProtocolGeneration::Binary => binary::decode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_dispatch() {
        // A text XGPS datagram is meaningless to the binary decoder and
        // vice versa - the generation decides which parser runs.
        let text_datagram = b"XGPS1,-122.5,45.5,100.0,270.0,50.0\0";
        assert!(matches!(
            decode(ProtocolGeneration::Text, text_datagram),
            TelemetryRecord::Gps(_)
        ));
        assert_eq!(
            decode(ProtocolGeneration::Binary, text_datagram),
            TelemetryRecord::Unrecognized
        );
    }

    #[test]
    fn test_decode_is_total_over_arbitrary_bytes() {
        let inputs: &[&[u8]] = &[
            b"",
            b"X",
            b"XGPS",
            b"RPOS",
            &[0xff, 0xfe, 0x00, 0x01, 0x80],
            &[0u8; 4096],
        ];
        for bytes in inputs {
            // Must return, never panic
            let _ = decode(ProtocolGeneration::Text, bytes);
            let _ = decode(ProtocolGeneration::Binary, bytes);
        }
    }
}
