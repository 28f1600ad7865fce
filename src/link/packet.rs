//! Link packet construction
//!
//! Every outbound packet is a JSON document whose final field is a
//! CRC-16/CCITT checksum of the document serialized without that field.
//! The build is therefore two-pass: serialize, checksum those exact bytes,
//! set `crc`, serialize again. Field order is fixed by struct declaration
//! order and must not change between passes or receivers cannot verify.

use serde::Serialize;

use crate::error::Result;
use crate::link::command::{CommandCode, ErrorCode};
use crate::link::crc::checksum;
use crate::types::MotionSample;

/// Wire tag for each packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    SensorData,
    GpsData,
    DeviceStatus,
    CommandResponse,
    Error,
}

/// Per-connection packet sequence counter.
#[derive(Debug, Default)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset on a new peer connection.
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Issue the next sequence number, exactly once per call, in call
    /// order. The first packet after a reset carries sequence 1.
    pub fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    pub fn current(&self) -> u32 {
        self.0
    }
}

/// A packet struct that can receive its trailing checksum.
pub trait Frame: Serialize {
    fn set_crc(&mut self, crc: u16);
}

/// Seal a frame: checksum the crc-less serialization, then re-serialize
/// with `crc` appended as the final field.
pub fn seal<F: Frame>(frame: &mut F) -> Result<Vec<u8>> {
    let unsealed = serde_json::to_vec(frame)?;
    frame.set_crc(checksum(&unsealed));
    Ok(serde_json::to_vec(frame)?)
}

/// Altitude field of a position packet.
///
/// The wire format distinguishes three cases: the key is omitted when the
/// fix is usable but altitude reads zero, null when the fix is unusable,
/// and a number otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Altitude {
    Omitted,
    Unavailable,
    Meters(f64),
}

impl Altitude {
    pub fn is_omitted(&self) -> bool {
        matches!(self, Altitude::Omitted)
    }
}

impl Serialize for Altitude {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            // Omitted never reaches the serializer (skip_serializing_if)
            Altitude::Omitted | Altitude::Unavailable => serializer.serialize_none(),
            Altitude::Meters(m) => serializer.serialize_f64(*m),
        }
    }
}

/// Position body of a `gps_data` packet.
#[derive(Debug, Serialize)]
pub struct GpsBody {
    pub fix: bool,
    pub satellites: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Altitude::is_omitted")]
    pub altitude: Altitude,
}

impl GpsBody {
    /// Coordinates are reported only for a usable fix; otherwise null
    /// placeholders go out so receivers can tell "no fix" from a fix at
    /// literal coordinate zero.
    pub fn new(fix: bool, satellites: u32, latitude: f64, longitude: f64, altitude: f64) -> Self {
        if fix && latitude != 0.0 && longitude != 0.0 {
            GpsBody {
                fix,
                satellites,
                latitude: Some(latitude),
                longitude: Some(longitude),
                altitude: if altitude != 0.0 {
                    Altitude::Meters(altitude)
                } else {
                    Altitude::Omitted
                },
            }
        } else {
            GpsBody {
                fix,
                satellites,
                latitude: None,
                longitude: None,
                altitude: Altitude::Unavailable,
            }
        }
    }
}

/// Status body of a `device_status` packet.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub wifi_connected: bool,
    pub gps_fix: bool,
    pub battery_level: u8,
    /// Always true: this packet only exists on a live link.
    pub ble_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct SensorFrame {
    #[serde(rename = "type")]
    kind: PacketKind,
    sequence: u32,
    timestamp: u64,
    sensor: MotionSample,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<u16>,
}

impl SensorFrame {
    pub fn new(sequence: u32, timestamp: u64, sensor: MotionSample) -> Self {
        SensorFrame {
            kind: PacketKind::SensorData,
            sequence,
            timestamp,
            sensor,
            crc: None,
        }
    }
}

impl Frame for SensorFrame {
    fn set_crc(&mut self, crc: u16) {
        self.crc = Some(crc);
    }
}

#[derive(Debug, Serialize)]
pub struct GpsFrame {
    #[serde(rename = "type")]
    kind: PacketKind,
    sequence: u32,
    timestamp: u64,
    gps: GpsBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<u16>,
}

impl GpsFrame {
    pub fn new(sequence: u32, timestamp: u64, gps: GpsBody) -> Self {
        GpsFrame {
            kind: PacketKind::GpsData,
            sequence,
            timestamp,
            gps,
            crc: None,
        }
    }
}

impl Frame for GpsFrame {
    fn set_crc(&mut self, crc: u16) {
        self.crc = Some(crc);
    }
}

#[derive(Debug, Serialize)]
pub struct StatusFrame {
    #[serde(rename = "type")]
    kind: PacketKind,
    sequence: u32,
    timestamp: u64,
    status: StatusBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<u16>,
}

impl StatusFrame {
    pub fn new(sequence: u32, timestamp: u64, status: StatusBody) -> Self {
        StatusFrame {
            kind: PacketKind::DeviceStatus,
            sequence,
            timestamp,
            status,
            crc: None,
        }
    }
}

impl Frame for StatusFrame {
    fn set_crc(&mut self, crc: u16) {
        self.crc = Some(crc);
    }
}

/// Acknowledgment for a successfully executed command.
#[derive(Debug, Serialize)]
pub struct CommandResponseFrame {
    #[serde(rename = "type")]
    kind: PacketKind,
    command: u8,
    command_name: &'static str,
    status: &'static str,
    sequence: u32,
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<u16>,
}

impl CommandResponseFrame {
    pub fn success(command: CommandCode, sequence: u32, timestamp: u64) -> Self {
        CommandResponseFrame {
            kind: PacketKind::CommandResponse,
            command: command as u8,
            command_name: command.name(),
            status: "success",
            sequence,
            timestamp,
            crc: None,
        }
    }
}

impl Frame for CommandResponseFrame {
    fn set_crc(&mut self, crc: u16) {
        self.crc = Some(crc);
    }
}

/// Typed error report to the peer.
#[derive(Debug, Serialize)]
pub struct ErrorFrame {
    #[serde(rename = "type")]
    kind: PacketKind,
    error_code: u8,
    message: String,
    sequence: u32,
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc: Option<u16>,
}

impl ErrorFrame {
    pub fn new(code: ErrorCode, message: String, sequence: u32, timestamp: u64) -> Self {
        ErrorFrame {
            kind: PacketKind::Error,
            error_code: code as u8,
            message,
            sequence,
            timestamp,
            crc: None,
        }
    }
}

impl Frame for ErrorFrame {
    fn set_crc(&mut self, crc: u16) {
        self.crc = Some(crc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Split a sealed packet into the bytes the checksum covers and the
    /// stored checksum. `crc` is always the last field.
    fn strip_crc(payload: &[u8]) -> (Vec<u8>, u16) {
        let text = std::str::from_utf8(payload).unwrap();
        let idx = text.rfind(",\"crc\":").unwrap();
        let crc: u16 = text[idx + 7..text.len() - 1].parse().unwrap();
        let mut covered = text[..idx].as_bytes().to_vec();
        covered.push(b'}');
        (covered, crc)
    }

    #[test]
    fn test_sequence_counter() {
        let mut seq = SequenceCounter::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        seq.reset();
        assert_eq!(seq.current(), 0);
        assert_eq!(seq.next(), 1);
    }

    #[test]
    fn test_seal_appends_verifiable_crc() {
        let mut frame = SensorFrame::new(3, 1500, MotionSample::default());
        let sealed = seal(&mut frame).unwrap();

        let (covered, stored) = strip_crc(&sealed);
        assert_eq!(checksum(&covered), stored);
    }

    #[test]
    fn test_seal_passes_are_byte_identical() {
        let mut frame = StatusFrame::new(
            1,
            42,
            StatusBody {
                wifi_connected: true,
                gps_fix: false,
                battery_level: 87,
                ble_connected: true,
            },
        );
        let unsealed = serde_json::to_vec(&frame).unwrap();
        let sealed = seal(&mut frame).unwrap();

        // Sealed output is the unsealed document with only `crc` appended
        let (covered, _) = strip_crc(&sealed);
        assert_eq!(covered, unsealed);
    }

    #[test]
    fn test_frame_field_order() {
        let mut frame = ErrorFrame::new(ErrorCode::InvalidData, "Invalid JSON format".into(), 9, 77);
        let sealed = seal(&mut frame).unwrap();
        let text = String::from_utf8(sealed).unwrap();

        assert!(text.starts_with("{\"type\":\"error\",\"error_code\":2,\"message\":"));
        assert!(text.contains("\"sequence\":9,\"timestamp\":77,\"crc\":"));
    }

    #[test]
    fn test_command_response_schema() {
        let mut frame = CommandResponseFrame::success(CommandCode::GetStatus, 4, 100);
        let sealed = seal(&mut frame).unwrap();
        let text = String::from_utf8(sealed).unwrap();

        assert!(text.starts_with(
            "{\"type\":\"command_response\",\"command\":1,\"command_name\":\"GET_STATUS\",\"status\":\"success\""
        ));
    }

    #[test]
    fn test_gps_body_usable_fix() {
        let body = GpsBody::new(true, 8, 45.0, -93.0, 250.0);
        let text = serde_json::to_string(&body).unwrap();
        assert!(text.contains("\"latitude\":45.0"));
        assert!(text.contains("\"longitude\":-93.0"));
        assert!(text.contains("\"altitude\":250.0"));
    }

    #[test]
    fn test_gps_body_zero_altitude_omitted() {
        let body = GpsBody::new(true, 8, 45.0, -93.0, 0.0);
        let text = serde_json::to_string(&body).unwrap();
        assert!(!text.contains("altitude"));
    }

    #[test]
    fn test_gps_body_no_fix_null_placeholders() {
        let body = GpsBody::new(false, 2, 45.0, -93.0, 250.0);
        let text = serde_json::to_string(&body).unwrap();
        assert!(text.contains("\"latitude\":null"));
        assert!(text.contains("\"longitude\":null"));
        assert!(text.contains("\"altitude\":null"));
    }

    #[test]
    fn test_gps_body_null_island_rejected() {
        let body = GpsBody::new(true, 8, 0.0, 0.0, 100.0);
        let text = serde_json::to_string(&body).unwrap();
        assert!(text.contains("\"latitude\":null"));
    }
}
