//! Inbound command parsing and dispatch support

use crate::error::Result;

/// Error codes reported to the peer in `error` packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    InvalidCommand = 0x01,
    InvalidData = 0x02,
    /// Reserved: checksum verification is the receiver's responsibility.
    ChecksumFail = 0x03,
    /// Reserved.
    NotConnected = 0x04,
    /// Reserved.
    BufferFull = 0x05,
    Unknown = 0xFF,
}

/// The closed set of commands a peer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    GetStatus = 0x01,
    SetWifiSsid = 0x02,
    SetWifiPassword = 0x03,
    SetApiEndpoint = 0x04,
    ResetDevice = 0x05,
    CalibrateSensor = 0x06,
}

impl CommandCode {
    /// Parse command code from byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(CommandCode::GetStatus),
            0x02 => Some(CommandCode::SetWifiSsid),
            0x03 => Some(CommandCode::SetWifiPassword),
            0x04 => Some(CommandCode::SetApiEndpoint),
            0x05 => Some(CommandCode::ResetDevice),
            0x06 => Some(CommandCode::CalibrateSensor),
            _ => None,
        }
    }

    /// Human-readable name echoed in command responses
    pub fn name(&self) -> &'static str {
        match self {
            CommandCode::GetStatus => "GET_STATUS",
            CommandCode::SetWifiSsid => "SET_WIFI_SSID",
            CommandCode::SetWifiPassword => "SET_WIFI_PASSWORD",
            CommandCode::SetApiEndpoint => "SET_API_ENDPOINT",
            CommandCode::ResetDevice => "RESET_DEVICE",
            CommandCode::CalibrateSensor => "CALIBRATE_SENSOR",
        }
    }
}

/// Structural failures while reading an inbound command document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    InvalidJson,
    MissingCommand,
    UnknownCommand,
}

impl ParseFailure {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ParseFailure::InvalidJson => ErrorCode::InvalidData,
            ParseFailure::MissingCommand | ParseFailure::UnknownCommand => ErrorCode::InvalidCommand,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ParseFailure::InvalidJson => "Invalid JSON format",
            ParseFailure::MissingCommand => "Missing command field",
            ParseFailure::UnknownCommand => "Unknown command type",
        }
    }
}

/// A validated inbound command: code plus optional string argument.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCommand {
    pub code: CommandCode,
    pub value: Option<String>,
}

/// Parse a raw inbound write into a command.
///
/// The error ladder is part of the wire contract: unparseable input is
/// INVALID_DATA, a parseable document without a `command` key is
/// INVALID_CMD "Missing command field", and a `command` value outside the
/// known set (including non-integer values) is INVALID_CMD "Unknown
/// command type".
pub fn parse(raw: &[u8]) -> std::result::Result<InboundCommand, ParseFailure> {
    let doc: serde_json::Value =
        serde_json::from_slice(raw).map_err(|_| ParseFailure::InvalidJson)?;

    let command = doc.get("command").ok_or(ParseFailure::MissingCommand)?;
    let code = command
        .as_u64()
        .and_then(|v| u8::try_from(v).ok())
        .and_then(CommandCode::from_u8)
        .ok_or(ParseFailure::UnknownCommand)?;

    let value = doc.get("value").and_then(|v| v.as_str()).map(str::to_owned);

    Ok(InboundCommand { code, value })
}

/// Effects a dispatched command applies on the device.
///
/// Configuration writes go to the credential store; calibration is
/// forwarded to the inertial sensor driver. A command is only
/// acknowledged as successful once its effect has returned Ok.
pub trait CommandEffects {
    fn set_wifi_ssid(&mut self, ssid: &str) -> Result<()>;
    fn set_wifi_password(&mut self, password: &str) -> Result<()>;
    fn set_api_endpoint(&mut self, endpoint: &str) -> Result<()>;
    fn calibrate_sensor(&mut self) -> Result<()>;
}

/// Capacity-1 inbound command buffer.
///
/// At most one command is in flight per dispatch cycle. A second write
/// arriving before dispatch replaces the first; the overwrite is counted
/// and logged rather than silent.
#[derive(Debug, Default)]
pub struct CommandSlot {
    pending: Option<Vec<u8>>,
    dropped: u64,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, raw: Vec<u8>) {
        if self.pending.replace(raw).is_some() {
            self.dropped += 1;
            log::warn!(
                "Inbound command overwritten before dispatch ({} dropped so far)",
                self.dropped
            );
        }
    }

    pub fn take(&mut self) -> Option<Vec<u8>> {
        self.pending.take()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_status() {
        let cmd = parse(b"{\"command\": 1}").unwrap();
        assert_eq!(cmd.code, CommandCode::GetStatus);
        assert_eq!(cmd.value, None);
    }

    #[test]
    fn test_parse_with_value() {
        let cmd = parse(b"{\"command\": 2, \"value\": \"HomeNet\"}").unwrap();
        assert_eq!(cmd.code, CommandCode::SetWifiSsid);
        assert_eq!(cmd.value.as_deref(), Some("HomeNet"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let failure = parse(b"not json at all").unwrap_err();
        assert_eq!(failure, ParseFailure::InvalidJson);
        assert_eq!(failure.error_code(), ErrorCode::InvalidData);
        assert_eq!(failure.message(), "Invalid JSON format");
    }

    #[test]
    fn test_parse_missing_command_field() {
        let failure = parse(b"{\"value\": \"x\"}").unwrap_err();
        assert_eq!(failure, ParseFailure::MissingCommand);
        assert_eq!(failure.error_code(), ErrorCode::InvalidCommand);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(parse(b"{\"command\": 99}").unwrap_err(), ParseFailure::UnknownCommand);
        assert_eq!(parse(b"{\"command\": 300}").unwrap_err(), ParseFailure::UnknownCommand);
        // Wrong-typed command values are unknown, not malformed
        assert_eq!(
            parse(b"{\"command\": \"1\"}").unwrap_err(),
            ParseFailure::UnknownCommand
        );
    }

    #[test]
    fn test_command_code_round_trip() {
        for code in 1u8..=6 {
            let parsed = CommandCode::from_u8(code).unwrap();
            assert_eq!(parsed as u8, code);
        }
        assert_eq!(CommandCode::from_u8(0), None);
        assert_eq!(CommandCode::from_u8(7), None);
        assert_eq!(CommandCode::GetStatus.name(), "GET_STATUS");
    }

    #[test]
    fn test_slot_overwrite_policy() {
        let mut slot = CommandSlot::new();
        slot.store(b"{\"command\": 1}".to_vec());
        slot.store(b"{\"command\": 6}".to_vec());

        assert_eq!(slot.dropped(), 1);
        // Newest write wins
        assert_eq!(slot.take().unwrap(), b"{\"command\": 6}".to_vec());
        assert_eq!(slot.take(), None);
    }
}
