//! Wireless link boundary
//!
//! The radio stack itself is a vendor collaborator; the engine only sees
//! this trait. Connect/disconnect and inbound writes arrive from the
//! stack's callbacks as queued [`LinkEvent`]s consumed by the engine's
//! polling loop, which keeps the state machine testable without a radio.

use crate::error::Result;

/// GATT service UUID advertised by the tracker.
pub const SERVICE_UUID: &str = "0000ff00-0000-1000-8000-00805f9b34fb";

const CHAR_SENSOR_DATA_UUID: &str = "0000ff01-0000-1000-8000-00805f9b34fb";
const CHAR_GPS_DATA_UUID: &str = "0000ff02-0000-1000-8000-00805f9b34fb";
const CHAR_CONFIG_UUID: &str = "0000ff03-0000-1000-8000-00805f9b34fb";
const CHAR_DEVICE_STATUS_UUID: &str = "0000ff04-0000-1000-8000-00805f9b34fb";

/// Link channels, one per GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    SensorData,
    GpsData,
    Config,
    DeviceStatus,
}

impl Channel {
    pub fn uuid(&self) -> &'static str {
        match self {
            Channel::SensorData => CHAR_SENSOR_DATA_UUID,
            Channel::GpsData => CHAR_GPS_DATA_UUID,
            Channel::Config => CHAR_CONFIG_UUID,
            Channel::DeviceStatus => CHAR_DEVICE_STATUS_UUID,
        }
    }

    /// Only the configuration channel accepts peer writes.
    pub fn writable(&self) -> bool {
        matches!(self, Channel::Config)
    }
}

/// Transport events produced by the wireless stack's callbacks.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    PeerConnected,
    PeerDisconnected,
    InboundWrite { channel: Channel, data: Vec<u8> },
}

/// Short-range wireless transport the engine publishes through.
pub trait LinkTransport: Send {
    /// Push a sealed packet to the peer on the given channel.
    fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<()>;

    /// Whether a peer is currently connected.
    fn peer_connected(&self) -> bool;

    /// Whether the characteristic behind `channel` is registered and able
    /// to notify.
    fn channel_ready(&self, channel: Channel) -> bool {
        let _ = channel;
        true
    }

    /// Ask the stack to advertise for new peers.
    fn start_advertising(&mut self) -> Result<()>;

    /// Next queued transport event, if any.
    fn poll_event(&mut self) -> Option<LinkEvent>;
}
