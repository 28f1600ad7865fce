//! Link protocol engine
//!
//! Frames outbound telemetry into sequenced, CRC-checked JSON packets,
//! tracks the peer connection lifecycle, and dispatches inbound commands
//! with structured error reporting. All state lives in [`LinkEngine`];
//! there are no process-wide globals, and the engine expects to be driven
//! from a single control loop.

pub mod command;
pub mod crc;
pub mod packet;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use command::{CommandCode, CommandEffects, ErrorCode};
pub use session::ConnectionMonitor;
pub use transport::{Channel, LinkEvent, LinkTransport, SERVICE_UUID};

use crate::error::Result;
use crate::types::MotionSample;
use command::{CommandSlot, InboundCommand};
use packet::{
    CommandResponseFrame, ErrorFrame, GpsBody, GpsFrame, SensorFrame, SequenceCounter, StatusBody,
    StatusFrame,
};

/// Delay between accepting a RESET_DEVICE command and the actual restart.
pub const RESTART_DELAY_MS: u64 = 1_000;

/// A command effect that could not be applied, reported to the peer as a
/// typed error packet instead of a success acknowledgment.
struct Reject {
    code: ErrorCode,
    message: String,
}

impl Reject {
    fn effect_failed(err: crate::error::Error) -> Self {
        Reject {
            code: ErrorCode::Unknown,
            message: err.to_string(),
        }
    }

    fn missing_value() -> Self {
        Reject {
            code: ErrorCode::InvalidData,
            message: "Missing value field".to_string(),
        }
    }
}

/// Telemetry and command engine for one wireless link.
pub struct LinkEngine<T: LinkTransport> {
    transport: T,
    session: ConnectionMonitor,
    sequence: SequenceCounter,
    inbound: CommandSlot,
    restart_at: Option<u64>,
    status_requested: bool,
}

impl<T: LinkTransport> LinkEngine<T> {
    pub fn new(transport: T) -> Self {
        LinkEngine {
            transport,
            session: ConnectionMonitor::new(),
            sequence: SequenceCounter::new(),
            inbound: CommandSlot::new(),
            restart_at: None,
            status_requested: false,
        }
    }

    /// Drain queued transport events into the engine state.
    pub fn pump_events(&mut self) {
        while let Some(event) = self.transport.poll_event() {
            match event {
                LinkEvent::PeerConnected => {
                    self.session.on_connected();
                    self.sequence.reset();
                    log::info!("Link peer connected, sequence counter reset");
                }
                LinkEvent::PeerDisconnected => {
                    self.session.on_disconnected();
                    log::info!("Link peer disconnected");
                }
                LinkEvent::InboundWrite { channel, data } => {
                    if channel.writable() {
                        self.inbound.store(data);
                    } else {
                        log::debug!("Ignoring write on non-writable channel {:?}", channel);
                    }
                }
            }
        }
    }

    /// One engine cycle: pump events, dispatch the buffered command, and
    /// reconcile the connection state (re-advertising when due).
    pub fn service(&mut self, now_ms: u64, effects: &mut dyn CommandEffects) -> Result<()> {
        self.pump_events();
        self.dispatch_pending(now_ms, effects)?;
        if self.session.reconcile(now_ms) {
            log::info!("Restarting advertising for new peers");
            self.transport.start_advertising()?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Whether a dispatched RESET_DEVICE has reached its restart deadline.
    pub fn restart_due(&self, now_ms: u64) -> bool {
        matches!(self.restart_at, Some(at) if now_ms >= at)
    }

    /// Consume a pending GET_STATUS request; the control loop answers it
    /// with a prompt `device_status` publish.
    pub fn take_status_request(&mut self) -> bool {
        std::mem::take(&mut self.status_requested)
    }

    /// Commands lost to the single-slot inbound buffer's overwrite policy.
    pub fn dropped_commands(&self) -> u64 {
        self.inbound.dropped()
    }

    fn channel_up(&self, channel: Channel) -> bool {
        self.session.is_connected() && self.transport.channel_ready(channel)
    }

    /// Publish an inertial sensor reading. No-op while disconnected.
    pub fn publish_motion(&mut self, now_ms: u64, sample: &MotionSample) -> Result<()> {
        if !self.channel_up(Channel::SensorData) {
            return Ok(());
        }
        let mut frame = SensorFrame::new(self.sequence.next(), now_ms, *sample);
        let payload = packet::seal(&mut frame)?;
        self.transport.notify(Channel::SensorData, &payload)
    }

    /// Publish a position report. No-op while disconnected.
    pub fn publish_position(
        &mut self,
        now_ms: u64,
        fix: bool,
        satellites: u32,
        latitude: f64,
        longitude: f64,
        altitude: f64,
    ) -> Result<()> {
        if !self.channel_up(Channel::GpsData) {
            return Ok(());
        }
        let body = GpsBody::new(fix, satellites, latitude, longitude, altitude);
        let mut frame = GpsFrame::new(self.sequence.next(), now_ms, body);
        let payload = packet::seal(&mut frame)?;
        self.transport.notify(Channel::GpsData, &payload)
    }

    /// Publish a device health summary. No-op while disconnected.
    pub fn publish_status(
        &mut self,
        now_ms: u64,
        network_connected: bool,
        fix: bool,
        battery_level: u8,
    ) -> Result<()> {
        if !self.channel_up(Channel::DeviceStatus) {
            return Ok(());
        }
        let body = StatusBody {
            wifi_connected: network_connected,
            gps_fix: fix,
            battery_level,
            ble_connected: true,
        };
        let mut frame = StatusFrame::new(self.sequence.next(), now_ms, body);
        let payload = packet::seal(&mut frame)?;
        self.transport.notify(Channel::DeviceStatus, &payload)
    }

    fn send_error(&mut self, now_ms: u64, code: ErrorCode, message: String) -> Result<()> {
        if !self.channel_up(Channel::Config) {
            return Ok(());
        }
        let mut frame = ErrorFrame::new(code, message, self.sequence.next(), now_ms);
        let payload = packet::seal(&mut frame)?;
        self.transport.notify(Channel::Config, &payload)
    }

    fn send_ack(&mut self, now_ms: u64, code: CommandCode) -> Result<()> {
        if !self.channel_up(Channel::Config) {
            return Ok(());
        }
        let mut frame = CommandResponseFrame::success(code, self.sequence.next(), now_ms);
        let payload = packet::seal(&mut frame)?;
        self.transport.notify(Channel::Config, &payload)
    }

    /// One dispatch cycle: drain the slot, validate, act, respond.
    fn dispatch_pending(&mut self, now_ms: u64, effects: &mut dyn CommandEffects) -> Result<()> {
        let Some(raw) = self.inbound.take() else {
            return Ok(());
        };

        let cmd = match command::parse(&raw) {
            Ok(cmd) => cmd,
            Err(failure) => {
                log::warn!("Rejected inbound command: {}", failure.message());
                return self.send_error(now_ms, failure.error_code(), failure.message().to_string());
            }
        };

        log::info!("Dispatching command {}", cmd.code.name());

        let outcome = match cmd.code {
            CommandCode::GetStatus => {
                self.status_requested = true;
                Ok(())
            }
            CommandCode::SetWifiSsid => with_value(&cmd, |v| effects.set_wifi_ssid(v)),
            CommandCode::SetWifiPassword => with_value(&cmd, |v| effects.set_wifi_password(v)),
            CommandCode::SetApiEndpoint => with_value(&cmd, |v| effects.set_api_endpoint(v)),
            CommandCode::CalibrateSensor => {
                effects.calibrate_sensor().map_err(Reject::effect_failed)
            }
            CommandCode::ResetDevice => {
                // The one terminal command: schedule the restart and skip
                // the acknowledgment entirely.
                self.restart_at = Some(now_ms + RESTART_DELAY_MS);
                log::warn!("Device restart scheduled in {}ms", RESTART_DELAY_MS);
                return Ok(());
            }
        };

        match outcome {
            Ok(()) => self.send_ack(now_ms, cmd.code),
            Err(reject) => {
                log::error!("Command {} rejected: {}", cmd.code.name(), reject.message);
                self.send_error(now_ms, reject.code, reject.message)
            }
        }
    }
}

/// Run a configuration effect that requires the command's string value.
fn with_value(
    cmd: &InboundCommand,
    apply: impl FnOnce(&str) -> Result<()>,
) -> std::result::Result<(), Reject> {
    match cmd.value.as_deref() {
        Some(value) => apply(value).map_err(Reject::effect_failed),
        None => Err(Reject::missing_value()),
    }
}
