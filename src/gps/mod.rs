//! Positioning validity engine
//!
//! Classifies the navigation receiver's health from a noisy,
//! intermittently available sentence stream, and sanitizes coordinates
//! before anyone publishes them. Two independent clocks drive the
//! classification: when any byte last arrived (is the receiver wired up
//! and talking?) and when the last structurally valid fix was decoded
//! (is the solution current?).

pub mod decoder;
mod nmea;

pub use decoder::NavDecoder;
pub use nmea::Nmea0183Decoder;

#[cfg(any(test, feature = "mock"))]
pub use decoder::MockDecoder;

use crate::config::AppConfig;
use crate::error::Result;
use crate::transport::{SerialTransport, Transport};

/// Maximum age of the last valid fix before it stops counting as current.
pub const FIX_STALENESS_TIMEOUT_MS: u64 = 10_000;

/// Silence on the receiver port longer than this means the device stopped
/// talking to us.
pub const DATA_TIMEOUT_MS: u64 = 2_000;

/// Receiver health, coarsest signal an operator needs.
///
/// The tier order matters: a receiver that is sending bytes but has no
/// usable fix is a reception problem, not a wiring fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GpsStatus {
    /// No data arriving from the receiver at all
    NotWorking = 0,
    /// Receiving data but no valid, fresh, in-range fix
    NoSignal = 1,
    /// Tracking with a usable fix
    Active = 2,
}

impl GpsStatus {
    /// Operator-facing description
    pub fn message(&self) -> &'static str {
        match self {
            GpsStatus::NotWorking => "GPS device not working - Check connections",
            GpsStatus::NoSignal => "No GPS signal detected - Move to open area",
            GpsStatus::Active => "GPS tracking active",
        }
    }
}

/// Positioning monitor over a receiver byte stream and sentence decoder.
pub struct GpsMonitor<T: Transport, D: NavDecoder> {
    transport: T,
    decoder: D,
    last_valid_fix_ms: Option<u64>,
    last_data_ms: Option<u64>,
    receiving: bool,
    sentences: u64,
}

impl<T: Transport, D: NavDecoder> GpsMonitor<T, D> {
    pub fn new(transport: T, decoder: D) -> Self {
        GpsMonitor {
            transport,
            decoder,
            last_valid_fix_ms: None,
            last_data_ms: None,
            receiving: false,
            sentences: 0,
        }
    }

    /// Drain newly available receiver bytes through the decoder.
    ///
    /// Every byte refreshes the data-arrival clock regardless of sentence
    /// validity; only decoded sentences carrying a valid fix refresh the
    /// fix clock. With no bytes at all, silence past [`DATA_TIMEOUT_MS`]
    /// degrades `receiving_data` to false.
    pub fn ingest(&mut self, now_ms: u64) -> Result<()> {
        let mut buf = [0u8; 64];
        let mut data_received = false;

        loop {
            let count = self.transport.read(&mut buf)?;
            if count == 0 {
                break;
            }
            data_received = true;

            for &byte in &buf[..count] {
                if self.decoder.feed(byte) {
                    self.sentences += 1;
                    if self.decoder.fix_valid() {
                        self.last_valid_fix_ms = Some(now_ms);
                    }
                }
            }
        }

        if data_received {
            self.last_data_ms = Some(now_ms);
            self.receiving = true;
        } else if let Some(last) = self.last_data_ms {
            if now_ms.saturating_sub(last) > DATA_TIMEOUT_MS {
                self.receiving = false;
            }
        }

        Ok(())
    }

    /// Whether the decoder holds a current fix (valid and refreshed).
    pub fn has_fix(&self) -> bool {
        self.decoder.fix_valid() && self.decoder.fix_updated()
    }

    /// Whether bytes were still arriving at the last ingest.
    pub fn receiving_data(&self) -> bool {
        self.receiving
    }

    /// Count of structurally valid sentences decoded since start.
    pub fn sentence_count(&self) -> u64 {
        self.sentences
    }

    /// The usability predicate gating every coordinate accessor: the fix
    /// must be structurally valid, fresh, inside coordinate ranges, and
    /// away from the (0, 0) sentinel.
    fn fix_usable(&self, now_ms: u64) -> bool {
        if !self.decoder.fix_valid() {
            return false;
        }

        match self.last_valid_fix_ms {
            Some(at) if now_ms.saturating_sub(at) <= FIX_STALENESS_TIMEOUT_MS => {}
            _ => return false,
        }

        let lat = self.decoder.latitude();
        let lon = self.decoder.longitude();

        if !(-90.0..=90.0).contains(&lat) {
            return false;
        }
        if !(-180.0..=180.0).contains(&lon) {
            return false;
        }
        // (0, 0) is the receiver's own invalid sentinel, not a position
        if lat == 0.0 && lon == 0.0 {
            return false;
        }

        true
    }

    /// Latitude in degrees, 0.0 unless the fix is usable.
    pub fn latitude(&self, now_ms: u64) -> f64 {
        if self.fix_usable(now_ms) {
            self.decoder.latitude()
        } else {
            0.0
        }
    }

    /// Longitude in degrees, 0.0 unless the fix is usable.
    pub fn longitude(&self, now_ms: u64) -> f64 {
        if self.fix_usable(now_ms) {
            self.decoder.longitude()
        } else {
            0.0
        }
    }

    /// Altitude in meters, 0.0 unless the fix is usable and the decoder
    /// marks its altitude valid.
    pub fn altitude(&self, now_ms: u64) -> f64 {
        if self.fix_usable(now_ms) && self.decoder.altitude_valid() {
            self.decoder.altitude()
        } else {
            0.0
        }
    }

    /// Satellites in use, 0 when the decoder marks the count invalid.
    pub fn satellites(&self) -> u32 {
        if self.decoder.satellites_valid() {
            self.decoder.satellites()
        } else {
            0
        }
    }

    /// Tri-state receiver health classification.
    pub fn status(&self, now_ms: u64) -> GpsStatus {
        if !self.receiving {
            return GpsStatus::NotWorking;
        }
        if self.fix_usable(now_ms) {
            return GpsStatus::Active;
        }
        GpsStatus::NoSignal
    }

    /// Operator-facing status string.
    pub fn status_message(&self, now_ms: u64) -> &'static str {
        self.status(now_ms).message()
    }
}

/// Create the positioning monitor for the configured receiver port.
///
/// The port value "sim" selects the in-process simulated receiver; any
/// other value is opened as a serial device feeding the NMEA decoder.
pub fn create_monitor(
    config: &AppConfig,
) -> Result<GpsMonitor<Box<dyn Transport>, Box<dyn NavDecoder>>> {
    match config.hardware.gps_port.as_str() {
        #[cfg(any(test, feature = "mock"))]
        "sim" => {
            log::info!("Using simulated navigation receiver");
            Ok(GpsMonitor::new(
                Box::new(crate::transport::MockTransport::new()),
                Box::new(MockDecoder::new()),
            ))
        }
        port => {
            let serial = SerialTransport::open(port, config.hardware.gps_baud)?;
            Ok(GpsMonitor::new(
                Box::new(serial),
                Box::new(Nmea0183Decoder::new()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn monitor() -> (GpsMonitor<MockTransport, MockDecoder>, MockTransport, MockDecoder) {
        let transport = MockTransport::new();
        let decoder = MockDecoder::new();
        let monitor = GpsMonitor::new(transport.clone(), decoder.clone());
        (monitor, transport, decoder)
    }

    #[test]
    fn test_not_working_without_data() {
        let (mut gps, _transport, decoder) = monitor();
        // Even a decoder claiming a perfect fix cannot override silence
        decoder.set_fix(45.0, -93.0);

        gps.ingest(0).unwrap();
        assert_eq!(gps.status(0), GpsStatus::NotWorking);
        assert!(!gps.receiving_data());
    }

    #[test]
    fn test_active_with_fresh_valid_fix() {
        let (mut gps, transport, decoder) = monitor();
        decoder.set_fix(45.0, -93.0);
        decoder.set_satellites(7);

        transport.inject_read(b"fix\n");
        gps.ingest(1_000).unwrap();

        assert_eq!(gps.status(1_000), GpsStatus::Active);
        assert_eq!(gps.latitude(1_000), 45.0);
        assert_eq!(gps.longitude(1_000), -93.0);
        assert_eq!(gps.satellites(), 7);
        assert_eq!(gps.sentence_count(), 1);
        assert_eq!(gps.status_message(1_000), "GPS tracking active");
    }

    #[test]
    fn test_null_island_is_no_signal() {
        let (mut gps, transport, decoder) = monitor();
        decoder.set_fix(0.0, 0.0);

        transport.inject_read(b"fix\n");
        gps.ingest(1_000).unwrap();

        assert_eq!(gps.status(1_000), GpsStatus::NoSignal);
        assert_eq!(gps.latitude(1_000), 0.0);
        assert_eq!(gps.longitude(1_000), 0.0);
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let (mut gps, transport, decoder) = monitor();
        decoder.set_fix(91.0, 10.0);

        transport.inject_read(b"fix\n");
        gps.ingest(0).unwrap();
        assert_eq!(gps.status(0), GpsStatus::NoSignal);

        decoder.set_fix(45.0, -181.0);
        transport.inject_read(b"fix\n");
        gps.ingest(100).unwrap();
        assert_eq!(gps.status(100), GpsStatus::NoSignal);
    }

    #[test]
    fn test_stale_fix_downgrades_without_new_bytes() {
        let (mut gps, transport, decoder) = monitor();
        decoder.set_fix(45.0, -93.0);

        transport.inject_read(b"fix\n");
        gps.ingest(0).unwrap();
        assert_eq!(gps.status(0), GpsStatus::Active);

        // Inside the staleness window the fix still counts
        assert_eq!(gps.status(FIX_STALENESS_TIMEOUT_MS), GpsStatus::Active);
        // One past it the fix is stale; no ingest ran, so the receiver
        // still counts as talking
        assert_eq!(gps.status(FIX_STALENESS_TIMEOUT_MS + 1), GpsStatus::NoSignal);
        assert_eq!(gps.latitude(FIX_STALENESS_TIMEOUT_MS + 1), 0.0);
    }

    #[test]
    fn test_silence_degrades_to_not_working() {
        let (mut gps, transport, decoder) = monitor();
        decoder.set_fix(45.0, -93.0);

        transport.inject_read(b"fix\n");
        gps.ingest(0).unwrap();
        assert!(gps.receiving_data());

        // Quiet ingest inside the data window keeps the receiver alive
        gps.ingest(DATA_TIMEOUT_MS).unwrap();
        assert!(gps.receiving_data());

        // Past the window it goes dead
        gps.ingest(DATA_TIMEOUT_MS + 500).unwrap();
        assert!(!gps.receiving_data());
        assert_eq!(gps.status(DATA_TIMEOUT_MS + 500), GpsStatus::NotWorking);
    }

    #[test]
    fn test_altitude_requires_decoder_validity() {
        let (mut gps, transport, decoder) = monitor();
        decoder.set_fix(45.0, -93.0);

        transport.inject_read(b"fix\n");
        gps.ingest(0).unwrap();
        assert_eq!(gps.altitude(0), 0.0);

        decoder.set_altitude(320.5);
        assert_eq!(gps.altitude(0), 320.5);
    }

    #[test]
    fn test_satellites_invalid_reads_zero() {
        let (mut gps, transport, decoder) = monitor();
        transport.inject_read(b"x\n");
        gps.ingest(0).unwrap();

        assert_eq!(gps.satellites(), 0);
        decoder.set_satellites(4);
        assert_eq!(gps.satellites(), 4);
    }

    #[test]
    fn test_sentence_counter_ignores_partial_data() {
        let (mut gps, transport, _decoder) = monitor();
        transport.inject_read(b"partial sentence without terminator");
        gps.ingest(0).unwrap();
        assert_eq!(gps.sentence_count(), 0);
        assert!(gps.receiving_data());

        transport.inject_read(b"\ncomplete\n");
        gps.ingest(10).unwrap();
        assert_eq!(gps.sentence_count(), 2);
    }
}
