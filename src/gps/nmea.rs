//! NMEA 0183 decoder backend

use super::decoder::NavDecoder;
use nmea0183::{ParseResult, Parser};

/// [`NavDecoder`] backed by the nmea0183 sentence parser.
///
/// GGA sentences carry position, altitude, and satellite count; RMC is a
/// position-only fallback between GGA updates. A GGA with an empty fix
/// payload clears the fix.
pub struct Nmea0183Decoder {
    parser: Parser,
    fix_valid: bool,
    fix_updated: bool,
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    satellites: Option<u32>,
}

impl Nmea0183Decoder {
    pub fn new() -> Self {
        Nmea0183Decoder {
            parser: Parser::new(),
            fix_valid: false,
            fix_updated: false,
            latitude: 0.0,
            longitude: 0.0,
            altitude: None,
            satellites: None,
        }
    }
}

impl Default for Nmea0183Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NavDecoder for Nmea0183Decoder {
    fn feed(&mut self, byte: u8) -> bool {
        match self.parser.parse_from_byte(byte) {
            Some(Ok(ParseResult::GGA(Some(gga)))) => {
                self.fix_valid = true;
                self.fix_updated = true;
                self.latitude = gga.latitude.as_f64();
                self.longitude = gga.longitude.as_f64();
                self.altitude = Some(gga.altitude.meters as f64);
                self.satellites = Some(gga.sat_in_use as u32);
                true
            }
            Some(Ok(ParseResult::GGA(None))) => {
                // Receiver is alive but reports no fix
                self.fix_valid = false;
                self.fix_updated = false;
                true
            }
            Some(Ok(ParseResult::RMC(Some(rmc)))) => {
                self.fix_valid = true;
                self.fix_updated = true;
                self.latitude = rmc.latitude.as_f64();
                self.longitude = rmc.longitude.as_f64();
                true
            }
            // Complete sentence we don't consume
            Some(Ok(_)) => true,
            // Malformed or failed-checksum sentence
            Some(Err(_)) => false,
            None => false,
        }
    }

    fn fix_valid(&self) -> bool {
        self.fix_valid
    }

    fn fix_updated(&self) -> bool {
        self.fix_updated
    }

    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }

    fn altitude_valid(&self) -> bool {
        self.altitude.is_some()
    }

    fn altitude(&self) -> f64 {
        self.altitude.unwrap_or(0.0)
    }

    fn satellites_valid(&self) -> bool {
        self.satellites.is_some()
    }

    fn satellites(&self) -> u32 {
        self.satellites.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_sentence(decoder: &mut Nmea0183Decoder, sentence: &[u8]) -> bool {
        let mut completed = false;
        for &byte in sentence {
            completed |= decoder.feed(byte);
        }
        completed
    }

    #[test]
    fn test_gga_sentence_produces_fix() {
        let mut decoder = Nmea0183Decoder::new();
        let completed = feed_sentence(
            &mut decoder,
            b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n",
        );

        assert!(completed);
        assert!(decoder.fix_valid());
        assert!((decoder.latitude() - 48.1173).abs() < 0.001);
        assert!((decoder.longitude() - 11.5166).abs() < 0.001);
        assert!(decoder.altitude_valid());
        assert!((decoder.altitude() - 545.4).abs() < 0.1);
        assert!(decoder.satellites_valid());
        assert_eq!(decoder.satellites(), 8);
    }

    #[test]
    fn test_garbage_does_not_complete() {
        let mut decoder = Nmea0183Decoder::new();
        assert!(!feed_sentence(&mut decoder, b"garbage bytes\r\n"));
        assert!(!decoder.fix_valid());
    }
}
