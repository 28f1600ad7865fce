//! Navigation decoder boundary

/// Sentence decoder for the navigation receiver's byte stream.
///
/// Bytes go in one at a time; `feed` reports when a structurally complete,
/// checksum-valid sentence has been consumed. The accessors expose the
/// most recent decode, each flagged valid or invalid independently by the
/// decoder.
pub trait NavDecoder: Send {
    /// Feed one byte. Returns true when this byte completed a valid sentence.
    fn feed(&mut self, byte: u8) -> bool;

    /// Whether the decoder currently holds a structurally valid fix.
    fn fix_valid(&self) -> bool;

    /// Whether the fix has been refreshed by a recently decoded sentence.
    fn fix_updated(&self) -> bool;

    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;

    fn altitude_valid(&self) -> bool;
    fn altitude(&self) -> f64;

    fn satellites_valid(&self) -> bool;
    fn satellites(&self) -> u32;
}

impl<D: NavDecoder + ?Sized> NavDecoder for Box<D> {
    fn feed(&mut self, byte: u8) -> bool {
        (**self).feed(byte)
    }

    fn fix_valid(&self) -> bool {
        (**self).fix_valid()
    }

    fn fix_updated(&self) -> bool {
        (**self).fix_updated()
    }

    fn latitude(&self) -> f64 {
        (**self).latitude()
    }

    fn longitude(&self) -> f64 {
        (**self).longitude()
    }

    fn altitude_valid(&self) -> bool {
        (**self).altitude_valid()
    }

    fn altitude(&self) -> f64 {
        (**self).altitude()
    }

    fn satellites_valid(&self) -> bool {
        (**self).satellites_valid()
    }

    fn satellites(&self) -> u32 {
        (**self).satellites()
    }
}

/// Scriptable decoder for tests and the simulation backend.
///
/// Treats a newline as the sentence terminator; everything else is
/// payload. Fix fields are set directly by the test or simulator. Clones
/// share state so a handle can steer a decoder already owned by a monitor.
#[cfg(any(test, feature = "mock"))]
#[derive(Clone, Default)]
pub struct MockDecoder {
    inner: std::sync::Arc<std::sync::Mutex<MockDecoderState>>,
}

#[cfg(any(test, feature = "mock"))]
#[derive(Default)]
struct MockDecoderState {
    fix_valid: bool,
    fix_updated: bool,
    latitude: f64,
    longitude: f64,
    altitude_valid: bool,
    altitude: f64,
    satellites_valid: bool,
    satellites: u32,
}

#[cfg(any(test, feature = "mock"))]
impl MockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a valid fix at the given coordinates.
    pub fn set_fix(&self, latitude: f64, longitude: f64) {
        let mut state = self.inner.lock().unwrap();
        state.fix_valid = true;
        state.fix_updated = true;
        state.latitude = latitude;
        state.longitude = longitude;
    }

    pub fn set_altitude(&self, meters: f64) {
        let mut state = self.inner.lock().unwrap();
        state.altitude_valid = true;
        state.altitude = meters;
    }

    pub fn set_satellites(&self, count: u32) {
        let mut state = self.inner.lock().unwrap();
        state.satellites_valid = true;
        state.satellites = count;
    }

    pub fn clear_fix(&self) {
        let mut state = self.inner.lock().unwrap();
        state.fix_valid = false;
        state.fix_updated = false;
    }
}

#[cfg(any(test, feature = "mock"))]
impl NavDecoder for MockDecoder {
    fn feed(&mut self, byte: u8) -> bool {
        byte == b'\n'
    }

    fn fix_valid(&self) -> bool {
        self.inner.lock().unwrap().fix_valid
    }

    fn fix_updated(&self) -> bool {
        self.inner.lock().unwrap().fix_updated
    }

    fn latitude(&self) -> f64 {
        self.inner.lock().unwrap().latitude
    }

    fn longitude(&self) -> f64 {
        self.inner.lock().unwrap().longitude
    }

    fn altitude_valid(&self) -> bool {
        self.inner.lock().unwrap().altitude_valid
    }

    fn altitude(&self) -> f64 {
        self.inner.lock().unwrap().altitude
    }

    fn satellites_valid(&self) -> bool {
        self.inner.lock().unwrap().satellites_valid
    }

    fn satellites(&self) -> u32 {
        self.inner.lock().unwrap().satellites
    }
}
