//! Shared telemetry types

use serde::{Deserialize, Serialize};

/// One filtered inertial sensor reading.
///
/// Accelerations are normalized to g, orientation angles are degrees.
/// The smoothing filter runs inside the sensor driver; values arrive here
/// already filtered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub roll: f32,
    pub pitch: f32,
    pub tilt_detected: bool,
}
