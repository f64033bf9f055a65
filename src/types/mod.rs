pub mod frame;
pub mod linalg;

pub use frame::*;
pub use linalg::*;

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open index range `[start, end)` where the vehicle is at rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationaryInterval {
    pub start: usize,
    pub end: usize,
}

impl StationaryInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// GNSS fixes with their own timestamps (seconds, same clock as the inertial batch)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GnssTrack {
    pub times: Vec<f64>,
    /// Latitude in radians
    pub latitude: Vec<f64>,
    /// Longitude in radians
    pub longitude: Vec<f64>,
    /// Altitude in meters
    pub altitude: Vec<f64>,
}

impl GnssTrack {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// One recording, already unit-converted by the input collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InertialBatch {
    pub times: Vec<f64>,
    /// Sensor-frame accelerations in m/s² (gravity included)
    pub accelerations: Vec<Vec3>,
    /// Sensor-frame angular velocities in rad/s
    pub angular_velocities: Vec<Vec3>,
    /// Scalar speed in m/s on the inertial grid, when the recorder provides one
    pub speed: Option<Vec<f64>>,
    pub gnss: Option<GnssTrack>,
}

impl InertialBatch {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
