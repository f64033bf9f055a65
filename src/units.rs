//! Unit conversion and timestamp helpers for the input collaborator

use crate::error::{FusionError, FusionResult};
use crate::types::Vec3;

/// Standard gravity [m/s²]
pub const STANDARD_GRAVITY: f64 = 9.80665;

pub fn g_to_ms2(value_g: f64) -> f64 {
    value_g * STANDARD_GRAVITY
}

pub fn deg_to_rad(value_deg: f64) -> f64 {
    value_deg.to_radians()
}

pub fn kmh_to_ms(value_kmh: f64) -> f64 {
    value_kmh / 3.6
}

/// Convert raw accelerations from g and angular velocities from deg/s.
pub fn convert_inertial_units(accel_g: &[Vec3], gyro_deg: &[Vec3]) -> (Vec<Vec3>, Vec<Vec3>) {
    let accel = accel_g.iter().map(|a| a.map(g_to_ms2)).collect();
    let gyro = gyro_deg.iter().map(|w| w.map(deg_to_rad)).collect();
    (accel, gyro)
}

/// Shift timestamps so the first sample is at 0.
pub fn normalize_timestamps(times: &[f64]) -> Vec<f64> {
    match times.first() {
        Some(&origin) => times.iter().map(|t| t - origin).collect(),
        None => Vec::new(),
    }
}

/// Timestamps must be finite and non-decreasing.
pub fn validate_timestamps(times: &[f64]) -> FusionResult<()> {
    for (index, t) in times.iter().enumerate() {
        if !t.is_finite() {
            return Err(FusionError::NonFinite {
                what: "timestamps",
                index,
            });
        }
        if index > 0 && *t < times[index - 1] {
            return Err(FusionError::NonMonotonicTimestamps {
                index,
                previous: times[index - 1],
                current: *t,
            });
        }
    }
    Ok(())
}

/// Every component of every sample must be finite.
pub fn validate_finite(what: &'static str, samples: &[Vec3]) -> FusionResult<()> {
    match samples.iter().position(|v| !v.iter().all(|c| c.is_finite())) {
        Some(index) => Err(FusionError::NonFinite { what, index }),
        None => Ok(()),
    }
}
