//! Tunable parameters for every reconstruction stage
//!
//! All sections deserialize with `#[serde(default)]`, so a JSON config only
//! needs the fields it overrides.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub stationary: StationaryConfig,
    pub disturbance: DisturbanceConfig,
    pub z_align: ZAlignConfig,
    pub xy_align: XyAlignConfig,
    pub attitude: AttitudeConfig,
    pub heading: HeadingConfig,
    pub integration: IntegrationConfig,
    pub gnss: GnssConfig,
    pub sign_check: SignCheckConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationaryConfig {
    /// Speed below which the vehicle counts as stationary [m/s]
    pub speed_threshold: f64,
    /// A run must be strictly longer than this to count [samples]
    pub min_samples: usize,
    /// Threshold widening per relaxation step [m/s]
    pub relax_step: f64,
    /// Maximum number of relaxation steps before giving up
    pub max_relax_steps: usize,
}

impl Default for StationaryConfig {
    fn default() -> Self {
        Self {
            speed_threshold: 0.2,
            min_samples: 10,
            relax_step: 0.05,
            max_relax_steps: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceConfig {
    /// Moving-average window [samples]
    pub window: usize,
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        Self { window: 20 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZAlignConfig {
    /// Gravity tilt that triggers a mid-stream re-alignment [degrees]
    pub realign_tolerance_deg: f64,
}

impl Default for ZAlignConfig {
    fn default() -> Self {
        Self {
            realign_tolerance_deg: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XyAlignConfig {
    /// |a_x| and |a_y| must both exceed this [m/s²]
    pub accel_threshold: f64,
    /// |ω_z| must stay below this [rad/s]
    pub yaw_rate_threshold: f64,
    /// Minimum candidate run length [samples]
    pub min_run_samples: usize,
}

impl Default for XyAlignConfig {
    fn default() -> Self {
        Self {
            accel_threshold: 0.1,
            yaw_rate_threshold: 0.01,
            min_run_samples: 100,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttitudeConfig {
    /// Initial orientation as a rotation vector (axis * angle) [rad]
    pub initial_rotation: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    /// Minimum length of the non-stationary reference run [samples]
    pub min_motion_samples: usize,
    /// GNSS displacement gained beyond the starting velocity below this makes
    /// the bearing meaningless [m]
    pub min_displacement: f64,
    /// Same for the inertial solution [m]
    pub min_inertial_norm: f64,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            min_motion_samples: 100,
            min_displacement: 1.0,
            min_inertial_norm: 1e-6,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaScheme {
    /// Three-point parabola fits (irregular-grid Simpson)
    #[default]
    Parabolic,
    /// Two-point trapezoids, kept for comparison
    Trapezoidal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub scheme: DeltaScheme,
    /// Blend velocity against GNSS every N samples
    pub velocity_adjust_period: usize,
    /// Blend position against GNSS every N samples
    pub position_adjust_period: usize,
    /// Weight of the reference in the blend, the integral keeps `1 - weight`
    pub blend_weight: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            scheme: DeltaScheme::Parabolic,
            velocity_adjust_period: 1,
            position_adjust_period: 1,
            blend_weight: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GnssConfig {
    /// Spherical earth radius [m]
    pub earth_radius: f64,
    /// Half-width of the centred finite difference [samples]
    pub derivative_half_window: usize,
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            earth_radius: 6_371_000.0,
            derivative_half_window: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignCheckConfig {
    /// Index of the forward axis in velocity vectors
    pub forward_axis: usize,
    /// Forward velocity below this flags an inverted sign convention [m/s]
    pub threshold: f64,
}

impl Default for SignCheckConfig {
    fn default() -> Self {
        Self {
            forward_axis: 0,
            threshold: -4.0,
        }
    }
}

impl FusionConfig {
    pub fn from_json_file(path: &Path) -> FusionResult<Self> {
        let file = File::open(path).map_err(|e| {
            FusionError::InvalidConfig(format!("cannot open {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| FusionError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> FusionResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FusionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FusionResult<()> {
        let invalid =
            |msg: &str| -> FusionResult<()> { Err(FusionError::InvalidConfig(msg.to_string())) };

        if !(self.stationary.speed_threshold > 0.0) {
            return invalid("stationary.speed_threshold must be positive");
        }
        if self.stationary.relax_step < 0.0 {
            return invalid("stationary.relax_step must not be negative");
        }
        if self.disturbance.window == 0 {
            return invalid("disturbance.window must be at least 1");
        }
        if !(self.z_align.realign_tolerance_deg > 0.0) {
            return invalid("z_align.realign_tolerance_deg must be positive");
        }
        if self.xy_align.min_run_samples == 0 {
            return invalid("xy_align.min_run_samples must be at least 1");
        }
        if self.heading.min_motion_samples < 2 {
            return invalid("heading.min_motion_samples must be at least 2");
        }
        if self.integration.velocity_adjust_period == 0
            || self.integration.position_adjust_period == 0
        {
            return invalid("integration adjust periods must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.integration.blend_weight) {
            return invalid("integration.blend_weight must be within [0, 1]");
        }
        if !(self.gnss.earth_radius > 0.0) {
            return invalid("gnss.earth_radius must be positive");
        }
        if self.gnss.derivative_half_window == 0 {
            return invalid("gnss.derivative_half_window must be at least 1");
        }
        if self.sign_check.forward_axis > 2 {
            return invalid("sign_check.forward_axis must be 0, 1 or 2");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FusionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.disturbance.window, 20);
        assert_eq!(config.integration.blend_weight, 0.01);
        assert_eq!(config.sign_check.threshold, -4.0);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = FusionConfig::from_json_str(
            r#"{ "disturbance": { "window": 8 }, "integration": { "scheme": "trapezoidal" } }"#,
        )
        .unwrap();
        assert_eq!(config.disturbance.window, 8);
        assert_eq!(config.integration.scheme, DeltaScheme::Trapezoidal);
        // untouched sections keep their defaults
        assert_eq!(config.stationary.min_samples, 10);
        assert_eq!(config.integration.velocity_adjust_period, 1);
    }

    #[test]
    fn test_invalid_blend_weight_rejected() {
        let result = FusionConfig::from_json_str(r#"{ "integration": { "blend_weight": 1.5 } }"#);
        assert!(matches!(result, Err(FusionError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = FusionConfig::default();
        config.disturbance.window = 0;
        assert!(config.validate().is_err());
    }
}
