//! Offline trajectory reconstruction from vehicle inertial recordings.
//!
//! Raw accelerometer and gyroscope streams are filtered, debiased and aligned
//! to the vehicle, integrated into attitude, velocity and position, and
//! optionally anchored on GNSS fixes.

pub mod calibration;
pub mod config;
pub mod error;
pub mod gnss;
pub mod integration;
pub mod pipeline;
pub mod synthetic;
pub mod types;
pub mod units;

pub use config::FusionConfig;
pub use error::{FusionError, FusionResult};
pub use pipeline::{Pipeline, PipelineReport, Reconstruction};
pub use types::{
    Attitude, FrameSeries, GnssTrack, InertialBatch, Sensor, SensorSeries, StationaryInterval,
    Vec3, World, WorldSeries,
};
