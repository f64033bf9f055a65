//! End-to-end reconstruction: raw inertial batch to world-frame trajectory
//!
//! Stages run strictly in sequence, each one a pure transform of the previous
//! output. GNSS, when present, supplies absolute heading and the periodic
//! blend reference for velocity and position.

use crate::calibration::{
    align_xy_plane, align_z_axis, detect_with_relaxation, reduce_disturbance, remove_gravity,
    remove_gyro_bias, sign_inversion_is_necessary, trim_edges,
};
use crate::config::FusionConfig;
use crate::error::{ensure_len, FusionError, FusionResult};
use crate::gnss::{
    align_heading, positions_from_geodetic, resample_linear, track_distance, GnssKinematics,
};
use crate::integration::{integrate_attitude, integrate_series, Adjustment};
use crate::types::{
    quat_from_rotation_vector, Attitude, InertialBatch, SensorSeries, StationaryInterval, Vec3,
    WorldSeries,
};
use crate::units::{normalize_timestamps, validate_finite, validate_timestamps};

/// Diagnostics collected while the pipeline runs
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineReport {
    pub stationary_intervals: Vec<StationaryInterval>,
    /// Speed threshold that produced the intervals, after any relaxation [m/s]
    pub speed_threshold: f64,
    pub relax_steps: usize,
    /// Samples dropped from each end by the disturbance filter
    pub trimmed_samples: usize,
    pub z_rotation: Attitude,
    pub z_realignments: usize,
    /// Yaw applied by the XY aligner [rad], `None` when skipped
    pub xy_angle: Option<f64>,
    pub heading_correction: Option<f64>,
    pub sign_inverted: bool,
    pub gnss_aided: bool,
    /// Great-circle length of the GNSS track [m]
    pub gnss_distance: Option<f64>,
}

/// World-frame trajectory on the filtered time grid
#[derive(Clone, Debug)]
pub struct Reconstruction {
    pub times: Vec<f64>,
    pub positions: WorldSeries,
    pub velocities: WorldSeries,
    pub accelerations: WorldSeries,
    pub attitude: Vec<Attitude>,
    pub report: PipelineReport,
}

#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: FusionConfig,
}

impl Pipeline {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    fn validate(&self, batch: &InertialBatch) -> FusionResult<()> {
        self.config.validate()?;
        let n = batch.len();
        ensure_len("accelerations", n, batch.accelerations.len())?;
        ensure_len("angular velocities", n, batch.angular_velocities.len())?;
        if let Some(speed) = &batch.speed {
            ensure_len("speed", n, speed.len())?;
            if let Some(index) = speed.iter().position(|v| !v.is_finite()) {
                return Err(FusionError::NonFinite {
                    what: "speed",
                    index,
                });
            }
        }
        if batch.speed.is_none() && batch.gnss.as_ref().map_or(true, |g| g.is_empty()) {
            return Err(FusionError::MissingSpeedReference);
        }
        validate_timestamps(&batch.times)?;
        validate_finite("accelerations", &batch.accelerations)?;
        validate_finite("angular velocities", &batch.angular_velocities)?;
        Ok(())
    }

    pub fn run(&self, batch: &InertialBatch) -> FusionResult<Reconstruction> {
        self.validate(batch)?;
        let config = &self.config;
        let scheme = config.integration.scheme;
        let origin = batch.times.first().copied().unwrap_or(0.0);
        let raw_times = normalize_timestamps(&batch.times);
        log::info!(
            "Reconstructing {} samples over {:.1} s",
            raw_times.len(),
            raw_times.last().copied().unwrap_or(0.0)
        );

        let mut gnss_distance = None;
        let gnss_positions = match batch.gnss.as_ref().filter(|g| !g.is_empty()) {
            Some(track) => {
                let local = positions_from_geodetic(track, config.gnss.earth_radius)?;
                let fix_times: Vec<f64> = track.times.iter().map(|t| t - origin).collect();
                let distance = track_distance(track, config.gnss.earth_radius);
                log::info!("GNSS aiding with {} fixes over {:.1} m", track.len(), distance);
                gnss_distance = Some(distance);
                Some(resample_linear(&fix_times, &local, &raw_times)?)
            }
            None => None,
        };

        // Disturbance filter; companion series are trimmed to the same grid
        let window = config.disturbance.window;
        let accel = SensorSeries::new(batch.accelerations.clone());
        let gyro = SensorSeries::new(batch.angular_velocities.clone());
        let (times, accel) = reduce_disturbance(&raw_times, &accel, window)?;
        let (_, gyro) = reduce_disturbance(&raw_times, &gyro, window)?;
        let trimmed_samples = (batch.len() - times.len()) / 2;

        let gnss = match gnss_positions {
            Some(positions) => Some(GnssKinematics::from_positions(
                &times,
                WorldSeries::new(trim_edges(&positions, window)),
                config.gnss.derivative_half_window,
            )?),
            None => None,
        };

        let speed = match (&gnss, &batch.speed) {
            (Some(reference), _) => reference.speeds.clone(),
            (None, Some(speed)) => trim_edges(speed, window),
            (None, None) => return Err(FusionError::MissingSpeedReference),
        };

        let detection = detect_with_relaxation(&speed, &config.stationary)?;
        let intervals = detection.intervals;
        log::info!(
            "{} stationary interval(s) at {:.2} m/s",
            intervals.len(),
            detection.threshold
        );

        let gyro = remove_gyro_bias(&gyro, &intervals)?;
        let z = align_z_axis(&accel, &gyro, &intervals, &config.z_align)?;
        let accel = remove_gravity(&z.accelerations, &intervals[0])?;
        let xy = align_xy_plane(&accel, &z.angular_velocities, &config.xy_align)?;

        let initial_attitude = quat_from_rotation_vector(&Vec3::from(config.attitude.initial_rotation));
        let solution = integrate_attitude(
            &times,
            &xy.angular_velocities,
            &xy.accelerations,
            &initial_attitude,
            scheme,
        )?;

        let initial_velocity = match &gnss {
            Some(reference) => reference.velocities[0],
            None => Vec3::new(speed[0], 0.0, 0.0),
        };

        let (mut world_accel, attitude, heading_correction) = match &gnss {
            Some(reference) => {
                let unaided =
                    integrate_series(&times, &solution.accelerations, None, scheme, None)?;
                let heading = align_heading(
                    &times,
                    reference,
                    &unaided,
                    &solution.accelerations,
                    &solution.attitude,
                    &intervals,
                    &config.heading,
                )?;
                (heading.accelerations, heading.attitude, heading.correction)
            }
            None => (solution.accelerations, solution.attitude, None),
        };

        let blend = &config.integration;
        let velocity_adjust = gnss.as_ref().map(|reference| Adjustment {
            reference: reference.velocities.as_slice(),
            period: blend.velocity_adjust_period,
            weight: blend.blend_weight,
        });
        let mut velocity = integrate_series(
            &times,
            &world_accel,
            Some(initial_velocity),
            scheme,
            velocity_adjust.as_ref(),
        )?;

        // forward is a body axis, so judge the velocity in the vehicle frame
        let body_velocity: Vec<Vec3> = attitude
            .iter()
            .zip(velocity.iter())
            .map(|(q, v)| q.inverse_transform_vector(v))
            .collect();
        let sign_inverted = sign_inversion_is_necessary(&body_velocity, &config.sign_check);
        if sign_inverted {
            log::warn!("Forward velocity strongly negative, inverting acceleration and velocity signs");
            world_accel = world_accel.map(|a| -a);
            velocity = velocity.map(|v| -v);
        }

        let position_adjust = gnss.as_ref().map(|reference| Adjustment {
            reference: reference.positions.as_slice(),
            period: blend.position_adjust_period,
            weight: blend.blend_weight,
        });
        let initial_position = gnss.as_ref().map(|reference| reference.positions[0]);
        let positions = integrate_series(
            &times,
            &velocity,
            initial_position,
            scheme,
            position_adjust.as_ref(),
        )?;

        if let Some(end) = positions.last() {
            log::info!(
                "Reconstruction done: end position [{:.2}, {:.2}, {:.2}] m",
                end.x,
                end.y,
                end.z
            );
        }

        Ok(Reconstruction {
            report: PipelineReport {
                stationary_intervals: intervals,
                speed_threshold: detection.threshold,
                relax_steps: detection.relax_steps,
                trimmed_samples,
                z_rotation: z.rotation,
                z_realignments: z.realignments,
                xy_angle: xy.applied.then_some(xy.angle),
                heading_correction,
                sign_inverted,
                gnss_aided: gnss.is_some(),
                gnss_distance,
            },
            times,
            positions,
            velocities: velocity,
            accelerations: world_accel,
            attitude,
        })
    }
}
