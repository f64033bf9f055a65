use std::f64::consts::FRAC_PI_2;

use nalgebra::{UnitQuaternion, Vector3};

use super::stationary::check_intervals;
use crate::config::ZAlignConfig;
use crate::error::{ensure_len, FusionResult};
use crate::types::{
    mean, quat_from_rotation_vector, Attitude, SensorSeries, StationaryInterval, Vec3,
    ROTATION_EPSILON,
};

#[derive(Clone, Debug)]
pub struct ZAlignment {
    pub accelerations: SensorSeries,
    pub angular_velocities: SensorSeries,
    /// Total rotation applied to the sensor frame
    pub rotation: Attitude,
    /// Mid-stream re-alignments triggered by later stationary intervals
    pub realignments: usize,
}

/// Angle between a gravity estimate and the vertical axis [rad].
pub fn tilt_from_vertical(gravity: &Vec3) -> f64 {
    let norm = gravity.norm();
    if norm < ROTATION_EPSILON {
        return 0.0;
    }
    (gravity.dot(&Vec3::z()) / norm).clamp(-1.0, 1.0).acos()
}

/// Minimal rotation carrying `gravity` onto +z.
///
/// Gravity already vertical yields the identity; gravity pointing straight
/// down has no unique axis and yields a half turn about x.
pub fn gravity_alignment(gravity: &Vec3) -> Attitude {
    if gravity.norm() < ROTATION_EPSILON {
        return UnitQuaternion::identity();
    }
    let axis = gravity.cross(&Vec3::z());
    let angle = tilt_from_vertical(gravity);
    if axis.norm() < ROTATION_EPSILON * gravity.norm() {
        if angle < FRAC_PI_2 {
            return UnitQuaternion::identity();
        }
        return UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI);
    }
    quat_from_rotation_vector(&(axis.normalize() * angle))
}

fn rotate(series: &SensorSeries, rotation: &Attitude) -> SensorSeries {
    series.map(|v| rotation * v)
}

/// Rotate the sensor frame so gravity measured at rest points along +z.
///
/// The first stationary interval sets the alignment. Later intervals whose
/// gravity estimate tilts more than the configured tolerance re-align the
/// whole series again.
pub fn align_z_axis(
    accelerations: &SensorSeries,
    angular_velocities: &SensorSeries,
    intervals: &[StationaryInterval],
    config: &ZAlignConfig,
) -> FusionResult<ZAlignment> {
    ensure_len("angular velocities", accelerations.len(), angular_velocities.len())?;
    check_intervals("z-axis alignment", intervals, accelerations.len())?;

    let tolerance = config.realign_tolerance_deg.to_radians();

    let gravity = mean(&accelerations[intervals[0].range()]).unwrap_or_else(Vec3::zeros);
    let mut rotation = gravity_alignment(&gravity);
    log::info!(
        "Z alignment: gravity [{:.3}, {:.3}, {:.3}] tilted {:.2} deg",
        gravity.x,
        gravity.y,
        gravity.z,
        tilt_from_vertical(&gravity).to_degrees()
    );

    let mut accel = rotate(accelerations, &rotation);
    let mut gyro = rotate(angular_velocities, &rotation);
    let mut realignments = 0;

    for interval in &intervals[1..] {
        let local = mean(&accel[interval.range()]).unwrap_or_else(Vec3::zeros);
        let tilt = tilt_from_vertical(&local);
        if tilt > tolerance {
            log::warn!(
                "Sensor mount shifted: gravity tilted {:.2} deg at samples {}..{}, re-aligning",
                tilt.to_degrees(),
                interval.start,
                interval.end
            );
            let correction = gravity_alignment(&local);
            accel = rotate(&accel, &correction);
            gyro = rotate(&gyro, &correction);
            rotation = correction * rotation;
            realignments += 1;
        }
    }

    Ok(ZAlignment {
        accelerations: accel,
        angular_velocities: gyro,
        rotation,
        realignments,
    })
}

/// Subtract the vertical acceleration measured at rest in `interval`.
pub fn remove_gravity(
    accelerations: &SensorSeries,
    interval: &StationaryInterval,
) -> FusionResult<SensorSeries> {
    check_intervals("gravity removal", std::slice::from_ref(interval), accelerations.len())?;
    let g = mean(&accelerations[interval.range()]).map_or(0.0, |m| m.z);
    Ok(accelerations.map(|a| Vec3::new(a.x, a.y, a.z - g)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const G: f64 = 9.81;

    fn tilted(roll: f64, pitch: f64) -> Attitude {
        UnitQuaternion::from_euler_angles(roll, pitch, 0.0)
    }

    fn series_at_rest(mount: &Attitude, n: usize) -> (SensorSeries, SensorSeries) {
        // sensor sees gravity through the inverse of its mount rotation
        let g_sensor = mount.inverse() * Vec3::new(0.0, 0.0, G);
        let accel = (0..n).map(|_| g_sensor).collect();
        let gyro = (0..n).map(|_| mount.inverse() * Vec3::new(0.0, 0.0, 0.1)).collect();
        (accel, gyro)
    }

    #[test]
    fn test_tilted_mount_is_levelled() {
        let mount = tilted(0.2, -0.15);
        let (accel, gyro) = series_at_rest(&mount, 200);
        let intervals = [StationaryInterval::new(0, 50)];

        let aligned = align_z_axis(&accel, &gyro, &intervals, &ZAlignConfig::default()).unwrap();
        let g = mean(&aligned.accelerations[0..50]).unwrap();
        assert_abs_diff_eq!(g, Vec3::new(0.0, 0.0, G), epsilon = 1e-9);
        // yaw rate about true vertical ends up on the z axis too
        assert_abs_diff_eq!(aligned.angular_velocities[0], Vec3::new(0.0, 0.0, 0.1), epsilon = 1e-9);
        assert_eq!(aligned.realignments, 0);
    }

    #[test]
    fn test_already_aligned_is_identity() {
        let (accel, gyro) = series_at_rest(&UnitQuaternion::identity(), 100);
        let intervals = [StationaryInterval::new(0, 40)];
        let config = ZAlignConfig::default();

        let once = align_z_axis(&accel, &gyro, &intervals, &config).unwrap();
        let twice = align_z_axis(&once.accelerations, &once.angular_velocities, &intervals, &config).unwrap();
        assert_abs_diff_eq!(twice.rotation.angle(), 0.0, epsilon = 1e-12);
        assert_eq!(twice.accelerations, once.accelerations);
    }

    #[test]
    fn test_idempotent_after_tilt_correction() {
        let (accel, gyro) = series_at_rest(&tilted(0.3, 0.1), 100);
        let intervals = [StationaryInterval::new(0, 40)];
        let config = ZAlignConfig::default();

        let once = align_z_axis(&accel, &gyro, &intervals, &config).unwrap();
        let twice = align_z_axis(&once.accelerations, &once.angular_velocities, &intervals, &config).unwrap();
        assert!(twice.rotation.angle() < 1e-7);
        for (a, b) in once.accelerations.iter().zip(twice.accelerations.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_upside_down_sensor() {
        let q = gravity_alignment(&Vec3::new(0.0, 0.0, -G));
        assert_abs_diff_eq!(q * Vec3::new(0.0, 0.0, -G), Vec3::new(0.0, 0.0, G), epsilon = 1e-9);
        assert!(!q.w.is_nan());
    }

    #[test]
    fn test_shifted_mount_triggers_realignment() {
        let (accel_a, gyro_a) = series_at_rest(&UnitQuaternion::identity(), 100);
        let (accel_b, gyro_b) = series_at_rest(&tilted(0.4, 0.0), 100);
        let accel: SensorSeries = accel_a.iter().chain(accel_b.iter()).copied().collect();
        let gyro: SensorSeries = gyro_a.iter().chain(gyro_b.iter()).copied().collect();

        let intervals = [StationaryInterval::new(0, 50), StationaryInterval::new(120, 180)];
        let aligned = align_z_axis(&accel, &gyro, &intervals, &ZAlignConfig::default()).unwrap();
        assert_eq!(aligned.realignments, 1);
        let g = mean(&aligned.accelerations[120..180]).unwrap();
        assert!(tilt_from_vertical(&g) < 1e-9);
    }

    #[test]
    fn test_small_shift_within_tolerance_is_ignored() {
        let (accel_a, _) = series_at_rest(&UnitQuaternion::identity(), 100);
        let (accel_b, _) = series_at_rest(&tilted(0.05, 0.0), 100);
        let accel: SensorSeries = accel_a.iter().chain(accel_b.iter()).copied().collect();
        let gyro: SensorSeries = (0..200).map(|_| Vec3::zeros()).collect();

        let intervals = [StationaryInterval::new(0, 50), StationaryInterval::new(120, 180)];
        let aligned = align_z_axis(&accel, &gyro, &intervals, &ZAlignConfig::default()).unwrap();
        assert_eq!(aligned.realignments, 0);
    }

    #[test]
    fn test_remove_gravity() {
        let (accel, _) = series_at_rest(&UnitQuaternion::identity(), 60);
        let without_g = remove_gravity(&accel, &StationaryInterval::new(0, 30)).unwrap();
        assert_abs_diff_eq!(without_g[45], Vec3::zeros(), epsilon = 1e-12);
    }
}
