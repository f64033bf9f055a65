use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::Range;

use crate::config::XyAlignConfig;
use crate::error::{ensure_len, FusionResult};
use crate::types::{mean, yaw_rotation, SensorSeries, Vec3};

/// Outcome of the horizontal-plane alignment
#[derive(Clone, Debug)]
pub struct XyAlignment {
    pub accelerations: SensorSeries,
    pub angular_velocities: SensorSeries,
    /// Rotation about z that was applied [rad], 0 for a no-op
    pub angle: f64,
    pub bad_before: usize,
    pub bad_after: usize,
    /// Number of sign quadrants that produced a qualifying window
    pub candidates: usize,
    pub applied: bool,
}

/// Lateral acceleration on both axes while the vehicle is not yawing: only a
/// yaw-misaligned sensor reads that.
fn is_bad_alignment(accel: &Vec3, gyro: &Vec3, config: &XyAlignConfig) -> bool {
    accel.x.abs() > config.accel_threshold
        && accel.y.abs() > config.accel_threshold
        && gyro.z.abs() < config.yaw_rate_threshold
}

pub fn count_bad_alignment(accel: &[Vec3], gyro: &[Vec3], config: &XyAlignConfig) -> usize {
    accel
        .iter()
        .zip(gyro)
        .filter(|(a, w)| is_bad_alignment(a, w, config))
        .count()
}

/// Longest run of bad-alignment samples whose (a_x, a_y) signs match.
fn longest_run(
    accel: &[Vec3],
    gyro: &[Vec3],
    signs: (f64, f64),
    config: &XyAlignConfig,
) -> Option<Range<usize>> {
    let matches = |i: usize| {
        let a = &accel[i];
        is_bad_alignment(a, &gyro[i], config)
            && a.x.signum() == signs.0
            && a.y.signum() == signs.1
    };

    let mut best: Option<Range<usize>> = None;
    let mut start: Option<usize> = None;
    for i in 0..=accel.len() {
        let inside = i < accel.len() && matches(i);
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                let longer = best.as_ref().map_or(true, |b| i - s > b.len());
                if i - s >= config.min_run_samples && longer {
                    best = Some(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    best
}

/// Rotation about z that zeroes the y component of `v`, folded into
/// (-π/2, π/2] so the vector lands on whichever x half-axis is nearer.
pub fn cross_axis_angle(v: &Vec3) -> f64 {
    let angle = -v.y.atan2(v.x);
    if angle > FRAC_PI_2 {
        angle - PI
    } else if angle <= -FRAC_PI_2 {
        angle + PI
    } else {
        angle
    }
}

fn rotate_xy(series: &SensorSeries, angle: f64) -> SensorSeries {
    let rotation = yaw_rotation(angle);
    series.map(|v| rotation * v)
}

/// Detect a yaw-misaligned sensor and rotate it in the horizontal plane.
///
/// Each sign quadrant of (a_x, a_y) contributes its longest qualifying window
/// as a candidate. The candidate rotation leaving the fewest bad-alignment
/// samples wins, and only if it beats leaving the data untouched.
pub fn align_xy_plane(
    accelerations: &SensorSeries,
    angular_velocities: &SensorSeries,
    config: &XyAlignConfig,
) -> FusionResult<XyAlignment> {
    ensure_len("angular velocities", accelerations.len(), angular_velocities.len())?;

    let bad_before = count_bad_alignment(accelerations, angular_velocities, config);
    let mut candidates = 0;
    let mut best: Option<(f64, usize, SensorSeries)> = None;

    for signs in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
        let Some(run) = longest_run(accelerations, angular_velocities, signs, config) else {
            continue;
        };
        candidates += 1;
        let window_mean = mean(&accelerations[run.clone()]).unwrap_or_else(Vec3::zeros);
        let angle = cross_axis_angle(&window_mean);
        let rotated = rotate_xy(accelerations, angle);
        let remaining = count_bad_alignment(&rotated, angular_velocities, config);
        log::debug!(
            "XY candidate {:?} over samples {}..{}: {:.2} deg leaves {} bad samples",
            signs,
            run.start,
            run.end,
            angle.to_degrees(),
            remaining
        );
        if best.as_ref().map_or(true, |(_, count, _)| remaining < *count) {
            best = Some((angle, remaining, rotated));
        }
    }

    match best {
        Some((angle, bad_after, rotated)) if bad_after < bad_before => {
            log::info!(
                "XY alignment: rotated {:.2} deg, bad samples {} -> {}",
                angle.to_degrees(),
                bad_before,
                bad_after
            );
            Ok(XyAlignment {
                accelerations: rotated,
                angular_velocities: rotate_xy(angular_velocities, angle),
                angle,
                bad_before,
                bad_after,
                candidates,
                applied: true,
            })
        }
        _ => {
            log::debug!(
                "XY alignment skipped: {} candidate window(s), {} bad samples",
                candidates,
                bad_before
            );
            Ok(XyAlignment {
                accelerations: accelerations.clone(),
                angular_velocities: angular_velocities.clone(),
                angle: 0.0,
                bad_before,
                bad_after: bad_before,
                candidates,
                applied: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Straight-line acceleration bursts seen through a sensor yawed by `mount`.
    fn yawed_drive(mount: f64, n: usize) -> (SensorSeries, SensorSeries) {
        let to_sensor = yaw_rotation(-mount);
        let accel = (0..n)
            .map(|i| {
                let forward = if (100..400).contains(&i) {
                    1.0
                } else if (600..800).contains(&i) {
                    -0.8
                } else {
                    0.0
                };
                to_sensor * Vec3::new(forward, 0.0, 0.0)
            })
            .collect();
        let gyro = (0..n).map(|_| Vec3::zeros()).collect();
        (accel, gyro)
    }

    #[test]
    fn test_cross_axis_angle_quadrants() {
        for v in [
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(1.0, -0.5, 0.0),
            Vec3::new(-1.0, 0.5, 0.0),
            Vec3::new(-1.0, -0.5, 0.0),
        ] {
            let angle = cross_axis_angle(&v);
            assert!(angle.abs() <= FRAC_PI_2);
            let rotated = yaw_rotation(angle) * v;
            assert_abs_diff_eq!(rotated.y, 0.0, epsilon = 1e-12);
            // minimal rotation keeps the x sign
            assert_eq!(rotated.x.signum(), v.x.signum());
        }
    }

    #[test]
    fn test_yawed_sensor_is_corrected() {
        let (accel, gyro) = yawed_drive(0.5, 1000);
        let config = XyAlignConfig::default();
        let result = align_xy_plane(&accel, &gyro, &config).unwrap();

        assert!(result.applied);
        assert_eq!(result.bad_before, 500);
        assert_eq!(result.bad_after, 0);
        assert_abs_diff_eq!(result.angle, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(result.accelerations[200], Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_no_candidate_is_noop() {
        let (accel, gyro) = yawed_drive(0.0, 1000);
        let result = align_xy_plane(&accel, &gyro, &XyAlignConfig::default()).unwrap();
        assert!(!result.applied);
        assert_eq!(result.candidates, 0);
        assert_eq!(result.accelerations, accel);
    }

    #[test]
    fn test_turning_vehicle_is_not_misaligned() {
        let (accel, _) = yawed_drive(0.5, 1000);
        let gyro: SensorSeries = (0..1000).map(|_| Vec3::new(0.0, 0.0, 0.3)).collect();
        let result = align_xy_plane(&accel, &gyro, &XyAlignConfig::default()).unwrap();
        assert_eq!(result.bad_before, 0);
        assert!(!result.applied);
    }

    #[test]
    fn test_short_windows_are_ignored() {
        let (accel, gyro) = yawed_drive(0.5, 1000);
        let config = XyAlignConfig {
            min_run_samples: 400,
            ..XyAlignConfig::default()
        };
        let result = align_xy_plane(&accel, &gyro, &config).unwrap();
        assert_eq!(result.candidates, 0);
        assert!(!result.applied);
    }

    #[test]
    fn test_never_increases_bad_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = XyAlignConfig {
            min_run_samples: 3,
            ..XyAlignConfig::default()
        };
        for _ in 0..20 {
            let accel: SensorSeries = (0..500)
                .map(|_| Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0))
                .collect();
            let gyro: SensorSeries = (0..500)
                .map(|_| Vec3::new(0.0, 0.0, rng.gen_range(-0.02..0.02)))
                .collect();
            let result = align_xy_plane(&accel, &gyro, &config).unwrap();
            assert!(result.bad_after <= result.bad_before);
        }
    }
}
