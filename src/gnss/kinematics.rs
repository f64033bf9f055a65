//! GNSS fixes to local Cartesian kinematics
//!
//! The local frame is east-north-up anchored at the first fix, on a spherical
//! earth. Accurate enough for drives of a few tens of kilometres.

use crate::error::{ensure_len, FusionError, FusionResult};
use crate::types::{GnssTrack, Vec3, WorldSeries};
use crate::units::validate_timestamps;

/// Great-circle distance between two fixes given in radians [m].
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, earth_radius: f64) -> f64 {
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    earth_radius * c
}

/// Great-circle length of the whole track [m].
pub fn track_distance(track: &GnssTrack, earth_radius: f64) -> f64 {
    track
        .latitude
        .windows(2)
        .zip(track.longitude.windows(2))
        .map(|(lat, lon)| haversine_distance(lat[0], lon[0], lat[1], lon[1], earth_radius))
        .sum()
}

fn check_track(track: &GnssTrack) -> FusionResult<()> {
    ensure_len("gnss latitude", track.times.len(), track.latitude.len())?;
    ensure_len("gnss longitude", track.times.len(), track.longitude.len())?;
    ensure_len("gnss altitude", track.times.len(), track.altitude.len())?;
    validate_timestamps(&track.times)?;
    for (what, values) in [
        ("gnss latitude", &track.latitude),
        ("gnss longitude", &track.longitude),
        ("gnss altitude", &track.altitude),
    ] {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(FusionError::NonFinite { what, index });
        }
    }
    Ok(())
}

/// Accumulate per-fix displacements into local positions, first fix at origin.
///
/// East displacement is scaled by the cosine of the mean latitude of each step.
pub fn positions_from_geodetic(track: &GnssTrack, earth_radius: f64) -> FusionResult<WorldSeries> {
    check_track(track)?;

    let mut positions = Vec::with_capacity(track.len());
    let mut current = Vec3::zeros();
    for i in 0..track.len() {
        if i > 0 {
            let mid_lat = 0.5 * (track.latitude[i] + track.latitude[i - 1]);
            current.x += earth_radius * mid_lat.cos() * (track.longitude[i] - track.longitude[i - 1]);
            current.y += earth_radius * (track.latitude[i] - track.latitude[i - 1]);
            current.z += track.altitude[i] - track.altitude[i - 1];
        }
        positions.push(current);
    }
    Ok(WorldSeries::new(positions))
}

/// Finite-difference derivative, centred over `half_window` samples on each
/// side and one-sided where the window runs off either end.
pub fn differentiate(times: &[f64], values: &[Vec3], half_window: usize) -> FusionResult<Vec<Vec3>> {
    ensure_len("differentiated series", times.len(), values.len())?;
    if half_window == 0 {
        return Err(FusionError::InvalidConfig(
            "derivative half-window must be at least 1".to_string(),
        ));
    }
    let n = values.len();
    if n < 2 {
        return Err(FusionError::InsufficientSamples {
            what: "finite difference",
            needed: 2,
            found: n,
        });
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window).min(n - 1);
            let dt = times[hi] - times[lo];
            if !(dt > 0.0) {
                return Err(FusionError::NonMonotonicTimestamps {
                    index: hi,
                    previous: times[lo],
                    current: times[hi],
                });
            }
            Ok((values[hi] - values[lo]) / dt)
        })
        .collect()
}

pub fn velocities(times: &[f64], positions: &WorldSeries, half_window: usize) -> FusionResult<WorldSeries> {
    differentiate(times, positions, half_window).map(WorldSeries::new)
}

pub fn accelerations(times: &[f64], positions: &WorldSeries, half_window: usize) -> FusionResult<WorldSeries> {
    let velocity = velocities(times, positions, half_window)?;
    velocities(times, &velocity, half_window)
}

/// Ground speed, ignoring the vertical component.
pub fn speeds(velocities: &WorldSeries) -> Vec<f64> {
    velocities.iter().map(|v| v.xy().norm()).collect()
}

/// GNSS position, velocity and ground speed on a common time grid
#[derive(Clone, Debug, PartialEq)]
pub struct GnssKinematics {
    pub positions: WorldSeries,
    pub velocities: WorldSeries,
    pub speeds: Vec<f64>,
}

impl GnssKinematics {
    pub fn from_positions(
        times: &[f64],
        positions: WorldSeries,
        half_window: usize,
    ) -> FusionResult<Self> {
        let velocities = velocities(times, &positions, half_window)?;
        Ok(Self {
            speeds: speeds(&velocities),
            velocities,
            positions,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Linearly interpolate `values` sampled at `source_times` onto `target_times`.
/// Targets outside the source span take the nearest end value.
pub fn resample_linear(
    source_times: &[f64],
    values: &[Vec3],
    target_times: &[f64],
) -> FusionResult<Vec<Vec3>> {
    ensure_len("resampled series", source_times.len(), values.len())?;
    validate_timestamps(source_times)?;
    let (Some(&first), Some(&last)) = (source_times.first(), source_times.last()) else {
        return Err(FusionError::InsufficientSamples {
            what: "resampling",
            needed: 1,
            found: 0,
        });
    };

    let resampled = target_times
        .iter()
        .map(|&t| {
            if t <= first {
                return values[0];
            }
            if t >= last {
                return values[values.len() - 1];
            }
            // first source index with time > t; 1 <= upper < n here
            let upper = source_times.partition_point(|&s| s <= t);
            let lower = upper - 1;
            let span = source_times[upper] - source_times[lower];
            let frac = (t - source_times[lower]) / span;
            values[lower] + (values[upper] - values[lower]) * frac
        })
        .collect();
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const R: f64 = 6_371_000.0;

    fn track(latitude: Vec<f64>, longitude: Vec<f64>) -> GnssTrack {
        let n = latitude.len();
        GnssTrack {
            times: (0..n).map(|i| i as f64).collect(),
            latitude,
            longitude,
            altitude: (0..n).map(|i| 100.0 + i as f64).collect(),
        }
    }

    #[test]
    fn test_northward_track() {
        let lat: Vec<f64> = (0..5).map(|i| 0.8 + i as f64 * 1e-5).collect();
        let positions = positions_from_geodetic(&track(lat, vec![0.2; 5]), R).unwrap();
        assert_abs_diff_eq!(positions[0], Vec3::zeros());
        assert_abs_diff_eq!(positions[4], Vec3::new(0.0, 4.0 * R * 1e-5, 4.0), epsilon = 1e-6);
    }

    #[test]
    fn test_eastward_track_scales_with_latitude() {
        let lon: Vec<f64> = (0..3).map(|i| i as f64 * 1e-5).collect();
        let at_equator = positions_from_geodetic(&track(vec![0.0; 3], lon.clone()), R).unwrap();
        let at_60 = positions_from_geodetic(&track(vec![60f64.to_radians(); 3], lon), R).unwrap();
        assert_abs_diff_eq!(at_equator[2].x, 2.0 * R * 1e-5, epsilon = 1e-6);
        assert_abs_diff_eq!(at_60[2].x, R * 1e-5, epsilon = 1e-6);
    }

    #[test]
    fn test_local_distance_matches_haversine() {
        let lat = vec![0.8, 0.8 + 2e-5];
        let lon = vec![0.2, 0.2 + 3e-5];
        let positions = positions_from_geodetic(&track(lat.clone(), lon.clone()), R).unwrap();
        let d = haversine_distance(lat[0], lon[0], lat[1], lon[1], R);
        assert_abs_diff_eq!(positions[1].xy().norm(), d, epsilon = 1e-3);
    }

    #[test]
    fn test_track_distance_sums_segments() {
        // two northward legs and one eastward leg at the equator
        let lat = vec![0.0, 1e-5, 2e-5, 2e-5];
        let lon = vec![0.0, 0.0, 0.0, 3e-5];
        let distance = track_distance(&track(lat, lon), R);
        assert_abs_diff_eq!(distance, R * 5e-5, epsilon = 1e-3);
        assert_eq!(track_distance(&GnssTrack::default(), R), 0.0);
    }

    #[test]
    fn test_kinematics_from_positions() {
        let times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let positions: WorldSeries = times.iter().map(|t| Vec3::new(3.0 * t, 4.0 * t, 1.0)).collect();
        let kinematics = GnssKinematics::from_positions(&times, positions, 1).unwrap();
        assert_eq!(kinematics.len(), 10);
        assert_abs_diff_eq!(kinematics.velocities[5], Vec3::new(3.0, 4.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(kinematics.speeds[5], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_differentiate_quadratic() {
        let times: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let positions: WorldSeries = times.iter().map(|t| Vec3::new(t * t, 3.0 * t, 1.0)).collect();
        let velocity = velocities(&times, &positions, 1).unwrap();
        // centred difference is exact for a parabola on a uniform grid
        for i in 1..19 {
            assert_abs_diff_eq!(velocity[i], Vec3::new(2.0 * times[i], 3.0, 0.0), epsilon = 1e-9);
        }
        let accel = accelerations(&times, &positions, 1).unwrap();
        assert_abs_diff_eq!(accel[10].x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(speeds(&velocity)[10], (4.0 * times[10] * times[10] + 9.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_differentiate_rejects_repeated_fix_times() {
        let times = [0.0, 1.0, 1.0];
        let values = [Vec3::zeros(); 3];
        assert!(matches!(
            differentiate(&times, &values, 1),
            Err(FusionError::NonMonotonicTimestamps { .. })
        ));
    }

    #[test]
    fn test_resample_linear() {
        let source = [0.0, 1.0, 3.0];
        let values = [Vec3::zeros(), Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 0.0)];
        let out = resample_linear(&source, &values, &[-1.0, 0.5, 1.0, 2.0, 5.0]).unwrap();
        assert_abs_diff_eq!(out[0], Vec3::zeros());
        assert_abs_diff_eq!(out[1], Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(out[3], Vec3::new(2.0, 2.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(out[4], Vec3::new(2.0, 4.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_track_contract() {
        let mut bad = track(vec![0.0; 3], vec![0.0; 3]);
        bad.altitude.pop();
        assert!(matches!(
            positions_from_geodetic(&bad, R),
            Err(FusionError::LengthMismatch { .. })
        ));
        assert!(resample_linear(&[], &[], &[0.0]).is_err());
    }
}
