//! Analytic trajectories with known ground truth
//!
//! Used to check the integrators and the full pipeline against closed-form
//! motion. Sensor readings are noise-free; callers add bias or noise as needed.

use crate::types::{
    yaw_rotation, Attitude, GnssTrack, InertialBatch, SensorSeries, Vec3, WorldSeries,
};

#[derive(Clone, Debug)]
pub struct SyntheticTrajectory {
    pub dt: f64,
    pub times: Vec<f64>,
    /// Body-frame specific force without gravity [m/s²]
    pub accelerations: SensorSeries,
    /// Body-frame angular velocity [rad/s]
    pub angular_velocities: SensorSeries,
    pub velocities: WorldSeries,
    pub positions: WorldSeries,
    pub attitude: Vec<Attitude>,
}

fn sample_times(dt: f64, duration: f64) -> Vec<f64> {
    let steps = (duration / dt).round() as usize;
    (0..=steps).map(|i| i as f64 * dt).collect()
}

impl SyntheticTrajectory {
    /// Straight line along world x from rest under constant acceleration.
    pub fn linear(accel: f64, dt: f64, duration: f64) -> Self {
        let times = sample_times(dt, duration);
        Self {
            dt,
            accelerations: times.iter().map(|_| Vec3::new(accel, 0.0, 0.0)).collect(),
            angular_velocities: times.iter().map(|_| Vec3::zeros()).collect(),
            velocities: times.iter().map(|t| Vec3::new(accel * t, 0.0, 0.0)).collect(),
            positions: times
                .iter()
                .map(|t| Vec3::new(0.5 * accel * t * t, 0.0, 0.0))
                .collect(),
            attitude: vec![Attitude::identity(); times.len()],
            times,
        }
    }

    /// Tangential acceleration `accel` from rest while yawing at `yaw_rate`.
    ///
    /// World speed grows as `accel * t` along heading `yaw_rate * t`, so the
    /// body frame also sees the centripetal term `accel * yaw_rate * t` on y.
    pub fn accelerated_turn(accel: f64, yaw_rate: f64, dt: f64, duration: f64) -> Self {
        let times = sample_times(dt, duration);
        let w = yaw_rate;
        let position = |t: f64| {
            let (s, c) = (w * t).sin_cos();
            Vec3::new(
                accel * (c - 1.0 + w * t * s) / (w * w),
                accel * (s - w * t * c) / (w * w),
                0.0,
            )
        };
        Self {
            dt,
            accelerations: times
                .iter()
                .map(|t| Vec3::new(accel, accel * w * t, 0.0))
                .collect(),
            angular_velocities: times.iter().map(|_| Vec3::new(0.0, 0.0, w)).collect(),
            velocities: times
                .iter()
                .map(|t| {
                    let (s, c) = (w * t).sin_cos();
                    Vec3::new(c, s, 0.0) * (accel * t)
                })
                .collect(),
            positions: times.iter().map(|&t| position(t)).collect(),
            attitude: times.iter().map(|t| yaw_rotation(w * t)).collect(),
            times,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Prepend `duration` seconds at rest ahead of the motion.
    pub fn with_rest(self, duration: f64) -> Self {
        let rest = (duration / self.dt).round() as usize;
        let offset = rest as f64 * self.dt;
        let start_attitude = self.attitude.first().copied().unwrap_or_else(Attitude::identity);
        let start_position = self.positions.first().copied().unwrap_or_else(Vec3::zeros);

        let prefix = |value: Vec3, series: &[Vec3]| -> Vec<Vec3> {
            std::iter::repeat(value).take(rest).chain(series.iter().copied()).collect()
        };

        Self {
            dt: self.dt,
            times: (0..rest)
                .map(|i| i as f64 * self.dt)
                .chain(self.times.iter().map(|t| t + offset))
                .collect(),
            accelerations: prefix(Vec3::zeros(), self.accelerations.as_slice()).into(),
            angular_velocities: prefix(Vec3::zeros(), self.angular_velocities.as_slice()).into(),
            velocities: prefix(Vec3::zeros(), self.velocities.as_slice()).into(),
            positions: prefix(start_position, self.positions.as_slice()).into(),
            attitude: std::iter::repeat(start_attitude)
                .take(rest)
                .chain(self.attitude.iter().copied())
                .collect(),
        }
    }

    /// Sensor readings as a recorder would deliver them, gravity along body +z.
    pub fn to_batch(&self, gravity: f64) -> InertialBatch {
        InertialBatch {
            times: self.times.clone(),
            accelerations: self
                .accelerations
                .iter()
                .map(|a| a + Vec3::new(0.0, 0.0, gravity))
                .collect(),
            angular_velocities: self.angular_velocities.to_vec(),
            speed: Some(self.velocities.iter().map(|v| v.norm()).collect()),
            gnss: None,
        }
    }

    /// Fixes every `every` samples, placing the local origin at
    /// (`origin_lat`, `origin_lon`) [rad].
    pub fn gnss_track(&self, origin_lat: f64, origin_lon: f64, every: usize, earth_radius: f64) -> GnssTrack {
        let every = every.max(1);
        let mut track = GnssTrack::default();
        for i in (0..self.len()).step_by(every) {
            let p = self.positions[i];
            let lat = origin_lat + p.y / earth_radius;
            track.times.push(self.times[i]);
            track.latitude.push(lat);
            track.longitude.push(origin_lon + p.x / (earth_radius * (0.5 * (lat + origin_lat)).cos()));
            track.altitude.push(p.z);
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_turn_closed_form() {
        let turn = SyntheticTrajectory::accelerated_turn(0.1, 0.1, 0.01, 100.0);
        assert_eq!(turn.len(), 10_001);
        let end = turn.positions.last().unwrap();
        assert_abs_diff_eq!(end.x, -72.8, epsilon = 0.1);
        assert_abs_diff_eq!(end.y, 78.5, epsilon = 0.1);
        // world acceleration from the body readings matches d/dt of velocity
        let k = 5000;
        let world = turn.attitude[k] * turn.accelerations[k];
        let numeric = (turn.velocities[k + 1] - turn.velocities[k - 1]) / (2.0 * turn.dt);
        assert_abs_diff_eq!(world, numeric, epsilon = 1e-4);
    }

    #[test]
    fn test_with_rest() {
        let line = SyntheticTrajectory::linear(1.0, 0.1, 1.0).with_rest(2.0);
        assert_eq!(line.len(), 31);
        assert_abs_diff_eq!(line.times[20], 2.0, epsilon = 1e-12);
        assert_eq!(line.accelerations[19], Vec3::zeros());
        assert_eq!(line.accelerations[20], Vec3::new(1.0, 0.0, 0.0));
        assert!(line.times.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_batch_and_track() {
        let line = SyntheticTrajectory::linear(1.0, 0.1, 10.0);
        let batch = line.to_batch(9.81);
        assert_eq!(batch.accelerations[0], Vec3::new(1.0, 0.0, 9.81));
        assert_abs_diff_eq!(batch.speed.as_ref().unwrap()[100], 10.0, epsilon = 1e-9);

        let track = line.gnss_track(0.5, 0.1, 10, 6_371_000.0);
        assert_eq!(track.len(), 11);
        assert!(track.longitude[10] > track.longitude[0]);
    }
}
