use crate::config::DeltaScheme;
use crate::error::{ensure_len, FusionResult};
use crate::types::{quat_from_rotation_vector, Attitude, SensorSeries, Vec3, WorldSeries};

use super::parabolic::integrate_deltas;

#[derive(Clone, Debug)]
pub struct AttitudeSolution {
    /// Specific force rotated into the world frame
    pub accelerations: WorldSeries,
    /// Orientation of the sensor frame in the world frame, one per sample
    pub attitude: Vec<Attitude>,
}

/// Chain per-sample rotation increments onto `initial`.
///
/// Angular velocity is measured in the body frame, so every increment is
/// applied on the left: `q_i = exp(½Δθ_i) · q_{i-1}`. Each product is
/// renormalised to keep the chain on the unit sphere.
pub fn accumulate_rotations(initial: &Attitude, increments: &[Vec3]) -> Vec<Attitude> {
    let mut attitude = Vec::with_capacity(increments.len());
    let mut current = *initial;
    for (i, delta) in increments.iter().enumerate() {
        if i > 0 {
            current = quat_from_rotation_vector(delta) * current;
            current.renormalize();
        }
        attitude.push(current);
    }
    attitude
}

/// Orientation at every sample from integrated angular velocity.
pub fn propagate_attitude(
    times: &[f64],
    angular_velocities: &SensorSeries,
    initial: &Attitude,
    scheme: DeltaScheme,
) -> FusionResult<Vec<Attitude>> {
    ensure_len("angular velocities", times.len(), angular_velocities.len())?;
    let increments = integrate_deltas(times, angular_velocities.as_slice(), scheme)?;
    Ok(accumulate_rotations(initial, &increments))
}

/// Integrate attitude and express every acceleration sample in the world frame.
pub fn integrate_attitude(
    times: &[f64],
    angular_velocities: &SensorSeries,
    accelerations: &SensorSeries,
    initial: &Attitude,
    scheme: DeltaScheme,
) -> FusionResult<AttitudeSolution> {
    ensure_len("accelerations", times.len(), accelerations.len())?;
    let attitude = propagate_attitude(times, angular_velocities, initial, scheme)?;

    let rotated: SensorSeries = attitude
        .iter()
        .zip(accelerations.iter())
        .map(|(q, a)| q * a)
        .collect();

    if let Some(last) = attitude.last() {
        let (roll, pitch, yaw) = last.euler_angles();
        log::debug!(
            "Attitude integrated over {} samples, final roll {:.2} pitch {:.2} yaw {:.2} deg",
            attitude.len(),
            roll.to_degrees(),
            pitch.to_degrees(),
            yaw.to_degrees()
        );
    }

    Ok(AttitudeSolution {
        accelerations: rotated.retag(),
        attitude,
    })
}
