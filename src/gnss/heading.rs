use std::ops::Range;

use super::kinematics::GnssKinematics;
use crate::config::HeadingConfig;
use crate::error::{ensure_len, FusionResult};
use crate::types::{wrap_angle, yaw_rotation, Attitude, StationaryInterval, Vec3, WorldSeries};

/// Non-stationary window used to compare GNSS and inertial bearings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionReference {
    pub start: usize,
    pub end: usize,
}

impl MotionReference {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Clone, Debug)]
pub struct HeadingAlignment {
    pub accelerations: WorldSeries,
    pub attitude: Vec<Attitude>,
    /// Applied yaw correction [rad], `None` when the window was unusable
    pub correction: Option<f64>,
    pub reference: Option<MotionReference>,
}

/// First gap between stationary intervals spanning at least `min_samples`.
pub fn find_motion_reference(
    stationary: &[StationaryInterval],
    len: usize,
    min_samples: usize,
) -> Option<MotionReference> {
    let mut cursor = 0;
    let bounds = stationary.iter().map(|s| (s.start, s.end)).chain([(len, len)]);
    for (start, end) in bounds {
        let gap = MotionReference {
            start: cursor,
            end: start.min(len),
        };
        if !gap.is_empty() && gap.len() >= min_samples {
            return Some(gap);
        }
        cursor = cursor.max(end);
    }
    None
}

fn bearing(v: &Vec3) -> f64 {
    v.y.atan2(v.x)
}

/// Horizontal GNSS displacement over the window minus what the velocity at
/// its first sample alone would have travelled.
fn gnss_change(times: &[f64], gnss: &GnssKinematics, window: &MotionReference) -> Vec3 {
    let (first, last) = (window.start, window.end - 1);
    let span = times[last] - times[first];
    let mut change = gnss.positions[last] - gnss.positions[first] - gnss.velocities[first] * span;
    change.z = 0.0;
    change
}

/// Trapezoidal integral of `velocity - velocity[start]` over the window.
///
/// Independent of the constant the velocity was integrated from.
fn inertial_change(times: &[f64], velocity: &WorldSeries, window: &MotionReference) -> Vec3 {
    let base = velocity[window.start];
    let range = window.range();
    let mut change = times[range.clone()]
        .windows(2)
        .zip(velocity[range].windows(2))
        .fold(Vec3::zeros(), |acc, (t, v)| {
            acc + ((v[0] + v[1]) * 0.5 - base) * (t[1] - t[0])
        });
    change.z = 0.0;
    change
}

/// Rotate the world frame about z so inertial motion agrees with the GNSS
/// bearing over the motion reference window.
///
/// Both sides compare the displacement gained beyond the starting velocity,
/// so a drive already under way when the window opens is handled the same
/// as one starting from rest. `inertial` is world-frame velocity from
/// un-aided integration; its initial value does not matter.
pub fn align_heading(
    times: &[f64],
    gnss: &GnssKinematics,
    inertial: &WorldSeries,
    accelerations: &WorldSeries,
    attitude: &[Attitude],
    stationary: &[StationaryInterval],
    config: &HeadingConfig,
) -> FusionResult<HeadingAlignment> {
    let n = accelerations.len();
    ensure_len("heading times", n, times.len())?;
    ensure_len("gnss positions", n, gnss.positions.len())?;
    ensure_len("gnss velocities", n, gnss.velocities.len())?;
    ensure_len("inertial reference", n, inertial.len())?;
    ensure_len("attitude", n, attitude.len())?;

    let unchanged = |reference| HeadingAlignment {
        accelerations: accelerations.clone(),
        attitude: attitude.to_vec(),
        correction: None,
        reference,
    };

    let Some(reference) = find_motion_reference(stationary, n, config.min_motion_samples) else {
        log::warn!(
            "Heading alignment skipped: no motion window of {} samples",
            config.min_motion_samples
        );
        return Ok(unchanged(None));
    };

    let measured = gnss_change(times, gnss, &reference);
    let integrated = inertial_change(times, inertial, &reference);

    if measured.norm() < config.min_displacement || integrated.norm() < config.min_inertial_norm {
        log::warn!(
            "Heading alignment skipped: degenerate window {}..{} (gnss {:.2} m, inertial {:.2} m)",
            reference.start,
            reference.end,
            measured.norm(),
            integrated.norm()
        );
        return Ok(unchanged(Some(reference)));
    }

    let correction = wrap_angle(bearing(&measured) - bearing(&integrated));
    log::info!(
        "Heading alignment: {:.2} deg from samples {}..{}",
        correction.to_degrees(),
        reference.start,
        reference.end
    );

    let rotation = yaw_rotation(correction);
    Ok(HeadingAlignment {
        accelerations: accelerations.map(|a| rotation * a),
        attitude: attitude.iter().map(|q| rotation * q).collect(),
        correction: Some(correction),
        reference: Some(reference),
    })
}
