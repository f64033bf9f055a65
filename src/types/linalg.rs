//! Linear algebra aliases and rotation helpers shared by every stage
//!
//! Quaternions follow nalgebra's Hamilton convention: `q * v` is the sandwich
//! product q·v·q⁻¹ on a pure-vector quaternion.

use nalgebra::{UnitQuaternion, Vector3};

pub type Vec3 = Vector3<f64>;
pub type Attitude = UnitQuaternion<f64>;

/// Rotation vectors shorter than this are treated as the identity rotation.
pub const ROTATION_EPSILON: f64 = 1e-12;

/// exp(θ/2) of a rotation vector θ = angle * axis.
pub fn quat_from_rotation_vector(rotation: &Vec3) -> Attitude {
    if rotation.norm() < ROTATION_EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::from_scaled_axis(*rotation)
}

/// Rotation about the vertical axis by `angle` radians.
pub fn yaw_rotation(angle: f64) -> Attitude {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle)
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let mut wrapped = angle % (2.0 * PI);
    if wrapped <= -PI {
        wrapped += 2.0 * PI;
    } else if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Mean of a slice of vectors, `None` when empty.
pub fn mean(samples: &[Vec3]) -> Option<Vec3> {
    if samples.is_empty() {
        return None;
    }
    let sum = samples.iter().fold(Vec3::zeros(), |acc, v| acc + v);
    Some(sum / samples.len() as f64)
}
