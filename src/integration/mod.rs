//! Numerical integration: attitude from angular rate, velocity and position
//! from acceleration.

pub mod attitude;
pub mod parabolic;

pub use attitude::{accumulate_rotations, integrate_attitude, propagate_attitude, AttitudeSolution};
pub use parabolic::{
    cumulative_integrate, integrate_deltas, integrate_series, parabolic_deltas,
    trapezoidal_deltas, Adjustment, ParabolaFit,
};
