//! Signal conditioning and sensor-frame calibration stages

pub mod disturbance;
pub mod gyro_bias;
pub mod sign_check;
pub mod stationary;
pub mod xy_align;
pub mod z_align;

pub use disturbance::{reduce_disturbance, trim_edges, MovingAverage};
pub use gyro_bias::remove_gyro_bias;
pub use sign_check::sign_inversion_is_necessary;
pub use stationary::{detect_stationary, detect_with_relaxation, StationaryDetection};
pub use xy_align::{align_xy_plane, count_bad_alignment, XyAlignment};
pub use z_align::{align_z_axis, gravity_alignment, remove_gravity, ZAlignment};
