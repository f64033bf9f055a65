//! GNSS aiding: local kinematics from fixes and absolute heading

pub mod heading;
pub mod kinematics;

pub use heading::{align_heading, find_motion_reference, HeadingAlignment, MotionReference};
pub use kinematics::{
    accelerations, differentiate, haversine_distance, positions_from_geodetic, resample_linear,
    speeds, track_distance, velocities, GnssKinematics,
};
