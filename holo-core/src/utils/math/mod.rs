//! Math utilities for the holonomic drive.
//!
//! - `geometry`: planar rigid-body types (poses, rotations, twists).
//! - `kinematics`: mecanum wheel model and power normalization.
//! - `profile`: trapezoidal motion profiles.
//! - `trajectory`: time-parameterized strafes and turns built from profiles.

pub mod geometry;
pub mod kinematics;
pub mod profile;
pub mod trajectory;
