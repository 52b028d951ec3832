//! Utility modules and re-exports for the control core.
//!
//! - `actions`: pollable actions, composition and the scheduler
//! - `config`: tuning structs loaded at construction
//! - `controllers`: mechanism, drive, input handling and the PCA9685 backend
//! - `hal`: hardware traits, errors and clocks
//! - `localization`: encoder overflow handling and wheel odometry
//! - `math`: geometry, kinematics, motion profiles and trajectories
//! - `tuning`: live tuning channel

pub mod actions;
pub mod config;
pub mod controllers;
pub mod hal;
pub mod localization;
pub mod math;
pub mod tuning;

pub use actions::{Action, ActionBuilder, ActionError, Scheduler, Status};
pub use controllers::{drive::MecanumDrive, mechanism::Mechanism};
pub use embassy_time::{Duration, Instant};
pub use math::geometry::{Pose2d, PoseVelocity2d, Rotation2d, Twist2d, Vector2d};
