//! Time-parameterized trajectories and turns.
//!
//! A [`Trajectory`] is an immutable function of time producing the target
//! pose, world-frame velocity and world-frame acceleration for
//! `0 <= t <= duration`. Followers sample it once per control cycle.

use crate::utils::config::MotionConstraints;

use super::{
    geometry::{Pose2d, PoseVelocity2d, Rotation2d, Vector2d},
    kinematics::MecanumKinematics,
    profile::TrapezoidProfile,
};

/// Below this length a strafe is treated as a point and has no duration.
const MIN_PATH_LENGTH: f64 = 1e-6;

/// Target state of a trajectory at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetSample {
    pub pose: Pose2d,
    /// Field-frame velocity.
    pub velocity: PoseVelocity2d,
    /// Field-frame acceleration.
    pub acceleration: PoseVelocity2d,
}

pub trait Trajectory {
    /// Total length in seconds.
    fn duration(&self) -> f64;

    /// Target at time `t`, clamped to `[0, duration]`.
    fn sample(
        &self,
        t: f64,
    ) -> TargetSample;

    /// Pose at the end of the trajectory.
    fn end_pose(&self) -> Pose2d {
        self.sample(self.duration()).pose
    }
}

impl<T: Trajectory + ?Sized> Trajectory for &T {
    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn sample(
        &self,
        t: f64,
    ) -> TargetSample {
        (**self).sample(t)
    }
}

/// Straight-line strafe with heading interpolated linearly along the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrajectory {
    begin: Pose2d,
    direction: Vector2d,
    length: f64,
    heading_change: f64,
    profile: TrapezoidProfile,
}

impl LinearTrajectory {
    /// Strafe from `begin` to `end_position`, turning onto `end_heading`
    /// along the way (or holding the starting heading when `None`).
    pub fn new(
        begin: Pose2d,
        end_position: Vector2d,
        end_heading: Option<Rotation2d>,
        constraints: &MotionConstraints,
        kinematics: &MecanumKinematics,
    ) -> Self {
        let delta = end_position - begin.position;
        let length = delta.norm();
        let heading_change = end_heading.map_or(0.0, |h| h - begin.heading);
        let direction = if length > MIN_PATH_LENGTH {
            delta.scale(1.0 / length)
        } else {
            Vector2d::ZERO
        };

        let turn_per_length = if length > MIN_PATH_LENGTH {
            libm::fabs(heading_change) / length
        } else {
            0.0
        };
        // Worst-case wheel speed per unit path speed, over any robot heading.
        let lateral = kinematics.lateral_multiplier();
        let wheel_gain =
            libm::sqrt(1.0 + lateral * lateral) + kinematics.track_width() * turn_per_length;
        let mut max_velocity = constraints.max_wheel_vel / wheel_gain;
        if turn_per_length > 0.0 {
            max_velocity = f64::min(max_velocity, constraints.max_ang_vel / turn_per_length);
        }

        let profile = TrapezoidProfile::new(
            if length > MIN_PATH_LENGTH { length } else { 0.0 },
            max_velocity,
            constraints.max_profile_accel,
            constraints.min_profile_accel,
        );

        Self {
            begin,
            direction,
            length,
            heading_change,
            profile,
        }
    }

    pub fn begin_pose(&self) -> Pose2d {
        self.begin
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

impl Trajectory for LinearTrajectory {
    fn duration(&self) -> f64 {
        self.profile.duration()
    }

    fn sample(
        &self,
        t: f64,
    ) -> TargetSample {
        let s = self.profile.sample(t);
        let turn_rate = if self.length > MIN_PATH_LENGTH {
            self.heading_change / self.length
        } else {
            0.0
        };
        TargetSample {
            pose: Pose2d {
                position: self.begin.position + self.direction.scale(s.position),
                heading: self.begin.heading + turn_rate * s.position,
            },
            velocity: PoseVelocity2d::new(
                self.direction.scale(s.velocity),
                turn_rate * s.velocity,
            ),
            acceleration: PoseVelocity2d::new(
                self.direction.scale(s.acceleration),
                turn_rate * s.acceleration,
            ),
        }
    }
}

/// Turn in place by a signed angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeTurn {
    begin: Pose2d,
    angle: f64,
    profile: TrapezoidProfile,
}

impl TimeTurn {
    pub fn new(
        begin: Pose2d,
        angle: f64,
        constraints: &MotionConstraints,
    ) -> Self {
        Self {
            begin,
            angle,
            profile: TrapezoidProfile::new(
                angle,
                constraints.max_ang_vel,
                constraints.max_ang_accel,
                constraints.max_ang_accel,
            ),
        }
    }

    pub fn begin_pose(&self) -> Pose2d {
        self.begin
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }
}

impl Trajectory for TimeTurn {
    fn duration(&self) -> f64 {
        self.profile.duration()
    }

    fn sample(
        &self,
        t: f64,
    ) -> TargetSample {
        let s = self.profile.sample(t);
        let sign = if self.angle < 0.0 { -1.0 } else { 1.0 };
        TargetSample {
            pose: Pose2d {
                position: self.begin.position,
                heading: self.begin.heading + sign * s.position,
            },
            velocity: PoseVelocity2d::new(Vector2d::ZERO, sign * s.velocity),
            acceleration: PoseVelocity2d::new(Vector2d::ZERO, sign * s.acceleration),
        }
    }
}
