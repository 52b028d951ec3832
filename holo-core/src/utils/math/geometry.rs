//! Planar rigid-body geometry for pose estimation and trajectory following.
//!
//! Headings are stored as unit complex numbers ([`Rotation2d`]) so that
//! composition and subtraction stay well defined across the ±π wrap.
//!
//! # Example
//! ```rust
//! use holo_core::utils::math::geometry::{Pose2d, Twist2d, Vector2d};
//! let start = Pose2d::new(0.0, 0.0, 0.0);
//! let moved = start + Twist2d::new(Vector2d::new(1.0, 0.0), 0.0);
//! assert!((moved.position.x - 1.0).abs() < 1e-9);
//! ```

use core::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Below this angle the exp/log maps switch to their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2d {
    pub x: f64,
    pub y: f64,
}

impl Vector2d {
    pub const ZERO: Vector2d = Vector2d { x: 0.0, y: 0.0 };

    pub const fn new(
        x: f64,
        y: f64,
    ) -> Self {
        Self { x, y }
    }

    pub fn norm(self) -> f64 {
        libm::hypot(self.x, self.y)
    }

    pub fn scale(
        self,
        k: f64,
    ) -> Vector2d {
        Vector2d::new(self.x * k, self.y * k)
    }
}

impl Add for Vector2d {
    type Output = Vector2d;

    fn add(
        self,
        rhs: Vector2d,
    ) -> Vector2d {
        Vector2d::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2d {
    type Output = Vector2d;

    fn sub(
        self,
        rhs: Vector2d,
    ) -> Vector2d {
        Vector2d::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vector2d {
    type Output = Vector2d;

    fn neg(self) -> Vector2d {
        Vector2d::new(-self.x, -self.y)
    }
}

/// A planar rotation stored as `(cos θ, sin θ)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation2d {
    pub real: f64,
    pub imag: f64,
}

impl Default for Rotation2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation2d {
    pub const IDENTITY: Rotation2d = Rotation2d {
        real: 1.0,
        imag: 0.0,
    };

    /// Rotation by `theta` radians.
    pub fn exp(theta: f64) -> Self {
        Self {
            real: libm::cos(theta),
            imag: libm::sin(theta),
        }
    }

    /// Angle of this rotation in `(-π, π]`.
    pub fn log(self) -> f64 {
        libm::atan2(self.imag, self.real)
    }

    pub fn inverse(self) -> Self {
        Self {
            real: self.real,
            imag: -self.imag,
        }
    }

    /// Rotate a vector by this rotation.
    pub fn rotate(
        self,
        v: Vector2d,
    ) -> Vector2d {
        Vector2d::new(
            self.real * v.x - self.imag * v.y,
            self.imag * v.x + self.real * v.y,
        )
    }

    /// Rotate a velocity, leaving its angular part untouched.
    pub fn rotate_velocity(
        self,
        v: PoseVelocity2d,
    ) -> PoseVelocity2d {
        PoseVelocity2d::new(self.rotate(v.linear), v.angular)
    }
}

impl Mul for Rotation2d {
    type Output = Rotation2d;

    fn mul(
        self,
        rhs: Rotation2d,
    ) -> Rotation2d {
        Rotation2d {
            real: self.real * rhs.real - self.imag * rhs.imag,
            imag: self.real * rhs.imag + self.imag * rhs.real,
        }
    }
}

impl Add<f64> for Rotation2d {
    type Output = Rotation2d;

    fn add(
        self,
        theta: f64,
    ) -> Rotation2d {
        self * Rotation2d::exp(theta)
    }
}

/// Shortest signed angle taking `rhs` onto `self`, in `(-π, π]`.
impl Sub for Rotation2d {
    type Output = f64;

    fn sub(
        self,
        rhs: Rotation2d,
    ) -> f64 {
        (rhs.inverse() * self).log()
    }
}

/// A differential pose change: a displacement in the body frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2d {
    pub line: Vector2d,
    pub angle: f64,
}

impl Twist2d {
    pub const ZERO: Twist2d = Twist2d {
        line: Vector2d::ZERO,
        angle: 0.0,
    };

    pub const fn new(
        line: Vector2d,
        angle: f64,
    ) -> Self {
        Self { line, angle }
    }
}

/// Body or world frame velocity: linear part plus yaw rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseVelocity2d {
    pub linear: Vector2d,
    pub angular: f64,
}

impl PoseVelocity2d {
    pub const ZERO: PoseVelocity2d = PoseVelocity2d {
        linear: Vector2d::ZERO,
        angular: 0.0,
    };

    pub const fn new(
        linear: Vector2d,
        angular: f64,
    ) -> Self {
        Self { linear, angular }
    }
}

impl Add for PoseVelocity2d {
    type Output = PoseVelocity2d;

    fn add(
        self,
        rhs: PoseVelocity2d,
    ) -> PoseVelocity2d {
        PoseVelocity2d::new(self.linear + rhs.linear, self.angular + rhs.angular)
    }
}

impl Sub for PoseVelocity2d {
    type Output = PoseVelocity2d;

    fn sub(
        self,
        rhs: PoseVelocity2d,
    ) -> PoseVelocity2d {
        PoseVelocity2d::new(self.linear - rhs.linear, self.angular - rhs.angular)
    }
}

/// Position plus heading in the field frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub position: Vector2d,
    pub heading: Rotation2d,
}

impl Pose2d {
    /// Build a pose from coordinates and a heading in radians.
    pub fn new(
        x: f64,
        y: f64,
        heading: f64,
    ) -> Self {
        Self {
            position: Vector2d::new(x, y),
            heading: Rotation2d::exp(heading),
        }
    }

    pub fn inverse(self) -> Pose2d {
        let heading = self.heading.inverse();
        Pose2d {
            position: heading.rotate(-self.position),
            heading,
        }
    }

    /// Exponential map: the pose reached by following `t` for unit time
    /// along a constant-curvature arc.
    pub fn exp(t: Twist2d) -> Pose2d {
        let theta = t.angle;
        let (s, c) = if libm::fabs(theta) < SMALL_ANGLE {
            (1.0 - theta * theta / 6.0, theta / 2.0)
        } else {
            (libm::sin(theta) / theta, (1.0 - libm::cos(theta)) / theta)
        };
        Pose2d {
            position: Vector2d::new(
                s * t.line.x - c * t.line.y,
                c * t.line.x + s * t.line.y,
            ),
            heading: Rotation2d::exp(theta),
        }
    }

    /// Inverse of [`Pose2d::exp`].
    pub fn log(self) -> Twist2d {
        let theta = self.heading.log();
        let half = theta / 2.0;
        let a = if libm::fabs(theta) < SMALL_ANGLE {
            1.0 - theta * theta / 12.0
        } else {
            half * libm::sin(theta) / (1.0 - libm::cos(theta))
        };
        let p = self.position;
        Twist2d::new(
            Vector2d::new(a * p.x + half * p.y, -half * p.x + a * p.y),
            theta,
        )
    }

    /// Pose of `self` expressed in the frame of `other`.
    pub fn minus_exp(
        self,
        other: Pose2d,
    ) -> Pose2d {
        other.inverse() * self
    }
}

impl Mul for Pose2d {
    type Output = Pose2d;

    fn mul(
        self,
        rhs: Pose2d,
    ) -> Pose2d {
        Pose2d {
            position: self.heading.rotate(rhs.position) + self.position,
            heading: self.heading * rhs.heading,
        }
    }
}

/// Integrate a body-frame displacement onto a pose.
impl Add<Twist2d> for Pose2d {
    type Output = Pose2d;

    fn add(
        self,
        t: Twist2d,
    ) -> Pose2d {
        self * Pose2d::exp(t)
    }
}

/// Twist that takes `rhs` onto `self`, in the frame of `rhs`.
impl Sub for Pose2d {
    type Output = Twist2d;

    fn sub(
        self,
        rhs: Pose2d,
    ) -> Twist2d {
        self.minus_exp(rhs).log()
    }
}
