//! Kinematics for four-wheel holonomic (mecanum) drivetrains.
//!
//! `MecanumKinematics` maps a body-frame velocity onto the four wheel surface
//! velocities and recovers body motion from measured wheel motion.
//!
//! Wheel order everywhere is left-front, left-back, right-back, right-front.
//!
//! # Example
//! ```rust
//! use holo_core::utils::math::kinematics::MecanumKinematics;
//! use holo_core::utils::math::geometry::{PoseVelocity2d, Vector2d};
//! let kin = MecanumKinematics::new(12.0, 1.0);
//! let wheels = kin.inverse(PoseVelocity2d::new(Vector2d::new(10.0, 0.0), 0.0));
//! assert_eq!(wheels.to_array(), [10.0, 10.0, 10.0, 10.0]);
//! ```

use serde::{Deserialize, Serialize};

use super::geometry::{PoseVelocity2d, Twist2d, Vector2d};

/// Per-wheel quantities (velocities, increments or powers).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelVelocities {
    pub left_front: f64,
    pub left_back: f64,
    pub right_back: f64,
    pub right_front: f64,
}

impl WheelVelocities {
    pub const ZERO: WheelVelocities = WheelVelocities {
        left_front: 0.0,
        left_back: 0.0,
        right_back: 0.0,
        right_front: 0.0,
    };

    pub const fn from_array(w: [f64; 4]) -> Self {
        Self {
            left_front: w[0],
            left_back: w[1],
            right_back: w[2],
            right_front: w[3],
        }
    }

    pub const fn to_array(self) -> [f64; 4] {
        [
            self.left_front,
            self.left_back,
            self.right_back,
            self.right_front,
        ]
    }

    /// Largest absolute wheel value.
    pub fn max_abs(self) -> f64 {
        self.to_array()
            .iter()
            .fold(0.0, |acc, &v| f64::max(acc, libm::fabs(v)))
    }
}

/// Represents the kinematics of a four-wheel mecanum drivetrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MecanumKinematics {
    /// Effective track width (distance units); scales yaw rate into wheel speed.
    track_width: f64,
    /// Ratio of lateral to axial wheel gain; compensates for roller slip.
    lateral_multiplier: f64,
}

impl MecanumKinematics {
    /// Instantiate with a given track width and lateral multiplier.
    pub fn new(
        track_width: f64,
        lateral_multiplier: f64,
    ) -> Self {
        Self {
            track_width,
            lateral_multiplier,
        }
    }

    /// Unit-gain model used for open-loop driving: body velocity components
    /// map one-to-one onto wheel powers.
    pub fn unit() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    pub fn lateral_multiplier(&self) -> f64 {
        self.lateral_multiplier
    }

    /// Compute wheel surface velocities that realise the body velocity `v`.
    pub fn inverse(
        &self,
        v: PoseVelocity2d,
    ) -> WheelVelocities {
        let x = v.linear.x;
        let y = v.linear.y * self.lateral_multiplier;
        let w = v.angular * self.track_width;
        WheelVelocities {
            left_front: x - y - w,
            left_back: x + y - w,
            right_back: x - y + w,
            right_front: x + y + w,
        }
    }

    /// Recover body motion from per-wheel motion.
    ///
    /// Works for both increments (giving a displacement) and rates (giving a
    /// velocity) since the map is linear.
    ///
    /// # Returns
    ///
    /// `(x, y, ω)` in the robot frame.
    pub fn forward_components(
        &self,
        w: WheelVelocities,
    ) -> (f64, f64, f64) {
        let x = (w.left_front + w.left_back + w.right_back + w.right_front) * 0.25;
        let y = (-w.left_front + w.left_back - w.right_back + w.right_front)
            * (0.25 / self.lateral_multiplier);
        let omega = (-w.left_front - w.left_back + w.right_back + w.right_front)
            * (0.25 / self.track_width);
        (x, y, omega)
    }

    /// Body-frame displacement for the given wheel increments.
    pub fn forward(
        &self,
        increments: WheelVelocities,
    ) -> Twist2d {
        let (x, y, omega) = self.forward_components(increments);
        Twist2d::new(Vector2d::new(x, y), omega)
    }

    /// Body-frame velocity for the given wheel rates.
    pub fn forward_velocity(
        &self,
        rates: WheelVelocities,
    ) -> PoseVelocity2d {
        let (x, y, omega) = self.forward_components(rates);
        PoseVelocity2d::new(Vector2d::new(x, y), omega)
    }
}

/// Scale wheel powers so none exceeds unit magnitude.
///
/// All four values are divided by the same factor, so the commanded direction
/// and rotation ratio survive; clamping wheels independently would not.
pub fn normalize_powers(powers: WheelVelocities) -> WheelVelocities {
    let max = powers.max_abs();
    if max <= 1.0 {
        return powers;
    }
    let [lf, lb, rb, rf] = powers.to_array();
    WheelVelocities::from_array([lf / max, lb / max, rb / max, rf / max])
}
