//! Tuning configuration.
//!
//! Every tunable constant is read once at construction from these structs.
//! They deserialize from JSON (missing fields take their defaults) so a
//! robot entry point can keep its numbers in a single document:
//!
//! ```rust
//! use holo_core::utils::config::RobotConfig;
//! let cfg = RobotConfig::from_json(r#"{ "drive": { "in_per_tick": 0.002 } }"#).unwrap();
//! assert_eq!(cfg.drive.in_per_tick, 0.002);
//! assert_eq!(cfg.buttons.debounce_ms, 50);
//! ```
//!
//! Values that must change while the robot runs go through
//! [`crate::utils::tuning`] instead of mutating these structs.

use alloc::{string::String, vec::Vec};
use core::fmt;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use super::math::kinematics::MecanumKinematics;

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value `{}`: {}", field, reason)
            }
        }
    }
}

/// Static, velocity and acceleration motor model coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Feedforward {
    pub k_s: f64,
    pub k_v: f64,
    pub k_a: f64,
}

impl Feedforward {
    /// Voltage needed to hold wheel velocity `v` while accelerating at `a`.
    pub fn voltage(
        &self,
        v: f64,
        a: f64,
    ) -> f64 {
        let sign = if v > 0.0 {
            1.0
        } else if v < 0.0 {
            -1.0
        } else {
            0.0
        };
        self.k_s * sign + self.k_v * v + self.k_a * a
    }
}

/// Position and velocity error gains, per body axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackGains {
    pub axial: f64,
    pub lateral: f64,
    pub heading: f64,
    pub axial_vel: f64,
    pub lateral_vel: f64,
    pub heading_vel: f64,
}

/// Limits used when building trajectories and turns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConstraints {
    pub max_wheel_vel: f64,
    /// Most negative profile acceleration (deceleration bound).
    pub min_profile_accel: f64,
    pub max_profile_accel: f64,
    pub max_ang_vel: f64,
    pub max_ang_accel: f64,
}

impl Default for MotionConstraints {
    fn default() -> Self {
        Self {
            max_wheel_vel: 50.0,
            min_profile_accel: -30.0,
            max_profile_accel: 50.0,
            max_ang_vel: core::f64::consts::PI,
            max_ang_accel: core::f64::consts::PI,
        }
    }
}

/// Drivetrain geometry, encoder scaling, motor model and controller gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Distance travelled per encoder tick on the axial wheels.
    pub in_per_tick: f64,
    /// Distance per tick when strafing; differs from `in_per_tick` on mecanum.
    pub lateral_in_per_tick: f64,
    /// Effective track width expressed in ticks.
    pub track_width_ticks: f64,
    /// Width of the raw hardware encoder counters.
    pub encoder_bits: u8,
    pub feedforward: Feedforward,
    pub gains: FeedbackGains,
    pub constraints: MotionConstraints,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            in_per_tick: 1.0,
            lateral_in_per_tick: 1.0,
            track_width_ticks: 12.0,
            encoder_bits: 32,
            feedforward: Feedforward::default(),
            gains: FeedbackGains::default(),
            constraints: MotionConstraints::default(),
        }
    }
}

impl DriveConfig {
    pub fn kinematics(&self) -> MecanumKinematics {
        MecanumKinematics::new(
            self.in_per_tick * self.track_width_ticks,
            self.in_per_tick / self.lateral_in_per_tick,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.in_per_tick > 0.0) {
            return Err(ConfigError::Invalid {
                field: "drive.in_per_tick",
                reason: "must be positive",
            });
        }
        if !(self.lateral_in_per_tick > 0.0) {
            return Err(ConfigError::Invalid {
                field: "drive.lateral_in_per_tick",
                reason: "must be positive",
            });
        }
        if !(self.track_width_ticks > 0.0) {
            return Err(ConfigError::Invalid {
                field: "drive.track_width_ticks",
                reason: "must be positive",
            });
        }
        if self.encoder_bits == 0 || self.encoder_bits > 64 {
            return Err(ConfigError::Invalid {
                field: "drive.encoder_bits",
                reason: "must be within 1..=64",
            });
        }
        Ok(())
    }
}

/// Bounds, idle hold and timeout for one mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanismConfig {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Power applied at rest to counter gravity or backlash.
    pub idle_power: f64,
    /// Motions longer than this end as a graceful stop.
    pub timeout_ms: Option<u64>,
}

impl Default for MechanismConfig {
    fn default() -> Self {
        Self {
            name: String::from("mechanism"),
            min: 0.0,
            max: 1.0,
            idle_power: 0.0,
            timeout_ms: None,
        }
    }
}

impl MechanismConfig {
    pub fn new(
        name: &str,
        min: f64,
        max: f64,
    ) -> Self {
        Self {
            name: String::from(name),
            min,
            max,
            ..Self::default()
        }
    }

    pub fn with_idle_power(
        mut self,
        idle_power: f64,
    ) -> Self {
        self.idle_power = idle_power;
        self
    }

    pub fn with_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout_ms = Some(timeout.as_millis());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min <= self.max) {
            return Err(ConfigError::Invalid {
                field: "mechanism.min",
                reason: "must not exceed max",
            });
        }
        if !(-1.0..=1.0).contains(&self.idle_power) {
            return Err(ConfigError::Invalid {
                field: "mechanism.idle_power",
                reason: "must be within [-1, 1]",
            });
        }
        Ok(())
    }
}

/// Debounce and double-tap windows for digital inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub double_tap_ms: u64,
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            double_tap_ms: 300,
            debounce_ms: 50,
        }
    }
}

impl ButtonConfig {
    pub fn double_tap(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Deadzone and response curve for analog inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalogConfig {
    pub deadzone: f64,
    pub exponent: f64,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            exponent: 2.0,
        }
    }
}

impl AnalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(ConfigError::Invalid {
                field: "analog.deadzone",
                reason: "must be within [0, 1)",
            });
        }
        if !(self.exponent > 0.0) {
            return Err(ConfigError::Invalid {
                field: "analog.exponent",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// Everything a robot entry point hands to the core at construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub drive: DriveConfig,
    pub mechanisms: Vec<MechanismConfig>,
    pub buttons: ButtonConfig,
    pub analog: AnalogConfig,
}

impl RobotConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: RobotConfig = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.drive.validate()?;
        for m in &self.mechanisms {
            m.validate()?;
        }
        self.analog.validate()
    }

    pub fn mechanism(
        &self,
        name: &str,
    ) -> Option<&MechanismConfig> {
        self.mechanisms.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RobotConfig::default().validate().is_ok());
    }

    #[test]
    fn kinematics_from_ticks() {
        let cfg = DriveConfig {
            in_per_tick: 0.5,
            lateral_in_per_tick: 0.25,
            track_width_ticks: 30.0,
            ..DriveConfig::default()
        };
        let kin = cfg.kinematics();
        assert_eq!(kin.track_width(), 15.0);
        assert_eq!(kin.lateral_multiplier(), 2.0);
    }

    #[test]
    fn mechanisms_from_json() {
        let cfg = RobotConfig::from_json(
            r#"{
                "mechanisms": [
                    { "name": "lift", "min": 0.0, "max": 2400.0, "idle_power": 0.1, "timeout_ms": 3000 }
                ]
            }"#,
        )
        .unwrap();
        let lift = cfg.mechanism("lift").unwrap();
        assert_eq!(lift.max, 2400.0);
        assert_eq!(lift.timeout(), Some(Duration::from_millis(3000)));
        assert!(cfg.mechanism("claw").is_none());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = RobotConfig::from_json(r#"{ "mechanisms": [ { "name": "arm", "min": 5.0, "max": 1.0 } ] }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "mechanism.min", .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            RobotConfig::from_json("{ drive: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn feedforward_sign_term() {
        let ff = Feedforward {
            k_s: 1.0,
            k_v: 0.1,
            k_a: 0.01,
        };
        assert_eq!(ff.voltage(0.0, 0.0), 0.0);
        assert!(libm::fabs(ff.voltage(-10.0, 0.0) + 2.0) < 1e-12);
        assert!(libm::fabs(ff.voltage(10.0, 100.0) - 3.0) < 1e-12);
    }
}
