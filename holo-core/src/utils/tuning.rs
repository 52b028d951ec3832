//! Live tuning.
//!
//! Gains, feedforward coefficients and motion constraints can be changed
//! while the robot runs by sending a [`TuningCommand`] over
//! [`TUNING_CHANNEL`]. The drive drains the channel between control cycles
//! ([`crate::utils::controllers::drive::MecanumDrive::apply_pending_tuning`]),
//! so a change never lands halfway through a cycle.
//!
//! Commands are JSON with tag `"tc"`:
//!
//! ```rust
//! use holo_core::utils::tuning::TuningCommand;
//! let cmd = TuningCommand::from_json(r#"{ "tc": "feedforward", "k_s": 0.8, "k_v": 0.02 }"#).unwrap();
//! assert!(matches!(cmd, TuningCommand::Feedforward(ff) if ff.k_a == 0.0));
//! ```

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use serde::{Deserialize, Serialize};

use super::config::{ConfigError, DriveConfig, Feedforward, FeedbackGains, MotionConstraints};

/// Pending tuning changes, applied in order.
pub static TUNING_CHANNEL: Channel<CriticalSectionRawMutex, TuningCommand, 8> = Channel::new();

/// Replacement values for one group of drive constants.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "tc", rename_all = "snake_case")] // tc = tuning command
pub enum TuningCommand {
    Gains(FeedbackGains),
    Feedforward(Feedforward),
    Constraints(MotionConstraints),
}

impl TuningCommand {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    /// Overwrite the matching group in `config`.
    pub fn apply(
        self,
        config: &mut DriveConfig,
    ) {
        match self {
            TuningCommand::Gains(gains) => config.gains = gains,
            TuningCommand::Feedforward(ff) => config.feedforward = ff,
            TuningCommand::Constraints(c) => config.constraints = c,
        }
    }
}
