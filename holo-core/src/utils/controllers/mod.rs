//! Controllers
//!
//! - `mechanism`: Idle/Running/Faulted state machine around one actuator.
//! - `drive`: mecanum pose estimation and trajectory following.
//! - `input`: button and analog edge detection.
//! - `pca9685`: wheel motors on a PCA9685 PWM expander over I2C.

pub mod drive;
pub mod input;
pub mod mechanism;
pub mod pca9685;

pub use drive::{DriveDiagnostics, HolonomicController, TrajectoryActionBuilder};
pub use input::{AnalogEvent, AnalogHandler, ButtonEvent, ButtonHandler};
pub use mechanism::{MechanismError, MechanismReport, MechanismState};
pub use pca9685::Pca9685Wheels;
