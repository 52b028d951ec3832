//! Hardware seams consumed by the control core.
//!
//! Every call here is synchronous with bounded latency; the control loop
//! never waits on hardware. Backends map their own error types onto
//! [`HardwareError`] the way [`crate::utils::controllers::pca9685`] does.

use core::{cell::Cell, fmt};

use embassy_time::{Duration, Instant};
use serde::Serialize;

use super::math::kinematics::WheelVelocities;

/// Errors reported by actuator and sensor backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HardwareError {
    /// The bus transaction failed.
    Bus,
    /// The device was used before it was initialised.
    NotInitialized,
    /// The device stopped responding.
    Disconnected,
}

impl fmt::Display for HardwareError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            HardwareError::Bus => write!(f, "bus transaction failed"),
            HardwareError::NotInitialized => write!(f, "device not initialized"),
            HardwareError::Disconnected => write!(f, "device disconnected"),
        }
    }
}

/// A single positional actuator: a motor with an encoder running to a target,
/// a servo, or a continuous servo with a potentiometer.
pub trait Actuator {
    /// Measured position in actuator units.
    fn position(&mut self) -> Result<f64, HardwareError>;

    /// Start travelling toward `target` at `power`.
    fn drive_to(
        &mut self,
        target: f64,
        power: f64,
    ) -> Result<(), HardwareError>;

    /// Whether the actuator is still travelling toward its last target.
    fn is_busy(&mut self) -> Result<bool, HardwareError>;

    /// Apply a raw power, leaving position control.
    fn set_power(
        &mut self,
        power: f64,
    ) -> Result<(), HardwareError>;

    /// Stop and make the current position read as zero.
    ///
    /// Actuators with absolute feedback (servos, potentiometers) have
    /// nothing to re-zero and keep this default.
    fn reset_position(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }
}

/// The four drive wheel motors.
pub trait WheelMotors {
    fn set_powers(
        &mut self,
        powers: WheelVelocities,
    ) -> Result<(), HardwareError>;
}

/// Raw reading of one wheel encoder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EncoderReading {
    /// Raw hardware counter, wrapping at the configured bit width.
    pub count: i64,
    /// Ticks per second.
    pub velocity: f64,
}

impl EncoderReading {
    pub const fn new(
        count: i64,
        velocity: f64,
    ) -> Self {
        Self { count, velocity }
    }
}

/// Drivetrain sensors read once per control cycle.
pub trait DriveSensors {
    /// Encoders in wheel order (left-front, left-back, right-back, right-front).
    fn encoders(&mut self) -> Result<[EncoderReading; 4], HardwareError>;

    /// Absolute yaw in radians, counter-clockwise positive.
    fn heading(&mut self) -> Result<f64, HardwareError>;

    /// Supply voltage in volts.
    fn voltage(&mut self) -> Result<f64, HardwareError>;
}

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// A clock advanced by hand; drives tests and fixed-step simulation.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::from_ticks(0)),
        }
    }

    pub fn advance(
        &self,
        by: Duration,
    ) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to `secs` seconds after the clock's origin.
    pub fn set_secs(
        &self,
        secs: f64,
    ) {
        self.now.set(Instant::from_micros(secs_to_micros(secs)));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Seconds elapsed between two instants, saturating at zero.
pub fn elapsed_secs(
    since: Instant,
    now: Instant,
) -> f64 {
    now.saturating_duration_since(since).as_micros() as f64 / 1e6
}

/// Convert fractional seconds to a [`Duration`].
pub fn secs(s: f64) -> Duration {
    Duration::from_micros(secs_to_micros(s))
}

fn secs_to_micros(s: f64) -> u64 {
    if s <= 0.0 {
        0
    } else {
        libm::round(s * 1e6) as u64
    }
}
