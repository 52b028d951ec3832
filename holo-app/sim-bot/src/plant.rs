//! First-order toy plant standing in for the robot's hardware.
//!
//! Wheel speed follows commanded power instantly, the heading sensor reports
//! the integrated yaw, and the battery sags with load. The lift slides
//! toward its target at a speed proportional to power. None of this is meant
//! to be physically accurate; it exists to close the loop.

use std::{cell::RefCell, rc::Rc};

use holo_core::utils::{
    hal::{Actuator, DriveSensors, EncoderReading, HardwareError, WheelMotors},
    math::kinematics::{MecanumKinematics, WheelVelocities},
};

/// Wheel surface speed at full power, inches per second.
const MAX_WHEEL_SPEED: f64 = 60.0;
/// Lift travel at full power, ticks per second.
const LIFT_SPEED: f64 = 1500.0;
/// Lift counts as arrived within this many ticks.
const LIFT_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum LiftMode {
    Position { target: f64 },
    OpenLoop,
}

pub struct Plant {
    kinematics: MecanumKinematics,
    in_per_tick: f64,
    powers: WheelVelocities,
    ticks: [f64; 4],
    rates: [f64; 4],
    heading: f64,
    voltage: f64,
    lift_position: f64,
    lift_power: f64,
    lift_mode: LiftMode,
}

impl Plant {
    pub fn new(
        kinematics: MecanumKinematics,
        in_per_tick: f64,
    ) -> Self {
        Self {
            kinematics,
            in_per_tick,
            powers: WheelVelocities::ZERO,
            ticks: [0.0; 4],
            rates: [0.0; 4],
            heading: 0.0,
            voltage: 12.6,
            lift_position: 0.0,
            lift_power: 0.0,
            lift_mode: LiftMode::OpenLoop,
        }
    }

    /// Advance the plant by `dt` seconds.
    pub fn step(
        &mut self,
        dt: f64,
    ) {
        let speeds = self.powers.to_array().map(|p| p.clamp(-1.0, 1.0) * MAX_WHEEL_SPEED);
        for i in 0..4 {
            self.rates[i] = speeds[i] / self.in_per_tick;
            self.ticks[i] += self.rates[i] * dt;
        }
        let body = self
            .kinematics
            .forward_velocity(WheelVelocities::from_array(speeds));
        self.heading += body.angular * dt;

        let load = self.powers.to_array().iter().map(|p| p.abs()).sum::<f64>() / 4.0;
        self.voltage = 12.6 - 1.2 * load;

        let travel = self.lift_power.abs() * LIFT_SPEED * dt;
        match self.lift_mode {
            LiftMode::Position { target } => {
                let remaining = target - self.lift_position;
                if remaining.abs() <= travel {
                    self.lift_position = target;
                } else {
                    self.lift_position += travel * remaining.signum();
                }
            }
            LiftMode::OpenLoop => {
                self.lift_position += self.lift_power * LIFT_SPEED * dt;
            }
        }
    }
}

pub type SharedPlant = Rc<RefCell<Plant>>;

/// Drive motors and sensors of the plant.
#[derive(Clone)]
pub struct SimChassis(pub SharedPlant);

impl WheelMotors for SimChassis {
    fn set_powers(
        &mut self,
        powers: WheelVelocities,
    ) -> Result<(), HardwareError> {
        self.0.borrow_mut().powers = powers;
        Ok(())
    }
}

impl DriveSensors for SimChassis {
    fn encoders(&mut self) -> Result<[EncoderReading; 4], HardwareError> {
        let plant = self.0.borrow();
        let mut readings = [EncoderReading::default(); 4];
        for (reading, (ticks, rate)) in readings
            .iter_mut()
            .zip(plant.ticks.iter().zip(plant.rates.iter()))
        {
            // hardware counters are 32 bits wide and wrap
            *reading = EncoderReading::new(*ticks as i64 as i32 as i64, *rate);
        }
        Ok(readings)
    }

    fn heading(&mut self) -> Result<f64, HardwareError> {
        Ok(self.0.borrow().heading)
    }

    fn voltage(&mut self) -> Result<f64, HardwareError> {
        Ok(self.0.borrow().voltage)
    }
}

/// The lift motor of the plant, in run-to-position mode.
pub struct SimLift(pub SharedPlant);

impl Actuator for SimLift {
    fn position(&mut self) -> Result<f64, HardwareError> {
        Ok(self.0.borrow().lift_position)
    }

    fn drive_to(
        &mut self,
        target: f64,
        power: f64,
    ) -> Result<(), HardwareError> {
        let mut plant = self.0.borrow_mut();
        plant.lift_mode = LiftMode::Position { target };
        plant.lift_power = power;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, HardwareError> {
        let plant = self.0.borrow();
        Ok(match plant.lift_mode {
            LiftMode::Position { target } => {
                (target - plant.lift_position).abs() > LIFT_TOLERANCE && plant.lift_power != 0.0
            }
            LiftMode::OpenLoop => false,
        })
    }

    fn set_power(
        &mut self,
        power: f64,
    ) -> Result<(), HardwareError> {
        let mut plant = self.0.borrow_mut();
        plant.lift_mode = LiftMode::OpenLoop;
        plant.lift_power = power;
        Ok(())
    }

    fn reset_position(&mut self) -> Result<(), HardwareError> {
        let mut plant = self.0.borrow_mut();
        plant.lift_mode = LiftMode::OpenLoop;
        plant.lift_power = 0.0;
        plant.lift_position = 0.0;
        Ok(())
    }
}
