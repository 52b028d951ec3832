//! Wheel motors on a PCA9685 PWM expander.
//!
//! Each wheel uses a pair of channels on an H-bridge in phase/enable mode:
//! the phase channel is fully on for reverse, and the enable channel carries
//! the 12-bit duty cycle. The expander shares its I2C bus through a
//! `RefCell`, so other devices can sit on the same bus.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use crate::utils::{
    hal::{HardwareError, WheelMotors},
    math::kinematics::WheelVelocities,
};

/// Default I2C address of the expander.
pub const PWM_ADDRESS: u8 = 0x55;

const MAX_DUTY: u16 = 4095;

/// Maps a PCA9685 error onto [`HardwareError`], logging the original.
fn bus_error<E: core::fmt::Debug>(e: PwmError<E>) -> HardwareError {
    tracing::error!("PWM write failed: {:?}", e);
    HardwareError::Bus
}

pub struct Pca9685Wheels<'a, I2C: 'static> {
    i2c: &'a RefCell<I2C>,
    pwm: Option<Pca9685<RefCellDevice<'a, I2C>>>,
    /// `(phase, enable)` per wheel, in wheel order.
    channels: [(Channel, Channel); 4],
}

impl<'a, I2C, E> Pca9685Wheels<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    pub fn new(i2c_bus: &'a RefCell<I2C>) -> Self {
        Pca9685Wheels {
            i2c: i2c_bus,
            pwm: None,
            channels: [
                (Channel::C0, Channel::C1),
                (Channel::C2, Channel::C3),
                (Channel::C4, Channel::C5),
                (Channel::C6, Channel::C7),
            ],
        }
    }

    /// Attach the driver at `address`. No bus traffic happens until the
    /// first write.
    pub fn init(
        &mut self,
        address: u8,
    ) -> Result<(), HardwareError> {
        let pwm = Pca9685::new(RefCellDevice::new(self.i2c), PwmAddress::from(address))
            .map_err(bus_error)?;
        self.pwm = Some(pwm);
        Ok(())
    }

    /// Enable the outputs and set the prescaler.
    pub fn configure(&mut self) -> Result<(), HardwareError> {
        let pca = self.pwm.as_mut().ok_or(HardwareError::NotInitialized)?;
        pca.enable().map_err(bus_error)?;
        pca.set_prescale(100).map_err(bus_error)?;
        tracing::info!("PWM enabled, prescale 100");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<(), HardwareError> {
        let pca = self.pwm.as_mut().ok_or(HardwareError::NotInitialized)?;
        pca.disable().map_err(bus_error)
    }
}

impl<I2C, E> WheelMotors for Pca9685Wheels<'_, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    fn set_powers(
        &mut self,
        powers: WheelVelocities,
    ) -> Result<(), HardwareError> {
        let Some(pca) = self.pwm.as_mut() else {
            tracing::error!("PWM not initialized");
            return Err(HardwareError::NotInitialized);
        };

        for (&(phase, enable), power) in self.channels.iter().zip(powers.to_array()) {
            let duty = f64::min(libm::fabs(power), 1.0);
            let reverse = power < 0.0;
            pca.set_channel_on_off(phase, 0, if reverse { MAX_DUTY } else { 0 })
                .map_err(bus_error)?;
            pca.set_channel_on_off(enable, 0, (duty * MAX_DUTY as f64) as u16)
                .map_err(bus_error)?;
        }
        Ok(())
    }
}
