use core::cell::RefCell;

use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};
use holo_core::utils::{
    controllers::pca9685::{Pca9685Wheels, PWM_ADDRESS},
    hal::{HardwareError, WheelMotors},
    math::kinematics::WheelVelocities,
};

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}

/// Channel write `[register, on_l, on_h, off_l, off_h]` with `on = 0`.
fn channel(
    register: u8,
    off: u16,
) -> I2cTrans {
    write(
        PWM_ADDRESS,
        vec![register, 0x00, 0x00, (off & 0xFF) as u8, (off >> 8) as u8],
    )
}

/// Auto-increment is switched on before the first channel write.
fn auto_increment() -> I2cTrans {
    write(PWM_ADDRESS, vec![0x00, 0x31])
}

#[test]
fn test_configure_pwm() {
    // Expected transactions for enabling PWM and setting prescale (includes sleep handling)
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x01]),
        write(PWM_ADDRESS, vec![0x00, 0x11]),
        write(PWM_ADDRESS, vec![0xFE, 100]),
        write(PWM_ADDRESS, vec![0x00, 0x01]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut wheels = Pca9685Wheels::new(&i2c_bus);
    wheels.init(PWM_ADDRESS).unwrap();
    wheels.configure().unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_zero_powers() {
    // phase then enable, per wheel: C0..C7 at registers 0x06 + 4 * n
    let expectations = [
        auto_increment(),
        channel(0x06, 0),
        channel(0x0A, 0),
        channel(0x0E, 0),
        channel(0x12, 0),
        channel(0x16, 0),
        channel(0x1A, 0),
        channel(0x1E, 0),
        channel(0x22, 0),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut wheels = Pca9685Wheels::new(&i2c_bus);
    wheels.init(PWM_ADDRESS).unwrap();
    wheels.set_powers(WheelVelocities::ZERO).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_signed_powers() {
    let expectations = [
        auto_increment(),
        // left-front forward, full power
        channel(0x06, 0),
        channel(0x0A, 4095),
        // left-back reverse, half power
        channel(0x0E, 4095),
        channel(0x12, 2047),
        // right-back stopped
        channel(0x16, 0),
        channel(0x1A, 0),
        // right-front clamped to full power
        channel(0x1E, 0),
        channel(0x22, 4095),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut wheels = Pca9685Wheels::new(&i2c_bus);
    wheels.init(PWM_ADDRESS).unwrap();
    wheels
        .set_powers(WheelVelocities::from_array([1.0, -0.5, 0.0, 1.7]))
        .unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_uninitialized_driver() {
    let expectations: [I2cTrans; 0] = [];
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut wheels = Pca9685Wheels::new(&i2c_bus);
    assert_eq!(
        wheels.set_powers(WheelVelocities::ZERO),
        Err(HardwareError::NotInitialized)
    );
    assert_eq!(wheels.configure(), Err(HardwareError::NotInitialized));
    i2c_bus.borrow_mut().done();
}
