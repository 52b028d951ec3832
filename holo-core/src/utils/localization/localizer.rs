use crate::utils::{
    config::DriveConfig,
    hal::EncoderReading,
    math::{
        geometry::{PoseVelocity2d, Rotation2d, Twist2d},
        kinematics::{MecanumKinematics, WheelVelocities},
    },
};

use super::encoder::OverflowEncoder;

/// Sensor readings for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalizerInputs {
    /// Encoders in wheel order (left-front, left-back, right-back, right-front).
    pub wheels: [EncoderReading; 4],
    /// Absolute heading in radians.
    pub heading: f64,
}

/// Displacement since the previous update and current body velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwistSample {
    pub twist: Twist2d,
    pub velocity: PoseVelocity2d,
}

impl TwistSample {
    pub const ZERO: TwistSample = TwistSample {
        twist: Twist2d::ZERO,
        velocity: PoseVelocity2d::ZERO,
    };
}

/// Four-wheel odometry with the heading taken from an absolute sensor.
#[derive(Debug, Clone)]
pub struct DriveLocalizer {
    kinematics: MecanumKinematics,
    in_per_tick: f64,
    encoders: [OverflowEncoder; 4],
    last: Option<([i64; 4], Rotation2d)>,
}

impl DriveLocalizer {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            kinematics: config.kinematics(),
            in_per_tick: config.in_per_tick,
            encoders: [OverflowEncoder::new(config.encoder_bits); 4],
            last: None,
        }
    }

    /// Next update primes the cache again and reports no motion.
    pub fn reset(&mut self) {
        self.last = None;
        for enc in self.encoders.iter_mut() {
            enc.reset();
        }
    }

    pub fn update(
        &mut self,
        inputs: &LocalizerInputs,
    ) -> TwistSample {
        let mut counts = [0i64; 4];
        for ((count, enc), reading) in counts
            .iter_mut()
            .zip(self.encoders.iter_mut())
            .zip(inputs.wheels.iter())
        {
            *count = enc.update(reading.count);
        }
        let heading = Rotation2d::exp(inputs.heading);

        let Some((last_counts, last_heading)) = self.last.replace((counts, heading)) else {
            tracing::debug!(?counts, heading = inputs.heading, "localizer primed");
            return TwistSample::ZERO;
        };

        let mut deltas = [0.0; 4];
        let mut rates = [0.0; 4];
        for i in 0..4 {
            deltas[i] = counts[i].wrapping_sub(last_counts[i]) as f64 * self.in_per_tick;
            rates[i] = inputs.wheels[i].velocity * self.in_per_tick;
        }

        let kinematic = self.kinematics.forward(WheelVelocities::from_array(deltas));
        let velocity = self
            .kinematics
            .forward_velocity(WheelVelocities::from_array(rates));
        let heading_delta = heading - last_heading;
        tracing::trace!(?deltas, heading_delta, "localizer update");

        TwistSample {
            twist: Twist2d::new(kinematic.line, heading_delta),
            velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::PI;

    use super::*;
    use crate::utils::math::geometry::Vector2d;

    fn close(
        a: f64,
        b: f64,
    ) -> bool {
        libm::fabs(a - b) < 1e-9
    }

    fn inputs(
        counts: [i64; 4],
        velocity: f64,
        heading: f64,
    ) -> LocalizerInputs {
        LocalizerInputs {
            wheels: counts.map(|c| EncoderReading::new(c, velocity)),
            heading,
        }
    }

    fn config() -> DriveConfig {
        DriveConfig {
            in_per_tick: 0.5,
            lateral_in_per_tick: 0.5,
            track_width_ticks: 20.0,
            encoder_bits: 16,
            ..DriveConfig::default()
        }
    }

    #[test]
    fn first_update_is_zero() {
        let mut loc = DriveLocalizer::new(&config());
        let sample = loc.update(&inputs([123, -4000, 9, 65_000], 300.0, 2.0));
        assert_eq!(sample, TwistSample::ZERO);
    }

    #[test]
    fn straight_drive() {
        let mut loc = DriveLocalizer::new(&config());
        loc.update(&inputs([0; 4], 0.0, 0.0));
        let sample = loc.update(&inputs([100; 4], 200.0, 0.0));
        assert!(close(sample.twist.line.x, 50.0));
        assert!(close(sample.twist.line.y, 0.0));
        assert_eq!(sample.twist.angle, 0.0);
        assert!(close(sample.velocity.linear.x, 100.0));
    }

    #[test]
    fn heading_sensor_overrides_wheel_rotation() {
        let mut loc = DriveLocalizer::new(&config());
        loc.update(&inputs([0; 4], 0.0, PI - 0.05));
        // wheels claim a spin, but the heading only crossed the ±π seam by 0.1
        let sample = loc.update(&LocalizerInputs {
            wheels: [
                EncoderReading::new(-40, -10.0),
                EncoderReading::new(-40, -10.0),
                EncoderReading::new(40, 10.0),
                EncoderReading::new(40, 10.0),
            ],
            heading: -PI + 0.05,
        });
        assert!(close(sample.twist.angle, 0.1));
        assert_eq!(sample.twist.line, Vector2d::ZERO);
        // yaw rate stays the wheel estimate: 10 ticks/s * 0.5 / (0.5 * 20)
        assert!(close(sample.velocity.angular, 0.5));
    }

    #[test]
    fn counts_survive_wraparound() {
        let mut loc = DriveLocalizer::new(&config());
        loc.update(&inputs([65_530; 4], 0.0, 0.0));
        let sample = loc.update(&inputs([4; 4], 0.0, 0.0));
        assert!(close(sample.twist.line.x, 5.0));
    }

    #[test]
    fn reset_primes_again() {
        let mut loc = DriveLocalizer::new(&config());
        loc.update(&inputs([0; 4], 0.0, 0.0));
        loc.update(&inputs([10; 4], 0.0, 0.0));
        loc.reset();
        assert_eq!(loc.update(&inputs([500; 4], 0.0, 1.0)), TwistSample::ZERO);
    }
}
