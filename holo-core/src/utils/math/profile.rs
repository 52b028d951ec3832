//! Trapezoidal motion profiles.
//!
//! A profile covers a non-negative distance starting and ending at rest,
//! accelerating at a bounded rate up to a velocity cap, cruising, then
//! decelerating. Short moves that never reach the cap become triangular.

/// Position, velocity and acceleration along a profile at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfileState {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidProfile {
    distance: f64,
    accel: f64,
    decel: f64,
    peak_velocity: f64,
    accel_time: f64,
    cruise_time: f64,
    decel_time: f64,
}

impl TrapezoidProfile {
    /// Build a profile over `distance` (absolute value is used).
    ///
    /// `max_accel` and `max_decel` are magnitudes; non-positive limits are
    /// treated as the smallest positive value so the profile stays finite.
    pub fn new(
        distance: f64,
        max_velocity: f64,
        max_accel: f64,
        max_decel: f64,
    ) -> Self {
        let distance = libm::fabs(distance);
        let v_max = f64::max(libm::fabs(max_velocity), f64::EPSILON);
        let accel = f64::max(libm::fabs(max_accel), f64::EPSILON);
        let decel = f64::max(libm::fabs(max_decel), f64::EPSILON);

        if distance == 0.0 {
            return Self {
                distance,
                accel,
                decel,
                peak_velocity: 0.0,
                accel_time: 0.0,
                cruise_time: 0.0,
                decel_time: 0.0,
            };
        }

        let ramp_distance = v_max * v_max / (2.0 * accel) + v_max * v_max / (2.0 * decel);
        let peak_velocity = if ramp_distance >= distance {
            libm::sqrt(2.0 * distance * accel * decel / (accel + decel))
        } else {
            v_max
        };
        let accel_time = peak_velocity / accel;
        let decel_time = peak_velocity / decel;
        let ramp = peak_velocity * peak_velocity / (2.0 * accel)
            + peak_velocity * peak_velocity / (2.0 * decel);
        let cruise_time = f64::max(distance - ramp, 0.0) / peak_velocity;

        Self {
            distance,
            accel,
            decel,
            peak_velocity,
            accel_time,
            cruise_time,
            decel_time,
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.accel_time + self.cruise_time + self.decel_time
    }

    pub fn peak_velocity(&self) -> f64 {
        self.peak_velocity
    }

    /// Sample the profile; times outside `[0, duration]` are clamped.
    pub fn sample(
        &self,
        t: f64,
    ) -> ProfileState {
        let duration = self.duration();
        if t <= 0.0 || duration == 0.0 {
            return ProfileState::default();
        }
        if t >= duration {
            return ProfileState {
                position: self.distance,
                velocity: 0.0,
                acceleration: 0.0,
            };
        }

        let cruise_start = self.accel_time;
        let decel_start = self.accel_time + self.cruise_time;
        if t < cruise_start {
            ProfileState {
                position: 0.5 * self.accel * t * t,
                velocity: self.accel * t,
                acceleration: self.accel,
            }
        } else if t < decel_start {
            let dt = t - cruise_start;
            ProfileState {
                position: 0.5 * self.accel * cruise_start * cruise_start
                    + self.peak_velocity * dt,
                velocity: self.peak_velocity,
                acceleration: 0.0,
            }
        } else {
            // measured back from the end for symmetry with the accel ramp
            let remaining = duration - t;
            ProfileState {
                position: self.distance - 0.5 * self.decel * remaining * remaining,
                velocity: self.decel * remaining,
                acceleration: -self.decel,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(
        a: f64,
        b: f64,
    ) -> bool {
        libm::fabs(a - b) < 1e-9
    }

    #[test]
    fn trapezoid_reaches_cap() {
        // 1 s ramp up (0.5), 1 s cruise (1.0), 1 s ramp down (0.5)
        let p = TrapezoidProfile::new(2.0, 1.0, 1.0, 1.0);
        assert!(close(p.duration(), 3.0));
        assert!(close(p.peak_velocity(), 1.0));
        let mid = p.sample(1.5);
        assert!(close(mid.position, 1.0));
        assert!(close(mid.velocity, 1.0));
        assert!(close(p.sample(3.0).position, 2.0));
    }

    #[test]
    fn short_move_is_triangular() {
        let p = TrapezoidProfile::new(1.0, 10.0, 1.0, 1.0);
        assert!(close(p.peak_velocity(), 1.0));
        assert!(close(p.duration(), 2.0));
        let s = p.sample(1.5);
        assert!(close(s.position, 1.0 - 0.125));
        assert!(close(s.acceleration, -1.0));
    }

    #[test]
    fn zero_distance_has_no_duration() {
        let p = TrapezoidProfile::new(0.0, 1.0, 1.0, 1.0);
        assert_eq!(p.duration(), 0.0);
        assert_eq!(p.sample(0.3), ProfileState::default());
    }
}
