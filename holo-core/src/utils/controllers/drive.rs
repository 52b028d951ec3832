//! Mecanum drive: pose estimation, trajectory following and open-loop drive.
//!
//! [`MecanumDrive`] owns the wheel motors and drive sensors. Once per cycle
//! the caller runs [`MecanumDrive::update_pose_estimate`] (directly, or
//! through a follow action which does it for them). Trajectory and turn
//! actions borrow the drive, so they can be scheduled next to mechanism
//! actions:
//!
//! ```rust,ignore
//! let routine = drive
//!     .action_builder(drive.pose())
//!     .strafe_to(Vector2d::new(24.0, 0.0))
//!     .turn(PI / 2.0)
//!     .build();
//! scheduler.add(routine);
//! ```
//!
//! Each follow cycle combines feedback and feedforward:
//!
//! 1. sample the target at the elapsed time,
//! 2. refresh the pose estimate,
//! 3. run [`HolonomicController`] on the pose and velocity error,
//! 4. turn the body command into wheel velocities and accelerations,
//! 5. convert those to powers with the motor feedforward model and the live
//!    battery voltage.

use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell, RefMut};

use embassy_time::Instant;
use heapless::Deque;
use serde::Serialize;

use crate::utils::{
    actions::{Action, ActionError, Status, Task},
    config::{DriveConfig, FeedbackGains},
    hal::{elapsed_secs, secs, Clock, DriveSensors, HardwareError, WheelMotors},
    localization::{DriveLocalizer, LocalizerInputs},
    math::{
        geometry::{Pose2d, PoseVelocity2d, Rotation2d, Twist2d, Vector2d},
        kinematics::{normalize_powers, MecanumKinematics, WheelVelocities},
        trajectory::{LinearTrajectory, TargetSample, TimeTurn, Trajectory},
    },
    tuning::{TuningCommand, TUNING_CHANNEL},
};

/// Number of past pose estimates kept for diagnostics.
pub const POSE_HISTORY: usize = 100;

/// Below this path length a strafe only turns.
const MIN_STRAFE: f64 = 1e-6;
/// Below this angle a turn is skipped.
const MIN_TURN: f64 = 1e-9;

/// Body-frame feedback on pose and velocity error.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HolonomicController {
    gains: FeedbackGains,
}

impl HolonomicController {
    pub fn new(gains: FeedbackGains) -> Self {
        Self { gains }
    }

    /// Pose error of `actual` relative to `target`, in the robot frame.
    pub fn pose_error(
        target: Pose2d,
        actual: Pose2d,
    ) -> Twist2d {
        let error = target.minus_exp(actual);
        Twist2d::new(error.position, error.heading.log())
    }

    /// Robot-frame velocity command.
    ///
    /// The target velocity is rotated into the robot frame, then each axis
    /// gets its own position and velocity correction.
    pub fn compute(
        &self,
        target: &TargetSample,
        actual: Pose2d,
        actual_velocity: PoseVelocity2d,
    ) -> PoseVelocity2d {
        let g = &self.gains;
        let target_velocity = actual.heading.inverse().rotate_velocity(target.velocity);
        let error = Self::pose_error(target.pose, actual);
        let velocity_error = target_velocity - actual_velocity;

        target_velocity
            + PoseVelocity2d::new(
                Vector2d::new(g.axial * error.line.x, g.lateral * error.line.y),
                g.heading * error.angle,
            )
            + PoseVelocity2d::new(
                Vector2d::new(
                    g.axial_vel * velocity_error.linear.x,
                    g.lateral_vel * velocity_error.linear.y,
                ),
                g.heading_vel * velocity_error.angular,
            )
    }
}

/// What the drive did on its last cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DriveDiagnostics {
    pub pose: Pose2d,
    /// Target pose while a follow action runs.
    pub target: Option<Pose2d>,
    pub pose_error: Twist2d,
    pub wheel_powers: WheelVelocities,
    pub voltage: f64,
}

pub struct MecanumDrive<M, S, C> {
    config: RefCell<DriveConfig>,
    kinematics: MecanumKinematics,
    motors: RefCell<M>,
    sensors: RefCell<S>,
    clock: C,
    localizer: RefCell<DriveLocalizer>,
    pose: Cell<Pose2d>,
    velocity: Cell<PoseVelocity2d>,
    history: RefCell<Deque<Pose2d, POSE_HISTORY>>,
    diagnostics: Cell<DriveDiagnostics>,
}

impl<M: WheelMotors, S: DriveSensors, C: Clock> MecanumDrive<M, S, C> {
    pub fn new(
        config: DriveConfig,
        motors: M,
        sensors: S,
        clock: C,
        pose: Pose2d,
    ) -> Self {
        Self {
            kinematics: config.kinematics(),
            localizer: RefCell::new(DriveLocalizer::new(&config)),
            config: RefCell::new(config),
            motors: RefCell::new(motors),
            sensors: RefCell::new(sensors),
            clock,
            pose: Cell::new(pose),
            velocity: Cell::new(PoseVelocity2d::ZERO),
            history: RefCell::new(Deque::new()),
            diagnostics: Cell::new(DriveDiagnostics {
                pose,
                ..DriveDiagnostics::default()
            }),
        }
    }

    pub fn pose(&self) -> Pose2d {
        self.pose.get()
    }

    /// Overwrite the pose estimate, e.g. at the start of a routine.
    pub fn set_pose(
        &self,
        pose: Pose2d,
    ) {
        self.pose.set(pose);
    }

    /// Body-frame velocity from the last pose update.
    pub fn velocity(&self) -> PoseVelocity2d {
        self.velocity.get()
    }

    /// Recent pose estimates, oldest first.
    pub fn pose_history(&self) -> Vec<Pose2d> {
        self.history.borrow().iter().copied().collect()
    }

    pub fn diagnostics(&self) -> DriveDiagnostics {
        self.diagnostics.get()
    }

    pub fn config(&self) -> DriveConfig {
        *self.config.borrow()
    }

    pub fn kinematics(&self) -> MecanumKinematics {
        self.kinematics
    }

    pub fn motors(&self) -> Ref<'_, M> {
        self.motors.borrow()
    }

    pub fn sensors_mut(&self) -> RefMut<'_, S> {
        self.sensors.borrow_mut()
    }

    /// Read the sensors, integrate the twist into the pose and record it.
    pub fn update_pose_estimate(&self) -> Result<PoseVelocity2d, HardwareError> {
        let inputs = {
            let mut sensors = self.sensors.borrow_mut();
            LocalizerInputs {
                wheels: sensors.encoders()?,
                heading: sensors.heading()?,
            }
        };
        let sample = self.localizer.borrow_mut().update(&inputs);
        let pose = self.pose.get() + sample.twist;
        self.pose.set(pose);
        self.velocity.set(sample.velocity);

        let mut history = self.history.borrow_mut();
        if history.is_full() {
            history.pop_front();
        }
        // a slot is free after the pop above, so the push cannot be refused
        let _ = history.push_back(pose);

        let mut diagnostics = self.diagnostics.get();
        diagnostics.pose = pose;
        self.diagnostics.set(diagnostics);
        Ok(sample.velocity)
    }

    /// Open-loop drive with unit-gain kinematics.
    ///
    /// If any wheel would exceed full power all four are scaled down by the
    /// same factor.
    pub fn set_drive_powers(
        &self,
        powers: PoseVelocity2d,
    ) -> Result<WheelVelocities, HardwareError> {
        let wheels = normalize_powers(MecanumKinematics::unit().inverse(powers));
        self.write_powers(wheels)?;
        Ok(wheels)
    }

    /// Zero every wheel.
    pub fn stop(&self) -> Result<(), HardwareError> {
        self.write_powers(WheelVelocities::ZERO)
    }

    pub fn apply_tuning(
        &self,
        command: TuningCommand,
    ) {
        tracing::info!(?command, "tuning applied");
        command.apply(&mut self.config.borrow_mut());
    }

    /// Apply every queued [`TuningCommand`]; call between cycles.
    pub fn apply_pending_tuning(&self) -> usize {
        let mut applied = 0;
        while let Ok(command) = TUNING_CHANNEL.try_receive() {
            self.apply_tuning(command);
            applied += 1;
        }
        applied
    }

    /// Follow `trajectory` from the moment the action is first polled.
    pub fn follow<'a, T: Trajectory + 'a>(
        &'a self,
        trajectory: T,
    ) -> Action<'a> {
        Action::new(FollowTask {
            drive: self,
            trajectory,
            started_at: None,
        })
    }

    /// Segments chained from `begin`, each starting where the last ended.
    pub fn action_builder(
        &self,
        begin: Pose2d,
    ) -> TrajectoryActionBuilder<'_, M, S, C> {
        TrajectoryActionBuilder {
            drive: self,
            pose: begin,
            actions: Vec::new(),
        }
    }

    /// Turn in place by `angle` radians from the current estimate.
    pub fn turn(
        &self,
        angle: f64,
    ) -> Action<'_> {
        self.action_builder(self.pose()).turn(angle).build()
    }

    /// Turn in place onto the absolute `heading`.
    pub fn turn_to(
        &self,
        heading: f64,
    ) -> Action<'_> {
        self.action_builder(self.pose()).turn_to(heading).build()
    }

    pub fn strafe_to(
        &self,
        position: Vector2d,
    ) -> Action<'_> {
        self.action_builder(self.pose()).strafe_to(position).build()
    }

    pub fn strafe_to_linear_heading(
        &self,
        position: Vector2d,
        heading: f64,
    ) -> Action<'_> {
        self.action_builder(self.pose())
            .strafe_to_linear_heading(position, heading)
            .build()
    }

    /// No follow action is driving the wheels any more.
    fn clear_target(&self) {
        let mut diagnostics = self.diagnostics.get();
        diagnostics.target = None;
        self.diagnostics.set(diagnostics);
    }

    fn write_powers(
        &self,
        wheels: WheelVelocities,
    ) -> Result<(), HardwareError> {
        self.motors.borrow_mut().set_powers(wheels)?;
        let mut diagnostics = self.diagnostics.get();
        diagnostics.wheel_powers = wheels;
        self.diagnostics.set(diagnostics);
        Ok(())
    }

    /// One closed-loop step toward `target`, using the current estimate.
    fn track(
        &self,
        target: &TargetSample,
        velocity: PoseVelocity2d,
    ) -> Result<WheelVelocities, ActionError> {
        let config = self.config();
        let pose = self.pose.get();

        let command = HolonomicController::new(config.gains).compute(target, pose, velocity);
        let acceleration = pose.heading.inverse().rotate_velocity(target.acceleration);
        let wheel_vel = self.kinematics.inverse(command).to_array();
        let wheel_accel = self.kinematics.inverse(acceleration).to_array();

        let voltage = self.sensors.borrow_mut().voltage()?;
        if !(voltage > 0.0) {
            tracing::error!(voltage, "supply voltage is not positive");
            return Err(ActionError::Failed("supply voltage is not positive"));
        }

        let mut powers = [0.0; 4];
        for ((p, v), a) in powers.iter_mut().zip(wheel_vel).zip(wheel_accel) {
            *p = config.feedforward.voltage(v, a) / voltage;
        }
        let powers = WheelVelocities::from_array(powers);
        self.motors.borrow_mut().set_powers(powers)?;
        tracing::trace!(?command, ?powers, voltage, "drive command");

        self.diagnostics.set(DriveDiagnostics {
            pose,
            target: Some(target.pose),
            pose_error: HolonomicController::pose_error(target.pose, pose),
            wheel_powers: powers,
            voltage,
        });
        Ok(powers)
    }
}

struct FollowTask<'a, M, S, C, T> {
    drive: &'a MecanumDrive<M, S, C>,
    trajectory: T,
    started_at: Option<Instant>,
}

impl<M: WheelMotors, S: DriveSensors, C: Clock, T: Trajectory> Task for FollowTask<'_, M, S, C, T> {
    fn run(&mut self) -> Result<Status, ActionError> {
        let drive = self.drive;
        let now = drive.clock.now();
        let start = *self.started_at.get_or_insert(now);
        let t = elapsed_secs(start, now);

        if t >= self.trajectory.duration() {
            drive.clear_target();
            drive.write_powers(WheelVelocities::ZERO)?;
            tracing::debug!(duration = self.trajectory.duration(), "trajectory complete");
            return Ok(Status::Done);
        }

        let target = self.trajectory.sample(t);
        let step = drive
            .update_pose_estimate()
            .map_err(ActionError::from)
            .and_then(|velocity| drive.track(&target, velocity));
        if let Err(e) = step {
            drive.clear_target();
            return Err(e);
        }
        Ok(Status::Running)
    }

    fn cancel(&mut self) {
        self.drive.clear_target();
        if let Err(e) = self.drive.stop() {
            tracing::error!("failed to stop drive on cancel: {:?}", e);
        }
    }
}

/// Chains strafes, turns and waits into one sequential action.
pub struct TrajectoryActionBuilder<'a, M, S, C> {
    drive: &'a MecanumDrive<M, S, C>,
    pose: Pose2d,
    actions: Vec<Action<'a>>,
}

impl<'a, M: WheelMotors, S: DriveSensors, C: Clock> TrajectoryActionBuilder<'a, M, S, C> {
    /// Straight strafe keeping the current heading.
    pub fn strafe_to(
        self,
        position: Vector2d,
    ) -> Self {
        self.strafe(position, None)
    }

    /// Straight strafe turning onto `heading` (radians) along the way.
    pub fn strafe_to_linear_heading(
        self,
        position: Vector2d,
        heading: f64,
    ) -> Self {
        self.strafe(position, Some(Rotation2d::exp(heading)))
    }

    pub fn turn(
        mut self,
        angle: f64,
    ) -> Self {
        if libm::fabs(angle) < MIN_TURN {
            return self;
        }
        let constraints = self.drive.config().constraints;
        let turn = TimeTurn::new(self.pose, angle, &constraints);
        self.pose.heading = self.pose.heading + angle;
        self.actions.push(self.drive.follow(turn));
        self
    }

    pub fn turn_to(
        self,
        heading: f64,
    ) -> Self {
        let angle = Rotation2d::exp(heading) - self.pose.heading;
        self.turn(angle)
    }

    pub fn wait_seconds(
        mut self,
        seconds: f64,
    ) -> Self {
        self.actions.push(Action::wait(&self.drive.clock, secs(seconds)));
        self
    }

    /// Pose the robot should be at once every segment so far has run.
    pub fn end_pose(&self) -> Pose2d {
        self.pose
    }

    pub fn build(self) -> Action<'a> {
        Action::sequence(self.actions)
    }

    fn strafe(
        mut self,
        position: Vector2d,
        heading: Option<Rotation2d>,
    ) -> Self {
        let config = self.drive.config();
        let begin = self.pose;
        if (position - begin.position).norm() < MIN_STRAFE {
            return match heading {
                Some(h) => self.turn(h - begin.heading),
                None => self,
            };
        }
        let trajectory = LinearTrajectory::new(
            begin,
            position,
            heading,
            &config.constraints,
            &self.drive.kinematics,
        );
        self.pose = Pose2d {
            position,
            heading: heading.unwrap_or(begin.heading),
        };
        self.actions.push(self.drive.follow(trajectory));
        self
    }
}

#[cfg(test)]
mod tests {
    use core::f64::consts::PI;

    use super::*;
    use crate::utils::{
        config::Feedforward,
        hal::{EncoderReading, ManualClock},
    };

    #[derive(Default)]
    struct RecordingMotors {
        last: WheelVelocities,
        writes: u32,
    }

    impl WheelMotors for RecordingMotors {
        fn set_powers(
            &mut self,
            powers: WheelVelocities,
        ) -> Result<(), HardwareError> {
            self.last = powers;
            self.writes += 1;
            Ok(())
        }
    }

    struct StaticSensors {
        counts: [i64; 4],
        heading: f64,
        voltage: f64,
    }

    impl DriveSensors for StaticSensors {
        fn encoders(&mut self) -> Result<[EncoderReading; 4], HardwareError> {
            Ok(self.counts.map(|c| EncoderReading::new(c, 0.0)))
        }

        fn heading(&mut self) -> Result<f64, HardwareError> {
            Ok(self.heading)
        }

        fn voltage(&mut self) -> Result<f64, HardwareError> {
            Ok(self.voltage)
        }
    }

    fn drive(
        clock: &ManualClock,
        config: DriveConfig,
    ) -> MecanumDrive<RecordingMotors, StaticSensors, &ManualClock> {
        MecanumDrive::new(
            config,
            RecordingMotors::default(),
            StaticSensors {
                counts: [0; 4],
                heading: 0.0,
                voltage: 12.0,
            },
            clock,
            Pose2d::default(),
        )
    }

    /// Constant world-frame velocity for a fixed time.
    struct Cruise {
        duration: f64,
        velocity: PoseVelocity2d,
    }

    impl Trajectory for Cruise {
        fn duration(&self) -> f64 {
            self.duration
        }

        fn sample(
            &self,
            t: f64,
        ) -> TargetSample {
            TargetSample {
                pose: Pose2d::default() + Twist2d::new(self.velocity.linear.scale(t), 0.0),
                velocity: self.velocity,
                acceleration: PoseVelocity2d::ZERO,
            }
        }
    }

    fn close(
        a: f64,
        b: f64,
    ) -> bool {
        libm::fabs(a - b) < 1e-9
    }

    #[test]
    fn open_loop_powers_are_normalized() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        let wheels = d
            .set_drive_powers(PoseVelocity2d::new(Vector2d::new(1.0, 0.0), 1.0))
            .unwrap();
        assert_eq!(wheels.to_array(), [0.0, 0.0, 1.0, 1.0]);
        let wheels = d
            .set_drive_powers(PoseVelocity2d::new(Vector2d::new(0.3, 0.2), 0.0))
            .unwrap();
        assert!(close(wheels.left_front, 0.1));
        assert_eq!(d.motors().last, wheels);
    }

    #[test]
    fn controller_rotates_target_into_robot_frame() {
        let controller = HolonomicController::new(FeedbackGains::default());
        let target = TargetSample {
            pose: Pose2d::new(0.0, 0.0, PI / 2.0),
            velocity: PoseVelocity2d::new(Vector2d::new(1.0, 0.0), 0.0),
            acceleration: PoseVelocity2d::ZERO,
        };
        let cmd = controller.compute(&target, Pose2d::new(0.0, 0.0, PI / 2.0), PoseVelocity2d::ZERO);
        assert!(close(cmd.linear.x, 0.0));
        assert!(close(cmd.linear.y, -1.0));
    }

    #[test]
    fn controller_corrects_pose_error() {
        let controller = HolonomicController::new(FeedbackGains {
            axial: 2.0,
            lateral: 3.0,
            heading: 4.0,
            ..FeedbackGains::default()
        });
        let target = TargetSample {
            pose: Pose2d::new(1.0, -0.5, 0.1),
            ..TargetSample::default()
        };
        let cmd = controller.compute(&target, Pose2d::default(), PoseVelocity2d::ZERO);
        assert!(close(cmd.linear.x, 2.0));
        assert!(close(cmd.linear.y, -1.5));
        assert!(close(cmd.angular, 0.4));
    }

    #[test]
    fn pose_history_is_bounded() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        for i in 0..150 {
            d.sensors_mut().counts = [i; 4];
            d.update_pose_estimate().unwrap();
        }
        let history = d.pose_history();
        assert_eq!(history.len(), POSE_HISTORY);
        assert!(close(d.pose().position.x, 149.0));
        assert_eq!(history.last().copied(), Some(d.pose()));
    }

    #[test]
    fn follow_applies_feedforward_over_voltage() {
        let clock = ManualClock::new();
        let config = DriveConfig {
            feedforward: Feedforward {
                k_s: 0.0,
                k_v: 1.0,
                k_a: 0.0,
            },
            ..DriveConfig::default()
        };
        let d = drive(&clock, config);
        let mut action = d.follow(Cruise {
            duration: 1.0,
            velocity: PoseVelocity2d::new(Vector2d::new(6.0, 0.0), 0.0),
        });
        assert_eq!(action.poll().unwrap(), Status::Running);
        for p in d.motors().last.to_array() {
            assert!(close(p, 0.5));
        }
        assert_eq!(d.diagnostics().voltage, 12.0);
        assert!(d.diagnostics().target.is_some());
    }

    #[test]
    fn follow_finishes_with_zero_powers() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        let mut action = d.follow(Cruise {
            duration: 2.0,
            velocity: PoseVelocity2d::new(Vector2d::new(1.0, 0.0), 0.0),
        });
        clock.set_secs(0.0);
        assert_eq!(action.poll().unwrap(), Status::Running);
        clock.set_secs(1.0);
        assert_eq!(action.poll().unwrap(), Status::Running);
        clock.set_secs(2.1);
        assert_eq!(action.poll().unwrap(), Status::Done);
        assert_eq!(d.motors().last, WheelVelocities::ZERO);
        assert_eq!(d.diagnostics().target, None);
    }

    #[test]
    fn dead_battery_fails_the_action() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        d.sensors_mut().voltage = 0.0;
        let mut action = d.follow(Cruise {
            duration: 1.0,
            velocity: PoseVelocity2d::ZERO,
        });
        assert!(matches!(action.poll(), Err(ActionError::Failed(_))));
        assert_eq!(d.diagnostics().target, None);
    }

    #[test]
    fn pose_keeps_updating_after_a_failed_follow() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        d.update_pose_estimate().unwrap();
        d.sensors_mut().voltage = -1.0;
        let mut action = d.follow(Cruise {
            duration: 1.0,
            velocity: PoseVelocity2d::ZERO,
        });
        assert!(action.poll().is_err());

        // the control loop refreshes the estimate itself once no follow runs
        for step in 1..=3 {
            if d.diagnostics().target.is_none() {
                d.sensors_mut().counts = [step * 10; 4];
                d.update_pose_estimate().unwrap();
            }
        }
        assert!(close(d.pose().position.x, 30.0));
        assert_eq!(d.diagnostics().pose, d.pose());
    }

    #[test]
    fn cancel_clears_the_target() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        let mut action = d.follow(Cruise {
            duration: 5.0,
            velocity: PoseVelocity2d::new(Vector2d::new(1.0, 0.0), 0.0),
        });
        action.poll().unwrap();
        assert!(d.diagnostics().target.is_some());
        action.cancel();
        assert_eq!(d.diagnostics().target, None);
    }

    #[test]
    fn cancel_stops_wheels() {
        let clock = ManualClock::new();
        let config = DriveConfig {
            feedforward: Feedforward {
                k_s: 1.0,
                k_v: 0.0,
                k_a: 0.0,
            },
            ..DriveConfig::default()
        };
        let d = drive(&clock, config);
        let mut action = d.follow(Cruise {
            duration: 5.0,
            velocity: PoseVelocity2d::new(Vector2d::new(1.0, 0.0), 0.0),
        });
        action.poll().unwrap();
        assert_ne!(d.motors().last, WheelVelocities::ZERO);
        action.cancel();
        assert_eq!(d.motors().last, WheelVelocities::ZERO);
    }

    #[test]
    fn builder_chains_end_poses() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        let builder = d
            .action_builder(Pose2d::default())
            .strafe_to(Vector2d::new(10.0, 0.0))
            .turn_to(PI / 2.0)
            .strafe_to_linear_heading(Vector2d::new(10.0, 10.0), PI)
            .wait_seconds(0.5);
        let end = builder.end_pose();
        assert_eq!(end.position, Vector2d::new(10.0, 10.0));
        assert!(close(end.heading.log(), PI));
        let _ = builder.build();
    }

    #[test]
    fn in_place_strafe_becomes_turn() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        let mut action = d
            .action_builder(Pose2d::default())
            .strafe_to_linear_heading(Vector2d::ZERO, 1.0)
            .build();
        assert_eq!(action.poll().unwrap(), Status::Running);
        assert_eq!(d.diagnostics().target.map(|p| p.position), Some(Vector2d::ZERO));
    }

    #[test]
    fn queued_tuning_is_applied_between_cycles() {
        let clock = ManualClock::new();
        let d = drive(&clock, DriveConfig::default());
        while TUNING_CHANNEL.try_receive().is_ok() {}
        TUNING_CHANNEL
            .try_send(TuningCommand::Feedforward(Feedforward {
                k_s: 0.5,
                k_v: 0.1,
                k_a: 0.0,
            }))
            .unwrap();
        assert_eq!(d.apply_pending_tuning(), 1);
        assert_eq!(d.config().feedforward.k_s, 0.5);
        assert_eq!(d.apply_pending_tuning(), 0);
    }
}
