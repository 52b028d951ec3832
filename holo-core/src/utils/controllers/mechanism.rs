//! Mechanism controller: one actuator behind an Idle/Running/Faulted state
//! machine.
//!
//! A [`Mechanism`] hands out scheduler actions ([`Mechanism::move_to`],
//! [`Mechanism::move_for`], [`Mechanism::run_at`]) that borrow it for their
//! lifetime. Only one motion may run at a time: an action started while the
//! mechanism is not Idle fails with [`MechanismError::Busy`] without touching
//! the actuator.
//!
//! Faults are sticky. Once an actuator call fails inside an action the state
//! becomes [`MechanismState::Faulted`] and stays there until
//! [`Mechanism::stop`] is called.
//!
//! # Example
//! ```rust
//! use holo_core::utils::{
//!     config::MechanismConfig,
//!     controllers::mechanism::{Mechanism, MechanismState},
//!     hal::{Actuator, HardwareError, ManualClock},
//! };
//!
//! struct Servo(f64);
//! impl Actuator for Servo {
//!     fn position(&mut self) -> Result<f64, HardwareError> { Ok(self.0) }
//!     fn drive_to(&mut self, target: f64, _power: f64) -> Result<(), HardwareError> {
//!         self.0 = target;
//!         Ok(())
//!     }
//!     fn is_busy(&mut self) -> Result<bool, HardwareError> { Ok(false) }
//!     fn set_power(&mut self, _power: f64) -> Result<(), HardwareError> { Ok(()) }
//! }
//!
//! let clock = ManualClock::new();
//! let claw = Mechanism::new(MechanismConfig::new("claw", 0.0, 1.0), Servo(0.0), &clock);
//! let mut close = claw.move_to(1.0, 0.8).unwrap();
//! close.poll().unwrap();
//! assert_eq!(claw.state(), MechanismState::Running);
//! close.poll().unwrap();
//! assert_eq!(claw.state(), MechanismState::Idle);
//! ```

use alloc::string::String;
use core::{
    cell::{Cell, Ref, RefCell},
    fmt,
};

use embassy_time::{Duration, Instant};
use serde::Serialize;

use crate::utils::{
    actions::{Action, ActionError, Status, Task},
    config::MechanismConfig,
    hal::{Actuator, Clock, HardwareError},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MechanismState {
    Idle,
    Running,
    /// Sticky until [`Mechanism::stop`].
    Faulted(ActionError),
}

/// Precondition violations reported to whoever asked for the motion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MechanismError {
    OutOfBounds {
        name: String,
        target: f64,
        min: f64,
        max: f64,
    },
    InvalidPower {
        name: String,
        power: f64,
    },
    /// A motion was started while the mechanism was not Idle.
    Busy {
        name: String,
    },
}

impl fmt::Display for MechanismError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            MechanismError::OutOfBounds {
                name,
                target,
                min,
                max,
            } => write!(f, "{}: target {} outside [{}, {}]", name, target, min, max),
            MechanismError::InvalidPower { name, power } => {
                write!(f, "{}: power {} outside [-1, 1]", name, power)
            }
            MechanismError::Busy { name } => write!(f, "{}: mechanism is busy", name),
        }
    }
}

/// Per-cycle snapshot for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MechanismReport {
    pub name: String,
    pub state: MechanismState,
    pub goal: Option<f64>,
    pub position: f64,
    pub busy: bool,
}

pub struct Mechanism<A, C> {
    config: MechanismConfig,
    actuator: RefCell<A>,
    clock: C,
    state: RefCell<MechanismState>,
    goal: Cell<Option<f64>>,
    // bumped whenever a motion starts or is taken away from its action
    generation: Cell<u32>,
}

impl<A: Actuator, C: Clock> Mechanism<A, C> {
    pub fn new(
        config: MechanismConfig,
        actuator: A,
        clock: C,
    ) -> Self {
        Self {
            config,
            actuator: RefCell::new(actuator),
            clock,
            state: RefCell::new(MechanismState::Idle),
            goal: Cell::new(None),
            generation: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &MechanismConfig {
        &self.config
    }

    pub fn state(&self) -> MechanismState {
        self.state.borrow().clone()
    }

    /// Last target handed to the actuator, if the position is known.
    pub fn goal(&self) -> Option<f64> {
        self.goal.get()
    }

    /// Borrow the actuator, e.g. to inspect a simulated device.
    pub fn actuator(&self) -> Ref<'_, A> {
        self.actuator.borrow()
    }

    pub fn require_ready(&self) -> Result<(), MechanismError> {
        match *self.state.borrow() {
            MechanismState::Idle => Ok(()),
            _ => Err(MechanismError::Busy {
                name: self.config.name.clone(),
            }),
        }
    }

    /// Move to `target` at `power`, then hold there at the idle power.
    ///
    /// Bounds are checked here, before the action exists, so a rejected
    /// target never reaches the actuator.
    pub fn move_to(
        &self,
        power: f64,
        target: f64,
    ) -> Result<Action<'_>, MechanismError> {
        if !(self.config.min..=self.config.max).contains(&target) {
            tracing::warn!(name = %self.config.name, requested = target, "target out of bounds");
            return Err(MechanismError::OutOfBounds {
                name: self.config.name.clone(),
                target,
                min: self.config.min,
                max: self.config.max,
            });
        }
        self.check_power(power)?;
        Ok(self.motion(Motion::To { target, power }))
    }

    /// Open-loop move at `power` for a fixed time.
    pub fn move_for(
        &self,
        power: f64,
        duration: Duration,
    ) -> Result<Action<'_>, MechanismError> {
        self.check_power(power)?;
        Ok(self.motion(Motion::For { power, duration }))
    }

    /// Apply `power` until the action is cancelled or times out.
    pub fn run_at(
        &self,
        power: f64,
    ) -> Result<Action<'_>, MechanismError> {
        self.check_power(power)?;
        Ok(self.motion(Motion::Run { power }))
    }

    /// Re-zero the actuator's position on the first poll.
    ///
    /// Refused with [`MechanismError::Busy`] unless Idle. The old goal no
    /// longer means anything afterwards, so it is forgotten and the idle
    /// hold goes open-loop.
    pub fn reset_encoder(&self) -> Action<'_> {
        Action::from_fn(move || {
            self.require_ready()?;
            self.goal.set(None);
            let reset = self.actuator.borrow_mut().reset_position();
            if let Err(e) = reset.and_then(|()| self.hold_idle()) {
                return Err(self.fault(e.into()));
            }
            tracing::info!(name = %self.config.name, "position reset");
            Ok(Status::Done)
        })
    }

    /// Take the mechanism back from whatever action is driving it.
    ///
    /// Applies the idle hold and returns to Idle; the orphaned action
    /// finishes on its next poll without touching the actuator. A faulted
    /// mechanism is left alone.
    pub fn cancel(&self) -> Result<(), ActionError> {
        if *self.state.borrow() != MechanismState::Running {
            return Ok(());
        }
        self.bump_generation();
        if let Err(e) = self.hold_idle() {
            return Err(self.fault_in_cleanup(e.into()));
        }
        self.set_state(MechanismState::Idle);
        tracing::info!(name = %self.config.name, "motion cancelled");
        Ok(())
    }

    /// Cut power and return to Idle. This is the only way out of Faulted.
    ///
    /// On a hardware error the state is left as it was.
    pub fn stop(&self) -> Result<(), HardwareError> {
        self.actuator.borrow_mut().set_power(0.0).map_err(|e| {
            tracing::error!(name = %self.config.name, "stop failed: {:?}", e);
            e
        })?;
        self.bump_generation();
        self.goal.set(None);
        self.set_state(MechanismState::Idle);
        tracing::info!(name = %self.config.name, "mechanism stopped");
        Ok(())
    }

    /// Snapshot for diagnostics, called once per cycle regardless of actions.
    ///
    /// While Idle with a known goal, the idle hold at the goal is re-applied.
    pub fn report(&self) -> Result<MechanismReport, HardwareError> {
        let state = self.state();
        let goal = self.goal.get();
        let mut actuator = self.actuator.borrow_mut();
        if let (MechanismState::Idle, Some(goal)) = (&state, goal) {
            actuator.drive_to(goal, self.config.idle_power)?;
        }
        let position = actuator.position()?;
        let busy = actuator.is_busy()?;
        tracing::trace!(name = %self.config.name, ?state, position, busy);
        Ok(MechanismReport {
            name: self.config.name.clone(),
            state,
            goal,
            position,
            busy,
        })
    }

    fn check_power(
        &self,
        power: f64,
    ) -> Result<(), MechanismError> {
        if (-1.0..=1.0).contains(&power) {
            Ok(())
        } else {
            Err(MechanismError::InvalidPower {
                name: self.config.name.clone(),
                power,
            })
        }
    }

    fn motion(
        &self,
        motion: Motion,
    ) -> Action<'_> {
        Action::new(MotionTask {
            mechanism: self,
            motion,
            generation: None,
            started_at: None,
        })
    }

    fn set_state(
        &self,
        state: MechanismState,
    ) {
        *self.state.borrow_mut() = state;
    }

    fn bump_generation(&self) -> u32 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }

    fn owns(
        &self,
        generation: u32,
    ) -> bool {
        self.generation.get() == generation
    }

    /// Idle hold: at the goal when one is known, open-loop otherwise.
    fn hold_idle(&self) -> Result<(), HardwareError> {
        let mut actuator = self.actuator.borrow_mut();
        match self.goal.get() {
            Some(goal) => actuator.drive_to(goal, self.config.idle_power),
            None => actuator.set_power(self.config.idle_power),
        }
    }

    /// Record `error`, run cleanup once and return what the caller should see.
    fn fault(
        &self,
        error: ActionError,
    ) -> ActionError {
        tracing::error!(name = %self.config.name, %error, "mechanism faulted");
        self.set_state(MechanismState::Faulted(error.clone()));
        match self.hold_idle() {
            Ok(()) => error,
            Err(cleanup) => self.fault_in_cleanup(cleanup.into()),
        }
    }

    fn fault_in_cleanup(
        &self,
        error: ActionError,
    ) -> ActionError {
        tracing::error!(name = %self.config.name, %error, "idle hold failed");
        self.set_state(MechanismState::Faulted(error.clone()));
        error
    }
}

#[derive(Debug, Clone, Copy)]
enum Motion {
    To { target: f64, power: f64 },
    For { power: f64, duration: Duration },
    Run { power: f64 },
}

struct MotionTask<'a, A, C> {
    mechanism: &'a Mechanism<A, C>,
    motion: Motion,
    generation: Option<u32>,
    started_at: Option<Instant>,
}

impl<A: Actuator, C: Clock> MotionTask<'_, A, C> {
    fn start(&mut self) -> Result<(), ActionError> {
        let mech = self.mechanism;
        mech.require_ready()?;
        self.generation = Some(mech.bump_generation());
        self.started_at = Some(mech.clock.now());
        mech.set_state(MechanismState::Running);
        tracing::info!(name = %mech.config.name, motion = ?self.motion, "motion started");

        let mut actuator = mech.actuator.borrow_mut();
        match self.motion {
            Motion::To { target, power } => {
                mech.goal.set(Some(target));
                actuator.drive_to(target, power)?;
            }
            Motion::For { power, .. } | Motion::Run { power } => {
                mech.goal.set(None);
                actuator.set_power(power)?;
            }
        }
        Ok(())
    }

    fn finished(
        &self,
        elapsed: Duration,
    ) -> Result<bool, ActionError> {
        Ok(match self.motion {
            Motion::To { .. } => !self.mechanism.actuator.borrow_mut().is_busy()?,
            Motion::For { duration, .. } => elapsed >= duration,
            Motion::Run { .. } => false,
        })
    }
}

impl<A: Actuator, C: Clock> Task for MotionTask<'_, A, C> {
    fn run(&mut self) -> Result<Status, ActionError> {
        let mech = self.mechanism;
        let Some(generation) = self.generation else {
            if let Err(e) = self.start() {
                return match e {
                    // someone else owns the mechanism; not ours to fault
                    ActionError::Mechanism(MechanismError::Busy { .. }) => Err(e),
                    e => Err(mech.fault(e)),
                };
            }
            return Ok(Status::Running);
        };

        if !mech.owns(generation) {
            return Ok(Status::Done);
        }

        let start = self.started_at.unwrap_or_else(|| mech.clock.now());
        let elapsed = mech.clock.now().saturating_duration_since(start);
        let finished = match self.finished(elapsed) {
            Ok(finished) => finished,
            Err(e) => return Err(mech.fault(e)),
        };
        let timed_out = !finished && mech.config.timeout().is_some_and(|t| elapsed >= t);
        if timed_out {
            tracing::warn!(name = %mech.config.name, "motion timed out after {:?}", elapsed);
        }
        if !finished && !timed_out {
            return Ok(Status::Running);
        }

        if let Err(e) = mech.hold_idle() {
            return Err(mech.fault_in_cleanup(e.into()));
        }
        if *mech.state.borrow() == MechanismState::Running {
            mech.set_state(MechanismState::Idle);
        }
        tracing::info!(name = %mech.config.name, "motion finished");
        Ok(Status::Done)
    }

    fn cancel(&mut self) {
        let mech = self.mechanism;
        if let Some(generation) = self.generation {
            if mech.owns(generation) {
                if let Err(e) = mech.cancel() {
                    tracing::error!(name = %mech.config.name, "cancel failed: {}", e);
                }
            }
        }
    }
}
