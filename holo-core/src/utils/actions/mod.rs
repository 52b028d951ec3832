//! Cooperative, non-blocking actions.
//!
//! An [`Action`] is polled once per control cycle until it reports
//! [`Status::Done`]. Long-running work lives in a [`Task`]; composites run
//! children one after another ([`Action::Sequential`]) or side by side
//! ([`Action::Parallel`]). There are no threads: every suspension point is a
//! return from [`Action::poll`].
//!
//! # Example
//! ```rust
//! use core::cell::Cell;
//! use holo_core::utils::actions::{Action, Status};
//!
//! let counter = Cell::new(0);
//! let mut seq = Action::sequence([
//!     Action::instant(|| counter.set(counter.get() + 1)),
//!     Action::instant(|| counter.set(counter.get() + 10)),
//! ]);
//! assert_eq!(seq.poll().unwrap(), Status::Running);
//! assert_eq!(seq.poll().unwrap(), Status::Done);
//! assert_eq!(counter.get(), 11);
//! ```

pub mod builder;
pub mod scheduler;

use alloc::{boxed::Box, collections::VecDeque, string::String, vec::Vec};
use core::fmt;

use embassy_time::{Duration, Instant};
use serde::Serialize;

use super::{
    controllers::mechanism::MechanismError,
    hal::{Clock, HardwareError},
};

pub use builder::ActionBuilder;
pub use scheduler::Scheduler;

/// Result of polling an action once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Done,
}

impl Status {
    pub fn is_done(self) -> bool {
        matches!(self, Status::Done)
    }

    /// `Done` when `finished`, otherwise `Running`.
    pub fn finished_if(finished: bool) -> Self {
        if finished {
            Status::Done
        } else {
            Status::Running
        }
    }
}

/// Errors surfaced from a poll. Nothing in the core retries them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionError {
    Hardware(HardwareError),
    Mechanism(MechanismError),
    /// A task reported a failure of its own.
    Failed(&'static str),
}

impl fmt::Display for ActionError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ActionError::Hardware(e) => write!(f, "hardware error: {}", e),
            ActionError::Mechanism(e) => write!(f, "{}", e),
            ActionError::Failed(reason) => write!(f, "action failed: {}", reason),
        }
    }
}

impl From<HardwareError> for ActionError {
    fn from(e: HardwareError) -> Self {
        ActionError::Hardware(e)
    }
}

impl From<MechanismError> for ActionError {
    fn from(e: MechanismError) -> Self {
        ActionError::Mechanism(e)
    }
}

/// A unit of pollable work with closure-like private state.
pub trait Task {
    /// Advance by one control cycle.
    fn run(&mut self) -> Result<Status, ActionError>;

    /// Release whatever the task holds on hardware. Called at most once, and
    /// only when the task started and has not finished.
    fn cancel(&mut self) {}
}

/// Adapter turning a closure into a [`Task`].
pub struct FnTask<F>(pub F);

impl<F> Task for FnTask<F>
where
    F: FnMut() -> Result<Status, ActionError>,
{
    fn run(&mut self) -> Result<Status, ActionError> {
        (self.0)()
    }
}

/// Waits until a fixed duration has passed since its first poll.
pub struct WaitTask<C> {
    clock: C,
    duration: Duration,
    started_at: Option<Instant>,
}

impl<C: Clock> Task for WaitTask<C> {
    fn run(&mut self) -> Result<Status, ActionError> {
        let now = self.clock.now();
        let start = *self.started_at.get_or_insert(now);
        Ok(Status::finished_if(
            now.saturating_duration_since(start) >= self.duration,
        ))
    }
}

/// A leaf action wrapping a [`Task`] with its started/finished bookkeeping.
pub struct TaskAction<'a> {
    task: Box<dyn Task + 'a>,
    started: bool,
    finished: bool,
}

impl TaskAction<'_> {
    fn poll(&mut self) -> Result<Status, ActionError> {
        if self.finished {
            return Ok(Status::Done);
        }
        self.started = true;
        match self.task.run() {
            Ok(Status::Running) => Ok(Status::Running),
            Ok(Status::Done) => {
                self.finished = true;
                Ok(Status::Done)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn cancel(&mut self) {
        if self.started && !self.finished {
            self.finished = true;
            self.task.cancel();
        }
    }
}

/// An action wrapped with a name for lifecycle logging.
pub struct Labeled<'a> {
    label: String,
    polls: u32,
    inner: Box<Action<'a>>,
}

pub enum Action<'a> {
    Task(TaskAction<'a>),
    Sequential(VecDeque<Action<'a>>),
    Parallel(Vec<Action<'a>>),
    Instant(Option<Box<dyn FnOnce() + 'a>>),
    Labeled(Labeled<'a>),
}

impl fmt::Debug for Action<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Action::Sequential(children) => f.debug_tuple("Sequential").field(&children.len()).finish(),
            Action::Parallel(children) => f.debug_tuple("Parallel").field(&children.len()).finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl<'a> Action<'a> {
    /// Leaf action driving `task` until it reports done.
    pub fn new(task: impl Task + 'a) -> Self {
        Action::Task(TaskAction {
            task: Box::new(task),
            started: false,
            finished: false,
        })
    }

    /// Leaf action from a closure returning its status each poll.
    pub fn from_fn(f: impl FnMut() -> Result<Status, ActionError> + 'a) -> Self {
        Self::new(FnTask(f))
    }

    /// Children run one after another; the next starts on the poll after
    /// the previous one finished.
    pub fn sequence(actions: impl IntoIterator<Item = Action<'a>>) -> Self {
        Action::Sequential(actions.into_iter().collect())
    }

    /// Children are all polled every cycle; done once every child is.
    pub fn parallel(actions: impl IntoIterator<Item = Action<'a>>) -> Self {
        Action::Parallel(actions.into_iter().collect())
    }

    /// Run `effect` on the first poll and finish immediately.
    pub fn instant(effect: impl FnOnce() + 'a) -> Self {
        Action::Instant(Some(Box::new(effect)))
    }

    /// Finishes once `duration` has passed since the first poll.
    pub fn wait<C: Clock + 'a>(
        clock: C,
        duration: Duration,
    ) -> Self {
        Self::new(WaitTask {
            clock,
            duration,
            started_at: None,
        })
    }

    /// Wrap this action so its start and finish are logged under `label`.
    pub fn labeled(
        self,
        label: impl Into<String>,
    ) -> Self {
        Action::Labeled(Labeled {
            label: label.into(),
            polls: 0,
            inner: Box::new(self),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Task(_) => "Task",
            Action::Sequential(_) => "Sequence",
            Action::Parallel(_) => "Parallel",
            Action::Instant(_) => "Instant",
            Action::Labeled(l) => &l.label,
        }
    }

    /// Advance by one control cycle.
    ///
    /// Errors from children are returned as-is; the composite makes no
    /// attempt to recover.
    pub fn poll(&mut self) -> Result<Status, ActionError> {
        match self {
            Action::Task(task) => task.poll(),
            Action::Sequential(children) => {
                let Some(current) = children.front_mut() else {
                    return Ok(Status::Done);
                };
                if current.poll()?.is_done() {
                    children.pop_front();
                }
                Ok(Status::finished_if(children.is_empty()))
            }
            Action::Parallel(children) => {
                let mut i = 0;
                while i < children.len() {
                    if children[i].poll()?.is_done() {
                        children.remove(i);
                    } else {
                        i += 1;
                    }
                }
                Ok(Status::finished_if(children.is_empty()))
            }
            Action::Instant(effect) => {
                if let Some(effect) = effect.take() {
                    effect();
                }
                Ok(Status::Done)
            }
            Action::Labeled(labeled) => {
                if labeled.polls == 0 {
                    tracing::debug!(action = %labeled.label, "action started");
                }
                labeled.polls += 1;
                match labeled.inner.poll() {
                    Ok(Status::Done) => {
                        tracing::debug!(action = %labeled.label, polls = labeled.polls, "action finished");
                        Ok(Status::Done)
                    }
                    Ok(Status::Running) => Ok(Status::Running),
                    Err(error) => {
                        tracing::warn!(action = %labeled.label, %error, "action failed");
                        Err(error)
                    }
                }
            }
        }
    }

    /// Stop early, letting started leaves release their hardware.
    pub fn cancel(&mut self) {
        match self {
            Action::Task(task) => task.cancel(),
            Action::Sequential(children) => {
                if let Some(current) = children.front_mut() {
                    current.cancel();
                }
                children.clear();
            }
            Action::Parallel(children) => {
                for child in children.iter_mut() {
                    child.cancel();
                }
                children.clear();
            }
            Action::Instant(effect) => {
                effect.take();
            }
            Action::Labeled(labeled) => {
                if labeled.polls > 0 {
                    tracing::debug!(action = %labeled.label, polls = labeled.polls, "action cancelled");
                }
                labeled.inner.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::utils::hal::ManualClock;

    /// Leaf finishing on its `k`-th poll, counting polls into `seen`.
    fn after<'a>(
        k: u32,
        seen: &'a Cell<u32>,
    ) -> Action<'a> {
        let mut polls = 0;
        Action::from_fn(move || {
            polls += 1;
            seen.set(seen.get() + 1);
            Ok(Status::finished_if(polls >= k))
        })
    }

    fn polls_to_finish(action: &mut Action<'_>) -> u32 {
        let mut n = 0;
        loop {
            n += 1;
            if action.poll().unwrap().is_done() {
                return n;
            }
            assert!(n < 1000, "action never finished");
        }
    }

    #[test]
    fn sequence_takes_sum_of_polls() {
        let seen = Cell::new(0);
        let mut seq = Action::sequence([after(1, &seen), after(3, &seen), after(2, &seen)]);
        assert_eq!(polls_to_finish(&mut seq), 6);
        assert_eq!(seen.get(), 6);
    }

    #[test]
    fn empty_sequence_finishes_immediately() {
        let mut seq = Action::Sequential(VecDeque::new());
        assert_eq!(seq.poll().unwrap(), Status::Done);
    }

    #[test]
    fn parallel_joins_on_slowest() {
        let seen = Cell::new(0);
        let mut par = Action::parallel([after(2, &seen), after(5, &seen)]);
        for _ in 0..4 {
            assert_eq!(par.poll().unwrap(), Status::Running);
        }
        assert_eq!(par.poll().unwrap(), Status::Done);
        // the fast child is not polled after it finished
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn instant_runs_once() {
        let hits = Cell::new(0);
        let mut a = Action::instant(|| hits.set(hits.get() + 1));
        assert!(a.poll().unwrap().is_done());
        assert!(a.poll().unwrap().is_done());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn errors_propagate_through_composites() {
        let mut seq = Action::sequence([Action::parallel([Action::from_fn(|| {
            Err(ActionError::Failed("boom"))
        })])]);
        assert_eq!(seq.poll(), Err(ActionError::Failed("boom")));
    }

    #[test]
    fn wait_uses_clock() {
        let clock = ManualClock::new();
        let mut wait = Action::wait(&clock, Duration::from_millis(500));
        assert_eq!(wait.poll().unwrap(), Status::Running);
        clock.advance(Duration::from_millis(499));
        assert_eq!(wait.poll().unwrap(), Status::Running);
        clock.advance(Duration::from_millis(1));
        assert_eq!(wait.poll().unwrap(), Status::Done);
    }

    struct Hold<'a> {
        released: &'a Cell<bool>,
    }

    impl Task for Hold<'_> {
        fn run(&mut self) -> Result<Status, ActionError> {
            Ok(Status::Running)
        }

        fn cancel(&mut self) {
            self.released.set(true);
        }
    }

    #[test]
    fn cancel_reaches_started_leaves_only() {
        let first = Cell::new(false);
        let second = Cell::new(false);
        let mut seq = Action::sequence([
            Action::new(Hold { released: &first }),
            Action::new(Hold { released: &second }),
        ])
        .labeled("hold");
        assert_eq!(seq.poll().unwrap(), Status::Running);
        seq.cancel();
        assert!(first.get());
        assert!(!second.get());
        assert_eq!(seq.poll().unwrap(), Status::Done);
    }

    #[test]
    fn unstarted_task_ignores_cancel() {
        let released = Cell::new(false);
        let mut a = Action::new(Hold { released: &released });
        a.cancel();
        assert!(!released.get());
    }
}
