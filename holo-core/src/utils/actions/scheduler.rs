use alloc::vec::Vec;

use super::{Action, ActionError, Status};

/// The set of actions polled once per control cycle.
///
/// Actions are polled in insertion order. An action returning an error is
/// dropped and the error handed back to the caller; every other action,
/// whether polled this cycle or not, stays in the set.
#[derive(Debug, Default)]
pub struct Scheduler<'a> {
    active: Vec<Action<'a>>,
    cycle: u64,
}

impl<'a> Scheduler<'a> {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            cycle: 0,
        }
    }

    /// Enqueue an action; it is first polled on the next [`Scheduler::poll`].
    pub fn add(
        &mut self,
        action: Action<'a>,
    ) {
        tracing::trace!(action = action.name(), "action scheduled");
        self.active.push(action);
    }

    /// Poll every scheduled action once, in insertion order.
    ///
    /// On the first error the failing action is cancelled, so children it
    /// still owns release their hardware, and dropped. Actions after it are
    /// polled on the next cycle.
    pub fn poll(&mut self) -> Result<(), ActionError> {
        self.cycle += 1;
        let mut i = 0;
        while i < self.active.len() {
            match self.active[i].poll() {
                Ok(Status::Running) => i += 1,
                Ok(Status::Done) => {
                    self.active.remove(i);
                }
                Err(error) => {
                    let mut failed = self.active.remove(i);
                    failed.cancel();
                    tracing::error!(
                        action = failed.name(),
                        cycle = self.cycle,
                        %error,
                        "action failed"
                    );
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Cancel every live action and empty the set.
    pub fn cancel_all(&mut self) {
        for action in self.active.iter_mut() {
            action.cancel();
        }
        if !self.active.is_empty() {
            tracing::info!(count = self.active.len(), "cancelled all actions");
        }
        self.active.clear();
    }

    /// True once every scheduled action has finished or been dropped.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Number of actions still scheduled.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Number of completed [`Scheduler::poll`] calls.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }
}
