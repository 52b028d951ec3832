//! Fluent construction of action trees.
//!
//! ```rust
//! use core::cell::Cell;
//! use embassy_time::Duration;
//! use holo_core::utils::{actions::ActionBuilder, hal::ManualClock};
//!
//! let clock = ManualClock::new();
//! let fired = Cell::new(false);
//! let mut routine = ActionBuilder::new()
//!     .wait(&clock, Duration::from_millis(100))
//!     .parallel(|p| p.instant(|| fired.set(true)))
//!     .build();
//! while !routine.poll().unwrap().is_done() {
//!     clock.advance(Duration::from_millis(20));
//! }
//! assert!(fired.get());
//! ```

use alloc::vec::Vec;

use embassy_time::Duration;

use super::Action;
use crate::utils::hal::Clock;

#[derive(Default)]
pub struct ActionBuilder<'a> {
    actions: Vec<Action<'a>>,
}

impl<'a> ActionBuilder<'a> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    pub fn then(
        mut self,
        action: Action<'a>,
    ) -> Self {
        self.actions.push(action);
        self
    }

    pub fn instant(
        self,
        effect: impl FnOnce() + 'a,
    ) -> Self {
        self.then(Action::instant(effect).labeled("Instant"))
    }

    pub fn wait<C: Clock + 'a>(
        self,
        clock: C,
        duration: Duration,
    ) -> Self {
        self.then(Action::wait(clock, duration))
    }

    /// Append a nested sequence built by `f`.
    pub fn sequence(
        self,
        f: impl FnOnce(ActionBuilder<'a>) -> ActionBuilder<'a>,
    ) -> Self {
        let inner = f(ActionBuilder::new()).build();
        self.then(inner.labeled("Sequence"))
    }

    /// Append a group of actions that run side by side.
    pub fn parallel(
        self,
        f: impl FnOnce(ActionBuilder<'a>) -> ActionBuilder<'a>,
    ) -> Self {
        let inner = f(ActionBuilder::new()).build_parallel();
        self.then(inner.labeled("Parallel"))
    }

    /// Everything added so far, in order.
    pub fn build(self) -> Action<'a> {
        Action::sequence(self.actions)
    }

    /// Everything added so far, side by side.
    pub fn build_parallel(self) -> Action<'a> {
        Action::parallel(self.actions)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{vec, vec::Vec};
    use core::cell::RefCell;

    use super::*;
    use crate::utils::{actions::Status, hal::ManualClock};

    #[test]
    fn builds_nested_tree_in_order() {
        let log = RefCell::new(Vec::new());
        let clock = ManualClock::new();
        let mut action = ActionBuilder::new()
            .instant(|| log.borrow_mut().push("a"))
            .sequence(|s| {
                s.instant(|| log.borrow_mut().push("b"))
                    .instant(|| log.borrow_mut().push("c"))
            })
            .wait(&clock, Duration::from_millis(10))
            .instant(|| log.borrow_mut().push("d"))
            .build();

        for _ in 0..4 {
            assert_eq!(action.poll().unwrap(), Status::Running);
        }
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        clock.advance(Duration::from_millis(10));
        assert_eq!(action.poll().unwrap(), Status::Running);
        assert_eq!(action.poll().unwrap(), Status::Done);
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
    }
}
