//! Strategies deciding when an armed beat actually runs.

use core::cell::RefCell;
use core::fmt;
use std::collections::VecDeque;
use std::rc::Rc;

type Beat = Box<dyn FnOnce() + 'static>;

/// Defers an armed beat to the next point the host's event loop is free.
pub trait BeatDispatcher {
    /// Arranges for `beat` to run later. Implementations must not run it synchronously.
    fn dispatch(&self, beat: Beat);
}

impl<F> BeatDispatcher for F
where
    F: Fn(Beat),
{
    fn dispatch(&self, beat: Beat) {
        self(beat);
    }
}

/// Dispatcher that holds beats until the host runs them explicitly.
#[derive(Clone, Default)]
pub struct ManualDispatcher {
    pending: Rc<RefCell<VecDeque<Beat>>>,
}

impl ManualDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a beat is waiting to run.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Runs pending beats until none is left, including beats armed while running.
    ///
    /// Returns the number of beats run.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Some(beat) = self.pop() {
            beat();
            count += 1;
        }
        count
    }

    fn pop(&self) -> Option<Beat> {
        self.pending.borrow_mut().pop_front()
    }
}

impl BeatDispatcher for ManualDispatcher {
    fn dispatch(&self, beat: Beat) {
        self.pending.borrow_mut().push_back(beat);
    }
}

impl fmt::Debug for ManualDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualDispatcher")
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

/// Dispatcher spawning every beat as a task on the thread-local executor.
///
/// The host must have initialized a local executor for `executor-core` before the first beat is armed.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutorDispatcher;

impl BeatDispatcher for LocalExecutorDispatcher {
    fn dispatch(&self, beat: Beat) {
        executor_core::spawn_local(async move {
            beat();
        })
        .detach();
    }
}
