//! # Heartbeat
//!
//! Batches scattered asynchronous completions (loader responses, event bus replies, promise-like
//! continuations) into discrete *beats*. Every beat runs in three phases:
//!
//! ```text
//! before queue ──▶ ┌ main queue ──▶ listeners ┐ ──▶ after queue
//!   (once)         └──── until main is empty ─┘       (once)
//! ```
//!
//! Work scheduled with [`Heartbeat::on_next`] is never run synchronously. The first call while the
//! heartbeat is idle arms a beat through the injected [`BeatDispatcher`], which decides when the host's
//! event loop is free. Work enqueued while a beat drains (for example from a listener) is picked up by the
//! same beat before the after phase starts.
//!
//! The heartbeat is created once per application and handed to whoever needs per-beat reconciliation.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use waterpage_heartbeat::Heartbeat;
//!
//! let (heartbeat, dispatcher) = Heartbeat::manual();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = log.clone();
//! heartbeat.on_before_next(move || sink.borrow_mut().push("before"));
//! let sink = log.clone();
//! heartbeat.on_next(move || sink.borrow_mut().push("main"));
//! let sink = log.clone();
//! heartbeat.on_after_next(move || sink.borrow_mut().push("after"));
//!
//! dispatcher.run_pending();
//! assert_eq!(*log.borrow(), ["before", "main", "after"]);
//! ```

mod dispatcher;
#[cfg(test)]
mod tests;

pub use dispatcher::{BeatDispatcher, LocalExecutorDispatcher, ManualDispatcher};

use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::trace;

type Task = Box<dyn FnOnce() + 'static>;
type Listener = Rc<dyn Fn() + 'static>;

/// Scheduler state of a [`Heartbeat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeatState {
    /// No beat is pending.
    #[default]
    Idle,
    /// A beat has been handed to the dispatcher but has not started yet.
    Armed,
    /// A beat is currently draining its queues.
    Draining,
}

struct HeartbeatInner {
    dispatcher: Box<dyn BeatDispatcher>,
    state: Cell<BeatState>,
    before: RefCell<VecDeque<Task>>,
    next: RefCell<VecDeque<Task>>,
    after: RefCell<VecDeque<Task>>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener_id: Cell<u64>,
    completed_beats: Cell<u64>,
}

/// Handle to the application-wide beat scheduler.
///
/// Cloning the handle shares the same queues.
#[derive(Clone)]
pub struct Heartbeat {
    inner: Rc<HeartbeatInner>,
}

impl Heartbeat {
    /// Creates a heartbeat that arms beats through `dispatcher`.
    pub fn new(dispatcher: impl BeatDispatcher + 'static) -> Self {
        Self {
            inner: Rc::new(HeartbeatInner {
                dispatcher: Box::new(dispatcher),
                state: Cell::new(BeatState::Idle),
                before: RefCell::new(VecDeque::new()),
                next: RefCell::new(VecDeque::new()),
                after: RefCell::new(VecDeque::new()),
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(1),
                completed_beats: Cell::new(0),
            }),
        }
    }

    /// Creates a heartbeat driven by a [`ManualDispatcher`], returning both.
    ///
    /// Useful for hosts that run beats from their own frame loop, and for tests.
    #[must_use]
    pub fn manual() -> (Self, ManualDispatcher) {
        let dispatcher = ManualDispatcher::new();
        (Self::new(dispatcher.clone()), dispatcher)
    }

    /// Schedules `task` for the next beat, arming one if none is pending.
    pub fn on_next(&self, task: impl FnOnce() + 'static) {
        self.inner.next.borrow_mut().push_back(Box::new(task));
        if self.inner.state.get() == BeatState::Idle {
            self.arm();
        }
    }

    /// Schedules `task` to run before the next beat's main queue.
    ///
    /// This does not arm a beat: if no beat ever happens, `task` never runs.
    pub fn on_before_next(&self, task: impl FnOnce() + 'static) {
        self.inner.before.borrow_mut().push_back(Box::new(task));
    }

    /// Schedules `task` to run after the next beat's main queue settled.
    ///
    /// This does not arm a beat: if no beat ever happens, `task` never runs.
    pub fn on_after_next(&self, task: impl FnOnce() + 'static) {
        self.inner.after.borrow_mut().push_back(Box::new(task));
    }

    /// Registers a listener invoked after every drain of the main queue, in registration order.
    ///
    /// The listener stays registered until [`ListenerRegistration::deregister`] is called.
    #[must_use = "dropping the registration makes the listener impossible to remove"]
    pub fn register_listener(&self, listener: impl Fn() + 'static) -> ListenerRegistration {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        ListenerRegistration {
            heartbeat: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Returns the current scheduler state.
    #[must_use]
    pub fn state(&self) -> BeatState {
        self.inner.state.get()
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Returns how many beats have completed since creation.
    #[must_use]
    pub fn completed_beats(&self) -> u64 {
        self.inner.completed_beats.get()
    }

    fn arm(&self) {
        self.inner.state.set(BeatState::Armed);
        let heartbeat = Rc::downgrade(&self.inner);
        self.inner.dispatcher.dispatch(Box::new(move || {
            if let Some(inner) = heartbeat.upgrade() {
                Self { inner }.beat();
            }
        }));
    }

    fn beat(&self) {
        if self.inner.state.get() != BeatState::Armed {
            return;
        }
        self.inner.state.set(BeatState::Draining);

        let before = core::mem::take(&mut *self.inner.before.borrow_mut());
        for task in before {
            task();
        }

        // Listeners may publish new work (watchers, continuations), so drain until quiet.
        let mut cycles = 0_u32;
        loop {
            while let Some(task) = self.pop_next() {
                task();
            }
            for listener in self.listener_snapshot() {
                listener();
            }
            cycles += 1;
            if self.inner.next.borrow().is_empty() {
                break;
            }
        }

        let after = core::mem::take(&mut *self.inner.after.borrow_mut());
        for task in after {
            task();
        }

        let beat = self.inner.completed_beats.get() + 1;
        self.inner.completed_beats.set(beat);
        self.inner.state.set(BeatState::Idle);
        trace!(beat, cycles, "heartbeat settled");

        // After-callbacks scheduling main work get a beat of their own.
        if !self.inner.next.borrow().is_empty() {
            self.arm();
        }
    }

    fn pop_next(&self) -> Option<Task> {
        self.inner.next.borrow_mut().pop_front()
    }

    fn listener_snapshot(&self) -> Vec<Listener> {
        self.inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

impl fmt::Debug for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heartbeat")
            .field("state", &self.inner.state.get())
            .field("before", &self.inner.before.borrow().len())
            .field("next", &self.inner.next.borrow().len())
            .field("after", &self.inner.after.borrow().len())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Handle returned by [`Heartbeat::register_listener`].
pub struct ListenerRegistration {
    heartbeat: Weak<HeartbeatInner>,
    id: u64,
}

impl ListenerRegistration {
    /// Removes the listener. Has no effect if the heartbeat is gone.
    pub fn deregister(self) {
        if let Some(inner) = self.heartbeat.upgrade() {
            inner
                .listeners
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
