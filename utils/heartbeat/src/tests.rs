//! Beat phase ordering and re-entrancy tests.

use core::cell::{Cell, RefCell};
use core::pin::Pin;
use core::task::{Context, Poll};
use std::rc::Rc;

use executor_core::LocalExecutor;
use futures::executor::LocalPool;
use futures::future::RemoteHandle;
use futures::task::LocalSpawnExt;

use crate::{BeatState, Heartbeat, LocalExecutorDispatcher, ManualDispatcher};

// ============================================================================
// Test Infrastructure
// ============================================================================

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(log: &Log, entry: &str) -> impl Fn() + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move || log.borrow_mut().push(entry.clone())
}

fn setup() -> (Heartbeat, ManualDispatcher, Log) {
    let (heartbeat, dispatcher) = Heartbeat::manual();
    (heartbeat, dispatcher, Rc::new(RefCell::new(Vec::new())))
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn on_next_never_runs_synchronously() {
    let (heartbeat, dispatcher, log) = setup();
    heartbeat.on_next(recorder(&log, "task"));

    assert!(log.borrow().is_empty());
    assert_eq!(heartbeat.state(), BeatState::Armed);
    assert!(dispatcher.has_pending());

    assert_eq!(dispatcher.run_pending(), 1);
    assert_eq!(*log.borrow(), ["task"]);
    assert_eq!(heartbeat.state(), BeatState::Idle);
}

#[test]
fn arms_a_single_beat_for_many_tasks() {
    let (heartbeat, dispatcher, log) = setup();
    heartbeat.on_next(recorder(&log, "a"));
    heartbeat.on_next(recorder(&log, "b"));
    heartbeat.on_next(recorder(&log, "c"));

    assert_eq!(dispatcher.run_pending(), 1);
    assert_eq!(*log.borrow(), ["a", "b", "c"]);
    assert_eq!(heartbeat.completed_beats(), 1);
}

#[test]
fn before_and_after_hooks_do_not_arm_a_beat() {
    let (heartbeat, dispatcher, log) = setup();
    heartbeat.on_before_next(recorder(&log, "before"));
    heartbeat.on_after_next(recorder(&log, "after"));

    assert!(!dispatcher.has_pending());
    assert_eq!(heartbeat.state(), BeatState::Idle);
    assert!(log.borrow().is_empty());
}

// ============================================================================
// Phases
// ============================================================================

#[test]
fn runs_phases_in_order() {
    let (heartbeat, dispatcher, log) = setup();
    let _registration = heartbeat.register_listener(recorder(&log, "listener"));
    heartbeat.on_after_next(recorder(&log, "after"));
    heartbeat.on_next(recorder(&log, "main"));
    heartbeat.on_before_next(recorder(&log, "before"));

    dispatcher.run_pending();
    assert_eq!(*log.borrow(), ["before", "main", "listener", "after"]);
}

#[test]
fn before_hooks_run_once_even_when_rescheduling_themselves() {
    let (heartbeat, dispatcher, _) = setup();
    let runs = Rc::new(Cell::new(0));

    let hb = heartbeat.clone();
    let counter = runs.clone();
    heartbeat.on_before_next(move || {
        counter.set(counter.get() + 1);
        let counter = counter.clone();
        hb.on_before_next(move || counter.set(counter.get() + 1));
    });
    heartbeat.on_next(|| {});

    dispatcher.run_pending();
    assert_eq!(runs.get(), 1);

    heartbeat.on_next(|| {});
    dispatcher.run_pending();
    assert_eq!(runs.get(), 2);
}

#[test]
fn work_scheduled_inside_a_beat_runs_before_after_hooks() {
    let (heartbeat, dispatcher, log) = setup();

    let hb = heartbeat.clone();
    let inner_log = log.clone();
    heartbeat.on_next(move || {
        inner_log.borrow_mut().push("outer".into());
        let nested_log = inner_log.clone();
        hb.on_next(move || nested_log.borrow_mut().push("nested".into()));
    });
    heartbeat.on_after_next(recorder(&log, "after"));

    assert_eq!(dispatcher.run_pending(), 1);
    assert_eq!(*log.borrow(), ["outer", "nested", "after"]);
}

#[test]
fn listener_work_extends_the_current_beat() {
    let (heartbeat, dispatcher, log) = setup();
    let scheduled = Rc::new(Cell::new(false));

    let hb = heartbeat.clone();
    let listener_log = log.clone();
    let _registration = heartbeat.register_listener(move || {
        listener_log.borrow_mut().push("listener".into());
        if !scheduled.replace(true) {
            let task_log = listener_log.clone();
            hb.on_next(move || task_log.borrow_mut().push("from listener".into()));
        }
    });
    heartbeat.on_next(recorder(&log, "main"));
    heartbeat.on_after_next(recorder(&log, "after"));

    assert_eq!(dispatcher.run_pending(), 1);
    assert_eq!(
        *log.borrow(),
        ["main", "listener", "from listener", "listener", "after"]
    );
}

#[test]
fn listeners_run_in_registration_order() {
    let (heartbeat, dispatcher, log) = setup();
    let _first = heartbeat.register_listener(recorder(&log, "first"));
    let _second = heartbeat.register_listener(recorder(&log, "second"));
    heartbeat.on_next(|| {});

    dispatcher.run_pending();
    assert_eq!(*log.borrow(), ["first", "second"]);
}

#[test]
fn deregistered_listeners_stop_running() {
    let (heartbeat, dispatcher, log) = setup();
    let registration = heartbeat.register_listener(recorder(&log, "listener"));
    assert_eq!(heartbeat.listener_count(), 1);

    heartbeat.on_next(|| {});
    dispatcher.run_pending();
    registration.deregister();
    assert_eq!(heartbeat.listener_count(), 0);

    heartbeat.on_next(|| {});
    dispatcher.run_pending();
    assert_eq!(*log.borrow(), ["listener"]);
}

#[test]
fn after_hook_work_gets_its_own_beat() {
    let (heartbeat, dispatcher, log) = setup();

    let hb = heartbeat.clone();
    let after_log = log.clone();
    heartbeat.on_after_next(move || {
        after_log.borrow_mut().push("after".into());
        let task_log = after_log.clone();
        hb.on_next(move || task_log.borrow_mut().push("late".into()));
    });
    heartbeat.on_next(recorder(&log, "main"));

    assert_eq!(dispatcher.run_pending(), 2);
    assert_eq!(*log.borrow(), ["main", "after", "late"]);
    assert_eq!(heartbeat.completed_beats(), 2);
    assert_eq!(heartbeat.state(), BeatState::Idle);
}

#[test]
fn closure_dispatchers_are_accepted() {
    let queued = Rc::new(RefCell::new(Vec::<Box<dyn FnOnce()>>::new()));
    let sink = queued.clone();
    let heartbeat = Heartbeat::new(move |beat: Box<dyn FnOnce()>| sink.borrow_mut().push(beat));
    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    heartbeat.on_next(move || flag.set(true));

    let beat = queued.borrow_mut().pop().expect("beat dispatched");
    beat();
    assert!(ran.get());
}

#[test]
fn dropped_heartbeat_turns_pending_beats_into_no_ops() {
    let (heartbeat, dispatcher, log) = setup();
    heartbeat.on_next(recorder(&log, "task"));
    drop(heartbeat);

    assert_eq!(dispatcher.run_pending(), 1);
    assert!(log.borrow().is_empty());
}

// ============================================================================
// Local Executor
// ============================================================================

struct PoolExecutor(futures::executor::LocalSpawner);

struct PoolTask<T>(RemoteHandle<T>);

impl<T: 'static> Future for PoolTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.get_mut().0).poll(cx)
    }
}

impl<T: 'static> executor_core::Task<T> for PoolTask<T> {
    fn poll_result(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<T, Box<dyn core::any::Any + Send>>> {
        self.poll(cx).map(Ok)
    }
}

impl LocalExecutor for PoolExecutor {
    type Task<T: 'static> = PoolTask<T>;

    fn spawn_local<Fut>(&self, fut: Fut) -> Self::Task<Fut::Output>
    where
        Fut: Future + 'static,
    {
        PoolTask(self.0.spawn_local_with_handle(fut).unwrap())
    }
}

#[test]
fn local_executor_dispatcher_runs_beats_as_local_tasks() {
    let mut pool = LocalPool::new();
    executor_core::init_local_executor(PoolExecutor(pool.spawner()));
    let heartbeat = Heartbeat::new(LocalExecutorDispatcher);
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    let _registration = heartbeat.register_listener(recorder(&log, "listener"));
    heartbeat.on_next(recorder(&log, "work"));
    assert!(log.borrow().is_empty());
    assert_eq!(heartbeat.state(), BeatState::Armed);

    pool.run_until_stalled();
    assert_eq!(*log.borrow(), ["work", "listener"]);
    assert_eq!(heartbeat.state(), BeatState::Idle);

    heartbeat.on_next(recorder(&log, "again"));
    pool.run_until_stalled();
    assert_eq!(*log.borrow(), ["work", "listener", "again", "listener"]);
    assert_eq!(heartbeat.completed_beats(), 2);
}
