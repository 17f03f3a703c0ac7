//! The scheduling context on which a [Reactor](crate::Reactor)
//! pipeline runs.
//!
//! All of a pipeline's work (action intake, reduction and replay) is
//! performed by tasks spawned on one [Scheduler], which serializes it
//! on a single thread. By default this is the calling thread's run
//! loop, a [LocalPool] which the application drives with
//! [run_until_stalled()] or [run_until()].

use crate::Cancellable;
use futures::{
    executor::{LocalPool, LocalSpawner},
    future::{self, FutureExt, LocalBoxFuture},
    task::LocalSpawnExt,
};
use std::{cell::RefCell, fmt::Debug, future::Future, rc::Rc};

struct RunLoop {
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl RunLoop {
    fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool: RefCell::new(pool),
            spawner,
        }
    }
}

thread_local! {
    static RUN_LOOP: RunLoop = RunLoop::new();
}

/// A handle to a single-threaded executor which accepts `'static`,
/// non-`Send` futures.
#[derive(Clone)]
pub struct Scheduler(Rc<dyn Fn(LocalBoxFuture<'static, ()>)>);

impl Scheduler {
    /// Create a [Scheduler] from a function which spawns a future on
    /// some local executor, for example `tokio::task::spawn_local`.
    pub fn new<F: Fn(LocalBoxFuture<'static, ()>) + 'static>(spawn: F) -> Self {
        Scheduler(Rc::new(spawn))
    }

    /// The run loop of the calling thread.
    pub fn current() -> Self {
        let spawner = RUN_LOOP.with(|run_loop| run_loop.spawner.clone());
        Scheduler::new(move |future| {
            if let Err(error) = spawner.spawn_local(future) {
                log::error!("unable to spawn task on the run loop: {}", error);
            }
        })
    }

    /// Spawn `future` on this scheduler. The task is aborted when the
    /// returned [Cancellable] is dropped.
    pub fn spawn<F: Future<Output = ()> + 'static>(&self, future: F) -> Cancellable {
        let (future, handle) = future::abortable(future);
        (self.0)(future.map(|_| ()).boxed_local());
        Cancellable::new(handle)
    }
}

impl Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scheduler(spawn @ {:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Run every task on the calling thread's run loop until none of them
/// can make further progress.
///
/// Once stalled, the pipelines of dropped reactors and the bindings of
/// dropped views are released, and the tasks this ends are run to
/// completion.
///
/// Calling this from within a task which is already being run by the
/// run loop does nothing.
pub fn run_until_stalled() {
    RUN_LOOP.with(|run_loop| loop {
        match run_loop.pool.try_borrow_mut() {
            Ok(mut pool) => pool.run_until_stalled(),
            Err(_) => {
                log::warn!("run loop is already running, ignoring re-entrant run");
                return;
            }
        }

        if crate::reactor::prune_dropped_owners() == 0 {
            return;
        }
    })
}

/// Run the calling thread's run loop until `future` resolves, and
/// return its output. Returns `None` when called from within a task
/// which is already being run by the run loop.
pub fn run_until<F: Future>(future: F) -> Option<F::Output> {
    RUN_LOOP.with(|run_loop| match run_loop.pool.try_borrow_mut() {
        Ok(mut pool) => Some(pool.run_until(future)),
        Err(_) => {
            log::warn!("run loop is already running, ignoring re-entrant run");
            None
        }
    })
}
