use futures::future::AbortHandle;
use std::fmt::Debug;

/// A lifetime token for a running task (a pipeline driver, a binding,
/// a forwarding of one stream into an [ActionSink](crate::ActionSink)).
///
/// The task keeps running for as long as this token is alive, and is
/// aborted when the token is dropped or [cancelled](Cancellable::cancel()).
#[must_use = "the task is aborted as soon as its Cancellable is dropped"]
pub struct Cancellable {
    handle: Option<AbortHandle>,
}

impl Cancellable {
    pub fn new(handle: AbortHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Abort the task now.
    pub fn cancel(mut self) {
        self.abort();
    }

    /// Move this token into `bag`, tying the task's lifetime to the
    /// bag's.
    pub fn store(self, bag: &mut CancelBag) {
        bag.insert(self);
    }

    /// Whether the task has been aborted.
    pub fn is_cancelled(&self) -> bool {
        match &self.handle {
            Some(handle) => handle.is_aborted(),
            None => true,
        }
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Cancellable {
    fn drop(&mut self) {
        self.abort();
    }
}

impl Debug for Cancellable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cancellable{{cancelled: {}}}", self.is_cancelled())
    }
}

/// A set of [Cancellable] tokens sharing one lifetime. Dropping (or
/// [clearing](CancelBag::clear())) the bag aborts every task in it.
#[derive(Debug, Default)]
pub struct CancelBag {
    cancellables: Vec<Cancellable>,
}

impl CancelBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cancellable: Cancellable) {
        self.cancellables.push(cancellable);
    }

    /// Abort and forget every task in this bag.
    pub fn clear(&mut self) {
        self.cancellables.clear();
    }

    pub fn len(&self) -> usize {
        self.cancellables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cancellables.is_empty()
    }
}

impl Extend<Cancellable> for CancelBag {
    fn extend<T: IntoIterator<Item = Cancellable>>(&mut self, iter: T) {
        self.cancellables.extend(iter);
    }
}
