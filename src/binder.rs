use crate::logger::LogLevel;
use std::{fmt::Display, rc::Rc};

/// A callback which applies values to a target object, for example a
/// label displaying part of a reactor's `State`.
///
/// The target is held by a weak reference. Once it has been dropped,
/// values are skipped silently.
pub struct Binder<Value> {
    binding: Rc<dyn Fn(Value)>,
}

impl<Value: 'static> Binder<Value> {
    pub fn new<Target, F>(target: &Rc<Target>, binding: F) -> Self
    where
        Target: 'static,
        F: Fn(&Target, Value) + 'static,
    {
        let target = Rc::downgrade(target);
        Binder {
            binding: Rc::new(move |value| {
                if let Some(target) = target.upgrade() {
                    binding(&*target, value);
                }
            }),
        }
    }

    pub fn on(&self, value: Value) {
        (self.binding)(value)
    }
}

impl<Value> Clone for Binder<Value> {
    fn clone(&self) -> Self {
        Binder {
            binding: self.binding.clone(),
        }
    }
}

/// What to do with a failure which reached a
/// [try_bind()](crate::ReactiveStreamExt::try_bind()) binding.
///
/// Failures are expected to be converted into data before they get
/// this far, so one arriving here is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Panic with the failure's message.
    Panic,
    /// Log the failure's message at the given level, and drop it.
    Log(LogLevel),
}

impl FailurePolicy {
    pub fn handle<E: Display>(&self, error: &E) {
        match self {
            FailurePolicy::Panic => panic!("unhandled failure in bound stream: {}", error),
            FailurePolicy::Log(log_level) => {
                log_level.log(format!("unhandled failure in bound stream: {}", error))
            }
        }
    }
}

impl Default for FailurePolicy {
    /// [FailurePolicy::Panic] in builds with debug assertions,
    /// otherwise [FailurePolicy::Log] at the error level.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            FailurePolicy::Panic
        } else {
            FailurePolicy::Log(LogLevel::Error)
        }
    }
}
