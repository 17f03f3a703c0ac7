//! A unidirectional state management core.
//!
//! A [Reactor] turns the `Action`s sent to its [ActionSink] into
//! `Mutation`s, and reduces those into a stream of immutable `State`s
//! which is shared between all of its subscribers, each of which
//! first receives the current state. See [ReactorExt] for access to a
//! reactor's pipeline, and [View] for binding it to a display.

mod action;
mod binder;
mod cancellable;
mod ext;
pub mod logger;
mod multicast;
mod reactor;
pub mod scheduler;
mod view;
mod weak_map;

pub use action::ActionSink;
pub use binder::{Binder, FailurePolicy};
pub use cancellable::{CancelBag, Cancellable};
pub use ext::ReactiveStreamExt;
pub use multicast::{Connectable, Multicast};
pub use reactor::{Reactor, ReactorExt};
pub use scheduler::Scheduler;
pub use view::{View, ViewExt};
pub use weak_map::WeakMap;
