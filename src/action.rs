use crate::{Cancellable, Scheduler};
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    future, Stream, StreamExt,
};
use std::{cell::RefCell, fmt::Debug, rc::Rc};

/// The input side of a [Reactor](crate::Reactor) pipeline: a
/// broadcast channel of `Action`s.
///
/// The sink never completes and never fails; the user can always act
/// again. Clones share the same underlying channel, so any number of
/// producers may [send()](ActionSink::send()) into it. Each
/// subscriber receives every action sent after it subscribed.
pub struct ActionSink<Action> {
    subscribers: Rc<RefCell<Vec<UnboundedSender<Action>>>>,
}

impl<Action> ActionSink<Action> {
    pub fn new() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Subscribe to the actions sent into this sink from now on.
    pub fn subscribe(&self) -> UnboundedReceiver<Action> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.borrow_mut().push(sender);
        receiver
    }

    /// The number of subscribers which were still listening the last
    /// time an action was sent.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl<Action: Clone> ActionSink<Action> {
    /// Send an `Action` to every current subscriber. Delivery is
    /// queued, it happens when the subscribers are next polled on
    /// their scheduler.
    pub fn send<A: Into<Action>>(&self, action: A) {
        self.send_impl(action.into());
    }

    fn send_impl(&self, action: Action) {
        self.subscribers.borrow_mut().retain(|subscriber| {
            let retain = subscriber.unbounded_send(action.clone()).is_ok();
            if !retain {
                log::trace!("removing closed action subscriber");
            }
            retain
        });
    }
}

impl<Action: Clone + 'static> ActionSink<Action> {
    /// Forward every value produced by `stream` into this sink, for as
    /// long as the returned [Cancellable] is alive.
    pub fn send_all<S>(&self, stream: S, scheduler: &Scheduler) -> Cancellable
    where
        S: Stream<Item = Action> + 'static,
    {
        let sink = self.clone();
        scheduler.spawn(stream.for_each(move |action| {
            sink.send_impl(action);
            future::ready(())
        }))
    }
}

impl<Action> Clone for ActionSink<Action> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<Action> Default for ActionSink<Action> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Action> PartialEq for ActionSink<Action> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.subscribers, &other.subscribers)
    }
}

impl<Action> Debug for ActionSink<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ActionSink{{subscribers: {}}} @ {:p}",
            self.subscriber_count(),
            Rc::as_ptr(&self.subscribers)
        )
    }
}
