use crate::{Cancellable, Scheduler};
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    stream::LocalBoxStream,
    Stream, StreamExt,
};
use std::{cell::RefCell, fmt::Debug, rc::Rc};

struct Shared<T> {
    /// Replay buffer, holding only the most recent value.
    latest: Option<T>,
    subscribers: Vec<UnboundedSender<T>>,
    finished: bool,
}

/// The subscribe side of a [Connectable] stream: any number of
/// subscribers share the values produced by one upstream computation.
///
/// Every subscriber immediately receives the most recently produced
/// value (if any) before any value produced after it subscribed.
pub struct Multicast<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T: Clone> Multicast<T> {
    fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                latest: None,
                subscribers: Vec::new(),
                finished: false,
            })),
        }
    }

    /// Subscribe to this stream. The returned stream starts with the
    /// latest value, followed by every value produced from now on. It
    /// ends when the upstream computation ends or is cancelled.
    pub fn subscribe(&self) -> UnboundedReceiver<T> {
        let (sender, receiver) = mpsc::unbounded();
        let mut shared = self.shared.borrow_mut();

        if let Some(latest) = &shared.latest {
            // The receiver is held right here, this cannot fail.
            let _ = sender.unbounded_send(latest.clone());
        }

        if !shared.finished {
            shared.subscribers.push(sender);
        }

        receiver
    }

    /// The most recently produced value.
    pub fn latest(&self) -> Option<T> {
        self.shared.borrow().latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.borrow().subscribers.len()
    }

    fn publish(&self, value: T) {
        let mut shared = self.shared.borrow_mut();
        shared.subscribers.retain(|subscriber| {
            let retain = subscriber.unbounded_send(value.clone()).is_ok();
            if !retain {
                log::trace!("removing closed multicast subscriber");
            }
            retain
        });
        shared.latest = Some(value);
    }

    fn finish(&self) {
        let mut shared = self.shared.borrow_mut();
        shared.finished = true;
        shared.subscribers.clear();
    }
}

impl<T> Clone for Multicast<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> PartialEq for Multicast<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T> Debug for Multicast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Multicast @ {:p}", Rc::as_ptr(&self.shared))
    }
}

/// An upstream computation waiting to be shared through a
/// [Multicast] with a replay buffer of one value.
///
/// Nothing is computed until [connect()](Connectable::connect()) is
/// called. Connecting consumes the [Connectable], so it can only ever
/// happen once.
pub struct Connectable<T> {
    multicast: Multicast<T>,
    upstream: LocalBoxStream<'static, T>,
}

impl<T: Clone + 'static> Connectable<T> {
    pub fn new<S: Stream<Item = T> + 'static>(upstream: S) -> Self {
        Self {
            multicast: Multicast::new(),
            upstream: upstream.boxed_local(),
        }
    }

    /// A handle for subscribing, which may be used before and after
    /// connecting.
    pub fn multicast(&self) -> Multicast<T> {
        self.multicast.clone()
    }

    /// Start the shared upstream computation on `scheduler`. It runs
    /// until it ends by itself, or until the returned [Cancellable] is
    /// dropped.
    pub fn connect(self, scheduler: &Scheduler) -> Cancellable {
        let Self {
            multicast,
            mut upstream,
        } = self;
        let finish = FinishOnDrop(multicast);

        scheduler.spawn(async move {
            let finish = finish;
            while let Some(value) = upstream.next().await {
                finish.0.publish(value);
            }
        })
    }
}

/// Finishes the [Multicast] once its driver is gone, whether the
/// upstream ended or the driver was aborted.
struct FinishOnDrop<T: Clone>(Multicast<T>);

impl<T: Clone> Drop for FinishOnDrop<T> {
    fn drop(&mut self) {
        self.0.finish();
    }
}
