use crate::{logger::LogLevel, Binder, Cancellable, FailurePolicy, Scheduler};
use futures::{
    future,
    stream::{self, LocalBoxStream},
    FutureExt, Stream, StreamExt, TryStreamExt,
};
use std::fmt::Display;

/// Combinators used at the edges of a [Reactor](crate::Reactor)
/// pipeline.
pub trait ReactiveStreamExt: Stream + Sized + 'static {
    /// Bind every value of this stream to `binder`, for as long as the
    /// returned [Cancellable] is alive.
    fn bind(self, binder: Binder<Self::Item>, scheduler: &Scheduler) -> Cancellable
    where
        Self::Item: 'static,
    {
        scheduler.spawn(self.for_each(move |value| {
            binder.on(value);
            future::ready(())
        }))
    }

    /// Bind every `Ok` value of this stream to `binder`. The first
    /// `Err` is handled according to `policy`, after which nothing
    /// more is bound.
    fn try_bind<T, E>(
        self,
        binder: Binder<T>,
        policy: FailurePolicy,
        scheduler: &Scheduler,
    ) -> Cancellable
    where
        Self: Stream<Item = Result<T, E>>,
        T: 'static,
        E: Display + 'static,
    {
        let mut stream = self.boxed_local();
        scheduler.spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(value) => binder.on(value),
                    Err(error) => {
                        policy.handle(&error);
                        break;
                    }
                }
            }
        })
    }

    /// Run this stream on `scheduler` for as long as the returned
    /// [Cancellable] is alive, passing every `Ok` value to
    /// `receive_value`. The first `Err` ends it, and is logged at
    /// `log_level`.
    fn try_for_each_logged<T, E, F>(
        self,
        log_level: LogLevel,
        mut receive_value: F,
        scheduler: &Scheduler,
    ) -> Cancellable
    where
        Self: Stream<Item = Result<T, E>>,
        T: 'static,
        E: Display + 'static,
        F: FnMut(T) + 'static,
    {
        let run = self
            .try_for_each(move |value| {
                receive_value(value);
                future::ready(Ok(()))
            })
            .map(move |result| {
                if let Err(error) = result {
                    log_level.log(format!("stream failed: {}", error));
                }
            });
        scheduler.spawn(run)
    }

    /// Turn this stream of `Result`s into one which never fails: the
    /// first `Err` is replaced by the value produced by `handler`, and
    /// the stream ends right after it.
    fn recover<T, E, F>(self, handler: F) -> LocalBoxStream<'static, T>
    where
        Self: Stream<Item = Result<T, E>>,
        T: 'static,
        E: 'static,
        F: FnMut(E) -> T + 'static,
    {
        stream::unfold(
            (self.boxed_local(), handler, false),
            |(mut upstream, mut handler, failed)| async move {
                if failed {
                    return None;
                }
                match upstream.next().await? {
                    Ok(value) => Some((value, (upstream, handler, false))),
                    Err(error) => {
                        let value = handler(error);
                        Some((value, (upstream, handler, true)))
                    }
                }
            },
        )
        .boxed_local()
    }
}

impl<S: Stream + 'static> ReactiveStreamExt for S {}

#[cfg(test)]
mod tests {
    use super::ReactiveStreamExt;
    use crate::{
        logger::LogLevel,
        scheduler::{run_until_stalled, Scheduler},
        Binder, FailurePolicy,
    };
    use futures::{channel::mpsc, executor::block_on, stream, StreamExt};
    use std::{cell::RefCell, rc::Rc};

    struct Label {
        texts: RefCell<Vec<String>>,
    }

    impl Label {
        fn new() -> Rc<Self> {
            Rc::new(Label {
                texts: RefCell::new(Vec::new()),
            })
        }

        fn binder(self: &Rc<Self>) -> Binder<i32> {
            Binder::new(self, |label: &Label, value: i32| {
                label.texts.borrow_mut().push(value.to_string());
            })
        }
    }

    #[test]
    fn bind_applies_values() {
        let label = Label::new();
        let _binding = stream::iter(vec![1, 2]).bind(label.binder(), &Scheduler::current());
        run_until_stalled();

        assert_eq!(vec!["1", "2"], *label.texts.borrow());
    }

    #[test]
    fn bind_skips_dropped_target() {
        let label = Label::new();
        let binder = label.binder();
        let (sender, receiver) = mpsc::unbounded();
        let binding = receiver.bind(binder, &Scheduler::current());

        drop(label);
        sender.unbounded_send(1).unwrap();
        run_until_stalled();
        assert!(!binding.is_cancelled());
    }

    #[test]
    fn dropped_binding_stops() {
        let label = Label::new();
        let (sender, receiver) = mpsc::unbounded();
        let binding = receiver.bind(label.binder(), &Scheduler::current());

        sender.unbounded_send(1).unwrap();
        run_until_stalled();
        drop(binding);
        let _ = sender.unbounded_send(2);
        run_until_stalled();

        assert_eq!(vec!["1"], *label.texts.borrow());
    }

    #[test]
    fn try_bind_ends_at_first_failure() {
        let label = Label::new();
        let values: Vec<Result<i32, String>> =
            vec![Ok(1), Err("broken".to_string()), Ok(3)];
        let _binding = stream::iter(values).try_bind(
            label.binder(),
            FailurePolicy::Log(LogLevel::Error),
            &Scheduler::current(),
        );
        run_until_stalled();

        assert_eq!(vec!["1"], *label.texts.borrow());
    }

    #[test]
    #[should_panic(expected = "broken")]
    fn try_bind_panic_policy() {
        let label = Label::new();
        let values: Vec<Result<i32, String>> = vec![Err("broken".to_string())];
        let _binding =
            stream::iter(values).try_bind(label.binder(), FailurePolicy::Panic, &Scheduler::current());
        run_until_stalled();
    }

    #[test]
    fn recover_replaces_failure_and_ends() {
        let values: Vec<Result<i32, String>> = vec![Ok(1), Err("broken".to_string()), Ok(3)];
        let recovered = stream::iter(values).recover(|error: String| -(error.len() as i32));

        assert_eq!(vec![1, -6], block_on(recovered.collect::<Vec<_>>()));
    }

    #[test]
    fn recover_without_failure() {
        let values: Vec<Result<i32, String>> = vec![Ok(1), Ok(2)];
        let recovered = stream::iter(values).recover(|_: String| 0);

        assert_eq!(vec![1, 2], block_on(recovered.collect::<Vec<_>>()));
    }

    #[test]
    fn try_for_each_logged_stops_at_failure() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let received_copy = received.clone();
        let values: Vec<Result<i32, String>> = vec![Ok(1), Ok(2), Err("broken".to_string()), Ok(4)];
        let _task = stream::iter(values).try_for_each_logged(
            LogLevel::Warn,
            move |value| received_copy.borrow_mut().push(value),
            &Scheduler::current(),
        );
        run_until_stalled();

        assert_eq!(vec![1, 2], *received.borrow());
    }
}
