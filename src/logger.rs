//! Logging for the stages of a [Reactor](crate::Reactor) pipeline.
//!
//! [SimpleLogger] is meant to be used from the `transform_*` hooks of
//! a reactor:
//!
//! ```ignore
//! fn transform_mutation(
//!     &self,
//!     mutation: LocalBoxStream<'static, Self::Mutation>,
//! ) -> LocalBoxStream<'static, Self::Mutation> {
//!     SimpleLogger::new().mutations(mutation)
//! }
//! ```

use futures::{stream::LocalBoxStream, StreamExt};
use std::fmt::Debug;

/// The level at which [SimpleLogger] and
/// [FailurePolicy::Log](crate::FailurePolicy::Log) write their
/// messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn level(self) -> log::Level {
        match self {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }

    pub fn log<S: AsRef<str>>(&self, message: S) {
        log::log!(self.level(), "{}", message.as_ref());
    }
}

/// Logs every value passing through the streams it wraps.
#[derive(Debug, Clone, Default)]
pub struct SimpleLogger {
    log_level: LogLevel,
}

impl SimpleLogger {
    pub fn new() -> Self {
        SimpleLogger {
            log_level: LogLevel::default(),
        }
    }

    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn actions<A: Debug + 'static>(
        &self,
        action: LocalBoxStream<'static, A>,
    ) -> LocalBoxStream<'static, A> {
        self.logged("action", action)
    }

    pub fn mutations<M: Debug + 'static>(
        &self,
        mutation: LocalBoxStream<'static, M>,
    ) -> LocalBoxStream<'static, M> {
        self.logged("mutation", mutation)
    }

    pub fn states<S: Debug + 'static>(
        &self,
        state: LocalBoxStream<'static, S>,
    ) -> LocalBoxStream<'static, S> {
        self.logged("state", state)
    }

    fn logged<T: Debug + 'static>(
        &self,
        label: &'static str,
        stream: LocalBoxStream<'static, T>,
    ) -> LocalBoxStream<'static, T> {
        let log_level = self.log_level;
        stream
            .inspect(move |value| log_level.log(format!("{}: {:?}", label, value)))
            .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, SimpleLogger};
    use futures::{executor::block_on, stream, StreamExt};

    #[test]
    fn values_pass_through_unchanged() {
        let logger = SimpleLogger::new().log_level(LogLevel::Trace);
        let logged = logger.mutations(stream::iter(vec![1, 2, 3]).boxed_local());

        assert_eq!(vec![1, 2, 3], block_on(logged.collect::<Vec<_>>()));
    }

    #[test]
    fn default_level_is_debug() {
        assert_eq!(LogLevel::Debug, LogLevel::default());
        assert_eq!(log::Level::Error, LogLevel::Error.level());
    }
}
