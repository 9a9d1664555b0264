//! Execution contexts and their one-time bootstrap.
//!
//! Each context (background, content) initializes its module once, then runs
//! its entry point, which is where listeners get registered. A failed
//! bootstrap leaves that context inert; the other context is unaffected.

use std::cell::Cell;
use std::fmt;
use std::future::Future;

use xmsg_hal::DiagnosticSink;

use crate::error::InitializationError;
use crate::log::Logger;

/// The two places the extension's module runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    /// Persistent extension context, one per browser session
    Background,
    /// Per-page context injected into visited pages
    Content,
}

impl ExecutionContext {
    pub fn name(self) -> &'static str {
        match self {
            ExecutionContext::Background => "background",
            ExecutionContext::Content => "content",
        }
    }

    /// Exported function the loader calls after module initialization
    pub fn entry_point(self) -> &'static str {
        match self {
            ExecutionContext::Background => "run_background",
            ExecutionContext::Content => "run_content",
        }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bootstrap progress of one context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootState {
    Pending,
    Initializing,
    Active,
    Failed,
}

/// One-shot bootstrap guard for an execution context
pub struct ContextBootstrap<S: ?Sized> {
    context: ExecutionContext,
    state: Cell<BootState>,
    logger: Logger<S>,
}

impl<S: DiagnosticSink + ?Sized> ContextBootstrap<S> {
    pub fn new(context: ExecutionContext, logger: &Logger<S>) -> Self {
        Self {
            context,
            state: Cell::new(BootState::Pending),
            logger: logger.scoped(context.name()),
        }
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn state(&self) -> BootState {
        self.state.get()
    }

    /// Whether the entry point ran and the context's bridge is live
    pub fn is_active(&self) -> bool {
        self.state.get() == BootState::Active
    }

    /// Run `init` once, then hand its output to `entry`.
    ///
    /// `entry` only runs if `init` succeeded. Any failure, including a second
    /// call, is logged and returned; the context then stays inactive.
    pub async fn start<I, Fut, T, E, A>(&self, init: I, entry: A) -> Result<(), InitializationError>
    where
        I: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        A: FnOnce(T),
    {
        if self.state.get() != BootState::Pending {
            let err = InitializationError::AlreadyStarted(self.context);
            self.logger.error(err.to_string());
            return Err(err);
        }

        self.state.set(BootState::Initializing);
        self.logger.info("Initializing");

        match init().await {
            Ok(ready) => {
                entry(ready);
                self.state.set(BootState::Active);
                self.logger
                    .info(format!("Started via {}", self.context.entry_point()));
                Ok(())
            }
            Err(e) => {
                self.state.set(BootState::Failed);
                let err = InitializationError::Module {
                    context: self.context,
                    reason: e.to_string(),
                };
                self.logger.error(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use futures::executor::block_on;
    use xmsg_hal::Level;
    use xmsg_hal_mock::RecordingSink;

    use crate::config::BridgeConfig;

    fn bootstrap(context: ExecutionContext) -> (ContextBootstrap<RecordingSink>, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        let logger = Logger::new(sink.clone(), &BridgeConfig::default());
        (ContextBootstrap::new(context, &logger), sink)
    }

    #[test]
    fn test_entry_points() {
        assert_eq!(ExecutionContext::Background.entry_point(), "run_background");
        assert_eq!(ExecutionContext::Content.entry_point(), "run_content");
        assert_eq!(ExecutionContext::Content.to_string(), "content");
    }

    #[test]
    fn test_successful_start_runs_entry_once() {
        let (boot, sink) = bootstrap(ExecutionContext::Background);
        let entered = Cell::new(0);

        let result = block_on(boot.start(
            || async { Ok::<_, String>(7) },
            |value: i32| entered.set(entered.get() + value),
        ));

        assert_eq!(result, Ok(()));
        assert!(boot.is_active());
        assert_eq!(entered.get(), 7);
        assert!(sink.has_entry_containing("[xmsg:background] Started via run_background"));
    }

    #[test]
    fn test_failed_init_is_fail_stop() {
        let (boot, sink) = bootstrap(ExecutionContext::Content);
        let entered = Cell::new(false);

        let result = block_on(boot.start(
            || async { Err::<(), _>("chrome.runtime unavailable") },
            |_| entered.set(true),
        ));

        assert_eq!(
            result,
            Err(InitializationError::Module {
                context: ExecutionContext::Content,
                reason: "chrome.runtime unavailable".into(),
            })
        );
        assert_eq!(boot.state(), BootState::Failed);
        assert!(!entered.get());
        assert_eq!(sink.count_at(Level::Error), 1);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let (boot, _sink) = bootstrap(ExecutionContext::Background);
        let entries = Cell::new(0);

        let first = block_on(boot.start(|| async { Ok::<_, String>(()) }, |_| {
            entries.set(entries.get() + 1)
        }));
        let second = block_on(boot.start(|| async { Ok::<_, String>(()) }, |_| {
            entries.set(entries.get() + 1)
        }));

        assert!(first.is_ok());
        assert_eq!(
            second,
            Err(InitializationError::AlreadyStarted(ExecutionContext::Background))
        );
        assert_eq!(entries.get(), 1);
        assert!(boot.is_active());
    }

    #[test]
    fn test_failed_context_cannot_retry() {
        let (boot, _sink) = bootstrap(ExecutionContext::Content);

        let _ = block_on(boot.start(|| async { Err::<(), _>("boom") }, |_| {}));
        let retry = block_on(boot.start(|| async { Ok::<_, String>(()) }, |_| {}));

        assert!(matches!(retry, Err(InitializationError::AlreadyStarted(_))));
        assert_eq!(boot.state(), BootState::Failed);
    }
}
