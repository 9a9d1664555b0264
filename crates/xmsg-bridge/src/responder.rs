//! Responding side of the bridge (background context).
//!
//! [`register`] installs one listener on the host. For every incoming
//! message the listener:
//! 1. runs the handler (normalized to a [`ReplyFuture`])
//! 2. spawns a task that waits for it and replies with the value, or logs the
//!    failure and replies with nothing
//! 3. tells the host synchronously to keep the channel open
//!
//! ## Exchange lifecycle
//!
//! ```text
//! Received -> HandlerRunning -> RepliedSuccess
//!                            \-> RepliedFailure
//! ```
//!
//! The reply callback is owned by the [`Exchange`] and consumed by the first
//! transition into a terminal state, so it runs exactly once.

use std::rc::Rc;

use serde_json::Value;
use xmsg_hal::{ChannelDirective, DiagnosticSink, HostTransport, Listener, ReplyFn, SenderMetadata};

use crate::error::HandlerError;
use crate::log::Logger;
use crate::reply::{Handler, IntoReply};

/// Where one incoming message is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeState {
    Received,
    HandlerRunning,
    RepliedSuccess,
    RepliedFailure,
}

impl ExchangeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExchangeState::RepliedSuccess | ExchangeState::RepliedFailure
        )
    }
}

/// One incoming message and its reply channel
pub struct Exchange {
    state: ExchangeState,
    reply: Option<ReplyFn>,
}

impl Exchange {
    pub fn new(reply: ReplyFn) -> Self {
        Self {
            state: ExchangeState::Received,
            reply: Some(reply),
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Received -> HandlerRunning
    pub fn begin(&mut self) {
        if self.state == ExchangeState::Received {
            self.state = ExchangeState::HandlerRunning;
        }
    }

    /// Deliver the handler's outcome through the reply callback.
    ///
    /// Failures are logged at error level and replied to with `None`.
    /// Once terminal, further calls change nothing and reply nothing.
    pub fn settle<S>(
        &mut self,
        outcome: Result<Option<Value>, HandlerError>,
        logger: &Logger<S>,
    ) -> ExchangeState
    where
        S: DiagnosticSink + ?Sized,
    {
        let Some(mut reply) = self.reply.take() else {
            return self.state;
        };

        match outcome {
            Ok(response) => {
                self.state = ExchangeState::RepliedSuccess;
                reply(response);
            }
            Err(e) => {
                logger.error(format!("Error in async message handler: {}", e));
                self.state = ExchangeState::RepliedFailure;
                reply(None);
            }
        }
        self.state
    }
}

/// Register `handler` as a listener on `host`.
///
/// Registering twice installs two independent listeners. Listeners are never
/// removed; they go away with the host.
pub fn register<H, S, F, R>(host: &Rc<H>, logger: Logger<S>, handler: F)
where
    H: HostTransport + ?Sized + 'static,
    S: DiagnosticSink + ?Sized + 'static,
    F: Fn(Value, SenderMetadata) -> R + 'static,
    R: IntoReply,
{
    let weak_host = Rc::downgrade(host);
    let handler: Rc<dyn Handler> = Rc::new(handler);

    let listener: Listener = Rc::new(move |message: Value, sender: SenderMetadata, reply: ReplyFn| {
        let mut exchange = Exchange::new(reply);

        // The host owns this listener, so it is alive whenever we are called
        let Some(host) = weak_host.upgrade() else {
            exchange.settle(Ok(None), &logger);
            return ChannelDirective::Close;
        };

        exchange.begin();
        let pending = handler.handle(message, sender);
        let logger = logger.clone();
        host.spawn_local(Box::pin(async move {
            let outcome = pending.await;
            exchange.settle(outcome, &logger);
        }));

        ChannelDirective::KeepOpen
    });

    host.add_listener(listener);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;
    use xmsg_hal::Level;
    use xmsg_hal_mock::{MockHost, RecordingSink};

    use crate::config::BridgeConfig;
    use crate::reply::deferred;

    fn recording_reply() -> (ReplyFn, Rc<RefCell<Vec<Option<Value>>>>) {
        let replies = Rc::new(RefCell::new(Vec::new()));
        let log = replies.clone();
        (Box::new(move |value| log.borrow_mut().push(value)), replies)
    }

    fn logger() -> (Logger<RecordingSink>, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::new());
        (Logger::new(sink.clone(), &BridgeConfig::default()), sink)
    }

    #[test]
    fn test_exchange_success_path() {
        let (reply, replies) = recording_reply();
        let (logger, sink) = logger();
        let mut exchange = Exchange::new(reply);
        assert_eq!(exchange.state(), ExchangeState::Received);

        exchange.begin();
        assert_eq!(exchange.state(), ExchangeState::HandlerRunning);

        let state = exchange.settle(Ok(Some(json!("pong"))), &logger);
        assert_eq!(state, ExchangeState::RepliedSuccess);
        assert_eq!(*replies.borrow(), vec![Some(json!("pong"))]);
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_exchange_failure_path() {
        let (reply, replies) = recording_reply();
        let (logger, sink) = logger();
        let mut exchange = Exchange::new(reply);
        exchange.begin();

        let state = exchange.settle(Err(HandlerError::failed("boom")), &logger);
        assert_eq!(state, ExchangeState::RepliedFailure);
        assert!(state.is_terminal());
        assert_eq!(*replies.borrow(), vec![None]);
        assert_eq!(sink.count_at(Level::Error), 1);
        assert!(sink.has_entry_containing("boom"));
    }

    #[test]
    fn test_exchange_terminal_state_is_final() {
        let (reply, replies) = recording_reply();
        let (logger, _sink) = logger();
        let mut exchange = Exchange::new(reply);
        exchange.begin();
        exchange.settle(Ok(None), &logger);

        let state = exchange.settle(Err(HandlerError::failed("late")), &logger);
        exchange.begin();

        assert_eq!(state, ExchangeState::RepliedSuccess);
        assert_eq!(exchange.state(), ExchangeState::RepliedSuccess);
        assert_eq!(replies.borrow().len(), 1);
    }

    #[test]
    fn test_register_keeps_channel_open_for_deferred_reply() {
        let host = Rc::new(MockHost::new());
        let (logger, _sink) = logger();
        let (gate_tx, gate_rx) = futures::channel::oneshot::channel::<Value>();
        let gate = Rc::new(RefCell::new(Some(gate_rx)));

        register(&host, logger, move |_message, _sender| {
            let rx = gate.borrow_mut().take();
            deferred(async move {
                match rx {
                    Some(rx) => rx.await.map(Some).map_err(|_| "gate dropped"),
                    None => Err("gate already used"),
                }
            })
        });

        let probe = host.probe_delivery(json!({"cmd": "slow"}));
        host.run_until_stalled();
        assert!(probe.outcomes().is_empty());
        assert_eq!(host.open_channel_count(), 1);

        gate_tx.send(json!("finally")).unwrap();
        host.run_until_stalled();

        assert_eq!(probe.single(), Some(Ok(Some(json!("finally")))));
        assert_eq!(host.reply_calls(), vec![1]);
    }

    #[test]
    fn test_register_twice_adds_two_listeners() {
        let host = Rc::new(MockHost::new());
        let (logger, _sink) = logger();

        register(&host, logger.clone(), |_, _| Ok::<_, HandlerError>(json!(1)));
        register(&host, logger, |_, _| Ok::<_, HandlerError>(json!(2)));

        assert_eq!(host.listener_count(), 2);

        let probe = host.probe_delivery(json!(null));
        host.run_until_stalled();

        // first reply wins, the second is ignored by the host
        assert_eq!(probe.single(), Some(Ok(Some(json!(1)))));
        assert_eq!(host.late_reply_count(), 1);
    }
}
