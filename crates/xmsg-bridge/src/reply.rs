//! Handler return normalization.
//!
//! Handlers may answer synchronously (a plain `Result`) or asynchronously
//! (a future wrapped with [`deferred`], or an already boxed [`ReplyFuture`]).
//! [`IntoReply`] is the one place where every shape becomes a `ReplyFuture`;
//! the responder never branches on what the handler returned.

use std::future::{self, Future};
use std::pin::Pin;

use serde_json::Value;
use xmsg_hal::SenderMetadata;

use crate::error::HandlerError;

/// Normalized handler outcome: the response (absent when `None`) or a failure
pub type ReplyFuture = Pin<Box<dyn Future<Output = Result<Option<Value>, HandlerError>>>>;

/// Conversion of a handler's return value into a [`ReplyFuture`]
pub trait IntoReply {
    fn into_reply(self) -> ReplyFuture;
}

impl<E: Into<HandlerError>> IntoReply for Result<Option<Value>, E> {
    fn into_reply(self) -> ReplyFuture {
        Box::pin(future::ready(self.map_err(Into::into)))
    }
}

impl<E: Into<HandlerError>> IntoReply for Result<Value, E> {
    fn into_reply(self) -> ReplyFuture {
        Box::pin(future::ready(self.map(Some).map_err(Into::into)))
    }
}

impl IntoReply for Option<Value> {
    fn into_reply(self) -> ReplyFuture {
        Box::pin(future::ready(Ok(self)))
    }
}

impl IntoReply for ReplyFuture {
    fn into_reply(self) -> ReplyFuture {
        self
    }
}

/// Asynchronous handler result, see [`deferred`]
pub struct Deferred<F>(F);

/// Mark a future as a handler's deferred reply.
///
/// ```ignore
/// bridge.register(|message, _sender| deferred(async move {
///     let ids = load_ids(message).await?;
///     Ok::<_, HandlerError>(Some(ids))
/// }));
/// ```
pub fn deferred<F>(future: F) -> Deferred<F> {
    Deferred(future)
}

impl<F, E> IntoReply for Deferred<F>
where
    F: Future<Output = Result<Option<Value>, E>> + 'static,
    E: Into<HandlerError>,
{
    fn into_reply(self) -> ReplyFuture {
        let pending = self.0;
        Box::pin(async move { pending.await.map_err(Into::into) })
    }
}

/// Message handler registered with the responder
pub trait Handler: 'static {
    fn handle(&self, message: Value, sender: SenderMetadata) -> ReplyFuture;
}

impl<F, R> Handler for F
where
    F: Fn(Value, SenderMetadata) -> R + 'static,
    R: IntoReply,
{
    fn handle(&self, message: Value, sender: SenderMetadata) -> ReplyFuture {
        self(message, sender).into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn settle(reply: ReplyFuture) -> Result<Option<Value>, HandlerError> {
        reply
            .now_or_never()
            .expect("ready replies resolve on first poll")
    }

    #[test]
    fn test_plain_results() {
        let ok: Result<Option<Value>, HandlerError> = Ok(Some(json!("pong")));
        assert_eq!(settle(ok.into_reply()), Ok(Some(json!("pong"))));

        let bare: Result<Value, &str> = Ok(json!(3));
        assert_eq!(settle(bare.into_reply()), Ok(Some(json!(3))));

        let failed: Result<Option<Value>, &str> = Err("boom");
        assert_eq!(settle(failed.into_reply()), Err(HandlerError::failed("boom")));

        assert_eq!(settle(None::<Value>.into_reply()), Ok(None));
    }

    #[test]
    fn test_deferred_matches_plain() {
        let plain: Result<Option<Value>, String> = Ok(Some(json!({"n": 1})));
        let later = deferred(async { Ok::<_, String>(Some(json!({"n": 1}))) });

        assert_eq!(settle(plain.into_reply()), settle(later.into_reply()));
    }

    #[test]
    fn test_closure_handlers() {
        let sync_handler = |message: Value, _sender: SenderMetadata| -> Result<Value, HandlerError> {
            Ok(json!({ "echo": message }))
        };
        let async_handler = |message: Value, _sender: SenderMetadata| {
            deferred(async move { Err::<Option<Value>, _>(format!("rejected {}", message)) })
        };

        assert_eq!(
            settle(sync_handler.handle(json!(1), SenderMetadata::default())),
            Ok(Some(json!({ "echo": 1 })))
        );
        assert_eq!(
            settle(async_handler.handle(json!(2), SenderMetadata::default())),
            Err(HandlerError::failed("rejected 2"))
        );
    }
}
