//! Single-resolution adapter from host completion callbacks to futures.
//!
//! The host's completion callback is turned into a oneshot sender that is
//! consumed on first use; any later invocation is ignored. A completion the
//! host drops without ever calling it (context destroyed) leaves the future
//! pending forever.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use serde_json::Value;
use xmsg_hal::{Completion, HostError};

use crate::error::TransportError;

/// Pending reply to one `send`
///
/// Resolves with the peer's response (`None` when absent) or the host's
/// delivery failure.
#[must_use = "the reply is lost if the future is dropped"]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Result<Option<Value>, HostError>>,
    abandoned: bool,
}

impl ResponseFuture {
    /// Whether the host dropped the completion without calling it
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

impl Future for ResponseFuture {
    type Output = Result<Option<Value>, TransportError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.abandoned {
            return Poll::Pending;
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome.map_err(TransportError::from)),
            Poll::Ready(Err(oneshot::Canceled)) => {
                self.abandoned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Build a completion callback and the future it resolves.
pub(crate) fn completion_pair() -> (Completion, ResponseFuture) {
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);

    let completion: Completion = Box::new(move |outcome| {
        // Later invocations find the sender gone
        if let Some(tx) = tx.take() {
            let _ = tx.send(outcome);
        }
    });

    (
        completion,
        ResponseFuture {
            rx,
            abandoned: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[test]
    fn test_resolves_with_first_outcome() {
        let (mut complete, response) = completion_pair();
        complete(Ok(Some(json!("first"))));
        complete(Ok(Some(json!("second"))));
        complete(Err(HostError::new("late failure")));

        assert_eq!(response.now_or_never(), Some(Ok(Some(json!("first")))));
    }

    #[test]
    fn test_host_failure_becomes_transport_error() {
        let (mut complete, response) = completion_pair();
        complete(Err(HostError::new("No tab with id: 3.")));

        assert_eq!(
            response.now_or_never(),
            Some(Err(TransportError::new("No tab with id: 3.")))
        );
    }

    #[test]
    fn test_absent_response() {
        let (mut complete, response) = completion_pair();
        complete(Ok(None));

        assert_eq!(response.now_or_never(), Some(Ok(None)));
    }

    #[test]
    fn test_pending_until_completed() {
        let (mut complete, mut response) = completion_pair();
        assert!((&mut response).now_or_never().is_none());

        complete(Ok(Some(json!(1))));
        assert_eq!(response.now_or_never(), Some(Ok(Some(json!(1)))));
    }

    #[test]
    fn test_dropped_completion_never_resolves() {
        let (complete, mut response) = completion_pair();
        drop(complete);

        assert!((&mut response).now_or_never().is_none());
        assert!(response.is_abandoned());
        assert!((&mut response).now_or_never().is_none());
    }
}
