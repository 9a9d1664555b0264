//! Sending side of the bridge (content context).
//!
//! `send` hands the message to the host immediately and returns a
//! `'static` future; nothing is shared between calls, so any number of
//! sends may be in flight at once. No retry, no timeout: liveness is the
//! host's business.

use std::future::Future;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use xmsg_hal::HostTransport;

use crate::error::BridgeError;
use crate::settle::{self, ResponseFuture};

/// Handle for sending requests to the other context
pub struct Sender<H: ?Sized> {
    host: Rc<H>,
}

impl<H: ?Sized> Clone for Sender<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
        }
    }
}

impl<H: HostTransport + ?Sized> Sender<H> {
    pub fn new(host: Rc<H>) -> Self {
        Self { host }
    }

    /// Send `message` and wait for the peer's response.
    ///
    /// Fails only when the host reports a delivery failure. An absent
    /// response (including a masked handler failure) resolves to `None`.
    pub fn send(&self, message: Value) -> ResponseFuture {
        let (on_complete, response) = settle::completion_pair();
        self.host.deliver(message, on_complete);
        response
    }

    /// Typed [`send`](Self::send).
    ///
    /// The request is serialized before anything is delivered; an encode
    /// failure never reaches the host.
    pub fn request<M, R>(
        &self,
        message: &M,
    ) -> impl Future<Output = Result<Option<R>, BridgeError>> + 'static
    where
        M: Serialize + ?Sized,
        R: DeserializeOwned + 'static,
    {
        let sent = serde_json::to_value(message)
            .map(|value| self.send(value))
            .map_err(|e| BridgeError::Encode(e.to_string()));

        async move {
            let response = sent?.await?;
            response
                .map(|value| {
                    serde_json::from_value(value).map_err(|e| BridgeError::Decode(e.to_string()))
                })
                .transpose()
        }
    }
}
