//! Bridge facade tying a host, a logger and the two halves together.

use std::future::Future;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use xmsg_hal::{DiagnosticSink, HostTransport, SenderMetadata};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, HandlerError};
use crate::log::Logger;
use crate::reply::{IntoReply, ReplyFuture};
use crate::responder;
use crate::sender::Sender;
use crate::settle::ResponseFuture;

/// Request/response bridge over one host transport
pub struct Bridge<H: ?Sized, S: ?Sized> {
    host: Rc<H>,
    logger: Logger<S>,
}

impl<H: ?Sized, S: ?Sized> Clone for Bridge<H, S> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            logger: self.logger.clone(),
        }
    }
}

impl<H, S> Bridge<H, S>
where
    H: HostTransport + ?Sized + 'static,
    S: DiagnosticSink + ?Sized + 'static,
{
    pub fn new(host: Rc<H>, sink: Rc<S>, config: &BridgeConfig) -> Self {
        Self {
            host,
            logger: Logger::new(sink, config),
        }
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn logger(&self) -> &Logger<S> {
        &self.logger
    }

    pub fn sender(&self) -> Sender<H> {
        Sender::new(self.host.clone())
    }

    /// See [`Sender::send`]
    pub fn send(&self, message: Value) -> ResponseFuture {
        self.sender().send(message)
    }

    /// See [`Sender::request`]
    pub fn request<M, R>(
        &self,
        message: &M,
    ) -> impl Future<Output = Result<Option<R>, BridgeError>> + 'static
    where
        M: Serialize + ?Sized,
        R: DeserializeOwned + 'static,
    {
        self.sender().request(message)
    }

    /// Register a handler for incoming messages, see [`responder::register`]
    pub fn register<F, R>(&self, handler: F)
    where
        F: Fn(Value, SenderMetadata) -> R + 'static,
        R: IntoReply,
    {
        responder::register(&self.host, self.logger.clone(), handler);
        self.logger.debug("Message listener registered");
    }

    /// Register a handler that works on typed requests and responses.
    ///
    /// A message that does not decode into `M`, or a response that does not
    /// encode, counts as a handler failure: it is logged and answered with
    /// nothing.
    pub fn register_typed<M, R, F, Fut, E>(&self, handler: F)
    where
        M: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(M, SenderMetadata) -> Fut + 'static,
        Fut: Future<Output = Result<Option<R>, E>> + 'static,
        E: Into<HandlerError> + 'static,
    {
        self.register(move |message: Value, sender: SenderMetadata| -> ReplyFuture {
            let request: M = match serde_json::from_value(message) {
                Ok(request) => request,
                Err(e) => {
                    let err = HandlerError::Decode(e.to_string());
                    return Box::pin(async move { Err(err) });
                }
            };

            let pending = handler(request, sender);
            Box::pin(async move {
                let response = pending.await.map_err(Into::into)?;
                response
                    .map(|r| {
                        serde_json::to_value(r).map_err(|e| HandlerError::Encode(e.to_string()))
                    })
                    .transpose()
            })
        });
    }
}
