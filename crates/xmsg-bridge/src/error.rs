//! Error types for the bridge.
//!
//! Only [`TransportError`] (wrapped in [`BridgeError`] by typed helpers)
//! ever reaches a sender. [`HandlerError`] stays on the responding side and
//! is masked with an absent reply. [`InitializationError`] stops one context.

use std::fmt;

use xmsg_hal::HostError;

use crate::context::ExecutionContext;

/// The host failed to deliver a message or to return a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    /// Host-reported description
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<HostError> for TransportError {
    fn from(e: HostError) -> Self {
        Self { message: e.message }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport error: {}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// A registered handler failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler reported a failure
    Failed(String),
    /// Incoming message did not match the handler's request type
    Decode(String),
    /// Handler's response could not be serialized
    Encode(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Failed(msg) => f.write_str(msg),
            HandlerError::Decode(msg) => write!(f, "Invalid request format: {}", msg),
            HandlerError::Encode(msg) => write!(f, "Unserializable response: {}", msg),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        HandlerError::Failed(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        HandlerError::Failed(msg.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Decode(e.to_string())
    }
}

/// Bootstrap of an execution context failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitializationError {
    /// Module or host initialization failed
    Module {
        context: ExecutionContext,
        reason: String,
    },
    /// The context was already started once
    AlreadyStarted(ExecutionContext),
}

impl InitializationError {
    /// Context that failed to start
    pub fn context(&self) -> ExecutionContext {
        match self {
            InitializationError::Module { context, .. } => *context,
            InitializationError::AlreadyStarted(context) => *context,
        }
    }
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationError::Module { context, reason } => {
                write!(f, "Failed to initialize {} context: {}", context, reason)
            }
            InitializationError::AlreadyStarted(context) => {
                write!(f, "{} context already started", context)
            }
        }
    }
}

impl std::error::Error for InitializationError {}

/// Errors from typed requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeError {
    /// Delivery failed
    Transport(TransportError),
    /// Request could not be serialized
    Encode(String),
    /// Response did not match the expected type
    Decode(String),
}

impl BridgeError {
    /// Check if the host failed to deliver (as opposed to a local serde failure)
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::Transport(_))
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Transport(e) => write!(f, "{}", e),
            BridgeError::Encode(msg) => write!(f, "Failed to encode request: {}", msg),
            BridgeError::Decode(msg) => write!(f, "Failed to decode response: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<TransportError> for BridgeError {
    fn from(e: TransportError) -> Self {
        BridgeError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_keeps_host_message() {
        let err = TransportError::from(HostError::new("Receiving end does not exist."));
        assert_eq!(err.message, "Receiving end does not exist.");
        assert!(err.to_string().contains("Receiving end does not exist."));
    }

    #[test]
    fn test_handler_error_conversions() {
        assert_eq!(HandlerError::from("boom"), HandlerError::Failed("boom".into()));
        assert_eq!(HandlerError::from(String::from("boom")).to_string(), "boom");
        assert!(HandlerError::Decode("missing field `cmd`".into())
            .to_string()
            .starts_with("Invalid request format"));

        let bad = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        assert!(matches!(HandlerError::from(bad), HandlerError::Decode(_)));
    }

    #[test]
    fn test_initialization_error_context() {
        let err = InitializationError::Module {
            context: ExecutionContext::Content,
            reason: "chrome.runtime unavailable".into(),
        };
        assert_eq!(err.context(), ExecutionContext::Content);
        assert_eq!(
            err.to_string(),
            "Failed to initialize content context: chrome.runtime unavailable"
        );
        assert_eq!(
            InitializationError::AlreadyStarted(ExecutionContext::Background).to_string(),
            "background context already started"
        );
    }

    #[test]
    fn test_bridge_error_from_transport() {
        let err: BridgeError = TransportError::new("gone").into();
        assert!(err.is_transport());
        assert!(!BridgeError::Decode("x".into()).is_transport());
    }
}
