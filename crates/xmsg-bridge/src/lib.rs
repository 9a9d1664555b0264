//! Request/response bridge between extension execution contexts
//!
//! The host runtime only offers callback-based, one-shot messaging. This
//! crate turns it into a future-based request/response contract:
//!
//! - [`Sender`] wraps one-shot delivery in a [`ResponseFuture`] that resolves
//!   with the peer's response or fails with a [`TransportError`]
//! - [`responder::register`] installs a listener that runs a handler, keeps
//!   the channel open while it runs and replies exactly once; handler
//!   failures are logged and answered with nothing
//! - [`ContextBootstrap`] runs each context's module initialization once and
//!   only then its entry point
//!
//! ## Module Structure
//!
//! - `bridge` - [`Bridge`] facade over one host
//! - `sender` - sending half (content context)
//! - `responder` - receiving half (background context)
//! - `reply` - handler return normalization
//! - `settle` - single-resolution callback adapter
//! - `context` - execution contexts and bootstrap
//! - `log` / `config` - prefixed logging and its settings
//! - `error` - error taxonomy
//!
//! The host itself is abstracted by `xmsg_hal::HostTransport`.

// =============================================================================
// Module declarations
// =============================================================================

mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod log;
pub mod reply;
pub mod responder;
pub mod sender;
mod settle;

// =============================================================================
// Public re-exports
// =============================================================================

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use context::{BootState, ContextBootstrap, ExecutionContext};
pub use error::{BridgeError, HandlerError, InitializationError, TransportError};
pub use log::Logger;
pub use reply::{deferred, Deferred, Handler, IntoReply, ReplyFuture};
pub use responder::{Exchange, ExchangeState};
pub use sender::Sender;
pub use settle::ResponseFuture;

// Host-level types callers need alongside the bridge
pub use xmsg_hal::{
    ChannelDirective, DiagnosticSink, HostError, HostTransport, Level, SenderMetadata,
};
