//! Host Abstraction Layer for extension messaging
//!
//! This crate defines the traits that let the bridge run against different
//! hosts (a real browser runtime, or an in-process mock for tests) by
//! abstracting the runtime's callback-based cross-context messaging.
//!
//! # Host Implementations
//!
//! - **Browser**: `chrome.runtime.sendMessage` / `chrome.runtime.onMessage`,
//!   `wasm_bindgen_futures::spawn_local` for deferred work, `console.*` for logs
//! - **Mock**: single-threaded in-process runtime driven by a `LocalPool`
//!
//! # Threading
//!
//! Every execution context is single-threaded and cooperatively scheduled, so
//! nothing here is `Send` or `Sync`. Callbacks are plain boxed closures.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Callback types
// =============================================================================

/// Completion callback handed to [`HostTransport::deliver`].
///
/// The host calls it with either the peer's response (`None` when the peer
/// replied with nothing) or the host-reported failure. Hosts are not trusted
/// to call it only once, hence `FnMut`.
pub type Completion = Box<dyn FnMut(Result<Option<Value>, HostError>)>;

/// Reply callback handed to a listener for one incoming message.
pub type ReplyFn = Box<dyn FnMut(Option<Value>)>;

/// Listener invoked by the host for every incoming message.
///
/// The return value tells the host whether a deferred reply is coming.
pub type Listener = Rc<dyn Fn(Value, SenderMetadata, ReplyFn) -> ChannelDirective>;

/// Unit of deferred work scheduled on the context's event loop.
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

// =============================================================================
// Host transport trait
// =============================================================================

/// Cross-context messaging primitive exposed by the host runtime.
///
/// Implementations provide:
/// - One-shot delivery with a callback-delivered reply
/// - Listener registration for incoming messages
/// - Scheduling of local tasks on the context's event loop
pub trait HostTransport {
    /// Deliver `message` to the other context.
    ///
    /// On browser: `chrome.runtime.sendMessage(message, callback)` with
    /// `chrome.runtime.lastError` mapped to `Err`.
    fn deliver(&self, message: Value, on_complete: Completion);

    /// Register a listener for incoming messages.
    ///
    /// Listeners are never removed; they live as long as the context.
    /// Registering twice yields two independent listeners.
    fn add_listener(&self, listener: Listener);

    /// Run `task` to completion on the current context's event loop.
    fn spawn_local(&self, task: LocalTask);
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Severity of a diagnostic record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Lowercase name used in log output
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-visible log the bridge reports failures to.
///
/// On browser: the devtools console of the context.
pub trait DiagnosticSink {
    /// Record one message at `level`
    fn record(&self, level: Level, message: &str);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Rc<S> {
    fn record(&self, level: Level, message: &str) {
        (**self).record(level, message)
    }
}

// =============================================================================
// Host-level types
// =============================================================================

/// Delivery failure as reported by the host (`lastError`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostError {
    /// Host-provided description, passed through verbatim
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HostError {}

/// Synchronous answer a listener gives the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelDirective {
    /// A reply will be produced later; keep the reply channel open
    KeepOpen,
    /// No deferred reply; the host may close the channel once the listener returns
    Close,
}

impl ChannelDirective {
    /// Whether the host must keep the reply channel open
    pub fn keeps_open(self) -> bool {
        matches!(self, ChannelDirective::KeepOpen)
    }
}

/// Origin of an incoming message, as described by the host.
///
/// Mirrors the runtime's `MessageSender`; every field is optional because
/// which ones are present depends on where the message came from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SenderMetadata {
    /// Extension ID of the sender
    pub id: Option<String>,
    /// URL of the page or frame that sent the message
    pub url: Option<String>,
    /// Origin of the page or frame that sent the message
    pub origin: Option<String>,
    /// Tab the message came from, when sent by a content context
    pub tab: Option<TabInfo>,
    /// Frame the message came from (0 is the top-level frame)
    pub frame_id: Option<i64>,
    /// Document the message came from
    pub document_id: Option<String>,
}

impl SenderMetadata {
    /// Tab ID shortcut
    pub fn tab_id(&self) -> Option<i64> {
        self.tab.as_ref().and_then(|tab| tab.id)
    }

    /// Parse host-provided metadata, ignoring fields we do not model.
    ///
    /// A metadata object that fails to parse yields the default (all `None`);
    /// metadata is informational and never blocks delivery.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Subset of the runtime's `Tab` carried in [`SenderMetadata`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabInfo {
    pub id: Option<i64>,
    pub url: Option<String>,
}
