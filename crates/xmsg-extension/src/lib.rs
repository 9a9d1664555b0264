//! Browser extension wiring for the xmsg bridge
//!
//! One wasm module serves both execution contexts; each loader script calls
//! its context's entry point after `init()`:
//!
//! - `run_background` - registers the command handler (`ping`, `echo`)
//! - `run_content` - connects the sender, pings the background and exposes
//!   `sendMessage` to the content script
//!
//! `chrome.runtime` sits behind [`chrome::ChromeRuntime`], the
//! `HostTransport` implementation for this host.

// =============================================================================
// Module declarations
// =============================================================================

pub mod background;
pub mod chrome;
pub mod commands;
pub mod console;
pub mod constants;
pub mod content;
pub mod convert;

// =============================================================================
// Public re-exports
// =============================================================================

pub use background::run_background;
pub use chrome::ChromeRuntime;
pub use console::ConsoleSink;
pub use content::{run_content, send_message};
