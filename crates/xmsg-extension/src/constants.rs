//! Centralized constants for the extension crate

/// Log prefix for every line this extension writes, rendered as `[xmsg]`
pub const LOG_PREFIX: &str = "xmsg";

/// Message the content context sends on start to check the background is up
pub const PING_COMMAND: &str = "ping";

/// Answer to [`PING_COMMAND`]
pub const PONG: &str = "pong";
