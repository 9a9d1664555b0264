//! Bridge configuration

use xmsg_hal::Level;

/// Default log prefix, rendered as `[xmsg]`
pub const DEFAULT_LOG_PREFIX: &str = "xmsg";

/// Runtime configuration for a bridge instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Component name shown in brackets in front of every log line
    pub log_prefix: String,
    /// Records below this level are dropped
    pub min_level: Level,
}

impl BridgeConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }
}

impl Default for BridgeConfig {
    /// Debug builds log everything; release builds start at `Info`.
    fn default() -> Self {
        Self {
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            min_level: if cfg!(debug_assertions) {
                Level::Debug
            } else {
                Level::Info
            },
        }
    }
}
