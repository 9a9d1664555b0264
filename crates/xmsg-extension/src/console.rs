//! Console-backed diagnostic sink
//!
//! Routes bridge log records to the devtools console of the current context,
//! using the console method that matches the record's level.

use wasm_bindgen::JsValue;
use web_sys::console;
use xmsg_bridge::{BridgeConfig, Logger};
use xmsg_hal::{DiagnosticSink, Level};

use crate::constants::LOG_PREFIX;

/// Diagnostic sink writing to `console.*`
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn record(&self, level: Level, message: &str) {
        let message = JsValue::from_str(message);
        match level {
            Level::Debug => console::debug_1(&message),
            Level::Info => console::log_1(&message),
            Level::Warn => console::warn_1(&message),
            Level::Error => console::error_1(&message),
        }
    }
}

/// Bridge configuration used by both entry points
pub fn config() -> BridgeConfig {
    BridgeConfig::default().with_prefix(LOG_PREFIX)
}

/// Root console logger (`[xmsg]`)
pub fn logger() -> Logger<ConsoleSink> {
    Logger::new(std::rc::Rc::new(ConsoleSink), &config())
}
