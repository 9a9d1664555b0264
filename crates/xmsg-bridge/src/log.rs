//! Prefixed, level-filtered logging on top of a [`DiagnosticSink`].
//!
//! Every line is rendered as `[prefix] message`; scoped loggers extend the
//! prefix (`[xmsg:background]`).

use std::rc::Rc;

use xmsg_hal::{DiagnosticSink, Level};

use crate::config::BridgeConfig;

/// Cheaply cloneable logger handle
pub struct Logger<S: ?Sized> {
    sink: Rc<S>,
    prefix: Rc<str>,
    min_level: Level,
}

impl<S: ?Sized> Clone for Logger<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            prefix: self.prefix.clone(),
            min_level: self.min_level,
        }
    }
}

impl<S: DiagnosticSink + ?Sized> Logger<S> {
    pub fn new(sink: Rc<S>, config: &BridgeConfig) -> Self {
        Self {
            sink,
            prefix: Rc::from(config.log_prefix.as_str()),
            min_level: config.min_level,
        }
    }

    /// Derive a logger whose prefix is `parent:scope`
    pub fn scoped(&self, scope: &str) -> Self {
        Self {
            sink: self.sink.clone(),
            prefix: Rc::from(format!("{}:{}", self.prefix, scope)),
            min_level: self.min_level,
        }
    }

    /// Prefix without brackets
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn sink(&self) -> &Rc<S> {
        &self.sink
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        if self.enabled(level) {
            self.sink
                .record(level, &format!("[{}] {}", self.prefix, message.as_ref()));
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::Error, message);
    }
}
