//! Diagnostic line output used by the session controller.

use std::sync::{Arc, Mutex};
use tracing::info;

/// Accepts one informational line at a time.
#[cfg_attr(test, mockall::automock)]
pub trait LogSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Emits every line as an `INFO` event on the `countdown::session` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn line(&self, text: &str) {
        info!(target: "countdown::session", "{}", text);
    }
}

/// Keeps every line in memory, in order. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLog {
    fn line(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}
