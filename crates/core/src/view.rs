//! Document view for the render variant.
//!
//! Every render replaces the whole body; nothing is appended or diffed.

use std::{fs, path::PathBuf, sync::Mutex};
use tracing::{debug, warn};

/// Shows one payload at a time.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send + Sync {
    /// Replaces the visible content with a view of `payload`.
    fn render(&self, payload: &str);
}

/// Builds the view markup for `payload`: the escaped text inside a container.
pub fn message_view(payload: &str) -> String {
    format!("<div class=\"message\">{}</div>", escape_html(payload))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// The document body, held in memory and optionally mirrored to a file.
#[derive(Debug, Default)]
pub struct DocumentBody {
    body: Mutex<String>,
    mirror: Option<PathBuf>,
}

impl DocumentBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also writes the full document to `path` after every render.
    pub fn with_mirror(path: impl Into<PathBuf>) -> Self {
        Self {
            body: Mutex::new(String::new()),
            mirror: Some(path.into()),
        }
    }

    /// Current body markup. Empty until the first render.
    pub fn content(&self) -> String {
        self.body
            .lock()
            .map(|body| body.clone())
            .unwrap_or_default()
    }
}

impl Renderer for DocumentBody {
    fn render(&self, payload: &str) {
        let view = message_view(payload);
        if let Ok(mut body) = self.body.lock() {
            *body = view.clone();
        }
        if let Some(path) = &self.mirror {
            let document = format!("<!DOCTYPE html>\n<html><body>{}</body></html>\n", view);
            // Blocking write on the caller's task; the mirror is one small file.
            match fs::write(path, document) {
                Ok(()) => debug!(path = %path.display(), "Document mirrored."),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to mirror document."),
            }
        }
    }
}
