//! Session log
//!
//! Every interpreter event becomes one `[Mon DD HH:MM:SS] message` line. Lines
//! are kept in memory for `dmesg`, emitted as `tracing` events under the
//! `shimsh` target, and appended to `shimsh.log` at the jail root after each
//! evaluation.
//!
//! # Security
//!
//! Messages contain user input. They are sanitized before recording so that a
//! command line cannot forge extra log lines, and long values are truncated.

use std::borrow::Cow;
use std::path::Path;

use chrono::Local;

use crate::fs::FileSystem;

/// File name of the persisted log, relative to the jail root.
pub const LOG_FILE_NAME: &str = "shimsh.log";

/// Default maximum length of a recorded message.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 500;

/// Append-only, in-memory log of one session.
#[derive(Debug, Clone)]
pub struct SessionLog {
    entries: Vec<String>,
    persisted: usize,
    max_message_length: usize,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            persisted: 0,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

impl SessionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum length for recorded messages
    pub fn max_message_length(mut self, len: usize) -> Self {
        self.max_message_length = len;
        self
    }

    /// Record a message.
    pub fn record(&mut self, message: impl AsRef<str>) {
        let sanitized = sanitize_for_log(message.as_ref());
        let message = truncate(&sanitized, self.max_message_length);
        tracing::info!(target: "shimsh", "{}", message);

        let now = Local::now().format("%b %d %H:%M:%S");
        self.entries.push(format!("[{now}] {message}"));
    }

    /// All recorded lines, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of recorded lines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append lines not yet written to `path`.
    ///
    /// Best effort: on failure the lines stay pending and are retried on the
    /// next flush.
    pub async fn flush(&mut self, fs: &dyn FileSystem, path: &Path) {
        if self.persisted >= self.entries.len() {
            return;
        }
        let mut chunk = self.entries[self.persisted..].join("\n");
        chunk.push('\n');

        match fs.append_file(path, chunk.as_bytes()).await {
            Ok(()) => self.persisted = self.entries.len(),
            Err(e) => tracing::debug!(target: "shimsh", error = %e, "log flush failed"),
        }
    }
}

/// Escape characters that could forge log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Hide `user:password@` in URLs.
pub fn redact_url(url: &str) -> Cow<'_, str> {
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        if let Some(at_pos) = rest.find('@') {
            if rest[..at_pos].contains(':') {
                let scheme = &url[..scheme_end + 3];
                let host_part = &rest[at_pos + 1..];
                return Cow::Owned(format!("{scheme}[REDACTED]@{host_part}"));
            }
        }
    }
    Cow::Borrowed(url)
}

fn truncate(value: &str, max: usize) -> Cow<'_, str> {
    if value.len() <= max {
        return Cow::Borrowed(value);
    }
    let mut end = max;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!(
        "{}...[truncated {} bytes]",
        &value[..end],
        value.len() - end
    ))
}
