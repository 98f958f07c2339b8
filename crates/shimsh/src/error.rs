//! Error types for shimsh
//!
//! Errors never cross the dispatcher boundary: the interpreter converts every
//! variant into a [`CommandResult`](crate::CommandResult) before returning to
//! the caller. They exist so handlers and the filesystem layer can use `?`.

use thiserror::Error;

/// Result type alias using shimsh's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// shimsh error types.
///
/// Messages are shown to the (possibly hostile) user of the fake shell, so
/// they must never include host paths outside the jail.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed command text (unterminated quote, dangling escape).
    #[error("parse error: {0}")]
    Parse(String),

    /// A handler failed in a way it could not express as an exit code.
    #[error("execution error: {0}")]
    Execution(String),

    /// I/O error from filesystem operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Recovered panic or broken invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short message without the category prefix, for `cmd: message` output.
    pub fn reason(&self) -> String {
        match self {
            Error::Io(e) => io_reason(e),
            Error::Parse(m) | Error::Execution(m) | Error::Internal(m) => m.clone(),
        }
    }
}

/// Render an I/O error the way coreutils does (`No such file or directory`).
pub(crate) fn io_reason(err: &std::io::Error) -> String {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound => "No such file or directory".to_string(),
        ErrorKind::PermissionDenied => "Permission denied".to_string(),
        ErrorKind::AlreadyExists => "File exists".to_string(),
        _ => {
            let text = err.to_string();
            match text.find(" (os error") {
                Some(end) => text[..end].to_string(),
                None => text,
            }
        }
    }
}
