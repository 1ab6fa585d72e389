//! Domain-specific error types for the action execution core.
//!
//! This module defines `CoreError`, a `thiserror`-based enum with two
//! user-visible kinds — `ConnectionFailure` and `ExecutionError` — plus the
//! supporting variants needed to construct them with contextual detail.
//! Library functions return `Result<T, CoreError>`; trait boundaries that
//! cross `dyn Connection`/`dyn Shell` continue to use `anyhow::Result`, and
//! `CoreError` converts into `anyhow::Error` automatically via `?`.

use std::io;

/// Formats an IO error kind into a human-readable message, mirroring the
/// teacher's `io_error_kind_message` so the same unrecognized-kind fallback
/// (include the OS-level message) applies here too.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for the action execution core.
///
/// `ConnectionFailure` and `ExecutionError` are the two kinds spec.md §7
/// requires to be user-visible; the remaining variants are the
/// implementation detail needed to build them with enough context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Transport could not be used or was misused at the remote end: auth
    /// failure, SSH negotiation failure, disk full during mkdtemp. Always
    /// fatal to the current task.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Module not found, missing shebang, check-mode unsupported, bad
    /// environment shape, remote chown/chmod/setfacl failure under become,
    /// empty mkdtemp result, unsupported slurp encoding.
    #[error("execution error: {0}")]
    ExecutionError(String),

    /// A validation constraint on input data was violated before any
    /// remote interaction was attempted.
    #[error("validation error: {0}")]
    Validation(String),

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// Human-readable description derived from `io_error_kind_message`.
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: io::Error,
    },
}

impl CoreError {
    /// Creates an `Io` variant with `message` derived from `source`.
    ///
    /// Public (not `pub(crate)`) because `Connection`, `ModulePathIndex`,
    /// and `ModuleAssembler` are all implemented outside this crate (spec.md
    /// §1 Non-goals) and need a way to report failures in the same shape.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates a `ConnectionFailure`.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailure(message.into())
    }

    /// Creates an `ExecutionError`.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError(message.into())
    }
}
