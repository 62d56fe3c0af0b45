//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Action value was not one of `move`, `rename`, or `none`.
    #[error("unknown action")]
    UnknownAction {
        /// Action payload provided by the caller.
        value: String,
    },
    /// A configured directory cannot be used.
    #[error("directory is not usable")]
    Directory {
        /// Field naming the directory (`watch_dir` or `dest_dir`).
        field: &'static str,
        /// Path as supplied or resolved.
        path: PathBuf,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the operation.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            field,
            value,
            reason,
        }
    }

    /// Human-readable detail combining the message with its context fields.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidField {
                field,
                value: Some(value),
                reason,
            } => format!("{self}: {field} '{value}' {reason}"),
            Self::InvalidField {
                field,
                value: None,
                reason,
            } => format!("{self}: {field} {reason}"),
            Self::UnknownAction { value } => {
                format!("{self}: '{value}' (expected move, rename, or none)")
            }
            Self::Directory {
                field,
                path,
                reason,
            } => format!("{self}: {field} '{}' {reason}", path.display()),
            Self::Io {
                operation,
                path,
                source,
            } => format!("{self}: {operation} '{}': {source}", path.display()),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
