//! # Design
//!
//! - Provide structured, constant-message errors for the action dispatcher.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced while applying an action to a ready file.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// The target name is already taken; nothing was overwritten.
    #[error("fsops destination collision")]
    DestinationCollision {
        /// Existing path that blocked the action.
        path: PathBuf,
    },
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn collision(path: impl Into<PathBuf>) -> Self {
        Self::DestinationCollision { path: path.into() }
    }

    /// Operation label for logs and metrics.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::DestinationCollision { .. } => "collision",
            Self::Io { operation, .. } => operation,
            Self::InvalidInput { field, .. } => field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_helper_preserves_context_and_source() {
        let err = FsOpsError::io("move.rename", "/drop/a.bin", io::Error::other("boom"));
        assert_eq!(err.to_string(), "fsops io failure");
        assert_eq!(err.operation(), "move.rename");
        assert!(err.source().is_some());
        match err {
            FsOpsError::Io { path, .. } => assert_eq!(path, PathBuf::from("/drop/a.bin")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn collision_and_invalid_input_have_constant_messages() {
        let collision = FsOpsError::collision("/archive/a.bin");
        assert_eq!(collision.to_string(), "fsops destination collision");
        assert_eq!(collision.operation(), "collision");
        assert!(collision.source().is_none());

        let invalid = FsOpsError::InvalidInput {
            field: "path",
            reason: "missing_file_name",
            value: Some("/".into()),
        };
        assert_eq!(invalid.to_string(), "fsops invalid input");
        assert_eq!(invalid.operation(), "path");
    }
}
