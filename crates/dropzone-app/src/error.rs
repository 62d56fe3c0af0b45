//! # Design
//!
//! - Centralize application-level errors for bootstrap and the watch session.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Map each error to the process exit status it should produce.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bootstrap::AppExit;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration validation failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: dropzone_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: dropzone_telemetry::TelemetryError,
    },
    /// Subscribing to directory notifications failed.
    #[error("watch subscription failed")]
    Watch {
        /// Operation identifier.
        operation: &'static str,
        /// Directory being watched.
        path: PathBuf,
        /// Source notify error.
        source: notify::Error,
    },
    /// A background task panicked or was aborted.
    #[error("background task failed")]
    Join {
        /// Operation identifier.
        operation: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: dropzone_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: dropzone_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) fn watch(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: notify::Error,
    ) -> Self {
        Self::Watch {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Exit status the binary reports for this error.
    #[must_use]
    pub const fn exit_status(&self) -> AppExit {
        match self {
            Self::Watch { .. } => AppExit::WatchFailed,
            Self::Config { .. } | Self::Telemetry { .. } | Self::Join { .. } | Self::Io { .. } => {
                AppExit::Usage
            }
        }
    }
}
