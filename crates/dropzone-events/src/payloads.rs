//! Event payload types carried across the watcher.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted by the watcher.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed lifecycle events surfaced while files move through the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The watch session subscribed to its directory.
    SessionStarted {
        /// Directory being watched.
        watch_dir: PathBuf,
        /// Configured action label (`move`, `rename`, `none`).
        action: String,
    },
    /// A qualifying file entered the readiness pipeline.
    FileDetected {
        /// Absolute path of the file.
        path: PathBuf,
        /// Notification that surfaced the file.
        trigger: DetectionTrigger,
    },
    /// The file is held open by another process; the pipeline is waiting.
    AwaitingUnlock {
        /// Absolute path of the file.
        path: PathBuf,
    },
    /// The file is unlocked and its size is being watched for stability.
    Stabilizing {
        /// Absolute path of the file.
        path: PathBuf,
    },
    /// The pipeline ended without acting on the file.
    GaveUp {
        /// Absolute path of the file.
        path: PathBuf,
        /// Why the pipeline stopped.
        reason: GiveUpReason,
    },
    /// The configured action mutated the filesystem.
    ActionApplied {
        /// Original path of the file.
        path: PathBuf,
        /// Action label (`moved`, `renamed`).
        action: String,
        /// Final location of the file.
        destination: PathBuf,
    },
    /// The dispatcher declined to act on the file.
    ActionSkipped {
        /// Absolute path of the file.
        path: PathBuf,
        /// Human-readable skip reason.
        reason: String,
    },
    /// The action failed; the file was left in place.
    ActionFailed {
        /// Absolute path of the file.
        path: PathBuf,
        /// Rendered error chain.
        message: String,
    },
    /// The watch session stopped and all pipelines drained.
    SessionStopped,
}

impl Event {
    /// Machine-friendly discriminator for log and stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::FileDetected { .. } => "file_detected",
            Self::AwaitingUnlock { .. } => "awaiting_unlock",
            Self::Stabilizing { .. } => "stabilizing",
            Self::GaveUp { .. } => "gave_up",
            Self::ActionApplied { .. } => "action_applied",
            Self::ActionSkipped { .. } => "action_skipped",
            Self::ActionFailed { .. } => "action_failed",
            Self::SessionStopped => "session_stopped",
        }
    }

    /// File path the event refers to, when it is file-scoped.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::FileDetected { path, .. }
            | Self::AwaitingUnlock { path }
            | Self::Stabilizing { path }
            | Self::GaveUp { path, .. }
            | Self::ActionApplied { path, .. }
            | Self::ActionSkipped { path, .. }
            | Self::ActionFailed { path, .. } => Some(path),
            Self::SessionStarted { .. } | Self::SessionStopped => None,
        }
    }

    /// Whether the event ends a file's pipeline.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GaveUp { .. }
                | Self::ActionApplied { .. }
                | Self::ActionSkipped { .. }
                | Self::ActionFailed { .. }
        )
    }
}

/// Notification kind that put a file into the pipeline.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionTrigger {
    /// The entry was created in place.
    Created,
    /// The entry was renamed or moved into the watched directory.
    MovedTo,
}

/// Reasons a pipeline stops without reaching the dispatcher.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GiveUpReason {
    /// The file stayed locked for the whole lock timeout.
    LockTimeout,
    /// The file disappeared while it was being checked.
    Vanished,
    /// The file's size could not be read repeatedly.
    Unreadable,
    /// The session shut down before the file became ready.
    Cancelled,
}

impl GiveUpReason {
    /// Render the reason as its snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LockTimeout => "lock_timeout",
            Self::Vanished => "vanished",
            Self::Unreadable => "unreadable",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned by the bus.
    pub id: EventId,
    /// Time at which the event was published.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}
