//! Outcome types for the action dispatcher.
//!
//! # Design
//! - Keep outcomes plain data so callers can log, publish, and count them.
//! - Skips are successes: the file was deliberately left alone.

use std::path::{Path, PathBuf};

/// What the dispatcher did with a ready file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedAction {
    /// The file was moved into the destination directory.
    Moved {
        /// Original location.
        from: PathBuf,
        /// New location under the destination directory.
        to: PathBuf,
    },
    /// The file was renamed in place.
    Renamed {
        /// Original location.
        from: PathBuf,
        /// Prefixed name in the same directory.
        to: PathBuf,
    },
    /// The configured action is `none`; the file was only observed.
    NoOp {
        /// Observed file.
        path: PathBuf,
    },
    /// The file was left untouched.
    Skipped {
        /// File that was skipped.
        path: PathBuf,
        /// Why it was skipped.
        reason: SkipReason,
    },
}

impl AppliedAction {
    /// Short label used in logs and lifecycle events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Moved { .. } => "moved",
            Self::Renamed { .. } => "renamed",
            Self::NoOp { .. } => "none",
            Self::Skipped { .. } => "skipped",
        }
    }

    /// Path the action started from.
    #[must_use]
    pub fn source(&self) -> &Path {
        match self {
            Self::Moved { from, .. } | Self::Renamed { from, .. } => from,
            Self::NoOp { path } | Self::Skipped { path, .. } => path,
        }
    }

    /// Where the file ended up, when it moved.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Moved { to, .. } | Self::Renamed { to, .. } => Some(to),
            Self::NoOp { .. } | Self::Skipped { .. } => None,
        }
    }
}

/// Why a ready file was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension did not match the configured filter.
    Filtered {
        /// The file's extension, lowercased, if it had one.
        extension: Option<String>,
    },
    /// The name already carries the rename prefix.
    AlreadyRenamed,
    /// The file disappeared before the action ran.
    Vanished,
}

impl SkipReason {
    /// Render the reason as a stable snake-case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Filtered { .. } => "filtered",
            Self::AlreadyRenamed => "already_renamed",
            Self::Vanished => "vanished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_follow_variant() {
        let moved = AppliedAction::Moved {
            from: PathBuf::from("/in/a.bin"),
            to: PathBuf::from("/out/a.bin"),
        };
        assert_eq!(moved.label(), "moved");
        assert_eq!(moved.source(), Path::new("/in/a.bin"));
        assert_eq!(moved.destination(), Some(Path::new("/out/a.bin")));

        let skipped = AppliedAction::Skipped {
            path: PathBuf::from("/in/a.wav"),
            reason: SkipReason::Filtered {
                extension: Some("wav".into()),
            },
        };
        assert_eq!(skipped.label(), "skipped");
        assert!(skipped.destination().is_none());
    }

    #[test]
    fn skip_reasons_have_stable_labels() {
        assert_eq!(
            SkipReason::Filtered { extension: None }.as_str(),
            "filtered"
        );
        assert_eq!(SkipReason::AlreadyRenamed.as_str(), "already_renamed");
        assert_eq!(SkipReason::Vanished.as_str(), "vanished");
    }
}
