//! Translation from `notify` events into the watcher's own file events.
//!
//! Only "created" and "moved into place" notifications survive; modify,
//! access, and remove events are dropped here so the router never sees them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dropzone_events::DetectionTrigger;
use notify::Event;
use notify::event::{CreateKind, EventKind, ModifyKind, RenameMode};

/// What happened to the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEventKind {
    /// An entry was created in place.
    Created {
        /// Path of the new entry.
        path: PathBuf,
    },
    /// An entry was renamed or moved to `dest`.
    MovedTo {
        /// Previous path, when the platform reports it.
        src: Option<PathBuf>,
        /// Path the entry now lives at.
        dest: PathBuf,
    },
}

/// A single filesystem notification, consumed once by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// What happened.
    pub kind: FileEventKind,
    /// Whether the target is a directory.
    pub is_dir: bool,
    /// When the notification was received.
    pub observed_at: DateTime<Utc>,
}

impl FileEvent {
    /// Build a "created" event observed now.
    #[must_use]
    pub fn created(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            kind: FileEventKind::Created { path: path.into() },
            is_dir,
            observed_at: Utc::now(),
        }
    }

    /// Build a "moved to" event observed now.
    #[must_use]
    pub fn moved_to(src: Option<PathBuf>, dest: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            kind: FileEventKind::MovedTo {
                src,
                dest: dest.into(),
            },
            is_dir,
            observed_at: Utc::now(),
        }
    }

    /// Path the pipeline should act on.
    #[must_use]
    pub fn target(&self) -> &Path {
        match &self.kind {
            FileEventKind::Created { path } => path,
            FileEventKind::MovedTo { dest, .. } => dest,
        }
    }

    /// Lifecycle trigger label for this event.
    #[must_use]
    pub const fn trigger(&self) -> DetectionTrigger {
        match self.kind {
            FileEventKind::Created { .. } => DetectionTrigger::Created,
            FileEventKind::MovedTo { .. } => DetectionTrigger::MovedTo,
        }
    }
}

/// Convert a raw `notify` event into zero or more file events.
#[must_use]
pub fn translate(event: Event) -> Vec<FileEvent> {
    let Event { kind, paths, .. } = event;
    match kind {
        EventKind::Create(create) => paths
            .into_iter()
            .map(|path| {
                let is_dir = match create {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    CreateKind::Any | CreateKind::Other => path.is_dir(),
                };
                FileEvent::created(path, is_dir)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => paths
            .into_iter()
            .map(|dest| {
                let is_dir = dest.is_dir();
                FileEvent::moved_to(None, dest, is_dir)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(src), Some(dest)) => {
                    let is_dir = dest.is_dir();
                    vec![FileEvent::moved_to(Some(src), dest, is_dir)]
                }
                _ => Vec::new(),
            }
        }
        // Backends that cannot tell the two halves of a rename apart report
        // `Any`; whichever side still exists is the destination.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => paths
            .into_iter()
            .filter(|path| path.exists())
            .map(|dest| {
                let is_dir = dest.is_dir();
                FileEvent::moved_to(None, dest, is_dir)
            })
            .collect(),
        _ => Vec::new(),
    }
}
