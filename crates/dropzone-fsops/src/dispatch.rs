//! Action dispatcher: applies the configured action to a ready file.
//!
//! # Design
//! - Checks run in a fixed order (extension filter, existence, rename
//!   prefix) and any of them may short-circuit with a skip.
//! - At most one mutation per call. Existing targets are never overwritten.
//! - Same-filesystem moves use `rename`; cross-device moves copy into a
//!   freshly created target and then remove the source.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use dropzone_config::{ActionKind, WatchConfig};
use tracing::{debug, info, warn};

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::{AppliedAction, SkipReason};

/// Applies the session's configured action to ready files.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    config: Arc<WatchConfig>,
}

impl ActionDispatcher {
    /// Build a dispatcher over a shared watch configuration.
    #[must_use]
    pub const fn new(config: Arc<WatchConfig>) -> Self {
        Self { config }
    }

    /// Configuration the dispatcher acts on.
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Apply the configured action to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::DestinationCollision`] when the target name is
    /// taken, [`FsOpsError::InvalidInput`] when `path` is not a regular file
    /// with a name, and [`FsOpsError::Io`] for any other filesystem failure.
    pub fn apply(&self, path: &Path) -> FsOpsResult<AppliedAction> {
        if !self.config.matches_extension(path) {
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
            debug!(path = %path.display(), ?extension, "extension filtered");
            return Ok(skipped(path, SkipReason::Filtered { extension }));
        }

        match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => {
                return Err(FsOpsError::InvalidInput {
                    field: "path",
                    reason: "not_a_regular_file",
                    value: Some(path.display().to_string()),
                });
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(skipped(path, SkipReason::Vanished));
            }
            Err(err) => return Err(FsOpsError::io("apply.stat", path, err)),
        }

        match self.config.action {
            ActionKind::Move => self.move_into_destination(path),
            ActionKind::Rename => self.rename_in_place(path),
            ActionKind::None => {
                info!(path = %path.display(), "file ready; no action configured");
                Ok(AppliedAction::NoOp {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    fn move_into_destination(&self, path: &Path) -> FsOpsResult<AppliedAction> {
        let dest_dir = self
            .config
            .destination_directory
            .as_deref()
            .ok_or_else(|| FsOpsError::InvalidInput {
                field: "destination_directory",
                reason: "missing_for_move",
                value: None,
            })?;
        let target = dest_dir.join(file_name(path)?);
        ensure_vacant(&target)?;

        match fs::rename(path, &target) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(skipped(path, SkipReason::Vanished));
            }
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                debug!(
                    from = %path.display(),
                    to = %target.display(),
                    "rename crosses devices; copying"
                );
                copy_then_remove(path, &target)?;
            }
            Err(err) => return Err(FsOpsError::io("move.rename", path, err)),
        }

        info!(from = %path.display(), to = %target.display(), "file moved");
        Ok(AppliedAction::Moved {
            from: path.to_path_buf(),
            to: target,
        })
    }

    fn rename_in_place(&self, path: &Path) -> FsOpsResult<AppliedAction> {
        let naming = &self.config.naming;
        if naming.has_rename_prefix(path) {
            debug!(path = %path.display(), "already carries rename prefix");
            return Ok(skipped(path, SkipReason::AlreadyRenamed));
        }

        let mut renamed = OsString::from(&naming.rename_prefix);
        renamed.push(file_name(path)?);
        let target = path.with_file_name(renamed);
        ensure_vacant(&target)?;

        match fs::rename(path, &target) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(skipped(path, SkipReason::Vanished));
            }
            Err(err) => return Err(FsOpsError::io("rename.rename", path, err)),
        }

        info!(from = %path.display(), to = %target.display(), "file renamed");
        Ok(AppliedAction::Renamed {
            from: path.to_path_buf(),
            to: target,
        })
    }
}

fn skipped(path: &Path, reason: SkipReason) -> AppliedAction {
    AppliedAction::Skipped {
        path: path.to_path_buf(),
        reason,
    }
}

fn file_name(path: &Path) -> FsOpsResult<&OsStr> {
    path.file_name().ok_or_else(|| FsOpsError::InvalidInput {
        field: "path",
        reason: "missing_file_name",
        value: Some(path.display().to_string()),
    })
}

fn ensure_vacant(target: &Path) -> FsOpsResult<()> {
    match fs::symlink_metadata(target) {
        Ok(_) => Err(FsOpsError::collision(target)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(FsOpsError::io("collision.stat", target, err)),
    }
}

fn copy_then_remove(source: &Path, target: &Path) -> FsOpsResult<()> {
    let mut reader =
        File::open(source).map_err(|err| FsOpsError::io("move.copy.open_source", source, err))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(|err| {
            if err.kind() == io::ErrorKind::AlreadyExists {
                FsOpsError::collision(target)
            } else {
                FsOpsError::io("move.copy.create_target", target, err)
            }
        })?;

    if let Err(err) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        discard_partial(target);
        return Err(FsOpsError::io("move.copy", target, err));
    }
    drop(writer);

    if let Ok(metadata) = reader.metadata() {
        if let Err(err) = fs::set_permissions(target, metadata.permissions()) {
            warn!(path = %target.display(), error = %err, "failed to copy permissions");
        }
    }
    drop(reader);

    fs::remove_file(source).map_err(|err| FsOpsError::io("move.remove_source", source, err))
}

fn discard_partial(target: &Path) {
    if let Err(err) = fs::remove_file(target) {
        warn!(path = %target.display(), error = %err, "failed to remove partial copy");
    }
}
