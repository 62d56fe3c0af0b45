//! Typed configuration values.
//!
//! # Design
//! - `RawWatchArgs` is the unvalidated input; `WatchConfig` is only built
//!   through [`WatchConfig::from_raw`] so downstream crates can trust it.
//! - Pure data carriers; filesystem probing lives in `validate.rs`.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::validate;

/// Action applied to a file once it is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Move the file into the destination directory, keeping its base name.
    Move,
    /// Prefix the file name in place.
    Rename,
    /// Observe and log only.
    None,
}

impl ActionKind {
    /// Render the action as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Rename => "rename",
            Self::None => "none",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> ConfigResult<Self> {
        validate::parse_action(value)
    }
}

/// Timings for the lock, stability, and grace stages of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadinessPolicy {
    /// Upper bound on waiting for an exclusive lock.
    pub lock_timeout: Duration,
    /// Delay between lock checks.
    pub lock_poll_interval: Duration,
    /// Consecutive unchanged size observations required.
    pub stable_polls: u32,
    /// Delay between size observations.
    pub stability_poll_interval: Duration,
    /// Wait after both checks pass and before the action runs.
    pub grace_period: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            lock_timeout: defaults::LOCK_TIMEOUT,
            lock_poll_interval: defaults::LOCK_POLL_INTERVAL,
            stable_polls: defaults::STABLE_POLLS,
            stability_poll_interval: defaults::STABILITY_POLL_INTERVAL,
            grace_period: defaults::GRACE_PERIOD,
        }
    }
}

/// File naming rules: the rename prefix and the in-progress suffixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingPolicy {
    /// Prefix prepended by the rename action.
    pub rename_prefix: String,
    /// Lowercase suffixes (with leading dot) marking in-progress files.
    pub transient_suffixes: Vec<String>,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            rename_prefix: defaults::RENAME_PREFIX.to_string(),
            transient_suffixes: defaults::TRANSIENT_SUFFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl NamingPolicy {
    /// Whether the file name marks an in-progress download or temp file.
    #[must_use]
    pub fn is_transient(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        self.transient_suffixes
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
    }

    /// Whether the file name already carries the rename prefix.
    #[must_use]
    pub fn has_rename_prefix(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&self.rename_prefix))
    }
}

/// Unvalidated watch settings as collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct RawWatchArgs {
    /// Directory to watch.
    pub watch_dir: PathBuf,
    /// Action label (`move`, `rename`, `none`).
    pub action: String,
    /// Destination directory; only consulted for `move`.
    pub dest_dir: Option<PathBuf>,
    /// Optional extension filter, with or without a leading dot.
    pub extension: Option<String>,
    /// Readiness timings.
    pub readiness: ReadinessPolicy,
    /// Rename prefix override.
    pub rename_prefix: Option<String>,
    /// Transient suffix overrides; empty keeps the defaults.
    pub transient_suffixes: Vec<String>,
}

/// Validated, immutable configuration for one watch session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchConfig {
    /// Canonical absolute path of the watched directory.
    pub watch_directory: PathBuf,
    /// Action applied to ready files.
    pub action: ActionKind,
    /// Canonical destination directory; present iff the action is `Move`.
    pub destination_directory: Option<PathBuf>,
    /// Lowercase extension without a leading dot.
    pub extension_filter: Option<String>,
    /// Readiness timings.
    pub readiness: ReadinessPolicy,
    /// Naming rules.
    pub naming: NamingPolicy,
}

impl WatchConfig {
    /// Validate raw arguments into a watch configuration.
    ///
    /// A `move` destination that does not exist yet is created.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any field fails validation or a directory
    /// cannot be resolved.
    pub fn from_raw(raw: RawWatchArgs) -> ConfigResult<Self> {
        let watch_directory = validate::resolve_watch_dir(&raw.watch_dir)?;
        let action = validate::parse_action(&raw.action)?;

        let destination_directory = match action {
            ActionKind::Move => {
                let dest = raw.dest_dir.as_deref().ok_or_else(|| {
                    ConfigError::invalid("dest_dir", None, "is required for move")
                })?;
                Some(validate::resolve_destination(dest, &watch_directory)?)
            }
            ActionKind::Rename | ActionKind::None => None,
        };

        let extension_filter = raw
            .extension
            .as_deref()
            .map(validate::normalize_extension)
            .transpose()?;

        validate::check_readiness(&raw.readiness)?;

        let rename_prefix = match raw.rename_prefix {
            Some(prefix) => validate::check_prefix(prefix)?,
            None => defaults::RENAME_PREFIX.to_string(),
        };
        let transient_suffixes = if raw.transient_suffixes.is_empty() {
            NamingPolicy::default().transient_suffixes
        } else {
            raw.transient_suffixes
                .iter()
                .map(String::as_str)
                .map(validate::normalize_suffix)
                .collect::<ConfigResult<Vec<_>>>()?
        };

        Ok(Self {
            watch_directory,
            action,
            destination_directory,
            extension_filter,
            readiness: raw.readiness,
            naming: NamingPolicy {
                rename_prefix,
                transient_suffixes,
            },
        })
    }

    /// Whether the path names a direct child of the watched directory.
    #[must_use]
    pub fn is_direct_child(&self, path: &Path) -> bool {
        path.parent() == Some(self.watch_directory.as_path())
    }

    /// Whether the path passes the extension filter.
    ///
    /// Matching is case-insensitive; no filter accepts everything.
    #[must_use]
    pub fn matches_extension(&self, path: &Path) -> bool {
        self.extension_filter.as_deref().is_none_or(|wanted| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn raw(watch: &Path, action: &str, dest: Option<&Path>) -> RawWatchArgs {
        RawWatchArgs {
            watch_dir: watch.to_path_buf(),
            action: action.to_string(),
            dest_dir: dest.map(Path::to_path_buf),
            ..RawWatchArgs::default()
        }
    }

    #[test]
    fn move_config_resolves_and_creates_destination() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let watch = temp.path().join("inbox");
        fs::create_dir(&watch)?;
        let dest = temp.path().join("archive").join("nested");

        let mut args = raw(&watch, "MOVE", Some(&dest));
        args.extension = Some(".Mp3".into());
        let config = WatchConfig::from_raw(args)?;

        assert_eq!(config.action, ActionKind::Move);
        assert_eq!(config.watch_directory, fs::canonicalize(&watch)?);
        assert_eq!(
            config.destination_directory.as_deref(),
            Some(fs::canonicalize(&dest)?.as_path())
        );
        assert_eq!(config.extension_filter.as_deref(), Some("mp3"));
        assert_eq!(config.readiness, ReadinessPolicy::default());
        assert_eq!(config.naming, NamingPolicy::default());
        Ok(())
    }

    #[test]
    fn rename_ignores_destination() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = WatchConfig::from_raw(raw(
            temp.path(),
            "rename",
            Some(Path::new("/does/not/matter")),
        ))?;
        assert_eq!(config.action, ActionKind::Rename);
        assert!(config.destination_directory.is_none());
        Ok(())
    }

    #[test]
    fn move_requires_destination() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let err = WatchConfig::from_raw(raw(temp.path(), "move", None))
            .expect_err("destination required");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "dest_dir",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn move_rejects_watch_directory_as_destination() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let err = WatchConfig::from_raw(raw(temp.path(), "move", Some(temp.path())))
            .expect_err("same directory rejected");
        assert!(matches!(
            err,
            ConfigError::Directory {
                field: "dest_dir",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn missing_watch_directory_is_rejected() {
        let err = WatchConfig::from_raw(raw(Path::new("/definitely/not/here"), "none", None))
            .expect_err("missing directory");
        assert!(matches!(
            err,
            ConfigError::Directory {
                field: "watch_dir",
                ..
            }
        ));
    }

    #[test]
    fn naming_overrides_are_normalised() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut args = raw(temp.path(), "rename", None);
        args.rename_prefix = Some("done-".into());
        args.transient_suffixes = vec!["PART".into(), ".Tmp".into()];
        let config = WatchConfig::from_raw(args)?;
        assert_eq!(config.naming.rename_prefix, "done-");
        assert_eq!(config.naming.transient_suffixes, vec![".part", ".tmp"]);
        Ok(())
    }

    #[test]
    fn transient_detection_is_case_insensitive() {
        let naming = NamingPolicy::default();
        assert!(naming.is_transient(Path::new("/drop/movie.mkv.PART")));
        assert!(naming.is_transient(Path::new("/drop/setup.exe.crdownload")));
        assert!(!naming.is_transient(Path::new("/drop/report.pdf")));
        assert!(!naming.is_transient(Path::new("/drop/.tmp")));
    }

    #[test]
    fn extension_matching_ignores_case() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut args = raw(temp.path(), "none", None);
        args.extension = Some("mp3".into());
        let config = WatchConfig::from_raw(args)?;

        assert!(config.matches_extension(Path::new("a.MP3")));
        assert!(config.matches_extension(Path::new("b.mp3")));
        assert!(!config.matches_extension(Path::new("a.wav")));
        assert!(!config.matches_extension(Path::new("mp3")));
        Ok(())
    }

    #[test]
    fn direct_child_check_uses_canonical_watch_dir() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = WatchConfig::from_raw(raw(temp.path(), "none", None))?;
        let root = config.watch_directory.clone();
        assert!(config.is_direct_child(&root.join("a.txt")));
        assert!(!config.is_direct_child(&root.join("sub").join("a.txt")));
        assert!(!config.is_direct_child(Path::new("/elsewhere/a.txt")));
        Ok(())
    }

    #[test]
    fn config_serialises_action_lowercase() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = WatchConfig::from_raw(raw(temp.path(), "rename", None))?;
        let value = serde_json::to_value(&config)?;
        assert_eq!(value["action"], "rename");
        assert_eq!(value["naming"]["rename_prefix"], "renamed_");
        Ok(())
    }
}
