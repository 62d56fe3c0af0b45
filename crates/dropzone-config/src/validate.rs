//! Validation helpers and parsing utilities for watch settings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::defaults::MAX_LOCK_TIMEOUT;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ActionKind, ReadinessPolicy};

/// Parse an action label, ignoring case and surrounding whitespace.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownAction`] for anything other than `move`,
/// `rename`, or `none`.
pub fn parse_action(value: &str) -> ConfigResult<ActionKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "move" => Ok(ActionKind::Move),
        "rename" => Ok(ActionKind::Rename),
        "none" => Ok(ActionKind::None),
        _ => Err(ConfigError::UnknownAction {
            value: value.to_string(),
        }),
    }
}

/// Normalise an extension filter to lowercase without a leading dot.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty or contains
/// a path separator.
pub fn normalize_extension(value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    let bare = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if bare.is_empty() {
        return Err(ConfigError::invalid(
            "extension",
            Some(value.to_string()),
            "must not be empty",
        ));
    }
    if has_separator(bare) || bare.contains('.') {
        return Err(ConfigError::invalid(
            "extension",
            Some(value.to_string()),
            "must be a single extension without separators",
        ));
    }
    Ok(bare.to_ascii_lowercase())
}

/// Normalise a transient suffix to lowercase with exactly one leading dot.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty or contains
/// a path separator.
pub fn normalize_suffix(value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    let bare = trimmed.trim_start_matches('.');
    if bare.is_empty() || has_separator(bare) {
        return Err(ConfigError::invalid(
            "transient_suffix",
            Some(value.to_string()),
            "must be a non-empty suffix without separators",
        ));
    }
    Ok(format!(".{}", bare.to_ascii_lowercase()))
}

pub(crate) fn check_prefix(prefix: String) -> ConfigResult<String> {
    if prefix.is_empty() || has_separator(&prefix) {
        return Err(ConfigError::invalid(
            "rename_prefix",
            Some(prefix),
            "must be non-empty without separators",
        ));
    }
    Ok(prefix)
}

pub(crate) fn check_readiness(policy: &ReadinessPolicy) -> ConfigResult<()> {
    if policy.stable_polls == 0 {
        return Err(ConfigError::invalid(
            "stable_polls",
            Some("0".to_string()),
            "must be at least 1",
        ));
    }
    non_zero("lock_poll_interval", policy.lock_poll_interval)?;
    non_zero("stability_poll_interval", policy.stability_poll_interval)?;
    non_zero("lock_timeout", policy.lock_timeout)?;
    if policy.lock_timeout > MAX_LOCK_TIMEOUT {
        return Err(ConfigError::invalid(
            "lock_timeout",
            Some(policy.lock_timeout.as_secs().to_string()),
            "must be at most one day",
        ));
    }
    Ok(())
}

pub(crate) fn resolve_watch_dir(path: &Path) -> ConfigResult<PathBuf> {
    let resolved = canonical_dir("watch_dir", path)?;
    debug!(watch_dir = %resolved.display(), "watch directory resolved");
    Ok(resolved)
}

pub(crate) fn resolve_destination(path: &Path, watch_dir: &Path) -> ConfigResult<PathBuf> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| ConfigError::Io {
            operation: "create_dir_all",
            path: path.to_path_buf(),
            source,
        })?;
        debug!(dest_dir = %path.display(), "destination directory created");
    }
    let resolved = canonical_dir("dest_dir", path)?;
    if resolved == watch_dir {
        return Err(ConfigError::Directory {
            field: "dest_dir",
            path: resolved,
            reason: "must differ from the watch directory",
        });
    }
    Ok(resolved)
}

fn canonical_dir(field: &'static str, path: &Path) -> ConfigResult<PathBuf> {
    let resolved = fs::canonicalize(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::Directory {
                field,
                path: path.to_path_buf(),
                reason: "does not exist",
            }
        } else {
            ConfigError::Io {
                operation: "canonicalize",
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    if !resolved.is_dir() {
        return Err(ConfigError::Directory {
            field,
            path: resolved,
            reason: "is not a directory",
        });
    }
    Ok(resolved)
}

fn non_zero(field: &'static str, value: Duration) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid(
            field,
            Some("0".to_string()),
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn has_separator(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_action_accepts_known_labels() -> anyhow::Result<()> {
        assert_eq!(parse_action("move")?, ActionKind::Move);
        assert_eq!(parse_action(" Rename ")?, ActionKind::Rename);
        assert_eq!(parse_action("NONE")?, ActionKind::None);
        assert!(matches!(
            parse_action("copy"),
            Err(ConfigError::UnknownAction { value }) if value == "copy"
        ));
        Ok(())
    }

    #[test]
    fn normalize_extension_strips_dot_and_lowercases() -> anyhow::Result<()> {
        assert_eq!(normalize_extension("MP3")?, "mp3");
        assert_eq!(normalize_extension(".Flac")?, "flac");
        assert_eq!(normalize_extension("  pdf ")?, "pdf");
        Ok(())
    }

    #[test]
    fn normalize_extension_rejects_bad_input() {
        for value in ["", ".", "  ", "a/b", "a\\b", "tar.gz"] {
            assert!(
                matches!(
                    normalize_extension(value),
                    Err(ConfigError::InvalidField {
                        field: "extension",
                        ..
                    })
                ),
                "expected rejection for {value:?}"
            );
        }
    }

    #[test]
    fn normalize_suffix_adds_single_dot() -> anyhow::Result<()> {
        assert_eq!(normalize_suffix("part")?, ".part");
        assert_eq!(normalize_suffix("..CRDOWNLOAD")?, ".crdownload");
        assert!(normalize_suffix("").is_err());
        assert!(normalize_suffix("x/y").is_err());
        Ok(())
    }

    #[test]
    fn check_prefix_rejects_separators() {
        assert!(check_prefix("renamed_".into()).is_ok());
        assert!(check_prefix(String::new()).is_err());
        assert!(check_prefix("../".into()).is_err());
    }

    #[test]
    fn check_readiness_rejects_zero_values() {
        assert!(check_readiness(&ReadinessPolicy::default()).is_ok());

        let zero_polls = ReadinessPolicy {
            stable_polls: 0,
            ..ReadinessPolicy::default()
        };
        assert!(matches!(
            check_readiness(&zero_polls),
            Err(ConfigError::InvalidField {
                field: "stable_polls",
                ..
            })
        ));

        let zero_interval = ReadinessPolicy {
            stability_poll_interval: Duration::ZERO,
            ..ReadinessPolicy::default()
        };
        assert!(matches!(
            check_readiness(&zero_interval),
            Err(ConfigError::InvalidField {
                field: "stability_poll_interval",
                ..
            })
        ));
    }

    #[test]
    fn check_readiness_caps_lock_timeout() {
        let one_day = ReadinessPolicy {
            lock_timeout: MAX_LOCK_TIMEOUT,
            ..ReadinessPolicy::default()
        };
        assert!(check_readiness(&one_day).is_ok());

        let forever = ReadinessPolicy {
            lock_timeout: Duration::from_secs(u64::MAX),
            ..ReadinessPolicy::default()
        };
        assert!(matches!(
            check_readiness(&forever),
            Err(ConfigError::InvalidField {
                field: "lock_timeout",
                value: Some(value),
                ..
            }) if value == u64::MAX.to_string()
        ));
    }

    #[test]
    fn watch_dir_must_be_a_directory() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x")?;
        assert!(matches!(
            resolve_watch_dir(&file),
            Err(ConfigError::Directory {
                reason: "is not a directory",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn destination_must_not_be_a_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = temp.path().join("taken");
        fs::write(&file, b"x")?;
        let watch = fs::canonicalize(temp.path())?;
        assert!(matches!(
            resolve_destination(&file, &watch),
            Err(ConfigError::Directory {
                field: "dest_dir",
                ..
            })
        ));
        Ok(())
    }
}
