//! Test fixtures for watch directories, timings, and polling assertions.

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use dropzone_config::{RawWatchArgs, ReadinessPolicy, WatchConfig};
use tempfile::TempDir;
use tokio::time::{Instant, sleep};

/// Readiness timings scaled down so pipelines settle within tens of
/// milliseconds.
#[must_use]
pub const fn fast_readiness() -> ReadinessPolicy {
    ReadinessPolicy {
        lock_timeout: Duration::from_secs(2),
        lock_poll_interval: Duration::from_millis(10),
        stable_polls: 3,
        stability_poll_interval: Duration::from_millis(20),
        grace_period: Duration::from_millis(20),
    }
}

/// A watch directory with an optional sibling destination, removed on drop.
pub struct DropTree {
    root: TempDir,
    watch: PathBuf,
    dest: PathBuf,
}

impl DropTree {
    /// Create `inbox/` and `archive/` under a fresh temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories cannot be created.
    pub fn new() -> Result<Self> {
        let root = TempDir::new()?;
        let watch = root.path().join("inbox");
        let dest = root.path().join("archive");
        fs::create_dir(&watch)?;
        fs::create_dir(&dest)?;
        Ok(Self {
            watch: fs::canonicalize(watch)?,
            dest: fs::canonicalize(dest)?,
            root,
        })
    }

    /// Canonical watch directory.
    #[must_use]
    pub fn watch(&self) -> &Path {
        &self.watch
    }

    /// Canonical destination directory.
    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Temporary root holding both directories.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Build a validated config for this tree with fast readiness timings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn config(&self, action: &str, extension: Option<&str>) -> Result<WatchConfig> {
        Ok(WatchConfig::from_raw(RawWatchArgs {
            watch_dir: self.watch.clone(),
            action: action.to_string(),
            dest_dir: Some(self.dest.clone()),
            extension: extension.map(ToString::to_string),
            readiness: fast_readiness(),
            ..RawWatchArgs::default()
        })?)
    }
}

/// Write `bytes` to `dir/name`, returning the full path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Poll `check` until it returns `true` or `limit` elapses.
///
/// Returns whether the condition was met.
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + limit;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_tree_builds_a_valid_move_config() -> Result<()> {
        let tree = DropTree::new()?;
        let config = tree.config("move", Some("mp3"))?;
        assert_eq!(config.watch_directory, tree.watch());
        assert_eq!(config.destination_directory.as_deref(), Some(tree.dest()));
        assert_eq!(config.readiness, fast_readiness());
        assert!(tree.root().exists());
        Ok(())
    }

    #[test]
    fn write_bytes_creates_file() -> Result<()> {
        let tree = DropTree::new()?;
        let path = write_bytes(tree.watch(), "a.bin", b"abc")?;
        assert_eq!(fs::read(path)?, b"abc");
        Ok(())
    }

    #[tokio::test]
    async fn eventually_reports_timeouts() {
        assert!(eventually(Duration::from_millis(50), || async { true }).await);
        assert!(!eventually(Duration::from_millis(30), || async { false }).await);
    }
}
