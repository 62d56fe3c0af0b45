//! Lock checker and stability detector.
//!
//! # Design
//! - A file is ready once nothing holds an exclusive lock on it and its size
//!   has stopped changing for a number of consecutive polls.
//! - Every wait is bounded by a poll interval and checks the cancellation
//!   token at each boundary, so shutdown is never held up by a slow writer.
//! - A file that never stops growing is never reported stable; only
//!   cancellation ends that wait.
//! - A size read that keeps failing for a reason other than "not found"
//!   gives up after [`STAT_ERROR_LIMIT`] consecutive failures.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::Duration;

use fs2::FileExt;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Consecutive failed size reads tolerated before a file is abandoned.
pub const STAT_ERROR_LIMIT: u32 = 5;

/// Result of a single lock check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// An exclusive lock was acquired and released immediately.
    Free,
    /// Another handle holds the file, or it could not be opened.
    Held,
    /// The path no longer exists.
    Vanished,
}

/// Result of waiting for a file to be unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// An exclusive lock was obtained.
    Unlocked,
    /// The file disappeared while waiting.
    Vanished,
    /// The timeout elapsed with the file still held.
    TimedOut,
    /// Shutdown was signalled.
    Cancelled,
}

/// Result of waiting for a file's size to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityOutcome {
    /// The size held still for the required number of polls.
    Stable {
        /// Size in bytes at the final observation.
        size: u64,
    },
    /// The file disappeared while waiting.
    Vanished,
    /// The size could not be read for [`STAT_ERROR_LIMIT`] polls in a
    /// row.
    Unreadable,
    /// Shutdown was signalled.
    Cancelled,
}

/// Attempt to open `path` and take an exclusive advisory lock without
/// blocking.
///
/// The lock is released and the handle closed before returning. Open
/// failures other than "not found" (permission denied, sharing violations)
/// count as held.
#[must_use]
pub fn check_lock(path: &Path) -> LockState {
    let file = match OpenOptions::new().read(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return LockState::Vanished,
        Err(err) => {
            trace!(path = %path.display(), error = %err, "open failed during lock check");
            return LockState::Held;
        }
    };
    try_exclusive(&file)
}

fn try_exclusive(file: &File) -> LockState {
    match FileExt::try_lock_exclusive(file) {
        Ok(()) => {
            // Closing the handle releases the lock regardless.
            let _ = FileExt::unlock(file);
            LockState::Free
        }
        Err(_) => LockState::Held,
    }
}

/// Per-file bookkeeping for one pipeline's readiness checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessState {
    /// Size seen at the most recent poll.
    pub last_observed_size: Option<u64>,
    /// Consecutive polls with an unchanged size.
    pub stable_polls: u32,
    /// Lock checks attempted so far.
    pub lock_attempts: u32,
    /// Size reads that failed in a row.
    pub stat_errors: u32,
}

impl ReadinessState {
    /// Fresh state for a newly detected file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a size observation and return the current streak.
    ///
    /// The first observation only sets the baseline.
    pub fn observe(&mut self, size: u64) -> u32 {
        match self.last_observed_size {
            Some(previous) if previous == size => {
                self.stable_polls = self.stable_polls.saturating_add(1);
            }
            _ => {
                self.stable_polls = 0;
                self.last_observed_size = Some(size);
            }
        }
        self.stable_polls
    }

    /// Forget the current streak, keeping the attempt counter.
    pub const fn reset_streak(&mut self) {
        self.stable_polls = 0;
        self.last_observed_size = None;
    }

    /// Retry until the file is unlocked, vanishes, `timeout` elapses, or
    /// `cancel` fires.
    pub async fn await_unlocked(
        &mut self,
        path: &Path,
        timeout: Duration,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> LockOutcome {
        // A timeout past the clock's range means "no deadline".
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if cancel.is_cancelled() {
                return LockOutcome::Cancelled;
            }
            self.lock_attempts = self.lock_attempts.saturating_add(1);
            match check_lock(path) {
                LockState::Free => return LockOutcome::Unlocked,
                LockState::Vanished => return LockOutcome::Vanished,
                LockState::Held => {}
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(
                            path = %path.display(),
                            attempts = self.lock_attempts,
                            "lock wait timed out"
                        );
                        return LockOutcome::TimedOut;
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };
            tokio::select! {
                () = cancel.cancelled() => return LockOutcome::Cancelled,
                () = sleep(wait) => {}
            }
        }
    }

    /// Poll the file size until it is unchanged for `required_polls`
    /// consecutive polls, the file vanishes, or `cancel` fires.
    pub async fn await_stable(
        &mut self,
        path: &Path,
        required_polls: u32,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> StabilityOutcome {
        loop {
            if cancel.is_cancelled() {
                return StabilityOutcome::Cancelled;
            }
            match tokio::fs::metadata(path).await {
                Ok(metadata) => {
                    self.stat_errors = 0;
                    let size = metadata.len();
                    let streak = self.observe(size);
                    trace!(path = %path.display(), size, streak, "size observed");
                    if streak >= required_polls {
                        return StabilityOutcome::Stable { size };
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return StabilityOutcome::Vanished;
                }
                Err(err) => {
                    self.stat_errors = self.stat_errors.saturating_add(1);
                    debug!(
                        path = %path.display(),
                        error = %err,
                        failures = self.stat_errors,
                        "size read failed"
                    );
                    if self.stat_errors >= STAT_ERROR_LIMIT {
                        return StabilityOutcome::Unreadable;
                    }
                    self.reset_streak();
                }
            }

            tokio::select! {
                () = cancel.cancelled() => return StabilityOutcome::Cancelled,
                () = sleep(poll_interval) => {}
            }
        }
    }
}

/// Wait for `path` to become unlocked with fresh per-file state.
pub async fn await_unlocked(
    path: &Path,
    timeout: Duration,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> LockOutcome {
    ReadinessState::new()
        .await_unlocked(path, timeout, poll_interval, cancel)
        .await
}

/// Wait for the size of `path` to settle with fresh per-file state.
pub async fn await_stable(
    path: &Path,
    required_polls: u32,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> StabilityOutcome {
    ReadinessState::new()
        .await_stable(path, required_polls, poll_interval, cancel)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropzone_test_support::fixtures::write_bytes;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;
    use tokio::time::timeout;

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn observe_counts_unchanged_polls_and_resets_on_change() {
        let mut state = ReadinessState::new();
        assert_eq!(state.observe(10), 0);
        assert_eq!(state.observe(10), 1);
        assert_eq!(state.observe(10), 2);
        assert_eq!(state.observe(12), 0);
        assert_eq!(state.last_observed_size, Some(12));
        assert_eq!(state.observe(12), 1);
        state.reset_streak();
        assert_eq!(state.observe(12), 0);
    }

    #[test]
    fn check_reports_free_and_vanished() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "a.bin", b"abc")?;
        assert_eq!(check_lock(&path), LockState::Free);
        assert_eq!(
            check_lock(&temp.path().join("missing.bin")),
            LockState::Vanished
        );
        Ok(())
    }

    #[test]
    fn check_reports_held_while_another_handle_locks() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "a.bin", b"abc")?;
        let holder = File::open(&path)?;
        FileExt::lock_exclusive(&holder)?;
        assert_eq!(check_lock(&path), LockState::Held);
        FileExt::unlock(&holder)?;
        assert_eq!(check_lock(&path), LockState::Free);
        Ok(())
    }

    #[tokio::test]
    async fn await_unlocked_returns_once_lock_released() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "a.bin", b"abc")?;
        let holder = File::open(&path)?;
        FileExt::lock_exclusive(&holder)?;

        let release = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            drop(holder);
        });

        let mut state = ReadinessState::new();
        let cancel = CancellationToken::new();
        let outcome = state
            .await_unlocked(&path, Duration::from_secs(2), POLL, &cancel)
            .await;
        release.await?;
        assert_eq!(outcome, LockOutcome::Unlocked);
        assert!(state.lock_attempts > 1);
        Ok(())
    }

    #[tokio::test]
    async fn await_unlocked_times_out_while_held() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "a.bin", b"abc")?;
        let holder = File::open(&path)?;
        FileExt::lock_exclusive(&holder)?;

        let outcome = await_unlocked(
            &path,
            Duration::from_millis(60),
            POLL,
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(outcome, LockOutcome::TimedOut);
        drop(holder);
        Ok(())
    }

    #[tokio::test]
    async fn await_unlocked_reports_vanished_and_cancelled() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let missing = temp.path().join("gone.bin");
        let outcome =
            await_unlocked(&missing, Duration::from_secs(1), POLL, &CancellationToken::new())
                .await;
        assert_eq!(outcome, LockOutcome::Vanished);

        let path = write_bytes(temp.path(), "held.bin", b"abc")?;
        let holder = File::open(&path)?;
        FileExt::lock_exclusive(&holder)?;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });
        let outcome = timeout(
            Duration::from_secs(1),
            await_unlocked(&path, Duration::from_secs(60), Duration::from_secs(30), &cancel),
        )
        .await?;
        assert_eq!(outcome, LockOutcome::Cancelled);
        drop(holder);
        Ok(())
    }

    #[tokio::test]
    async fn unbounded_lock_timeout_keeps_polling_until_cancelled() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "held.bin", b"abc")?;
        let holder = File::open(&path)?;
        FileExt::lock_exclusive(&holder)?;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(60)).await;
            trigger.cancel();
        });

        let mut state = ReadinessState::new();
        let outcome = timeout(
            Duration::from_secs(2),
            state.await_unlocked(&path, Duration::from_secs(u64::MAX), POLL, &cancel),
        )
        .await?;
        assert_eq!(outcome, LockOutcome::Cancelled);
        assert!(state.lock_attempts > 1);
        drop(holder);
        Ok(())
    }

    #[tokio::test]
    async fn await_stable_reports_size_after_required_polls() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "a.bin", &[7_u8; 128])?;
        let mut state = ReadinessState::new();
        let outcome = state
            .await_stable(&path, 3, POLL, &CancellationToken::new())
            .await;
        assert_eq!(outcome, StabilityOutcome::Stable { size: 128 });
        assert_eq!(state.stable_polls, 3);
        Ok(())
    }

    #[tokio::test]
    async fn growing_file_is_never_stable_until_cancelled() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "grow.bin", b"")?;
        let cancel = CancellationToken::new();

        let writer_cancel = cancel.clone();
        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            let mut file = fs::OpenOptions::new().append(true).open(&writer_path)?;
            while !writer_cancel.is_cancelled() {
                file.write_all(b"more")?;
                file.flush()?;
                sleep(Duration::from_millis(5)).await;
            }
            Ok::<_, io::Error>(())
        });

        let stopper = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            stopper.cancel();
        });

        let outcome = timeout(
            Duration::from_secs(2),
            await_stable(&path, 3, Duration::from_millis(20), &cancel),
        )
        .await?;
        assert_eq!(outcome, StabilityOutcome::Cancelled);
        writer.await??;
        Ok(())
    }

    #[tokio::test]
    async fn deleting_file_mid_stability_reports_vanished() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = write_bytes(temp.path(), "doomed.bin", b"abc")?;
        let doomed = path.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            let _ = fs::remove_file(doomed);
        });

        let outcome = timeout(
            Duration::from_secs(2),
            await_stable(&path, 1_000, POLL, &CancellationToken::new()),
        )
        .await?;
        assert_eq!(outcome, StabilityOutcome::Vanished);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn persistent_stat_errors_give_up() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let file = write_bytes(temp.path(), "plain.bin", b"abc")?;
        // A regular file used as a directory fails with ENOTDIR, not NotFound.
        let unreadable = file.join("child.bin");

        let mut state = ReadinessState::new();
        let outcome = timeout(
            Duration::from_secs(2),
            state.await_stable(&unreadable, 3, POLL, &CancellationToken::new()),
        )
        .await?;
        assert_eq!(outcome, StabilityOutcome::Unreadable);
        assert_eq!(state.stat_errors, STAT_ERROR_LIMIT);
        Ok(())
    }
}
