//! Command-line surface for the `dropzone` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dropzone_config::{RawWatchArgs, ReadinessPolicy};

/// Watch a directory and move or rename files once they are fully written.
#[derive(Debug, Parser)]
#[command(
    name = "dropzone",
    version,
    about = "Move or rename files dropped into a directory once they are fully written"
)]
pub struct Cli {
    /// Directory to watch (non-recursive).
    pub watch_dir: PathBuf,
    /// Action to apply: move, rename, or none.
    pub action: String,
    /// Destination directory; required, but only used by `move`.
    pub dest_dir: PathBuf,
    /// Only act on files with this extension (case-insensitive).
    pub extension: Option<String>,

    /// Seconds a file's size must stay unchanged before it is acted on.
    #[arg(long, env = "DROPZONE_STABLE_SECONDS")]
    pub stable_seconds: Option<u64>,
    /// Seconds to wait for a file to be unlocked before giving up.
    #[arg(long, env = "DROPZONE_LOCK_TIMEOUT_SECS")]
    pub lock_timeout_secs: Option<u64>,
    /// Delay between lock and size checks, in milliseconds.
    #[arg(long, env = "DROPZONE_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,
    /// Seconds to wait after a file is ready and before acting on it.
    #[arg(long, env = "DROPZONE_GRACE_SECS")]
    pub grace_secs: Option<u64>,
    /// Prefix prepended by the `rename` action.
    #[arg(long, env = "DROPZONE_RENAME_PREFIX")]
    pub rename_prefix: Option<String>,
    /// Suffix marking in-progress downloads; repeat to list several.
    #[arg(
        long = "transient-suffix",
        env = "DROPZONE_TRANSIENT_SUFFIXES",
        value_delimiter = ','
    )]
    pub transient_suffixes: Vec<String>,
    /// Log level or `RUST_LOG`-style directive.
    #[arg(long, env = "DROPZONE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    /// Log output format: pretty or json.
    #[arg(long, env = "DROPZONE_LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// Readiness timings with command-line overrides applied to the defaults.
    #[must_use]
    pub fn readiness(&self) -> ReadinessPolicy {
        let mut policy = ReadinessPolicy::default();
        if let Some(ms) = self.poll_interval_ms {
            let interval = Duration::from_millis(ms);
            policy.lock_poll_interval = interval;
            policy.stability_poll_interval = interval;
        }
        if let Some(secs) = self.lock_timeout_secs {
            policy.lock_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.grace_secs {
            policy.grace_period = Duration::from_secs(secs);
        }
        if let Some(secs) = self.stable_seconds {
            policy.stable_polls = polls_for(Duration::from_secs(secs), policy.stability_poll_interval);
        }
        policy
    }

    /// Collect the unvalidated settings for [`dropzone_config::WatchConfig::from_raw`].
    #[must_use]
    pub fn into_raw(self) -> RawWatchArgs {
        let readiness = self.readiness();
        RawWatchArgs {
            watch_dir: self.watch_dir,
            action: self.action,
            dest_dir: Some(self.dest_dir),
            extension: self.extension,
            readiness,
            rename_prefix: self.rename_prefix,
            transient_suffixes: self.transient_suffixes,
        }
    }
}

/// Number of polls at `interval` needed to cover `window`, rounded up.
///
/// A zero window yields zero polls, which validation rejects.
fn polls_for(window: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return u32::try_from(window.as_secs()).unwrap_or(u32::MAX);
    }
    let polls = window.as_millis().div_ceil(interval.as_millis());
    u32::try_from(polls).unwrap_or(u32::MAX)
}
