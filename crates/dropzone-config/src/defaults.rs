//! Readiness timings and naming defaults.
//!
//! # Design
//! - Keep every tunable in one place so the CLI help and the model agree.
//! - Stability polls run once per interval, so the poll count doubles as the
//!   "seconds of unchanged size" requirement at the default interval.
#![allow(clippy::redundant_pub_crate)]

use std::time::Duration;

/// How long a file may stay locked before the pipeline gives up.
pub(crate) const LOCK_TIMEOUT: Duration = Duration::from_secs(300);
/// Longest accepted lock timeout.
pub(crate) const MAX_LOCK_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Delay between lock checks.
pub(crate) const LOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Consecutive unchanged size observations required before a file is stable.
pub(crate) const STABLE_POLLS: u32 = 5;
/// Delay between size observations.
pub(crate) const STABILITY_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Extra wait after both checks pass, for writers that reopen the file.
pub(crate) const GRACE_PERIOD: Duration = Duration::from_secs(10);
/// Prefix prepended by the rename action.
pub(crate) const RENAME_PREFIX: &str = "renamed_";
/// Suffixes browsers and download tools use for in-progress files.
pub(crate) const TRANSIENT_SUFFIXES: [&str; 5] =
    [".tmp", ".part", ".crdownload", ".partial", ".download"];
