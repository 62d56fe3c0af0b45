//! File readiness checks and the action dispatcher for the drop folder.
#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

//! # Design
//!
//! - Readiness is two bounded, cancellable waits: an exclusive-lock check
//!   followed by a size-stability poll. Both report explicit outcomes
//!   instead of using errors for "the file went away".
//! - The dispatcher performs at most one filesystem mutation per call and
//!   never overwrites an existing file.
//!
//! Layout: `readiness.rs` (lock checker and stability detector),
//! `dispatch.rs` (`ActionDispatcher`), `model.rs` (outcome types),
//! `error.rs` (`FsOpsError`).

pub mod dispatch;
pub mod error;
pub mod model;
pub mod readiness;

pub use dispatch::ActionDispatcher;
pub use error::{FsOpsError, FsOpsResult};
pub use model::{AppliedAction, SkipReason};
pub use readiness::{
    LockOutcome, LockState, ReadinessState, STAT_ERROR_LIMIT, StabilityOutcome, await_stable,
    await_unlocked, check_lock,
};
