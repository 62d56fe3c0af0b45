#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Dropzone application wiring.
//!
//! Layout: `cli.rs` (arguments), `bootstrap.rs` (boot sequence and exit
//! codes), `session.rs` (notify subscription and shutdown), `source.rs`
//! (notify event translation), `router.rs` (per-file pipelines).

/// Boot sequence and process exit codes.
pub mod bootstrap;
/// Command-line arguments.
pub mod cli;
/// Application error types.
pub mod error;
/// Event routing and per-file readiness pipelines.
pub mod router;
/// Watch session lifecycle.
pub mod session;
/// Translation of raw notifications into file events.
pub mod source;

pub use bootstrap::{AppExit, run_app, run_app_with, shutdown_signal};
pub use error::{AppError, AppResult};
pub use router::{EventRouter, IgnoreReason, RouteDecision};
pub use session::WatchSession;
pub use source::{FileEvent, FileEventKind, translate};
