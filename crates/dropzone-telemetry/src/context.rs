//! Span helpers for the watch session and its per-file pipelines.
//!
//! # Design
//! - The session span stays entered for the whole process so every log line
//!   carries the watched directory, action, and build identifier.
//! - Pipelines get their own span keyed by the file path; callers attach it
//!   with `tracing::Instrument`.

use std::path::Path;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the session-level span entered while it is alive.
pub struct SessionContextGuard {
    _guard: Entered<'static>,
}

impl SessionContextGuard {
    /// Enter the session span for the lifetime of the guard.
    #[must_use]
    pub fn new(watch_dir: &Path, action: &str) -> Self {
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "session",
            watch_dir = %watch_dir.display(),
            action = %action,
            build_sha = %build_sha(),
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Build the span a single file's pipeline runs under.
///
/// The `stage` field starts empty and is filled by [`record_stage`].
#[must_use]
pub fn pipeline_span(path: &Path) -> Span {
    tracing::info_span!(
        "pipeline",
        path = %path.display(),
        stage = tracing::field::Empty,
    )
}

/// Record the pipeline stage currently running on `span`.
pub fn record_stage(span: &Span, stage: &'static str) {
    span.record("stage", stage);
}
