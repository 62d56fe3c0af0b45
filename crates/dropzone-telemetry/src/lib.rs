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

//! Telemetry primitives shared across the Dropzone workspace.
//!
//! This crate centralises logging, metrics, and span helpers so the watch
//! session and its per-file pipelines report in one consistent shape.
//!
//! Layout: `init.rs` (subscriber install), `metrics.rs` (Prometheus counters),
//! `context.rs` (session and pipeline spans), `error.rs` (telemetry errors).

pub mod context;
pub mod error;
pub mod init;
pub mod metrics;

pub use context::{SessionContextGuard, pipeline_span, record_stage};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot, PipelineOutcome};
