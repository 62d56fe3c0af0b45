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

//! Validated, immutable watch configuration.
//!
//! Raw inputs (CLI arguments and environment fallbacks) arrive as a
//! [`RawWatchArgs`]; [`WatchConfig::from_raw`] validates them once at startup
//! and the resulting value is shared read-only behind an `Arc`.
//!
//! Layout: `model.rs` (typed config values), `validate.rs` (parsing and
//! normalisation helpers), `defaults.rs` (readiness and naming defaults),
//! `error.rs` (configuration errors).

mod defaults;
pub mod error;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{ActionKind, NamingPolicy, RawWatchArgs, ReadinessPolicy, WatchConfig};
pub use validate::{normalize_extension, normalize_suffix, parse_action};
