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

//! Lifecycle event bus for the Dropzone watcher.
//!
//! The bus provides a typed event enum, sequential identifiers, and support for
//! replaying recent events to late subscribers. Internally it uses
//! `tokio::broadcast` with a bounded buffer; when the channel overflows, the
//! oldest events are dropped.
//!
//! Layout: `payloads.rs` (event types), `routing.rs` (`EventBus`).

pub mod payloads;
pub mod routing;

pub use payloads::{
    DEFAULT_REPLAY_CAPACITY, DetectionTrigger, Event, EventEnvelope, EventId, GiveUpReason,
};
pub use routing::{EventBus, EventStream};
