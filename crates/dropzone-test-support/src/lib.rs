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

//! Shared test helpers used across crate and integration suites.
//! Layout: fixtures.rs (temp trees, fast timings, polling assertions).

pub mod fixtures;
