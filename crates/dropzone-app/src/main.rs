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

//! Binary entrypoint for the Dropzone directory watcher.

use std::process::ExitCode;

/// Watches the configured directory until Ctrl-C or SIGTERM.
#[tokio::main]
async fn main() -> ExitCode {
    dropzone_app::run_app(std::env::args_os()).await.into()
}
