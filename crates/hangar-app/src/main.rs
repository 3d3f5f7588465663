#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Binary entrypoint that loads configuration and serves the file API.

use hangar_app::{AppResult, run_app};

/// Bootstraps the daemon and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
