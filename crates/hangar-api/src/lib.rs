#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! HTTP surface for server file management.
//!
//! Routes live under `/api/servers/{server}/files/`; every error is rendered as an RFC9457
//! problem document.

pub mod error;
pub mod http;
pub mod models;
mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
