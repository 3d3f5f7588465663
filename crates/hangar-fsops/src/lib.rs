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

//! File operation workflows layered over the filesystem capability: concurrent
//! rename/delete batches, space-guarded archive requests and server lookup.

pub mod archive;
pub mod batch;
pub mod error;
#[cfg(test)]
mod fake;
pub mod registry;

pub use archive::ArchiveWorkflow;
pub use batch::{BatchAction, BatchExecutor, RenameItem};
pub use error::{FileOpsError, FileOpsResult};
pub use registry::{Server, ServerLookup, ServerRegistry};
