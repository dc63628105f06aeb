//! Durable state content providers for Tessera.
//!
//! This crate implements the storage side of workspace state: a named set of
//! gzip-compressed state blobs, keyed by a file prefix and a per-account
//! suffix, behind the backend-agnostic [`StateContentProvider`] trait.
//!
//! # Storage Backends
//!
//! - [`FileContentProvider`] — blobs on the local filesystem, written via
//!   temp-file-plus-rename
//! - [`InMemoryContentProvider`] — `HashMap`-backed store for tests and
//!   embedding
//! - `S3ContentProvider` (cargo feature `s3`) — blobs in an S3 bucket
//!
//! # Design Rules
//!
//! 1. "No files yet" is a valid empty result, never an error; only an
//!    unreachable backend is.
//! 2. `rename` is atomic from the caller's perspective.
//! 3. `clear` is idempotent.
//! 4. Content fingerprints are recomputed from content, never taken from
//!    backend metadata, so they agree across backends after a migration.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
pub mod static_files;
pub mod traits;

pub use config::provider_from_config;
pub use error::{StoreError, StoreResult};
pub use file::FileContentProvider;
pub use memory::InMemoryContentProvider;
#[cfg(feature = "s3")]
pub use s3::S3ContentProvider;
pub use static_files::{InMemoryStaticFiles, LocalStaticFiles};
pub use traits::{
    account_from_file_name, prefix_base, state_file_name, ContentAndHash, NamedContent,
    StateContentProvider, StaticFilesSource, STATE_FILE_SUFFIX,
};
