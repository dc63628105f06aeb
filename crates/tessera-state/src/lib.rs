//! Workspace state orchestration for Tessera.
//!
//! This crate coordinates the durable side of workspace state (the content
//! providers of `tessera-store`, serialized through `tessera-codec`) with a
//! quick-access cache built on pluggable key-value maps, so the fetch/deploy
//! pipeline never reparses multi-account element sets it has already seen.
//!
//! # Architecture
//!
//! - [`KvMap`] / [`MapCreator`] — the cache's pluggable backing store
//! - [`StateData`] — the materialized view: elements, path index, accounts,
//!   and metadata (including the recorded content hash)
//! - [`WorkspaceState`] — the orchestrator: lazy hash-checked loading,
//!   dirty tracking, memoized per-account content, flush, clear, rename,
//!   and storage backend migration
//!
//! # Freshness model
//!
//! Durable content is authoritative. The cache records the hash of the last
//! content it materialized; on load, that hash is compared to the durable
//! content's current hash and a mismatch triggers a full reparse. In-memory
//! mutations mark the handle dirty until `flush` writes them back.

pub mod data;
pub mod error;
pub mod kv;
pub mod state;

mod lifecycle;

pub use data::StateData;
pub use error::{StateError, StateResult};
pub use kv::{InMemoryMapCreator, KvMap, MapCreator};
pub use state::WorkspaceState;
