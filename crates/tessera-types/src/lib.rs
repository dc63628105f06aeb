//! Foundation types for Tessera.
//!
//! This crate provides the core identifier, element, and configuration types
//! used throughout the Tessera workspace-state subsystem. Every other Tessera
//! crate depends on `tessera-types`.
//!
//! # Key Types
//!
//! - [`ElemId`] — Globally unique hierarchical element identifier
//! - [`Element`] — An opaque configuration object: an [`ElemId`] plus its
//!   serialized value
//! - [`PathIndex`] — Mapping from element identifier to the source fragment
//!   paths it originated from
//! - [`Change`] — A detailed change to apply to workspace state
//! - [`ContentHash`] — Content fingerprint of durable state content
//! - [`StateConfig`] — Storage backend selection and per-backend options

pub mod change;
pub mod config;
pub mod elem;
pub mod error;
pub mod hash;
pub mod path_index;

pub use change::Change;
pub use config::{FileStateOptions, ProviderKind, ProviderOptions, S3StateOptions, StateConfig};
pub use elem::{ElemId, Element};
pub use error::TypeError;
pub use hash::ContentHash;
pub use path_index::{PathIndex, PathIndexEntry, SourcePath};
