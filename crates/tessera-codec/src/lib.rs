//! State stream codec for Tessera.
//!
//! Serializes one account's workspace state (elements, account name, path
//! index) into a gzip-compressed, line-delimited JSON document, and parses
//! the same format back, including legacy variants still present in
//! long-lived workspaces.
//!
//! # Durable format
//!
//! A state file is a single gzip stream of newline-delimited JSON lines:
//!
//! - line 0: array of serialized elements, sorted by identifier
//! - line 1: account name as a JSON string (legacy: an object mapping
//!   account names to fetch timestamps; the keys are taken)
//! - line 2: path index as nested `[full_name, [[segment, ...], ...]]` arrays
//! - line 3: legacy version string, ignored when present
//!
//! Unrecognized line indices are logged and skipped, never fatal: newer
//! writers may append lines this reader does not know about.

pub mod codec;
pub mod error;
pub mod lines;

pub use codec::{deserialize_account, serialize_account, ParsedAccount};
pub use error::{CodecError, CodecResult};
pub use lines::StateLineKind;
