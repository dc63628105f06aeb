//! Reference-counted pool of location-scoped caches.
//!
//! Several components may open the same workspace location at once; each
//! needs a bounded cache scoped to that location, and all of them should
//! share one underlying instance. The pool guarantees at most one live
//! [`LocationCache`] per location key: acquisitions within a cache's
//! lifetime share it, and the instance is destroyed exactly when the last
//! reference is released.
//!
//! Acquisition and release for one location are serialized (no lost
//! refcount updates); operations on different locations do not contend.

pub mod cache;
pub mod pool;

pub use cache::LocationCache;
pub use pool::{CachePool, PoolStats};
