//! Content-addressed object storage for Tessel.
//!
//! Segments and snapshots are immutable byte blobs addressed by the hash of
//! their exact bytes (`"sha256:<hex>"`). The store only grows: there is no
//! update or delete, and `put` of bytes already present is a no-op.
//!
//! - [`ObjectStore`]: the storage trait
//! - [`InMemoryObjectStore`]: HashMap-backed store for tests and embedding
//! - [`FsObjectStore`]: hash-prefix sharded directory tree with atomic writes

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
