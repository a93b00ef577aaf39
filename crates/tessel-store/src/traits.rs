use std::sync::Arc;

use tessel_types::{HashAlgorithm, ObjectHash};

use crate::error::StoreResult;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; there is no update or delete.
/// - `put` is idempotent: identical bytes yield the same address and at most
///   one physical write.
/// - `get` verifies the stored bytes against their address before returning.
/// - A missing object is [`StoreError::NotFound`](crate::StoreError::NotFound),
///   never a generic I/O error.
/// - Concurrent readers and writers are always safe.
pub trait ObjectStore: Send + Sync {
    /// Algorithm used to address newly written objects.
    fn algorithm(&self) -> HashAlgorithm;

    /// Store `data` and return its content address.
    fn put(&self, data: &[u8]) -> StoreResult<ObjectHash>;

    /// Fetch the bytes stored under `hash`.
    fn get(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>>;

    /// Check whether an object exists.
    fn contains(&self, hash: &ObjectHash) -> StoreResult<bool>;

    /// Store several objects. Default implementation calls `put()` for each.
    fn put_batch(&self, objects: &[&[u8]]) -> StoreResult<Vec<ObjectHash>> {
        objects.iter().map(|data| self.put(data)).collect()
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn algorithm(&self) -> HashAlgorithm {
        (**self).algorithm()
    }

    fn put(&self, data: &[u8]) -> StoreResult<ObjectHash> {
        (**self).put(data)
    }

    fn get(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>> {
        (**self).get(hash)
    }

    fn contains(&self, hash: &ObjectHash) -> StoreResult<bool> {
        (**self).contains(hash)
    }
}
