use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tessel_crypto::ContentHasher;
use tessel_types::{HashAlgorithm, ObjectHash};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock` and
/// cloned on read.
pub struct InMemoryObjectStore {
    hasher: ContentHasher,
    objects: RwLock<HashMap<ObjectHash, Vec<u8>>>,
    physical_writes: AtomicU64,
}

impl InMemoryObjectStore {
    /// Create an empty SHA-256 store.
    pub fn new() -> Self {
        Self::with_algorithm(HashAlgorithm::Sha256)
    }

    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            hasher: ContentHasher::new(algorithm),
            objects: RwLock::new(HashMap::new()),
            physical_writes: AtomicU64::new(0),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of `put` calls that actually stored new bytes.
    pub fn physical_writes(&self) -> u64 {
        self.physical_writes.load(Ordering::Relaxed)
    }

    /// Sorted list of every stored address.
    pub fn all_hashes(&self) -> Vec<ObjectHash> {
        let map = self.objects.read().expect("lock poisoned");
        let mut hashes: Vec<ObjectHash> = map.keys().copied().collect();
        hashes.sort();
        hashes
    }

    /// Overwrite stored bytes without rehashing. Test hook for corruption.
    #[cfg(test)]
    fn corrupt(&self, hash: &ObjectHash, data: &[u8]) {
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(*hash, data.to_vec());
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    fn put(&self, data: &[u8]) -> StoreResult<ObjectHash> {
        let hash = self.hasher.hash(data);
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(hash).or_insert_with(|| {
            self.physical_writes.fetch_add(1, Ordering::Relaxed);
            data.to_vec()
        });
        Ok(hash)
    }

    fn get(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>> {
        let map = self.objects.read().expect("lock poisoned");
        let data = map.get(hash).ok_or(StoreError::NotFound(*hash))?;
        if !ContentHasher::verify(data, hash) {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed: ContentHasher::new(hash.algorithm()).hash(data),
            });
        }
        Ok(data.clone())
    }

    fn contains(&self, hash: &ObjectHash) -> StoreResult<bool> {
        Ok(self.objects.read().expect("lock poisoned").contains_key(hash))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("algorithm", &self.algorithm())
            .field("object_count", &self.len())
            .finish()
    }
}
