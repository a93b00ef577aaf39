use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::NamedTempFile;
use tessel_crypto::ContentHasher;
use tessel_types::{HashAlgorithm, ObjectHash};
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// Filesystem object store.
///
/// Objects live at `<root>/<algo>/<first two hex chars>/<remaining hex>`.
/// Writes go to a temp file in the shard directory and are renamed into
/// place, so a reader never observes a partially written object.
pub struct FsObjectStore {
    root: PathBuf,
    hasher: ContentHasher,
    physical_writes: AtomicU64,
}

impl FsObjectStore {
    /// Open (creating if needed) a SHA-256 store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_with_algorithm(root, HashAlgorithm::Sha256)
    }

    pub fn open_with_algorithm(root: impl Into<PathBuf>, algorithm: HashAlgorithm) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            hasher: ContentHasher::new(algorithm),
            physical_writes: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of `hash`.
    pub fn object_path(&self, hash: &ObjectHash) -> PathBuf {
        self.root
            .join(hash.algorithm().name())
            .join(hash.shard())
            .join(hash.shard_rest())
    }

    /// Number of `put` calls that actually wrote a file.
    pub fn physical_writes(&self) -> u64 {
        self.physical_writes.load(Ordering::Relaxed)
    }

    /// Every stored address, sorted. Stray files that are not valid
    /// addresses (e.g. leftover temp files) are skipped.
    pub fn all_hashes(&self) -> StoreResult<Vec<ObjectHash>> {
        let mut hashes = Vec::new();
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            let algo_dir = self.root.join(algorithm.name());
            for shard in read_dir_if_exists(&algo_dir)? {
                let shard = shard?;
                if !shard.file_type()?.is_dir() {
                    continue;
                }
                let prefix = shard.file_name().to_string_lossy().into_owned();
                for entry in fs::read_dir(shard.path())? {
                    let entry = entry?;
                    let rest = entry.file_name().to_string_lossy().into_owned();
                    match ObjectHash::parse(&format!("{}:{prefix}{rest}", algorithm.name())) {
                        Ok(hash) => hashes.push(hash),
                        Err(_) => trace!(path = %entry.path().display(), "skipping non-object file"),
                    }
                }
            }
        }
        hashes.sort();
        Ok(hashes)
    }
}

fn read_dir_if_exists(dir: &Path) -> io::Result<Box<dyn Iterator<Item = io::Result<fs::DirEntry>>>> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(Box::new(entries)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Box::new(std::iter::empty())),
        Err(e) => Err(e),
    }
}

impl ObjectStore for FsObjectStore {
    fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    fn put(&self, data: &[u8]) -> StoreResult<ObjectHash> {
        let hash = self.hasher.hash(data);
        let path = self.object_path(&hash);
        if path.exists() {
            trace!(object = %hash, "object already stored");
            return Ok(hash);
        }

        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "object path has no parent"))?;
        fs::create_dir_all(dir)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        // Another writer may have won the race; identical bytes, so either is fine.
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        self.physical_writes.fetch_add(1, Ordering::Relaxed);
        debug!(object = %hash, bytes = data.len(), "object written");
        Ok(hash)
    }

    fn get(&self, hash: &ObjectHash) -> StoreResult<Vec<u8>> {
        let data = match fs::read(self.object_path(hash)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound(*hash)),
            Err(e) => return Err(e.into()),
        };
        if !ContentHasher::verify(&data, hash) {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed: ContentHasher::new(hash.algorithm()).hash(&data),
            });
        }
        Ok(data)
    }

    fn contains(&self, hash: &ObjectHash) -> StoreResult<bool> {
        Ok(self.object_path(hash).is_file())
    }
}

impl std::fmt::Debug for FsObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsObjectStore")
            .field("root", &self.root)
            .field("algorithm", &self.algorithm())
            .finish()
    }
}
