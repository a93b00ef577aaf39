use std::fmt;
use std::path::{Path, PathBuf};

use tessel_types::{HashAlgorithm, ObjectHash, SpaceId, TileId};

/// Partition key of one append log.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub space: SpaceId,
    pub tile: TileId,
}

impl TileKey {
    pub fn new(space: impl Into<SpaceId>, tile: impl Into<TileId>) -> Self {
        Self {
            space: space.into(),
            tile: tile.into(),
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.space, self.tile)
    }
}

/// On-disk layout of the tile hierarchy:
///
/// ```text
/// <root>/spaces/<space_id>/tiles/<tile_id>/index.json
///                                         /manifest.json
///                                         /snapshots/<algo>-<hex>.json
/// ```
///
/// Segments are not stored here; they live in the shared object store.
#[derive(Clone, Debug)]
pub struct TileLayout {
    root: PathBuf,
}

impl TileLayout {
    pub const INDEX_FILE: &'static str = "index.json";
    pub const MANIFEST_FILE: &'static str = "manifest.json";
    pub const SNAPSHOTS_DIR: &'static str = "snapshots";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tiles_dir(&self, space: &SpaceId) -> PathBuf {
        self.root.join("spaces").join(space.as_str()).join("tiles")
    }

    pub fn tile_dir(&self, key: &TileKey) -> PathBuf {
        self.tiles_dir(&key.space).join(key.tile.as_str())
    }

    pub fn index_path(&self, key: &TileKey) -> PathBuf {
        self.tile_dir(key).join(Self::INDEX_FILE)
    }

    pub fn manifest_path(&self, key: &TileKey) -> PathBuf {
        self.tile_dir(key).join(Self::MANIFEST_FILE)
    }

    pub fn snapshots_dir(&self, key: &TileKey) -> PathBuf {
        self.tile_dir(key).join(Self::SNAPSHOTS_DIR)
    }

    /// `:` is not portable in file names, so the address is written as
    /// `<algo>-<hex>.json`.
    pub fn snapshot_path(&self, key: &TileKey, hash: &ObjectHash) -> PathBuf {
        self.snapshots_dir(key).join(snapshot_file_name(hash))
    }
}

pub(crate) fn snapshot_file_name(hash: &ObjectHash) -> String {
    format!("{}-{}.json", hash.algorithm().name(), hash.to_hex())
}

pub(crate) fn parse_snapshot_file_name(name: &str) -> Option<ObjectHash> {
    let stem = name.strip_suffix(".json")?;
    let (algo, hex) = stem.split_once('-')?;
    let algorithm: HashAlgorithm = algo.parse().ok()?;
    ObjectHash::parse(&format!("{}:{hex}", algorithm.name())).ok()
}
