use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tessel_types::{ObjectHash, SpaceId, TileId};
use tracing::trace;

use crate::catalog::TileCatalog;
use crate::error::TileResult;
use crate::index::TileIndex;
use crate::layout::{parse_snapshot_file_name, TileKey, TileLayout};
use crate::manifest::Manifest;

/// Filesystem implementation of [`TileCatalog`] over a [`TileLayout`].
///
/// Index and manifest are JSON files replaced by write-to-temp then rename,
/// so a reader never sees a partial write.
#[derive(Clone, Debug)]
pub struct FsTileCatalog {
    layout: TileLayout,
}

impl FsTileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: TileLayout::new(root),
        }
    }

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }
}

/// Write `data` to a temp file beside `path`, fsync it, then rename over.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"))?;
    fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> TileResult<()> {
    let data = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &data)?;
    trace!(path = %path.display(), bytes = data.len(), "replaced");
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> TileResult<Option<T>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_dir_names(dir: &Path) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for entry in entries {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

impl TileCatalog for FsTileCatalog {
    fn read_index(&self, key: &TileKey) -> TileResult<Option<TileIndex>> {
        read_json(&self.layout.index_path(key))
    }

    fn write_index(&self, key: &TileKey, index: &TileIndex) -> TileResult<()> {
        write_json(&self.layout.index_path(key), index)
    }

    fn read_manifest(&self, key: &TileKey) -> TileResult<Manifest> {
        Ok(read_json(&self.layout.manifest_path(key))?.unwrap_or_default())
    }

    fn write_manifest(&self, key: &TileKey, manifest: &Manifest) -> TileResult<()> {
        write_json(&self.layout.manifest_path(key), manifest)
    }

    fn put_snapshot(&self, key: &TileKey, hash: &ObjectHash, bytes: &[u8]) -> TileResult<()> {
        let path = self.layout.snapshot_path(key, hash);
        if path.exists() {
            return Ok(());
        }
        atomic_write(&path, bytes)?;
        Ok(())
    }

    fn list_snapshots(&self, key: &TileKey) -> TileResult<Vec<ObjectHash>> {
        let mut hashes: Vec<ObjectHash> = read_dir_names(&self.layout.snapshots_dir(key))?
            .iter()
            .filter_map(|name| parse_snapshot_file_name(name))
            .collect();
        hashes.sort();
        Ok(hashes)
    }

    fn list_tiles(&self, space: &SpaceId) -> TileResult<Vec<TileId>> {
        let tiles_dir = self.layout.tiles_dir(space);
        let mut tiles: Vec<TileId> = read_dir_names(&tiles_dir)?
            .into_iter()
            .filter(|name| tiles_dir.join(name).join(TileLayout::INDEX_FILE).is_file())
            .map(TileId::from)
            .collect();
        tiles.sort();
        Ok(tiles)
    }
}
