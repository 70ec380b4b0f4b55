//! Storage collaborators handed to the pipeline.
//!
//! [`TileSource`] reads per-tile detected-tree records and shading CSVs.
//! [`OutputSink`] persists per-tile results. Both are passed explicitly
//! so the pipeline holds no global clients.
//!
//! Input layout, relative to the source root:
//!
//! ```text
//! {tile}/{year}/JSON_TreeData_{tile}/*.json
//! {tile}/{year}/Shading_Metrics_{tile}/Shading_Metric_{tile}_Tree_ID_{tree_count_id}.csv
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Errors from storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O failure for a key.
    #[error("Storage I/O error for {key}: {source}")]
    Io {
        /// Key or path being accessed.
        key: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Key does not exist.
    #[error("Storage key not found: {key}")]
    NotFound {
        /// Missing key.
        key: String,
    },
}

/// Key prefix holding a tile's detected-tree JSON records.
#[must_use]
pub fn tree_data_prefix(tile_id: &str, year: &str) -> String {
    format!("{tile_id}/{year}/JSON_TreeData_{tile_id}")
}

/// Key of one tree's shading CSV.
#[must_use]
pub fn shade_csv_key(tile_id: &str, year: &str, tree_count_id: i64) -> String {
    format!(
        "{tile_id}/{year}/Shading_Metrics_{tile_id}/Shading_Metric_{tile_id}_Tree_ID_{tree_count_id}.csv"
    )
}

/// Read access to per-tile inputs.
pub trait TileSource {
    /// Lists all tile ids, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the listing fails.
    fn list_tiles(&self) -> Result<Vec<String>, StorageError>;

    /// Lists the keys of a tile's detected-tree records, sorted.
    ///
    /// Returns `Ok(None)` when the tile has no record directory at all.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the listing fails.
    fn tree_record_keys(&self, tile_id: &str) -> Result<Option<Vec<String>>, StorageError>;

    /// Reads one record by key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the key cannot be read.
    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Reads a tree's shading CSV, `Ok(None)` if the tree has none.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file exists but cannot be read.
    fn read_shade_csv(
        &self,
        tile_id: &str,
        tree_count_id: i64,
    ) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Write access for per-tile outputs.
pub trait OutputSink {
    /// Whether an output named `name` already exists.
    fn exists(&self, name: &str) -> bool;

    /// Persists `bytes` under `name`. Readers never observe a partially
    /// written output.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write fails.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// [`TileSource`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalTileSource {
    root: PathBuf,
    year: String,
}

impl LocalTileSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, year: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            year: year.into(),
        }
    }
}

fn io_error(key: impl Into<String>) -> impl FnOnce(std::io::Error) -> StorageError {
    let key = key.into();
    move |source| StorageError::Io { key, source }
}

impl TileSource for LocalTileSource {
    fn list_tiles(&self) -> Result<Vec<String>, StorageError> {
        let root = self.root.display().to_string();
        let mut tiles = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(io_error(root.clone()))? {
            let entry = entry.map_err(io_error(root.clone()))?;
            if entry.path().is_dir() {
                tiles.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        tiles.sort();
        Ok(tiles)
    }

    fn tree_record_keys(&self, tile_id: &str) -> Result<Option<Vec<String>>, StorageError> {
        let prefix = tree_data_prefix(tile_id, &self.year);
        let dir = self.root.join(&prefix);
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_error(prefix.clone()))? {
            let name = entry
                .map_err(io_error(prefix.clone()))?
                .file_name()
                .to_string_lossy()
                .into_owned();
            if name.ends_with(".json") {
                keys.push(format!("{prefix}/{name}"));
            }
        }
        keys.sort();
        Ok(Some(keys))
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        std::fs::read(self.root.join(key)).map_err(io_error(key))
    }

    fn read_shade_csv(
        &self,
        tile_id: &str,
        tree_count_id: i64,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let key = shade_csv_key(tile_id, &self.year, tree_count_id);
        let path = self.root.join(&key);
        if !path.is_file() {
            return Ok(None);
        }
        std::fs::read(path).map(Some).map_err(io_error(key))
    }
}

/// [`OutputSink`] writing files into a local directory.
///
/// Writes go to a `.tmp` sibling first and are renamed into place.
#[derive(Debug, Clone)]
pub struct LocalOutputSink {
    dir: PathBuf,
}

impl LocalOutputSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl OutputSink for LocalOutputSink {
    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(self.dir.display().to_string()))?;

        let path = self.path_for(name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));
        std::fs::write(&tmp_path, bytes).map_err(io_error(name))?;
        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            std::fs::remove_file(&tmp_path).ok();
            return Err(io_error(name)(e));
        }
        Ok(())
    }
}

/// In-memory storage implementing both [`TileSource`] and [`OutputSink`].
///
/// Inputs live under the same key layout as [`LocalTileSource`]; outputs
/// are kept in a separate namespace.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    year: String,
    inputs: BTreeMap<String, Vec<u8>>,
    outputs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            ..Self::default()
        }
    }

    /// Adds a detected-tree record file to a tile.
    pub fn put_tree_record(&mut self, tile_id: &str, file_name: &str, bytes: impl Into<Vec<u8>>) {
        let key = format!("{}/{file_name}", tree_data_prefix(tile_id, &self.year));
        self.inputs.insert(key, bytes.into());
    }

    /// Adds a tree's shading CSV.
    pub fn put_shade_csv(&mut self, tile_id: &str, tree_count_id: i64, bytes: impl Into<Vec<u8>>) {
        self.inputs
            .insert(shade_csv_key(tile_id, &self.year, tree_count_id), bytes.into());
    }

    /// Returns a copy of a written output.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<Vec<u8>> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all written outputs, sorted.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl TileSource for MemoryStorage {
    fn list_tiles(&self) -> Result<Vec<String>, StorageError> {
        let mut tiles: Vec<String> = self
            .inputs
            .keys()
            .filter_map(|k| k.split('/').next())
            .map(str::to_string)
            .collect();
        tiles.dedup();
        Ok(tiles)
    }

    fn tree_record_keys(&self, tile_id: &str) -> Result<Option<Vec<String>>, StorageError> {
        let prefix = format!("{}/", tree_data_prefix(tile_id, &self.year));
        let keys: Vec<String> = self
            .inputs
            .keys()
            .filter(|k| k.starts_with(&prefix) && k.ends_with(".json"))
            .cloned()
            .collect();
        Ok(if keys.is_empty() { None } else { Some(keys) })
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inputs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    fn read_shade_csv(
        &self,
        tile_id: &str,
        tree_count_id: i64,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .inputs
            .get(&shade_csv_key(tile_id, &self.year, tree_count_id))
            .cloned())
    }
}

impl OutputSink for MemoryStorage {
    fn exists(&self, name: &str) -> bool {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_key_matches_simulation_layout() {
        assert_eq!(
            shade_csv_key("987185", "2017", 42),
            "987185/2017/Shading_Metrics_987185/Shading_Metric_987185_Tree_ID_42.csv"
        );
    }

    #[test]
    fn memory_storage_lists_tiles_and_records() {
        let mut storage = MemoryStorage::new("2017");
        storage.put_tree_record("20", "b.json", "{}");
        storage.put_tree_record("10", "a.json", "{}");
        storage.put_tree_record("10", "c.json", "{}");
        storage.put_shade_csv("10", 1, "csv");

        assert_eq!(storage.list_tiles().unwrap(), vec!["10", "20"]);
        let keys = storage.tree_record_keys("10").unwrap().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(storage.tree_record_keys("30").unwrap().is_none());
        assert_eq!(storage.read_shade_csv("10", 1).unwrap().unwrap(), b"csv");
        assert!(storage.read_shade_csv("10", 2).unwrap().is_none());
    }

    #[test]
    fn local_storage_round_trips_through_filesystem() {
        let tmp = std::env::temp_dir().join("treefolio_local_storage_test");
        let _ = std::fs::remove_dir_all(&tmp);

        let input = tmp.join("input");
        let records = input.join(tree_data_prefix("555", "2017"));
        std::fs::create_dir_all(&records).unwrap();
        std::fs::write(records.join("1.json"), "{}").unwrap();
        std::fs::write(records.join("readme.txt"), "ignored").unwrap();
        std::fs::create_dir_all(input.join("555/2017/Shading_Metrics_555")).unwrap();
        std::fs::write(input.join(shade_csv_key("555", "2017", 1)), "a,b").unwrap();

        let source = LocalTileSource::new(&input, "2017");
        assert_eq!(source.list_tiles().unwrap(), vec!["555"]);
        let keys = source.tree_record_keys("555").unwrap().unwrap();
        assert_eq!(keys, vec!["555/2017/JSON_TreeData_555/1.json"]);
        assert_eq!(source.read(&keys[0]).unwrap(), b"{}");
        assert_eq!(source.read_shade_csv("555", 1).unwrap().unwrap(), b"a,b");
        assert!(source.read_shade_csv("555", 2).unwrap().is_none());
        assert!(source.tree_record_keys("556").unwrap().is_none());

        let sink = LocalOutputSink::new(tmp.join("out"));
        assert!(!sink.exists("MatchedTrees_555.geojson"));
        sink.write("MatchedTrees_555.geojson", b"{}").unwrap();
        assert!(sink.exists("MatchedTrees_555.geojson"));
        assert!(!sink.path_for("MatchedTrees_555.geojson.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_rename_removes_temporary_file() {
        let tmp = std::env::temp_dir().join("treefolio_failed_rename_test");
        let _ = std::fs::remove_dir_all(&tmp);

        let sink = LocalOutputSink::new(&tmp);
        // A non-empty directory at the target path makes the rename fail.
        let target = sink.path_for("MatchedTrees_555.geojson");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = sink.write("MatchedTrees_555.geojson", b"{}").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
        assert!(!sink.path_for("MatchedTrees_555.geojson.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
