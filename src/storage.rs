// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! String-keyed persistence for the routing table.

use crate::error::RouterError;
use rustc_hash::FxHashMap;
use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// A tiny get/set store. The router only ever uses one key.
pub trait KeyValueStore: core::fmt::Debug + Send {
    /// Returns the value under `key`, or `None` if nothing was ever stored.
    fn get(&self, key: &str) -> Result<Option<String>, RouterError>;

    /// Replaces the value under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), RouterError>;
}

/// Keeps everything in memory. Forgets it all on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: FxHashMap<String, String>,
}
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, RouterError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RouterError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keeps a JSON object of key/value strings in a single file.
///
/// Every `set()` rewrites the whole file. That's fine for a handful of
/// routes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}
impl FileStore {
    /// Creates a store backed by the file at `path`. The file need not exist
    /// yet.
    pub fn new_with(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    #[allow(missing_docs)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load(&self) -> Result<FxHashMap<String, String>, RouterError> {
        if !self.path.exists() {
            return Ok(Default::default());
        }
        let mut contents = String::new();
        File::open(&self.path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|e| RouterError::Storage(format!("couldn't read {:?}: {e}", self.path)))?;
        if contents.trim().is_empty() {
            return Ok(Default::default());
        }
        serde_json::from_str(&contents)
            .map_err(|e| RouterError::Storage(format!("couldn't parse {:?}: {e}", self.path)))
    }
}
impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, RouterError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), RouterError> {
        // A corrupt file shouldn't block saving new routes over it.
        let mut values = self.load().unwrap_or_else(|e| {
            log::warn!("{e}; starting over");
            Default::default()
        });
        values.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&values)
            .map_err(|e| RouterError::Storage(format!("couldn't serialize: {e}")))?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                RouterError::Storage(format!("couldn't create {dir:?}: {e}"))
            })?;
        }

        // Write beside the target, then rename over it, so a crash mid-write
        // leaves the old routes in place.
        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)
            .map_err(|e| RouterError::Storage(format!("couldn't create {temp_path:?}: {e}")))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| RouterError::Storage(format!("couldn't write {temp_path:?}: {e}")))?;
        drop(file);
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            RouterError::Storage(format!("couldn't replace {:?}: {e}", self.path))
        })
    }
}
