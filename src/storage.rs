//! Key-value persistence adapter.
//!
//! Mirrors a browser-local storage layout on disk: each key maps to one
//! JSON file inside the data directory (`tasks.json`, `categories.json`,
//! `color_theme.json`). Reads fall back to a caller-supplied default when
//! the file is absent or unparseable; writes are unconditional and
//! atomic-ish via temp file + rename.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Storage key holding the serialized task collection.
pub const KEY_TASKS: &str = "tasks";
/// Storage key holding the serialized category names.
pub const KEY_CATEGORIES: &str = "categories";
/// Storage key holding the display theme string, consumed by an external
/// theming collaborator.
pub const KEY_THEME: &str = "color_theme";

/// File-backed key-value storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Storage { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// True when the key has a persisted value on disk.
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    /// Read and deserialize a key, falling back to `default` when the file
    /// is missing or its contents cannot be parsed. No partial recovery of
    /// a corrupt record is attempted.
    pub fn load<T, F>(&self, key: &str, default: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        let path = self.path_for(key);
        if !path.exists() {
            return default();
        }
        let mut buf = String::new();
        match File::open(&path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(v) => v,
                Err(e) => {
                    warn!(key, error = %e, "unparseable storage value, using default");
                    default()
                }
            },
            Err(e) => {
                warn!(key, error = %e, "unreadable storage file, using default");
                default()
            }
        }
    }

    /// Serialize and write a key unconditionally. Write failures propagate
    /// to the caller; there is no retry or rollback.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
