use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;

/// Keyed blob persistence. A key that was never saved loads as
/// `T::default()`.
pub trait BlobStore {
    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> anyhow::Result<T>;

    async fn save<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()>;

    /// Removing a missing key is not an error.
    async fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// One pretty-printed JSON file per key: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for JsonFileStore {
    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> anyhow::Result<T> {
        let path = self.path(key);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, using empty default", path.display());
                return Ok(T::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        serde_json::from_str(&text).with_context(|| format!("corrupt data in {}", path.display()))
    }

    async fn save<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let path = self.path(key);
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("failed to serialize {}", key))?;

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!("saved {}", path.display());
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
pub use memory::MemoryStore;
