use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Durable client-side key-value store, one JSON object per file.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl LocalStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            return Ok(Self { path, items: BTreeMap::new() });
        }

        let content = fs::read_to_string(&path)?;
        let items: BTreeMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self { path, items })
    }

    /// Like [`open`](Self::open), but an unreadable file starts an empty store.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(storage) => storage,
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable storage file: {}", e);
                Self { path, items: BTreeMap::new() }
            }
        }
    }

    pub fn default_location() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ws-chat").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Store a value and write the whole map back to disk.
    pub fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.items)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
