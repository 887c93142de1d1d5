//! Durable per-file project storage. Keys come from
//! [`ProjectKey::file_key`](sandpad_preview::ProjectKey::file_key); last write
//! wins.

use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sandpad_preview::registry::lookup;
use sandpad_preview::{FileLanguage, ProjectKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub content: String,
    pub language: FileLanguage,
    pub updated_at: DateTime<Utc>,
}

pub trait ProjectStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<StoredFile>>;
    fn set(&self, key: &str, content: &str, language: FileLanguage) -> StoreResult<()>;
}

/// Process-local store, shared between sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredFile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProjectStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredFile>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn set(&self, key: &str, content: &str, language: FileLanguage) -> StoreResult<()> {
        self.entries.insert(
            key.to_string(),
            StoredFile {
                content: content.to_string(),
                language,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// One JSON document per key under `root`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.resolved_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name for `key`: the readable part of the key plus a hash suffix,
    /// so distinct keys never collide after sanitizing.
    fn path_for(&self, key: &str) -> PathBuf {
        let readable: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .take(96)
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.root.join(format!("{}-{}.json", readable, &digest[..12]))
    }
}

impl ProjectStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredFile>> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn set(&self, key: &str, content: &str, language: FileLanguage) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.root).map_err(io_err)?;
        let entry = StoredFile {
            content: content.to_string(),
            language,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&entry).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        // Write then rename so a reader never sees a half-written entry.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

/// Save `content` as the file `name` of the project under `key`, tagged with
/// the language its preset gives that file. Unknown presets and file names
/// are rejected.
pub fn save_preset_file(
    store: &dyn ProjectStore,
    key: &ProjectKey,
    name: &str,
    content: &str,
) -> StoreResult<FileLanguage> {
    let spec = lookup(&key.preset_id)?.file_spec(name)?;
    store.set(&key.file_key(name), content, spec.language)?;
    Ok(spec.language)
}
