//! # File Durable Backend
//!
//! One JSON document per key:
//!
//! ```text
//! <root>/<hex(db_name)>/<hex(store_name)>/<hex(key)>.json
//! ```
//!
//! Names are hex-encoded so any string is a valid path component. Writes go
//! to a temp file that is renamed over the target, so a reader never sees a
//! partially written value.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use uuid::Uuid;

use super::backend::{DurableBackend, DurableStore};
use super::errors::{DurableError, DurableResult};
use crate::identity::Namespace;

const EXTENSION: &str = "json";

/// Opens partitions as directories under a root
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Backend storing partitions under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a namespace's entries
    pub fn partition_dir(&self, namespace: &Namespace) -> PathBuf {
        self.root
            .join(encode_component(&namespace.db_name))
            .join(encode_component(&namespace.store_name))
    }

    /// Keys stored in a namespace, sorted. A missing partition has no keys.
    pub async fn list_keys(&self, namespace: &Namespace) -> DurableResult<Vec<String>> {
        let dir = self.partition_dir(namespace);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_component)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl DurableBackend for FileBackend {
    async fn open(&self, namespace: &Namespace) -> DurableResult<Arc<dyn DurableStore>> {
        let dir = self.partition_dir(namespace);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DurableError::open_failed(namespace, e))?;
        Ok(Arc::new(FileStore { dir }))
    }
}

/// One namespace directory
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_component(key), EXTENSION))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> DurableResult<Option<Value>> {
        let bytes = match fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DurableError::read_failed(key, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| DurableError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    async fn put(&self, key: &str, value: &Value) -> DurableResult<()> {
        let target = self.path_for(key);
        // Unique per write so concurrent puts never share a temp file.
        let tmp = target.with_extension(format!("{}.{}.tmp", EXTENSION, Uuid::new_v4().simple()));
        let bytes =
            serde_json::to_vec(value).map_err(|e| DurableError::write_failed(key, e))?;

        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| DurableError::write_failed(key, e))?;
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(DurableError::write_failed(key, e));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> DurableResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DurableError::write_failed(key, e)),
        }
    }
}

fn encode_component(s: &str) -> String {
    s.bytes().map(|b| format!("{:02x}", b)).collect()
}

fn decode_component(s: &str) -> Option<String> {
    if s.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
