//! Storage: plain-text persistence behind a small trait.
//!
//! Evaluation records, the RAG index and the draft documents are all plain
//! text files. Every read/write in the evaluation loop goes through
//! `Storage`, so the indexer and orchestrator can run against
//! `MemoryStorage` in tests and `FsStorage` in production.

#[cfg(test)]
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use walkdir::WalkDir;

/// File suffix that marks a persisted evaluation record.
pub const EVALUATION_SUFFIX: &str = ".evaluation.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Index file {path} is corrupt: {source}")]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage walk failed under {root}: {message}")]
    Walk { root: PathBuf, message: String },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Lists every evaluation record under `root`, sorted by path.
    async fn list_records(&self, root: &Path) -> Result<Vec<PathBuf>, StorageError>;

    /// Reads a text file. A missing file is `Ok(None)`, not an error.
    async fn read(&self, path: &Path) -> Result<Option<String>, StorageError>;

    /// Writes a text file, creating parent directories as needed.
    async fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError>;
}

fn is_evaluation_record(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(EVALUATION_SUFFIX))
        .unwrap_or(false)
}

// ────────────────────────────────────────────────────────────────────────────
// FsStorage
// ────────────────────────────────────────────────────────────────────────────

/// Local filesystem storage.
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

#[async_trait]
impl Storage for FsStorage {
    async fn list_records(&self, root: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let root = root.to_path_buf();
        let walk_root = root.clone();

        let listed = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, StorageError> {
            if !walk_root.exists() {
                return Ok(Vec::new());
            }

            let mut records = Vec::new();
            for entry in WalkDir::new(&walk_root).sort_by_file_name() {
                let entry = entry.map_err(|e| StorageError::Walk {
                    root: walk_root.clone(),
                    message: e.to_string(),
                })?;
                if entry.file_type().is_file() && is_evaluation_record(entry.path()) {
                    records.push(entry.into_path());
                }
            }
            Ok(records)
        })
        .await
        .map_err(|e| StorageError::Walk {
            root,
            message: format!("walk task failed: {e}"),
        })??;

        Ok(listed)
    }

    async fn read(&self, path: &Path) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io(parent, e))?;
            }
        }
        // Readers only ever see the old or the new contents, never a torn file.
        let staging = staging_path(path);
        if let Err(e) = tokio::fs::write(&staging, contents).await {
            return Err(StorageError::io(&staging, e));
        }
        if let Err(e) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StorageError::io(path, e));
        }
        Ok(())
    }
}

/// Hidden sibling of `path`, unique per write.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryStorage
// ────────────────────────────────────────────────────────────────────────────

/// In-memory storage keyed by path, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a single file, for assertions.
    pub fn get(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .ok()
            .and_then(|files| files.get(path).cloned())
    }

    pub fn len(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[async_trait]
impl Storage for MemoryStorage {
    async fn list_records(&self, root: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let files = self.files.lock().map_err(|_| StorageError::Walk {
            root: root.to_path_buf(),
            message: "memory storage lock poisoned".to_string(),
        })?;
        // BTreeMap keys are already sorted.
        Ok(files
            .keys()
            .filter(|p| p.starts_with(root) && is_evaluation_record(p))
            .cloned()
            .collect())
    }

    async fn read(&self, path: &Path) -> Result<Option<String>, StorageError> {
        let files = self.files.lock().map_err(|_| StorageError::Walk {
            root: path.to_path_buf(),
            message: "memory storage lock poisoned".to_string(),
        })?;
        Ok(files.get(path).cloned())
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        let mut files = self.files.lock().map_err(|_| StorageError::Walk {
            root: path.to_path_buf(),
            message: "memory storage lock poisoned".to_string(),
        })?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_evaluation_record_suffix() {
        assert!(is_evaluation_record(Path::new(
            "/apps/acme/acme-cto-20250101T000000.evaluation.json"
        )));
        assert!(!is_evaluation_record(Path::new("/apps/.rag-index.json")));
        assert!(!is_evaluation_record(Path::new("/apps/acme/resume.md")));
    }

    #[tokio::test]
    async fn test_memory_storage_missing_file_is_none() {
        let storage = MemoryStorage::new();
        let read = storage.read(Path::new("/nope.txt")).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_memory_storage_lists_only_records_under_root() {
        let storage = MemoryStorage::new();
        storage
            .write(Path::new("/root/b/b.evaluation.json"), "{}")
            .await
            .unwrap();
        storage
            .write(Path::new("/root/a/a.evaluation.json"), "{}")
            .await
            .unwrap();
        storage
            .write(Path::new("/root/.rag-index.json"), "{}")
            .await
            .unwrap();
        storage
            .write(Path::new("/other/c.evaluation.json"), "{}")
            .await
            .unwrap();

        let records = storage.list_records(Path::new("/root")).await.unwrap();
        assert_eq!(
            records,
            vec![
                PathBuf::from("/root/a/a.evaluation.json"),
                PathBuf::from("/root/b/b.evaluation.json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fs_storage_roundtrip_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage;

        let record = dir.path().join("acme").join("acme-cto.evaluation.json");
        storage.write(&record, "{\"ok\":true}").await.unwrap();
        storage
            .write(&dir.path().join("acme").join("resume.md"), "# Resume")
            .await
            .unwrap();

        assert_eq!(
            storage.read(&record).await.unwrap().as_deref(),
            Some("{\"ok\":true}")
        );
        let records = storage.list_records(dir.path()).await.unwrap();
        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn test_fs_storage_overwrite_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join(".rag-index.json");

        FsStorage.write(&index, "{\"v\":1}").await.unwrap();
        FsStorage.write(&index, "{\"v\":2}").await.unwrap();

        assert_eq!(
            FsStorage.read(&index).await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![".rag-index.json".to_string()]);
    }

    #[tokio::test]
    async fn test_fs_storage_concurrent_writes_never_tear() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join(".rag-index.json");
        let big_a = "a".repeat(256 * 1024);
        let big_b = "b".repeat(256 * 1024);

        let writes = (0..8).map(|i| {
            let index = index.clone();
            let body = if i % 2 == 0 { big_a.clone() } else { big_b.clone() };
            tokio::spawn(async move { FsStorage.write(&index, &body).await })
        });
        for w in writes {
            w.await.unwrap().unwrap();
        }

        let text = FsStorage.read(&index).await.unwrap().unwrap();
        assert!(text == big_a || text == big_b);
    }

    #[tokio::test]
    async fn test_fs_storage_missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let records = FsStorage
            .list_records(&dir.path().join("does-not-exist"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }
}
