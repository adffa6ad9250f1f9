//! File-backed respondent store.
//!
//! Persists a flat JSON object of string values. Every write replaces the file
//! atomically (temp file, fsync, rename) while holding an exclusive lock file.

use async_trait::async_trait;
use curio_core::error::{CurioError, Result};
use curio_core::state::RespondentStore;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::paths::CurioPaths;

type StateMap = BTreeMap<String, String>;

/// Respondent store persisted to a JSON file.
///
/// Reads are served from a cache filled on open and refreshed by every write.
#[derive(Clone)]
pub struct FileRespondentStore {
    path: Arc<PathBuf>,
    cache: Arc<Mutex<StateMap>>,
}

impl FileRespondentStore {
    /// Opens the store at the default location (`~/.config/curio/respondent_state.json`).
    pub async fn open_default() -> Result<Self> {
        Self::open(CurioPaths::state_file()?).await
    }

    /// Opens the store at `path`. A missing or empty file is an empty store.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let initial = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || load_map(&path))
                .await
                .map_err(|e| CurioError::internal(format!("Failed to join task: {}", e)))??
        };

        tracing::debug!(path = %path.display(), entries = initial.len(), "opened respondent store");

        Ok(Self {
            path: Arc::new(path),
            cache: Arc::new(Mutex::new(initial)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file, applies `change`, and writes it back under one lock.
    ///
    /// The cache is replaced with what was written, so keys set by other
    /// handles on the same file are kept.
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut StateMap) + Send + 'static,
    {
        let mut cache = self.cache.lock().await;
        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || {
            let _lock = FileLock::acquire(&path)?;
            let mut map = load_map(&path)?;
            change(&mut map);
            write_atomically(&path, &map)?;
            Ok::<_, CurioError>(map)
        })
        .await
        .map_err(|e| CurioError::internal(format!("Failed to join task: {}", e)))??;
        *cache = written;
        Ok(())
    }
}

#[async_trait]
impl RespondentStore for FileRespondentStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.update(move |map| {
            map.insert(key, value);
        })
        .await
    }
}

fn load_map(path: &Path) -> Result<StateMap> {
    if !path.exists() {
        return Ok(StateMap::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(StateMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_atomically(path: &Path, map: &StateMap) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CurioError::io(format!("{} has no parent directory", path.display())))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| CurioError::io(format!("{} has no file name", path.display())))?;
    fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Exclusive lock on `<state file>.lock`, released on drop.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| CurioError::io(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
