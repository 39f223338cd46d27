//! File-backed flashcard sets.
//!
//! Each set lives in `<dir>/<name>.json` as a JSON array of cards. Names are
//! sanitized the same way on write and read, so `"My Set!"` and `"My_Set_"`
//! address the same set. Saving replaces the previous contents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use walkdir::WalkDir;

use crate::flashcard::Flashcard;

const EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("flashcard set not found: {0}")]
    NotFound(String),
    #[error("invalid set name: {0:?}")]
    InvalidName(String),
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored set {0} is corrupt: {1}")]
    Corrupt(String, #[source] serde_json::Error),
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

pub struct SetStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SetStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;
        info!("flashcard sets stored in {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Persist `cards` under the sanitized `name`, returning that name.
    pub async fn save(&self, name: &str, cards: &[Flashcard]) -> Result<String, StoreError> {
        let name = checked_name(name)?;
        let body = serde_json::to_vec_pretty(cards).map_err(|err| StoreError::Corrupt(name.clone(), err))?;

        let lock = self.lock_for(&name);
        let written = {
            let _guard = lock.lock().await;
            self.write_atomic(&name, &body).await
        };
        self.release_lock(&name, lock);
        written?;

        info!("saved {} flashcards to set {}", cards.len(), name);
        Ok(name)
    }

    async fn write_atomic(&self, name: &str, body: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(name);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    pub async fn load(&self, name: &str) -> Result<Vec<Flashcard>, StoreError> {
        let name = checked_name(name)?;
        let path = self.path_for(&name);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::NotFound(name)),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!("loaded set {} ({} bytes)", name, body.len());
        serde_json::from_slice(&body).map_err(|err| StoreError::Corrupt(name, err))
    }

    /// Names of all stored sets, sorted. The directory scan runs on the blocking pool.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || scan_dir(&dir))
            .await
            .map_err(|err| StoreError::Io {
                path: self.dir.clone(),
                source: std::io::Error::other(err),
            })?
    }

    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other save holds or waits on it.
    fn release_lock(&self, name: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(lock);
        if locks.get(name).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(name);
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

fn scan_dir(dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| StoreError::Io {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn checked_name(name: &str) -> Result<String, StoreError> {
    let sanitized = sanitize_name(name);
    if sanitized.is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(n: usize) -> Vec<Flashcard> {
        (0..n)
            .filter_map(|i| Flashcard::new(&format!("Question {i}?"), &format!("Answer {i}")))
            .collect()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_name("My Set!"), "My_Set_");
        assert_eq!(sanitize_name("bio-101_final"), "bio-101_final");
        assert_eq!(sanitize_name("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_name("Größe"), "Gr__e");
    }

    #[tokio::test]
    async fn test_round_trip_through_sanitized_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SetStore::open(dir.path())?;
        let saved = cards(3);

        let name = store.save("My Set!", &saved).await?;
        assert_eq!(name, "My_Set_");
        assert_eq!(store.load("My_Set_").await?, saved);
        assert_eq!(store.load("My Set!").await?, saved);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SetStore::open(dir.path())?;
        store.save("bio", &cards(5)).await?;
        store.save("bio", &cards(2)).await?;
        assert_eq!(store.load("bio").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_survives_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        SetStore::open(dir.path())?.save("chem", &cards(4)).await?;
        let reopened = SetStore::open(dir.path())?;
        assert_eq!(reopened.load("chem").await?, cards(4));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_sorted_and_ignores_other_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SetStore::open(dir.path())?;
        store.save("zoology", &cards(1)).await?;
        store.save("algebra", &cards(1)).await?;
        std::fs::write(dir.path().join("notes.txt"), "not a set")?;
        std::fs::create_dir(dir.path().join("nested.json"))?;

        assert_eq!(store.list().await?, vec!["algebra".to_string(), "zoology".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_and_invalid_names() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SetStore::open(dir.path())?;
        assert!(matches!(store.load("nothing").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.save("", &cards(1)).await, Err(StoreError::InvalidName(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_saves_to_one_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(SetStore::open(dir.path())?);

        let mut handles = Vec::new();
        for n in 1..=8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.save("shared", &cards(n * 10)).await }));
        }
        for handle in handles {
            handle.await??;
        }

        let loaded = store.load("shared").await?;
        assert_eq!(loaded.len() % 10, 0);
        assert_eq!(loaded, cards(loaded.len()));
        assert_eq!(store.tracked_locks(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_part_of_the_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SetStore::open(dir.path())?;

        assert_eq!(store.save(" My Set! ", &cards(1)).await?, "_My_Set__");
        assert_eq!(store.save("My Set", &cards(2)).await?, "My_Set");
        assert_eq!(store.save(" My Set", &cards(3)).await?, "_My_Set");

        assert_eq!(store.load("My Set").await?.len(), 2);
        assert_eq!(store.load(" My Set").await?.len(), 3);
        assert_eq!(store.list().await?.len(), 3);
        Ok(())
    }
}
