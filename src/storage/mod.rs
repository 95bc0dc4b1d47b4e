//! # Storage Module - Game State Persistence
//!
//! Each launched game keeps one JSON blob on disk:
//!
//! ```text
//! data/
//! ├── game_emote-memory.json
//! ├── game_gamba-light.json
//! └── game_number-guess.json
//! ```
//!
//! The blob is opaque here (the engine decides its shape). Writes go to a
//! temp file in the same directory and are renamed over the target while an
//! exclusive `fs2` lock is held on a sidecar `.lock` file, so a crash never
//! leaves a half-written save behind. Reads take the shared lock.
//!
//! Callers treat failures as non-fatal: log, keep playing with in-memory state.

use fs2::FileExt;
use log::{debug, trace};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in saved game: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid game id '{0}' (use letters, digits, '-' or '_')")]
    InvalidId(String),
}

/// Reject ids that could escape the data directory or make odd file names.
pub fn validate_game_id(id: &str) -> Result<(), StorageError> {
    let ok = !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct GameStorage {
    data_dir: PathBuf,
    game_id: String,
}

impl GameStorage {
    pub fn new<P: AsRef<Path>>(data_dir: P, game_id: &str) -> Result<Self, StorageError> {
        validate_game_id(game_id)?;
        Ok(Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            game_id: game_id.to_string(),
        })
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// `<data_dir>/game_<id>.json`
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(format!("game_{}.json", self.game_id))
    }

    /// Default file name used by export when no path is given.
    pub fn default_export_name(&self) -> String {
        format!("{}_config.json", self.game_id)
    }

    fn lock_path(&self) -> PathBuf {
        self.data_dir.join(format!(".game_{}.lock", self.game_id))
    }

    fn open_lock(&self) -> Result<File, StorageError> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?)
    }

    /// Atomically replace the saved blob.
    pub fn save(&self, blob: &Value) -> Result<(), StorageError> {
        let content = serde_json::to_string(blob)?;
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;
        let result = write_atomic(&self.path(), content.as_bytes());
        let _ = lock.unlock();
        result?;
        trace!("saved {} ({} bytes)", self.path().display(), content.len());
        Ok(())
    }

    /// Load the saved blob; `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Value>, StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let result = read_json(&path);
        let _ = lock.unlock();
        let value = result?;
        debug!("loaded saved game from {}", path.display());
        Ok(Some(value))
    }

    /// Write a pretty-printed copy of `blob` to `dest`.
    pub fn export_to<P: AsRef<Path>>(&self, dest: P, blob: &Value) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(blob)?;
        write_atomic(dest.as_ref(), content.as_bytes())?;
        debug!("exported {} to {}", self.game_id, dest.as_ref().display());
        Ok(())
    }

    /// Read `src`, make it the saved blob and return it. A file that fails to
    /// parse leaves the existing save untouched.
    pub fn import_from<P: AsRef<Path>>(&self, src: P) -> Result<Value, StorageError> {
        let src = src.as_ref();
        if !src.exists() {
            return Err(StorageError::NotFound(src.to_path_buf()));
        }
        let value = read_json(src)?;
        self.save(&value)?;
        debug!("imported {} from {}", self.game_id, src.display());
        Ok(value)
    }
}

fn read_json(path: &Path) -> Result<Value, StorageError> {
    let mut s = String::new();
    File::open(path)?.read_to_string(&mut s)?;
    // Leading NULs can survive an interrupted write on some filesystems.
    let cleaned = s.trim_start_matches('\0');
    Ok(serde_json::from_str(cleaned)?)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("game.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content)?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e.into()),
        }
    };
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Ok(dir_file) = File::open(&dir) {
        let _ = dir_file.sync_all();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let s = GameStorage::new(dir.path(), "memory").unwrap();
        assert!(s.load().unwrap().is_none());
        assert!(s.path().ends_with("game_memory.json"));
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let s = GameStorage::new(dir.path().join("nested"), "roulette").unwrap();
        s.save(&json!({"a": 1})).unwrap();
        s.save(&json!({"a": 2})).unwrap();
        assert_eq!(s.load().unwrap(), Some(json!({"a": 2})));
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(matches!(GameStorage::new("/tmp", "../x"), Err(StorageError::InvalidId(_))));
        assert!(matches!(GameStorage::new("/tmp", ""), Err(StorageError::InvalidId(_))));
        assert!(GameStorage::new("/tmp", "number-guess_2").is_ok());
    }

    #[test]
    fn corrupt_file_is_json_error() {
        let dir = TempDir::new().unwrap();
        let s = GameStorage::new(dir.path(), "guess").unwrap();
        fs::write(s.path(), "{not json").unwrap();
        assert!(matches!(s.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn failed_import_keeps_existing_save() {
        let dir = TempDir::new().unwrap();
        let s = GameStorage::new(dir.path(), "guess").unwrap();
        s.save(&json!({"keep": true})).unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "[1, 2,").unwrap();
        assert!(matches!(s.import_from(&bad), Err(StorageError::Json(_))));
        assert!(matches!(
            s.import_from(dir.path().join("missing.json")),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(s.load().unwrap(), Some(json!({"keep": true})));
    }
}
