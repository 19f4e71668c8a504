// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-file document storage.
//!
//! Every record is one pretty-printed JSON file. Writes go to a temp file
//! and are renamed into place, so readers never see a half-written record.
//! All writes are serialized through one mutex; [`JsonStorage::update_json`]
//! holds it across read-check-write, which makes single-document state
//! transitions (e.g. consuming an access grant) atomic.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::StoragePaths;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage not initialized")]
    NotInitialized,

    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Permission denied: user {user_id} cannot access {resource}")]
    PermissionDenied { user_id: String, resource: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Document storage rooted at a data directory.
///
/// Cloning is cheap and clones share the write lock.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    paths: StoragePaths,
    initialized: bool,
    write_lock: Arc<Mutex<()>>,
}

impl JsonStorage {
    /// Create a new storage handle. Call `initialize()` before use.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open storage at `root` and create its directory layout.
    pub fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let mut storage = Self::new(StoragePaths::new(root));
        storage.initialize()?;
        Ok(storage)
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Create all collection directories. Idempotent.
    pub fn initialize(&mut self) -> StorageResult<()> {
        let dirs = [
            self.paths.users_dir(),
            self.paths.cards_dir(),
            self.paths.bank_accounts_dir(),
            self.paths.addresses_dir(),
            self.paths.access_grants_dir(),
            self.paths.tickets_dir(),
            self.paths.audit_dir(),
        ];

        for dir in dirs {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Write-read-delete check used by the health endpoints.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ensure_initialized()?;

        let test_file = self.paths.root().join(".health_check");
        let test_data = b"health_check_data";

        fs::write(&test_file, test_data)?;
        let read_data = fs::read(&test_file)?;
        fs::remove_file(&test_file)?;

        if read_data != test_data {
            return Err(StorageError::SerializationError(
                "Health check data mismatch".to_string(),
            ));
        }

        Ok(())
    }

    // ========== JSON Documents ==========

    /// Read a JSON file and deserialize it.
    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        self.ensure_initialized()?;
        let path = self.checked(path.as_ref())?;

        let file = File::open(path)?;
        let value = serde_json::from_reader(BufReader::new(file))?;
        Ok(value)
    }

    /// Write a JSON file atomically.
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        self.ensure_initialized()?;
        let path = self.checked(path.as_ref())?;

        let _guard = self.lock()?;
        write_atomic(path, value)
    }

    /// Read-modify-write a document while holding the write lock.
    ///
    /// `apply` sees the current document and may mutate it; the (possibly
    /// modified) document is written back only if `apply` returns `Ok`.
    pub fn update_json<T, R, F>(&self, path: impl AsRef<Path>, apply: F) -> StorageResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> StorageResult<R>,
    {
        self.ensure_initialized()?;
        let path = self.checked(path.as_ref())?;

        let _guard = self.lock()?;
        let file = File::open(path)?;
        let mut value: T = serde_json::from_reader(BufReader::new(file))?;
        let result = apply(&mut value)?;
        write_atomic(path, &value)?;
        Ok(result)
    }

    /// Check if a file exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.checked(path.as_ref()).is_ok_and(Path::is_file)
    }

    /// Delete a file.
    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ensure_initialized()?;
        let path = self.checked(path.as_ref())?;

        let _guard = self.lock()?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// List the file stems of all files with `extension` in `dir`.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        self.ensure_initialized()?;

        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Load every document in a collection directory, skipping unreadable files.
    pub fn load_all<T: DeserializeOwned>(&self, dir: impl AsRef<Path>) -> StorageResult<Vec<T>> {
        let dir = dir.as_ref();
        let mut records = Vec::new();
        for id in self.list_files(dir, "json")? {
            match self.read_json(dir.join(format!("{id}.json"))) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(record_id = %id, error = %e, "Skipping unreadable record"),
            }
        }
        Ok(records)
    }

    // ========== Raw Files ==========

    /// Append bytes to a file, creating it if needed.
    pub fn append_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        self.ensure_initialized()?;
        let path = self.checked(path.as_ref())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _guard = self.lock()?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Read raw bytes from a file.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ensure_initialized()?;
        let path = self.checked(path.as_ref())?;

        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Ok(data)
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Only paths below the data root are served. An absolute or `..` id
    /// joined onto a collection dir would otherwise escape it.
    fn checked<'p>(&self, path: &'p Path) -> StorageResult<&'p Path> {
        let inside = path
            .strip_prefix(self.paths.root())
            .is_ok_and(|rest| rest.components().all(|c| matches!(c, Component::Normal(_))));
        if inside {
            Ok(path)
        } else {
            Err(StorageError::InvalidId(path.display().to_string()))
        }
    }
}


fn write_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
