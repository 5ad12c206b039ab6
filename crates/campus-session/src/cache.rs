//! Local profile cache.
//!
//! The store keeps one record, the last-known [`Profile`], so that a
//! reload can show the right role-gated page before the backend answers.
//! The record lives under the fixed key [`CACHE_KEY`] and is encoded with
//! the identity crate's codec.
//!
//! Two implementations ship with the crate:
//! - [`MemoryCache`]: a shared in-process slot, for tests and the demo.
//! - [`FileCache`]: one JSON file in a directory, surviving restarts.
//!
//! There is no locking across processes. Two processes sharing a
//! `FileCache` directory simply overwrite each other's record.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use campus_identity::{CACHE_KEY, Profile, decode_profile, encode_profile};

use crate::SessionError;

/// Storage for the single cached profile record.
///
/// All methods are synchronous: the record is small and local, and the
/// store reads it inline to apply a cached profile before any network
/// call has been made.
pub trait ProfileCache: Send + Sync + 'static {
    /// Reads the cached profile, `Ok(None)` if there is no record.
    ///
    /// # Errors
    /// Returns [`SessionError::CacheRecord`] if the record is corrupt, or
    /// [`SessionError::CacheIo`] if it can't be read.
    fn load(&self) -> Result<Option<Profile>, SessionError>;

    /// Overwrites the record with `profile`.
    fn store(&self, profile: &Profile) -> Result<(), SessionError>;

    /// Deletes the record. Deleting a missing record is not an error.
    fn clear(&self) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// An in-process cache slot.
///
/// Clones share the same slot, so a test can hand one clone to the store
/// and inspect the record through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    record: Arc<Mutex<Option<String>>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache that already holds `profile`.
    ///
    /// # Errors
    /// Returns [`SessionError::CacheRecord`] if the profile can't be encoded.
    pub fn with_profile(profile: &Profile) -> Result<Self, SessionError> {
        let cache = Self::new();
        cache.store(profile)?;
        Ok(cache)
    }

    /// The raw encoded record, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot().clone()
    }

    /// Replaces the raw record without encoding. Useful for simulating a
    /// record written by something else.
    pub fn put_raw(&self, record: impl Into<String>) {
        *self.slot() = Some(record.into());
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A panic while holding this lock can't leave the Option in a
        // half-written state, so a poisoned lock is still usable.
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProfileCache for MemoryCache {
    fn load(&self) -> Result<Option<Profile>, SessionError> {
        match self.slot().as_deref() {
            Some(record) => Ok(Some(decode_profile(record)?)),
            None => Ok(None),
        }
    }

    fn store(&self, profile: &Profile) -> Result<(), SessionError> {
        let record = encode_profile(profile)?;
        *self.slot() = Some(record);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot() = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileCache
// ---------------------------------------------------------------------------

/// A cache backed by a single file, `<dir>/userProfile.json`.
///
/// Writes go to a sibling temp file first and are renamed into place, so
/// a crash mid-write leaves either the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    /// Creates a cache storing its record inside `dir`. The directory is
    /// created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{CACHE_KEY}.json")),
        }
    }

    /// The path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileCache for FileCache {
    fn load(&self) -> Result<Option<Profile>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(record) => Ok(Some(decode_profile(&record)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, profile: &Profile) -> Result<(), SessionError> {
        let record = encode_profile(profile)?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, record)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
