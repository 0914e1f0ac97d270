//! Durable storage for the wizard's working draft.
//!
//! A draft is stored under a key (by default [`DRAFT_KEY`]) together with the
//! wizard's navigation progress and a version counter. Saves carry the
//! version the writer last observed; a mismatch means another writer (a
//! second terminal, a second browser tab) saved in between, and the save is
//! refused with [`DraftError::VersionConflict`] instead of silently
//! overwriting.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::PlanDraft;
use crate::wizard::Stage;

/// Storage key used by the plan builder.
pub const DRAFT_KEY: &str = "planBuilderDraft";

/// What gets persisted for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDraft {
    /// Incremented by the store on every successful save.
    pub version: u64,
    pub saved_at: DateTime<Utc>,
    pub current_stage: Stage,
    #[serde(default)]
    pub completed: Vec<Stage>,
    #[serde(default)]
    pub review_reached: bool,
    pub draft: PlanDraft,
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("invalid draft key {0:?} (use letters, digits, '-' or '_')")]
    InvalidKey(String),

    #[error("draft I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("draft is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("draft was modified elsewhere (expected version {expected:?}, found {found:?}); reload before saving")]
    VersionConflict {
        expected: Option<u64>,
        found: Option<u64>,
    },
}

/// Key-value storage for wizard drafts.
pub trait DraftStore: Send + Sync {
    /// Load the draft stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<StoredDraft>, DraftError>;

    /// Store `draft` under `key` if the stored version still equals
    /// `expected_version` (`None` meaning "nothing stored"). Returns the new
    /// version; the `version` field of `draft` is ignored.
    fn save(
        &self,
        key: &str,
        draft: &StoredDraft,
        expected_version: Option<u64>,
    ) -> Result<u64, DraftError>;

    /// Remove the draft stored under `key`. Missing drafts are not an error.
    fn clear(&self, key: &str) -> Result<(), DraftError>;
}

fn validate_key(key: &str) -> Result<(), DraftError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DraftError::InvalidKey(key.to_owned()))
    }
}

fn check_version(expected: Option<u64>, found: Option<u64>) -> Result<u64, DraftError> {
    if expected != found {
        return Err(DraftError::VersionConflict { expected, found });
    }
    Ok(found.map_or(1, |v| v + 1))
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Stores each draft as `<dir>/<key>.json`.
///
/// Writes go to a uniquely named temporary file in the same directory that
/// is then renamed over the target, so a crash never leaves a half-written
/// draft behind. Version checks are not locked: two processes that read the
/// same version at the same instant can both succeed, the later rename
/// winning. Conflict detection across processes is therefore best-effort.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DraftError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &str) -> Result<Option<StoredDraft>, DraftError> {
        let path = self.path_for(key)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DraftError::Io { path, source }),
        };
        let stored: StoredDraft = serde_json::from_str(&contents)?;
        Ok(Some(stored))
    }

    fn save(
        &self,
        key: &str,
        draft: &StoredDraft,
        expected_version: Option<u64>,
    ) -> Result<u64, DraftError> {
        let path = self.path_for(key)?;
        let found = self.load(key)?.map(|d| d.version);
        let version = check_version(expected_version, found)?;

        std::fs::create_dir_all(&self.dir).map_err(|source| DraftError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut stored = draft.clone();
        stored.version = version;
        let contents = serde_json::to_string_pretty(&stored)?;

        let io_err = |source| DraftError::Io {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(io_err)?;
        tmp.write_all(contents.as_bytes()).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(key, version, path = %path.display(), "draft saved");
        Ok(version)
    }

    fn clear(&self, key: &str) -> Result<(), DraftError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "draft cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DraftError::Io { path, source }),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: Mutex<HashMap<String, StoredDraft>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &str) -> Result<Option<StoredDraft>, DraftError> {
        validate_key(key)?;
        let drafts = self.drafts.lock().unwrap_or_else(|e| e.into_inner());
        Ok(drafts.get(key).cloned())
    }

    fn save(
        &self,
        key: &str,
        draft: &StoredDraft,
        expected_version: Option<u64>,
    ) -> Result<u64, DraftError> {
        validate_key(key)?;
        let mut drafts = self.drafts.lock().unwrap_or_else(|e| e.into_inner());
        let found = drafts.get(key).map(|d| d.version);
        let version = check_version(expected_version, found)?;
        let mut stored = draft.clone();
        stored.version = version;
        drafts.insert(key.to_owned(), stored);
        Ok(version)
    }

    fn clear(&self, key: &str) -> Result<(), DraftError> {
        validate_key(key)?;
        let mut drafts = self.drafts.lock().unwrap_or_else(|e| e.into_inner());
        drafts.remove(key);
        Ok(())
    }
}
