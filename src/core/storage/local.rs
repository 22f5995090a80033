//! On-device store: one JSON document mapping student ids to their state

use super::{validate_student_id, BackendKind, DurableWrite, Result, StorageBackend};
use crate::core::models::NormalizedState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Namespaced key of the store document; also its file stem.
pub const LOCAL_DB_KEY: &str = "plan-tracker:local-db";

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalDb {
    #[serde(default)]
    users: BTreeMap<String, LocalUser>,
}

/// Entries written by older versions carry no `state` and read as absent.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<NormalizedState>,
}

/// Local durable store
///
/// Without a directory there is no persistent storage: reads are absent and
/// writes succeed without doing anything.
#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl LocalStore {
    /// Store whose document lives in `dir`
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let file_name = format!("{}.json", LOCAL_DB_KEY.replace(':', "-"));
        Self {
            path: Some(dir.as_ref().join(file_name)),
            lock: Mutex::new(()),
        }
    }

    /// Store with no persistent storage behind it
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            path: None,
            lock: Mutex::new(()),
        }
    }

    /// Store in `dir`, or an unavailable store when `dir` is `None`
    #[must_use]
    pub fn new(dir: Option<PathBuf>) -> Self {
        dir.map_or_else(Self::unavailable, Self::in_dir)
    }

    /// Path of the store document, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Missing or corrupt content reads as an empty document.
    fn read_db(&self) -> LocalDb {
        let Some(path) = &self.path else {
            return LocalDb::default();
        };
        let Ok(raw) = fs::read_to_string(path) else {
            return LocalDb::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Local store {} is unreadable, starting empty: {e}", path.display());
            LocalDb::default()
        })
    }

    fn write_db(&self, db: &LocalDb) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string(db)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read-modify-write of one student's entry under the store lock.
    fn update_student<F>(&self, student_id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut LocalUser),
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut db = self.read_db();
        update(db.users.entry(student_id.to_string()).or_default());
        self.write_db(&db)
    }

    /// Create an empty state for the student unless one exists.
    ///
    /// # Errors
    /// Returns an error if the id is blank or the document cannot be written.
    pub fn ensure_student(&self, student_id: &str) -> Result<()> {
        let student_id = validate_student_id(student_id)?;
        self.update_student(student_id, |user| {
            user.state.get_or_insert_with(NormalizedState::default);
        })
    }
}

impl StorageBackend for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn read(&self, student_id: &str) -> Result<Option<NormalizedState>> {
        let student_id = validate_student_id(student_id)?;
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut db = self.read_db();
        Ok(db.users.remove(student_id).and_then(|user| user.state))
    }
}

impl DurableWrite for LocalStore {
    fn write(&self, student_id: &str, state: &NormalizedState) -> Result<()> {
        let student_id = validate_student_id(student_id)?;
        debug!("Local store: writing state for {student_id}");
        self.update_student(student_id, |user| user.state = Some(state.clone()))
    }
}
