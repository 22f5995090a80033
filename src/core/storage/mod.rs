//! Storage backends for normalized academic state
//!
//! Every backend can [`read`](StorageBackend::read). Writing is split in two
//! capabilities so callers cannot confuse them: [`DurableWrite`] reports
//! success or failure, [`UnconfirmedWrite`] only hands the state off.

pub mod legacy;
pub mod local;
pub mod remote;

use crate::core::models::{NormalizedState, PlanIdentity};
use std::fmt;
use thiserror::Error;

pub use legacy::{
    FormEntries, GoogleSheets, LegacySettings, LegacyStore, MemorySheets, SheetsApi,
};
pub use local::LocalStore;
pub use remote::{MemoryTable, PostgrestTable, RemoteSettings, RemoteStore, StateRow, StateTable};

/// Storage error
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with an error status
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend settings are unusable (bad URL, header, ...)
    #[error("Invalid backend settings: {0}")]
    Config(String),

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Which backend variant is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// On-device JSON store
    Local,
    /// Networked structured store
    Remote,
    /// Legacy spreadsheet store
    Legacy,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Legacy => "legacy",
        };
        write!(f, "{name}")
    }
}

/// Read side shared by every backend
pub trait StorageBackend: Send + Sync {
    /// Variant of this backend
    fn kind(&self) -> BackendKind;

    /// Read a student's state; `Ok(None)` when no record exists.
    ///
    /// # Errors
    /// Returns an error on transport, authentication or parse failures.
    fn read(&self, student_id: &str) -> Result<Option<NormalizedState>>;

    /// Whether any record exists for the student.
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    fn exists(&self, student_id: &str) -> Result<bool> {
        Ok(self.read(student_id)?.is_some())
    }

    /// Plans the student has prior state for.
    ///
    /// Single-plan backends answer with `default_plan` when a record exists.
    ///
    /// # Errors
    /// Same as [`read`](Self::read).
    fn enrollments(
        &self,
        student_id: &str,
        default_plan: &PlanIdentity,
    ) -> Result<Vec<PlanIdentity>> {
        Ok(if self.exists(student_id)? {
            vec![default_plan.clone()]
        } else {
            Vec::new()
        })
    }
}

/// Confirmed full-state overwrite
pub trait DurableWrite: StorageBackend {
    /// Replace the student's state.
    ///
    /// # Errors
    /// Returns an error when the write was not persisted.
    fn write(&self, student_id: &str, state: &NormalizedState) -> Result<()>;
}

/// Best-effort hand-off with no confirmation and no read-back
pub trait UnconfirmedWrite: StorageBackend {
    /// Submit the student's state. Never reports failure.
    fn submit(&self, student_id: &str, state: &NormalizedState);
}

/// Reject blank student identifiers.
///
/// # Errors
/// Returns [`StorageError::InvalidInput`] when `student_id` is blank.
pub fn validate_student_id(student_id: &str) -> Result<&str> {
    let trimmed = student_id.trim();
    if trimmed.is_empty() {
        Err(StorageError::InvalidInput("student id is empty".to_string()))
    } else {
        Ok(trimmed)
    }
}
