//! Remote structured store: one row per student in a REST-exposed table
//!
//! The HTTP side speaks the PostgREST dialect (`?col=eq.value`, upserts via
//! `on_conflict` + `Prefer: resolution=merge-duplicates`). Concurrent upserts
//! for the same student resolve last-write-wins on the server.

use super::{
    validate_student_id, BackendKind, DurableWrite, Result, StorageBackend, StorageError,
};
use crate::core::models::NormalizedState;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const STATE_COLUMNS: &str =
    "student_id,approved,regularized,not_approved,language_requirement,professional_practice,updated_at";

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Connection settings for the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Project base URL (e.g., `https://xyz.supabase.co`)
    pub url: String,
    /// Public API key
    pub anon_key: String,
    /// Table name
    pub table: String,
}

impl RemoteSettings {
    /// Settings are usable when the URL is `http(s)` and a key is present.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.anon_key.trim().is_empty()
            && Url::parse(self.url.trim())
                .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
    }

    fn table_name(&self) -> &str {
        if self.table.trim().is_empty() {
            "user_state"
        } else {
            self.table.trim()
        }
    }
}

/// Row of the state table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRow {
    /// Unique key
    pub student_id: String,
    /// State columns
    #[serde(flatten)]
    pub state: NormalizedState,
    /// Time of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Table transport used by [`RemoteStore`]
pub trait StateTable: Send + Sync {
    /// Fetch the row for a student.
    ///
    /// # Errors
    /// Returns an error on transport, authentication or parse failures.
    fn fetch(&self, student_id: &str) -> Result<Option<StateRow>>;

    /// Whether a row exists, without fetching its state.
    ///
    /// # Errors
    /// Same as [`fetch`](Self::fetch).
    fn contains(&self, student_id: &str) -> Result<bool>;

    /// Insert the row, or overwrite it when the key exists.
    ///
    /// # Errors
    /// Returns an error when the server rejects or never receives the row.
    fn upsert(&self, row: &StateRow) -> Result<()>;

    /// Upsert only the key and timestamp, leaving state columns alone.
    ///
    /// # Errors
    /// Same as [`upsert`](Self::upsert).
    fn touch(&self, student_id: &str, at: DateTime<Utc>) -> Result<()>;
}

impl<T: StateTable + ?Sized> StateTable for Arc<T> {
    fn fetch(&self, student_id: &str) -> Result<Option<StateRow>> {
        (**self).fetch(student_id)
    }

    fn contains(&self, student_id: &str) -> Result<bool> {
        (**self).contains(student_id)
    }

    fn upsert(&self, row: &StateRow) -> Result<()> {
        (**self).upsert(row)
    }

    fn touch(&self, student_id: &str, at: DateTime<Utc>) -> Result<()> {
        (**self).touch(student_id, at)
    }
}

/// HTTP implementation of [`StateTable`]
#[derive(Debug, Clone)]
pub struct PostgrestTable {
    client: Client,
    endpoint: Url,
}

impl PostgrestTable {
    /// Build a client for the table described by `settings`.
    ///
    /// # Errors
    /// Returns an error if the settings are invalid or the client cannot be built.
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        if !settings.is_valid() {
            return Err(StorageError::Config(format!(
                "remote URL '{}' or key is not usable",
                settings.url
            )));
        }
        let endpoint_str = format!(
            "{}/rest/v1/{}",
            settings.url.trim().trim_end_matches('/'),
            settings.table_name()
        );
        let endpoint =
            Url::parse(&endpoint_str).map_err(|e| StorageError::Config(e.to_string()))?;

        let key = settings.anon_key.trim();
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(key)?);
        headers.insert(header::AUTHORIZATION, header_value(&format!("Bearer {key}"))?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, endpoint })
    }

    fn select<T: DeserializeOwned>(&self, student_id: &str, columns: &str) -> Result<Vec<T>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("student_id", format!("eq.{student_id}")),
                ("select", columns.to_string()),
                ("limit", "1".to_string()),
            ])
            .send()?;
        let body = check_status(response)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn post_upsert<B: Serialize + ?Sized>(&self, body: &B) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("on_conflict", "student_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()?;
        check_status(response)?;
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| StorageError::Config(e.to_string()))
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let message = response
            .text()
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
        Err(StorageError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[derive(Serialize)]
struct TouchRow<'a> {
    student_id: &'a str,
    updated_at: DateTime<Utc>,
}

impl StateTable for PostgrestTable {
    fn fetch(&self, student_id: &str) -> Result<Option<StateRow>> {
        Ok(self.select(student_id, STATE_COLUMNS)?.into_iter().next())
    }

    fn contains(&self, student_id: &str) -> Result<bool> {
        let rows: Vec<serde_json::Value> = self.select(student_id, "student_id")?;
        Ok(!rows.is_empty())
    }

    fn upsert(&self, row: &StateRow) -> Result<()> {
        self.post_upsert(std::slice::from_ref(row))
    }

    fn touch(&self, student_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.post_upsert(&[TouchRow {
            student_id,
            updated_at: at,
        }])
    }
}

/// In-process [`StateTable`] with the same upsert semantics
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: Mutex<BTreeMap<String, StateRow>>,
}

impl MemoryTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` when the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateTable for MemoryTable {
    fn fetch(&self, student_id: &str) -> Result<Option<StateRow>> {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(student_id).cloned())
    }

    fn contains(&self, student_id: &str) -> Result<bool> {
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.contains_key(student_id))
    }

    fn upsert(&self, row: &StateRow) -> Result<()> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.insert(row.student_id.clone(), row.clone());
        Ok(())
    }

    fn touch(&self, student_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.entry(student_id.to_string())
            .or_insert_with(|| StateRow {
                student_id: student_id.to_string(),
                state: NormalizedState::default(),
                updated_at: None,
            })
            .updated_at = Some(at);
        Ok(())
    }
}

/// Remote durable store keyed by student id
pub struct RemoteStore {
    table: Box<dyn StateTable>,
}

impl RemoteStore {
    /// Store backed by any table transport
    #[must_use]
    pub fn new(table: impl StateTable + 'static) -> Self {
        Self {
            table: Box::new(table),
        }
    }

    /// Store backed by the HTTP table described by `settings`
    ///
    /// # Errors
    /// Returns an error if the settings are invalid or the client cannot be built.
    pub fn connect(settings: &RemoteSettings) -> Result<Self> {
        Ok(Self::new(PostgrestTable::new(settings)?))
    }

    /// Register the student without touching existing state columns.
    ///
    /// # Errors
    /// Returns an error if the id is blank or the upsert fails.
    pub fn touch(&self, student_id: &str) -> Result<()> {
        let student_id = validate_student_id(student_id)?;
        self.table.touch(student_id, Utc::now())
    }
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore").finish_non_exhaustive()
    }
}

impl StorageBackend for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn read(&self, student_id: &str) -> Result<Option<NormalizedState>> {
        let student_id = validate_student_id(student_id)?;
        Ok(self.table.fetch(student_id)?.map(|row| row.state))
    }

    fn exists(&self, student_id: &str) -> Result<bool> {
        let student_id = validate_student_id(student_id)?;
        self.table.contains(student_id)
    }
}

impl DurableWrite for RemoteStore {
    fn write(&self, student_id: &str, state: &NormalizedState) -> Result<()> {
        let student_id = validate_student_id(student_id)?;
        debug!("Remote store: upserting state for {student_id}");
        self.table.upsert(&StateRow {
            student_id: student_id.to_string(),
            state: state.clone(),
            updated_at: Some(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ApprovedCourse;

    fn settings(url: &str, key: &str) -> RemoteSettings {
        RemoteSettings {
            url: url.to_string(),
            anon_key: key.to_string(),
            table: String::new(),
        }
    }

    #[test]
    fn test_settings_validity() {
        assert!(settings("https://abc.supabase.co", "key").is_valid());
        assert!(settings("http://localhost:54321", "key").is_valid());
        assert!(!settings("https://abc.supabase.co", " ").is_valid());
        assert!(!settings("not a url", "key").is_valid());
        assert!(!settings("ftp://abc.example", "key").is_valid());
        assert!(!settings("", "").is_valid());
    }

    #[test]
    fn test_postgrest_table_rejects_invalid_settings() {
        assert!(matches!(
            PostgrestTable::new(&settings("", "key")),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_postgrest_endpoint() {
        let table = PostgrestTable::new(&settings("https://abc.supabase.co/", "key")).unwrap();
        assert_eq!(
            table.endpoint.as_str(),
            "https://abc.supabase.co/rest/v1/user_state"
        );
    }

    #[test]
    fn test_upsert_overwrites() {
        let store = RemoteStore::new(MemoryTable::new());
        let mut state = NormalizedState::default();
        state.approved.push(ApprovedCourse {
            id: "61.03".to_string(),
            grade: 4,
        });
        store.write("12345", &state).unwrap();
        state.approved[0].grade = 9;
        store.write("12345", &state).unwrap();
        assert_eq!(store.read("12345").unwrap(), Some(state));
    }

    #[test]
    fn test_absent_and_exists() {
        let store = RemoteStore::new(MemoryTable::new());
        assert_eq!(store.read("12345").unwrap(), None);
        assert!(!store.exists("12345").unwrap());
        store.write("12345", &NormalizedState::default()).unwrap();
        assert!(store.exists("12345").unwrap());
    }

    #[test]
    fn test_touch_keeps_state() {
        let table = MemoryTable::new();
        let state = NormalizedState {
            professional_practice: true,
            ..NormalizedState::default()
        };
        let store = RemoteStore::new(table);
        store.write("12345", &state).unwrap();
        store.touch("12345").unwrap();
        assert_eq!(store.read("12345").unwrap(), Some(state));
        store.touch("67890").unwrap();
        assert_eq!(store.read("67890").unwrap(), Some(NormalizedState::default()));
    }

    #[test]
    fn test_row_json_shape() {
        let row: StateRow = serde_json::from_str(
            r#"{"student_id":"1","approved":[{"id":"61.03","grade":7}],"regularized":null,
                "not_approved":[],"language_requirement":true,"professional_practice":false,
                "updated_at":"2024-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(row.state.approved_grade("61.03"), Some(7));
        assert!(row.state.language_requirement);
        assert!(row.updated_at.is_some());
    }
}
