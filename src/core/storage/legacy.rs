//! Legacy spreadsheet store
//!
//! Reads scan an identifier column for every matching row and fetch those
//! rows in one batch. Writes are form submissions that are never confirmed,
//! so this backend only offers [`UnconfirmedWrite`].

use super::{
    validate_student_id, BackendKind, Result, StorageBackend, StorageError, UnconfirmedWrite,
};
use crate::core::codec;
use crate::core::models::{NormalizedState, PlanIdentity, PlanMap, UserIdentity};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Form field names of the legacy forms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormEntries {
    /// Student id field
    pub student: String,
    /// Plan id field
    pub plan: String,
    /// Track field
    pub track: String,
    /// Capstone track field
    pub capstone: String,
    /// Serialized plan map field
    pub map: String,
}

/// Settings of the legacy store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacySettings {
    /// Values endpoint of the spreadsheet
    pub spreadsheet_url: String,
    /// Spreadsheet API key
    pub api_key: String,
    /// Sheet with one row per login: timestamp, student, plan, track, capstone
    pub user_sheet: String,
    /// Sheet with one row per saved map: timestamp, student, plan, map JSON
    pub records_sheet: String,
    /// Form collecting logins
    pub user_form_url: String,
    /// Form collecting plan maps
    pub graph_form_url: String,
    /// Form field names
    pub entries: FormEntries,
    /// Plan whose records are read
    pub plan_id: String,
}

/// Spreadsheet transport used by [`LegacyStore`]
pub trait SheetsApi: Send + Sync {
    /// Values of a column range (e.g., `Registros!B:D`), one vector per column.
    ///
    /// # Errors
    /// Returns an error on transport failures or an error payload.
    fn columns(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// First row of each range (e.g., `Usuarios!7:7`), in request order.
    ///
    /// # Errors
    /// Returns an error on transport failures or an error payload.
    fn rows(&self, ranges: &[String]) -> Result<Vec<Vec<String>>>;

    /// Post a form without waiting for or inspecting the answer.
    fn post_form(&self, form_url: &str, fields: Vec<(String, String)>);
}

impl<T: SheetsApi + ?Sized> SheetsApi for Arc<T> {
    fn columns(&self, range: &str) -> Result<Vec<Vec<String>>> {
        (**self).columns(range)
    }

    fn rows(&self, ranges: &[String]) -> Result<Vec<Vec<String>>> {
        (**self).rows(ranges)
    }

    fn post_form(&self, form_url: &str, fields: Vec<(String, String)>) {
        (**self).post_form(form_url, fields);
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGet {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResponse<T> {
    Failure { error: ApiError },
    Success(T),
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure { error } => Err(StorageError::Server {
                status: error.code,
                message: error.message,
            }),
        }
    }
}

/// HTTP implementation of [`SheetsApi`] for the spreadsheet values API
#[derive(Debug, Clone)]
pub struct GoogleSheets {
    client: Client,
    values_url: String,
    api_key: String,
}

impl GoogleSheets {
    /// Client for the spreadsheet values endpoint
    ///
    /// # Errors
    /// Returns an error if the URL is empty or the client cannot be built.
    pub fn new(values_url: &str, api_key: &str) -> Result<Self> {
        let values_url = values_url.trim().trim_end_matches('/');
        if values_url.is_empty() {
            return Err(StorageError::Config(
                "legacy spreadsheet URL is not configured".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            values_url: values_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, suffix: &str) -> Result<Url> {
        Url::parse(&format!("{}{suffix}", self.values_url))
            .map_err(|e| StorageError::Config(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.client.get(url).send()?.text()?;
        serde_json::from_str::<ApiResponse<T>>(&body)?.into_result()
    }
}

impl SheetsApi for GoogleSheets {
    fn columns(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let mut url = self.url("")?;
        url.path_segments_mut()
            .map_err(|()| StorageError::Config("spreadsheet URL cannot be a base".to_string()))?
            .push(range);
        url.query_pairs_mut()
            .append_pair("majorDimension", "COLUMNS")
            .append_pair("key", &self.api_key);
        Ok(self.get::<ValueRange>(url)?.values)
    }

    fn rows(&self, ranges: &[String]) -> Result<Vec<Vec<String>>> {
        let mut url = self.url(":batchGet")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.api_key);
            for range in ranges {
                query.append_pair("ranges", range);
            }
        }
        let batch: BatchGet = self.get(url)?;
        Ok(batch
            .value_ranges
            .into_iter()
            .map(|range| range.values.into_iter().next().unwrap_or_default())
            .collect())
    }

    fn post_form(&self, form_url: &str, fields: Vec<(String, String)>) {
        // Sent before returning; the response is never inspected
        if let Err(e) = self.client.post(form_url).form(&fields).send() {
            debug!("Legacy form submission to {form_url} did not go through: {e}");
        }
    }
}

/// In-process [`SheetsApi`]: sheets are row-major grids starting at column A
#[derive(Debug, Default)]
pub struct MemorySheets {
    sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
    submissions: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MemorySheets {
    /// Empty spreadsheet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a sheet
    pub fn append_row<I, S>(&self, sheet: &str, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets
            .entry(sheet.to_string())
            .or_default()
            .push(cells.into_iter().map(Into::into).collect());
    }

    /// Forms posted so far, oldest first
    #[must_use]
    pub fn submissions(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn sheet(&self, name: &str) -> Vec<Vec<String>> {
        let sheets = self.sheets.lock().unwrap_or_else(PoisonError::into_inner);
        sheets.get(name).cloned().unwrap_or_default()
    }
}

/// Zero-based index of a column label (`A` = 0, `AA` = 26).
fn column_index(label: &str) -> Option<usize> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let value = label
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b.to_ascii_uppercase() - b'A' + 1));
    Some(value - 1)
}

fn split_range(range: &str) -> Result<(&str, &str, &str)> {
    let invalid = || StorageError::InvalidInput(format!("unsupported range '{range}'"));
    let (sheet, cells) = range.split_once('!').ok_or_else(invalid)?;
    let (from, to) = cells.split_once(':').ok_or_else(invalid)?;
    Ok((sheet, from, to))
}

impl SheetsApi for MemorySheets {
    fn columns(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let (sheet, from, to) = split_range(range)?;
        let invalid = || StorageError::InvalidInput(format!("unsupported range '{range}'"));
        let first = column_index(from).ok_or_else(invalid)?;
        let last = column_index(to).ok_or_else(invalid)?;
        let grid = self.sheet(sheet);
        Ok((first..=last)
            .map(|col| {
                grid.iter()
                    .map(|row| row.get(col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    fn rows(&self, ranges: &[String]) -> Result<Vec<Vec<String>>> {
        ranges
            .iter()
            .map(|range| {
                let (sheet, from, _) = split_range(range)?;
                let row: usize = from.parse().map_err(|_| {
                    StorageError::InvalidInput(format!("unsupported range '{range}'"))
                })?;
                Ok(row
                    .checked_sub(1)
                    .and_then(|idx| self.sheet(sheet).get(idx).cloned())
                    .unwrap_or_default())
            })
            .collect()
    }

    fn post_form(&self, form_url: &str, fields: Vec<(String, String)>) {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((form_url.to_string(), fields));
    }
}

/// Legacy spreadsheet store
pub struct LegacyStore {
    api: Box<dyn SheetsApi>,
    settings: LegacySettings,
}

impl LegacyStore {
    /// Store over any spreadsheet transport
    #[must_use]
    pub fn new(api: impl SheetsApi + 'static, settings: LegacySettings) -> Self {
        Self {
            api: Box::new(api),
            settings,
        }
    }

    /// Store over the HTTP spreadsheet API
    ///
    /// # Errors
    /// Returns an error if the spreadsheet URL is missing or the client cannot be built.
    pub fn connect(settings: LegacySettings) -> Result<Self> {
        let api = GoogleSheets::new(&settings.spreadsheet_url, &settings.api_key)?;
        Ok(Self::new(api, settings))
    }

    /// Zero-based row indices whose value equals `student_id`.
    fn matching_rows(column: &[String], student_id: &str) -> Vec<usize> {
        column
            .iter()
            .enumerate()
            .filter(|(_, value)| value.trim() == student_id)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Every plan the student ever logged in with, oldest first.
    ///
    /// # Errors
    /// Returns an error when the spreadsheet cannot be read.
    pub fn logins(&self, student_id: &str) -> Result<Vec<PlanIdentity>> {
        let student_id = validate_student_id(student_id)?;
        let sheet = &self.settings.user_sheet;
        let columns = self.api.columns(&format!("{sheet}!B:B"))?;
        let Some(students) = columns.first() else {
            return Ok(Vec::new());
        };
        let indexes = Self::matching_rows(students, student_id);
        if indexes.is_empty() {
            return Ok(Vec::new());
        }

        let ranges: Vec<String> = indexes
            .iter()
            .map(|idx| format!("{sheet}!{row}:{row}", row = idx + 1))
            .collect();
        let cell = |row: &[String], col: usize| {
            row.get(col)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok(self
            .api
            .rows(&ranges)?
            .iter()
            .filter_map(|row| {
                Some(PlanIdentity {
                    plan_id: cell(row, 2)?,
                    track: cell(row, 3),
                    capstone_track: cell(row, 4),
                })
            })
            .collect())
    }

    /// Submit a login row. Never confirmed.
    pub fn submit_login(&self, user: &UserIdentity) {
        let entries = &self.settings.entries;
        let fields = vec![
            (entries.student.clone(), user.student_id.clone()),
            (entries.plan.clone(), user.plan.plan_id.clone()),
            (entries.track.clone(), user.plan.track.clone().unwrap_or_default()),
            (
                entries.capstone.clone(),
                user.plan.capstone_track.clone().unwrap_or_default(),
            ),
        ];
        self.post(&self.settings.user_form_url, fields);
    }

    fn post(&self, form_url: &str, fields: Vec<(String, String)>) {
        if form_url.trim().is_empty() {
            warn!("Legacy form URL not configured, submission dropped");
            return;
        }
        self.api.post_form(form_url, fields);
    }
}

impl std::fmt::Debug for LegacyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StorageBackend for LegacyStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Legacy
    }

    /// The most recent saved map for the configured plan, encoded.
    fn read(&self, student_id: &str) -> Result<Option<NormalizedState>> {
        let student_id = validate_student_id(student_id)?;
        let columns = self
            .api
            .columns(&format!("{}!B:D", self.settings.records_sheet))?;
        let (Some(students), Some(plans), Some(maps)) =
            (columns.first(), columns.get(1), columns.get(2))
        else {
            return Ok(None);
        };

        let latest = Self::matching_rows(students, student_id)
            .into_iter()
            .rev()
            .find(|&idx| plans.get(idx).is_some_and(|p| p.trim() == self.settings.plan_id));
        let Some(idx) = latest else {
            return Ok(None);
        };
        let raw = maps.get(idx).map_or("", String::as_str);
        let map = PlanMap::from_json(raw)?;
        Ok(Some(codec::encode(&map)))
    }

    fn enrollments(
        &self,
        student_id: &str,
        _default_plan: &PlanIdentity,
    ) -> Result<Vec<PlanIdentity>> {
        self.logins(student_id)
    }
}

impl UnconfirmedWrite for LegacyStore {
    fn submit(&self, student_id: &str, state: &NormalizedState) {
        let Ok(student_id) = validate_student_id(student_id) else {
            return;
        };
        let map = codec::decode(state);
        let Ok(json) = serde_json::to_string(&map) else {
            return;
        };
        let entries = &self.settings.entries;
        let fields = vec![
            (entries.student.clone(), student_id.to_string()),
            (entries.plan.clone(), self.settings.plan_id.clone()),
            (entries.map.clone(), json),
        ];
        debug!("Legacy store: submitting map for {student_id} (unconfirmed)");
        self.post(&self.settings.graph_form_url, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn settings() -> LegacySettings {
        LegacySettings {
            user_sheet: "Usuarios".to_string(),
            records_sheet: "Registros".to_string(),
            user_form_url: "https://forms.example/user".to_string(),
            graph_form_url: "https://forms.example/graph".to_string(),
            entries: FormEntries {
                student: "entry.1".to_string(),
                plan: "entry.2".to_string(),
                track: "entry.3".to_string(),
                capstone: "entry.4".to_string(),
                map: "entry.5".to_string(),
            },
            plan_id: "biomedica-2022".to_string(),
            ..LegacySettings::default()
        }
    }

    fn store() -> (Arc<MemorySheets>, LegacyStore) {
        let sheets = Arc::new(MemorySheets::new());
        let store = LegacyStore::new(Arc::clone(&sheets), settings());
        (sheets, store)
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("d"), Some(3));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("1"), None);
    }

    #[test]
    fn test_read_latest_record_for_plan() {
        let (sheets, store) = store();
        sheets.append_row("Registros", ["t0", "12345", "biomedica-2022", r#"{"materias":[{"id":"61.03","nota":4}]}"#]);
        sheets.append_row("Registros", ["t1", "99999", "biomedica-2022", r#"{"materias":[]}"#]);
        sheets.append_row("Registros", ["t2", "12345", "otra-2009", r#"{"materias":[{"id":"X","nota":2}]}"#]);
        sheets.append_row(
            "Registros",
            ["t3", "12345", "biomedica-2022", r#"{"materias":[{"id":"61.03","nota":9}],"checkboxes":["Ingles"]}"#],
        );

        let state = store.read("12345").unwrap().unwrap();
        assert_eq!(state.approved_grade("61.03"), Some(9));
        assert!(state.language_requirement);
        assert!(!state.is_approved("X"));
    }

    #[test]
    fn test_read_absent() {
        let (_sheets, store) = store();
        assert_eq!(store.read("12345").unwrap(), None);
    }

    #[test]
    fn test_read_malformed_map_is_an_error() {
        let (sheets, store) = store();
        sheets.append_row("Registros", ["t0", "12345", "biomedica-2022", "{broken"]);
        assert!(matches!(store.read("12345"), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_logins_batch_fetch() {
        let (sheets, store) = store();
        sheets.append_row("Usuarios", ["t0", "12345", "biomedica-2022", "", ""]);
        sheets.append_row("Usuarios", ["t1", "55555", "informatica-1986", "", ""]);
        sheets.append_row("Usuarios", ["t2", "12345", "informatica-1986", "Sistemas", "Tesis"]);

        let logins = store.logins("12345").unwrap();
        assert_eq!(logins.len(), 2);
        assert_eq!(logins[0], PlanIdentity::new("biomedica-2022"));
        assert_eq!(logins[1].track.as_deref(), Some("Sistemas"));
        assert_eq!(logins[1].capstone_track.as_deref(), Some("Tesis"));
        assert!(store.logins("00000").unwrap().is_empty());
    }

    #[test]
    fn test_submit_is_form_post() {
        let (sheets, store) = store();
        let mut state = NormalizedState::default();
        state.regularized.insert("61.08".to_string());
        store.submit("12345", &state);

        let posted = sheets.submissions();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "https://forms.example/graph");
        let fields: HashMap<_, _> = posted[0].1.iter().cloned().collect();
        assert_eq!(fields["entry.1"], "12345");
        assert_eq!(fields["entry.2"], "biomedica-2022");
        let map = PlanMap::from_json(&fields["entry.5"]).unwrap();
        assert_eq!(map.course("61.08").map(|c| c.grade), Some(-1));
    }

    #[test]
    fn test_submit_without_form_url_is_dropped() {
        let sheets = Arc::new(MemorySheets::new());
        let store = LegacyStore::new(
            Arc::clone(&sheets),
            LegacySettings {
                graph_form_url: String::new(),
                ..settings()
            },
        );
        store.submit("12345", &NormalizedState::default());
        assert!(sheets.submissions().is_empty());
    }

    #[test]
    fn test_submit_login() {
        let (sheets, store) = store();
        let user = UserIdentity::new("12345", "biomedica-2022").with_track(Some("Bio".to_string()));
        store.submit_login(&user);
        let posted = sheets.submissions();
        assert_eq!(posted[0].0, "https://forms.example/user");
        assert!(posted[0].1.contains(&("entry.3".to_string(), "Bio".to_string())));
    }

    #[test]
    fn test_submit_reaches_server_before_returning() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            conn.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while let Ok(n) = conn.read(&mut buf) {
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&request).contains("entry.5=") {
                    break;
                }
            }
            let _ = conn.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        let store = LegacyStore::connect(LegacySettings {
            spreadsheet_url: format!("http://{addr}/values"),
            graph_form_url: format!("http://{addr}/graph"),
            ..settings()
        })
        .unwrap();
        store.submit("12345", &NormalizedState::default());
        drop(store);

        let request = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("form post never reached the server");
        assert!(request.starts_with("POST /graph"));
        assert!(request.contains("entry.1=12345"));
        server.join().unwrap();
    }

    #[test]
    fn test_google_sheets_requires_url() {
        assert!(GoogleSheets::new("  ", "key").is_err());
    }
}
