//! Backend selection and the unified read/write surface used by front ends

use crate::core::codec;
use crate::core::config::Config;
use crate::core::models::{NormalizedState, PlanIdentity, PlanMap, UserIdentity};
use crate::core::storage::{
    validate_student_id, BackendKind, DurableWrite, FormEntries, LegacySettings, LegacyStore,
    LocalStore, RemoteSettings, RemoteStore, Result, StorageBackend, StorageError,
    UnconfirmedWrite,
};
use std::path::PathBuf;

/// Which backend to use, decided once at start-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Explicit offline mode; `dir` is `None` when no persistent storage exists
    Offline {
        /// Directory of the local store
        dir: Option<PathBuf>,
    },
    /// Remote structured store with valid credentials
    Remote(RemoteSettings),
    /// Legacy spreadsheet store, the fallback of last resort
    Legacy(LegacySettings),
}

impl BackendConfig {
    /// Pick the backend: offline mode first, then valid remote credentials,
    /// otherwise the legacy store.
    #[must_use]
    pub fn select(config: &Config) -> Self {
        if config.storage.offline {
            let dir = Some(config.storage.local_dir.trim())
                .filter(|d| !d.is_empty())
                .map(PathBuf::from);
            return Self::Offline { dir };
        }

        let remote = RemoteSettings {
            url: config.remote.url.clone(),
            anon_key: config.remote.anon_key.clone(),
            table: config.remote.table.clone(),
        };
        if remote.is_valid() {
            return Self::Remote(remote);
        }

        let legacy = &config.legacy;
        Self::Legacy(LegacySettings {
            spreadsheet_url: legacy.spreadsheet_url.clone(),
            api_key: legacy.api_key.clone(),
            user_sheet: legacy.user_sheet.clone(),
            records_sheet: legacy.records_sheet.clone(),
            user_form_url: legacy.user_form_url.clone(),
            graph_form_url: legacy.graph_form_url.clone(),
            entries: FormEntries {
                student: legacy.student_entry.clone(),
                plan: legacy.plan_entry.clone(),
                track: legacy.track_entry.clone(),
                capstone: legacy.capstone_entry.clone(),
                map: legacy.map_entry.clone(),
            },
            plan_id: config.catalog.plan_id.clone(),
        })
    }

    /// Backend variant this configuration selects
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Offline { .. } => BackendKind::Local,
            Self::Remote(_) => BackendKind::Remote,
            Self::Legacy(_) => BackendKind::Legacy,
        }
    }
}

/// The one backend active for an orchestrator's lifetime
#[derive(Debug)]
pub enum ActiveBackend {
    /// Local durable store
    Local(LocalStore),
    /// Remote structured store
    Remote(RemoteStore),
    /// Legacy spreadsheet store
    Legacy(LegacyStore),
}

impl ActiveBackend {
    /// Build the backend described by `config`.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be created from the settings.
    pub fn build(config: &BackendConfig) -> Result<Self> {
        Ok(match config {
            BackendConfig::Offline { dir } => Self::Local(LocalStore::new(dir.clone())),
            BackendConfig::Remote(settings) => Self::Remote(RemoteStore::connect(settings)?),
            BackendConfig::Legacy(settings) => Self::Legacy(LegacyStore::connect(settings.clone())?),
        })
    }

    fn reader(&self) -> &dyn StorageBackend {
        match self {
            Self::Local(store) => store,
            Self::Remote(store) => store,
            Self::Legacy(store) => store,
        }
    }

    /// Variant of the active backend
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.reader().kind()
    }

    fn store(&self, student_id: &str, state: &NormalizedState) -> SaveOutcome {
        let durable: &dyn DurableWrite = match self {
            Self::Local(store) => store,
            Self::Remote(store) => store,
            Self::Legacy(store) => {
                store.submit(student_id, state);
                return SaveOutcome::Unconfirmed;
            }
        };
        durable
            .write(student_id, state)
            .map_or_else(SaveOutcome::Failed, |()| SaveOutcome::Confirmed)
    }
}

/// Result of a write through the orchestrator
#[derive(Debug)]
pub enum SaveOutcome {
    /// The backend confirmed the write
    Confirmed,
    /// Handed to a backend that never confirms; durability unknown
    Unconfirmed,
    /// The write did not happen
    Failed(StorageError),
}

impl SaveOutcome {
    /// `true` only for confirmed writes
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// `true` for failed writes
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Unified read/write surface over the active backend
///
/// Reads never fail from the caller's point of view: backend errors are
/// logged and reported as "no record". Writes report a [`SaveOutcome`] and
/// never panic. Writes are full-state overwrites, so the last one to complete
/// wins.
#[derive(Debug)]
pub struct SyncOrchestrator {
    backend: ActiveBackend,
    plan: PlanIdentity,
}

impl SyncOrchestrator {
    /// Orchestrator over an already-built backend
    #[must_use]
    pub const fn new(backend: ActiveBackend, plan: PlanIdentity) -> Self {
        Self { backend, plan }
    }

    /// Build the backend selected by `config` and wrap it.
    ///
    /// # Errors
    /// Returns an error if the selected backend cannot be created.
    pub fn from_config(config: &BackendConfig, plan: PlanIdentity) -> Result<Self> {
        let backend = ActiveBackend::build(config)?;
        info!("Using {} backend for plan {}", backend.kind(), plan.plan_id);
        Ok(Self::new(backend, plan))
    }

    /// Variant of the active backend
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The active backend
    #[must_use]
    pub const fn backend(&self) -> &ActiveBackend {
        &self.backend
    }

    /// Plan reported for students with prior state
    #[must_use]
    pub const fn plan(&self) -> &PlanIdentity {
        &self.plan
    }

    /// Which plan the student has prior state for, if any.
    #[must_use]
    pub fn query_enrollment(&self, student_id: &str) -> Option<PlanIdentity> {
        match self.backend.reader().enrollments(student_id, &self.plan) {
            Ok(plans) => plans.into_iter().next(),
            Err(e) => {
                warn!("Enrollment lookup for {student_id} failed, treating as new student: {e}");
                None
            }
        }
    }

    /// Read the student's state, keeping failures distinct from absence.
    ///
    /// # Errors
    /// Returns the backend error on transport, authentication or parse failures.
    pub fn try_load_state(&self, student_id: &str) -> Result<Option<NormalizedState>> {
        debug!("Loading state for {student_id} from {} backend", self.backend.kind());
        self.backend.reader().read(student_id)
    }

    /// Read the student's normalized state; failures read as absent.
    #[must_use]
    pub fn load_normalized(&self, student_id: &str) -> Option<NormalizedState> {
        self.try_load_state(student_id).unwrap_or_else(|e| {
            warn!("Loading state for {student_id} failed, showing an empty plan: {e}");
            None
        })
    }

    /// Read the student's plan map; absent or unreadable state gives an empty map.
    #[must_use]
    pub fn load_state(&self, student_id: &str) -> PlanMap {
        self.load_normalized(student_id)
            .map(|state| codec::decode(&state))
            .unwrap_or_default()
    }

    /// Encode and write the student's plan map.
    pub fn save_state(&self, student_id: &str, map: &PlanMap) -> SaveOutcome {
        let student_id = match validate_student_id(student_id) {
            Ok(id) => id,
            Err(e) => return SaveOutcome::Failed(e),
        };
        let state = codec::encode(map);
        debug!(
            "Saving {} courses for {student_id} to {} backend",
            state.course_count(),
            self.backend.kind()
        );
        let outcome = self.backend.store(student_id, &state);
        if let SaveOutcome::Failed(e) = &outcome {
            error!("Saving state for {student_id} failed: {e}");
        }
        outcome
    }

    /// Record that the student uses a plan, without touching saved courses.
    pub fn register_student(&self, user: &UserIdentity) -> SaveOutcome {
        let result = match &self.backend {
            ActiveBackend::Local(store) => store.ensure_student(&user.student_id),
            ActiveBackend::Remote(store) => store.touch(&user.student_id),
            ActiveBackend::Legacy(store) => {
                if let Err(e) = validate_student_id(&user.student_id) {
                    return SaveOutcome::Failed(e);
                }
                store.submit_login(user);
                return SaveOutcome::Unconfirmed;
            }
        };
        match result {
            Ok(()) => SaveOutcome::Confirmed,
            Err(e) => {
                error!("Registering {} failed: {e}", user.student_id);
                SaveOutcome::Failed(e)
            }
        }
    }
}
