//! Student and plan identity

use serde::{Deserialize, Serialize};

/// Which plan (and optional tracks) a student is enrolled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanIdentity {
    /// Degree plan identifier (e.g., "biomedica-2022")
    pub plan_id: String,
    /// Optional specialization track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    /// Optional capstone track (thesis, professional project, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capstone_track: Option<String>,
}

impl PlanIdentity {
    /// Plan identity without tracks
    #[must_use]
    pub fn new(plan_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            track: None,
            capstone_track: None,
        }
    }
}

/// Whose state is read or written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Student identifier
    pub student_id: String,
    /// Plan the student works on
    #[serde(flatten)]
    pub plan: PlanIdentity,
}

impl UserIdentity {
    /// Identity for a student on a plan without tracks
    #[must_use]
    pub fn new(student_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            plan: PlanIdentity::new(plan_id),
        }
    }

    /// Set the specialization track
    #[must_use]
    pub fn with_track(mut self, track: Option<String>) -> Self {
        self.plan.track = track.filter(|t| !t.is_empty());
        self
    }

    /// Set the capstone track
    #[must_use]
    pub fn with_capstone_track(mut self, capstone: Option<String>) -> Self {
        self.plan.capstone_track = capstone.filter(|t| !t.is_empty());
        self
    }
}
