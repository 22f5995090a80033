//! Course record model

use serde::{Deserialize, Serialize};

/// Grade recorded for a course that is regularized but not yet approved.
pub const REGULARIZED_GRADE: i32 = -1;

/// Canonical grade recorded for a course that was not approved.
pub const NOT_APPROVED_GRADE: i32 = -3;

/// Status implied by a grade value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeStatus {
    /// Approved with the given numeric grade
    Approved(i32),
    /// Coursework done, final approval pending
    Regularized,
    /// Explicitly not approved
    NotApproved,
}

impl GradeStatus {
    /// Classify a raw grade: `>= 0` approved, `-1` regularized, any other negative not approved.
    #[must_use]
    pub const fn from_grade(grade: i32) -> Self {
        if grade >= 0 {
            Self::Approved(grade)
        } else if grade == REGULARIZED_GRADE {
            Self::Regularized
        } else {
            Self::NotApproved
        }
    }
}

/// A single course entry of a plan map
///
/// Older saved maps used `nota` for the grade; it is accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course code, unique within a plan (e.g., "61.03")
    #[serde(default)]
    pub id: String,

    /// Grade code (see [`GradeStatus`])
    #[serde(alias = "nota")]
    pub grade: i32,
}

impl CourseRecord {
    /// Create a new course record
    #[must_use]
    pub fn new(id: impl Into<String>, grade: i32) -> Self {
        Self {
            id: id.into(),
            grade,
        }
    }

    /// Status implied by this record's grade
    #[must_use]
    pub const fn status(&self) -> GradeStatus {
        GradeStatus::from_grade(self.grade)
    }
}
