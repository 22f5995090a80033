//! Normalized academic state (the storage-facing representation)

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// An approved course with its grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedCourse {
    /// Course code
    pub id: String,
    /// Numeric grade (`>= 0`)
    #[serde(alias = "nota")]
    pub grade: i32,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Categorized, storage-agnostic academic state
///
/// A course id appears in at most one of `approved`, `regularized` and
/// `not_approved`. Missing fields deserialize to empty/false so partially
/// written records still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedState {
    /// Approved courses in source order
    #[serde(default, deserialize_with = "null_as_default")]
    pub approved: Vec<ApprovedCourse>,
    /// Regularized course ids
    #[serde(default, deserialize_with = "null_as_default")]
    pub regularized: BTreeSet<String>,
    /// Not-approved course ids
    #[serde(default, deserialize_with = "null_as_default")]
    pub not_approved: BTreeSet<String>,
    /// Language requirement fulfilled
    #[serde(default, deserialize_with = "null_as_default")]
    pub language_requirement: bool,
    /// Professional practice fulfilled
    #[serde(default, deserialize_with = "null_as_default")]
    pub professional_practice: bool,
}

impl NormalizedState {
    /// Grade of an approved course
    #[must_use]
    pub fn approved_grade(&self, id: &str) -> Option<i32> {
        self.approved.iter().find(|c| c.id == id).map(|c| c.grade)
    }

    /// `true` if the course is approved
    #[must_use]
    pub fn is_approved(&self, id: &str) -> bool {
        self.approved.iter().any(|c| c.id == id)
    }

    /// Number of distinct course ids across all buckets
    #[must_use]
    pub fn course_count(&self) -> usize {
        self.approved.len() + self.regularized.len() + self.not_approved.len()
    }

    /// `true` when no course is recorded and no flag is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.course_count() == 0 && !self.language_requirement && !self.professional_practice
    }
}
