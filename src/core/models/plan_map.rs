//! Plan map model (the UI-facing plan state)

use super::course::CourseRecord;
use serde::{Deserialize, Serialize};

/// Full UI-facing plan state for one student and plan
///
/// Older saved maps used `materias` and `checkboxes`; both are accepted on input
/// and extra legacy fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMap {
    /// Course entries in source order
    #[serde(default, alias = "materias")]
    pub courses: Vec<CourseRecord>,

    /// Checkbox flag names (e.g., "Proficiency test")
    #[serde(default, alias = "checkboxes", skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

impl PlanMap {
    /// Create an empty plan map
    #[must_use]
    pub const fn new() -> Self {
        Self {
            courses: Vec::new(),
            flags: Vec::new(),
        }
    }

    /// Append a course record
    pub fn push_course(&mut self, id: impl Into<String>, grade: i32) {
        self.courses.push(CourseRecord::new(id, grade));
    }

    /// Add a flag unless already present
    pub fn add_flag(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// First record for a course id
    #[must_use]
    pub fn course(&self, id: &str) -> Option<&CourseRecord> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// `true` when the map has no courses and no flags
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty() && self.flags.is_empty()
    }

    /// Parse a plan map from JSON
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or does not match the plan map shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
