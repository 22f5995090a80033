//! Degree-plan catalog: the read-only course list and credit requirements

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::Path;

/// Catalog shipped with the binary
const EMBEDDED_CATALOG: &str = include_str!("../../assets/catalog/biomedica-2022.toml");

/// Category a catalog course belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Introductory common core; grades do not count toward the average
    #[serde(alias = "CBC", alias = "CPU")]
    CommonCore,
    /// Mandatory course
    #[serde(alias = "Materias Obligatorias")]
    Mandatory,
    /// Elective course; credits count toward the elective requirement
    #[serde(alias = "Materias Electivas")]
    Elective,
    /// Capstone work (thesis or final project)
    #[serde(alias = "Fin de Carrera", alias = "Fin de Carrera (Obligatorio)")]
    Capstone,
    /// Anything else
    #[serde(other)]
    Other,
}

impl Category {
    /// Whether courses of this category count as regular subjects in course totals
    #[must_use]
    pub const fn counts_as_subject(self) -> bool {
        !matches!(self, Self::CommonCore | Self::Capstone)
    }
}

/// A course of the degree plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCourse {
    /// Course code (e.g., "61.03")
    pub id: String,
    /// Course name
    pub name: String,
    /// Credits awarded on approval
    #[serde(default)]
    pub credits: u32,
    /// Minimum accumulated credits required to enroll
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_credits: Option<u32>,
    /// Prerequisite ids separated by `-` (e.g., "61.03-61.08")
    #[serde(default)]
    pub prerequisites: String,
    /// Course category
    pub category: Category,
}

impl CatalogCourse {
    /// Prerequisite ids parsed from the expression
    #[must_use]
    pub fn prerequisite_ids(&self) -> Vec<&str> {
        self.prerequisites
            .split('-')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// A non-course requirement tracked as a checkbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckboxCredit {
    /// Full name; doubles as the plan map flag name
    pub name: String,
    /// Short label
    pub short_name: String,
    /// Display color tag
    #[serde(default)]
    pub color: String,
    /// Counts like a mandatory course toward completion
    #[serde(default)]
    pub counts_as_course: bool,
}

/// Credit requirements of a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequirements {
    /// Credits required to graduate
    pub total: u32,
    /// Elective credits required
    #[serde(default)]
    pub electives: u32,
    /// Checkbox requirements
    #[serde(default, rename = "checkbox")]
    pub checkboxes: Vec<CheckboxCredit>,
}

/// A degree plan definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreePlan {
    /// Plan identifier (e.g., "biomedica-2022")
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Year the plan took effect
    #[serde(default)]
    pub year: Option<u16>,
    /// Credit requirements
    pub credits: CreditRequirements,
    /// Courses of the plan
    #[serde(default)]
    pub courses: Vec<CatalogCourse>,
}

impl DegreePlan {
    /// Parse a plan from TOML
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or a course id is duplicated.
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let plan: Self = toml::from_str(toml_str)?;
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = plan.courses.iter().find(|c| !seen.insert(c.id.as_str())) {
            return Err(format!("Duplicate course id '{}' in plan '{}'", dup.id, plan.id).into());
        }
        Ok(plan)
    }

    /// Load a plan from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The plan shipped with the binary
    ///
    /// # Panics
    /// Panics if the embedded catalog is invalid, which is a build defect.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(EMBEDDED_CATALOG).expect("Failed to parse compiled-in catalog")
    }

    /// Look up a course by id
    #[must_use]
    pub fn course(&self, id: &str) -> Option<&CatalogCourse> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Courses of one category
    pub fn courses_in(&self, category: Category) -> impl Iterator<Item = &CatalogCourse> {
        self.courses.iter().filter(move |c| c.category == category)
    }
}
