//! Conversion between plan maps and normalized state
//!
//! `encode` is lossy (categories, exact failure codes and flag aliases are
//! dropped) but deterministic, and `decode(encode(..))` is a fixed point:
//! encoding and decoding a decoded map yields the same map again.

use crate::core::models::{
    ApprovedCourse, GradeStatus, NormalizedState, PlanMap, NOT_APPROVED_GRADE, REGULARIZED_GRADE,
};
use std::collections::{BTreeSet, HashSet};

/// Canonical flag for the language requirement
pub const LANGUAGE_FLAG: &str = "Proficiency test";

/// Historical names that also mark the language requirement
pub const LANGUAGE_FLAG_ALIASES: [&str; 3] = ["Language exam", "Prueba de suficiencia", "Ingles"];

/// Canonical flag for the professional practice requirement
pub const PRACTICE_FLAG: &str = "Professional practicum";

/// Historical names that also mark the professional practice requirement
pub const PRACTICE_FLAG_ALIASES: [&str; 1] = ["Trabajo profesional"];

/// Boolean requirement a flag name maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Language requirement
    Language,
    /// Professional practice
    ProfessionalPractice,
}

fn same_flag(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Classify a flag name (case-insensitive). Unknown names map to `None`.
#[must_use]
pub fn flag_kind(name: &str) -> Option<FlagKind> {
    if same_flag(name, LANGUAGE_FLAG) || LANGUAGE_FLAG_ALIASES.iter().any(|a| same_flag(name, a)) {
        Some(FlagKind::Language)
    } else if same_flag(name, PRACTICE_FLAG)
        || PRACTICE_FLAG_ALIASES.iter().any(|a| same_flag(name, a))
    {
        Some(FlagKind::ProfessionalPractice)
    } else {
        None
    }
}

/// Whether a checkbox named `name` is ticked in `state`; `None` for unknown names.
#[must_use]
pub fn flag_is_set(state: &NormalizedState, name: &str) -> Option<bool> {
    flag_kind(name).map(|kind| match kind {
        FlagKind::Language => state.language_requirement,
        FlagKind::ProfessionalPractice => state.professional_practice,
    })
}

/// Convert a plan map into normalized state.
///
/// Records are bucketed in three passes so that a course keeps its best known
/// status: approved (`grade >= 0`, first occurrence wins), then regularized
/// (`-1`), then everything else as not approved. Records without an id are
/// skipped.
#[must_use]
pub fn encode(map: &PlanMap) -> NormalizedState {
    let records = || map.courses.iter().filter(|c| !c.id.is_empty());
    let mut seen: HashSet<&str> = HashSet::new();

    let mut approved = Vec::new();
    for record in records() {
        if let GradeStatus::Approved(grade) = record.status() {
            if seen.insert(record.id.as_str()) {
                approved.push(ApprovedCourse {
                    id: record.id.clone(),
                    grade,
                });
            }
        }
    }

    let mut regularized = BTreeSet::new();
    for record in records() {
        if record.status() == GradeStatus::Regularized && seen.insert(record.id.as_str()) {
            regularized.insert(record.id.clone());
        }
    }

    let not_approved: BTreeSet<String> = records()
        .filter(|record| seen.insert(record.id.as_str()))
        .map(|record| record.id.clone())
        .collect();

    let kinds: Vec<FlagKind> = map.flags.iter().filter_map(|f| flag_kind(f)).collect();

    NormalizedState {
        approved,
        regularized,
        not_approved,
        language_requirement: kinds.contains(&FlagKind::Language),
        professional_practice: kinds.contains(&FlagKind::ProfessionalPractice),
    }
}

/// Convert normalized state back into a plan map.
///
/// Approved courses keep their grade, regularized ones get `-1` and not-approved
/// ones `-3`. Ids already emitted by an earlier bucket are skipped, and flags
/// use their canonical names only.
#[must_use]
pub fn decode(state: &NormalizedState) -> PlanMap {
    let mut map = PlanMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for course in &state.approved {
        if seen.insert(course.id.as_str()) {
            map.push_course(course.id.clone(), course.grade);
        }
    }
    for id in &state.regularized {
        if seen.insert(id.as_str()) {
            map.push_course(id.clone(), REGULARIZED_GRADE);
        }
    }
    for id in &state.not_approved {
        if seen.insert(id.as_str()) {
            map.push_course(id.clone(), NOT_APPROVED_GRADE);
        }
    }

    if state.language_requirement {
        map.add_flag(LANGUAGE_FLAG);
    }
    if state.professional_practice {
        map.add_flag(PRACTICE_FLAG);
    }
    map
}
