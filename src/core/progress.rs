//! Progress statistics derived from a student's state and the degree plan

use crate::core::codec;
use crate::core::models::{Category, DegreePlan, NormalizedState};
use serde::Serialize;

/// Status of one checkbox requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckboxStatus {
    /// Full name
    pub name: String,
    /// Short label
    pub short_name: String,
    /// Display color tag
    pub color: String,
    /// Whether the requirement is fulfilled
    pub checked: bool,
}

/// Snapshot of a student's progress through a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Approved subject courses
    pub approved_count: usize,
    /// Subject courses in the plan (common core and capstone excluded)
    pub total_course_count: usize,
    /// Mandatory courses, plus checkbox requirements that count as courses
    pub mandatory_total: usize,
    /// Approved mandatory courses, plus fulfilled course-like checkboxes
    pub mandatory_approved: usize,
    /// `0..=100`
    pub mandatory_percent: u32,
    /// Credits from approved electives
    pub elective_credits: u32,
    /// Elective credits required by the plan
    pub elective_credits_required: u32,
    /// `0..=100`
    pub elective_percent: u32,
    /// Credits from every approved plan course
    pub credits_earned: u32,
    /// `0..=100`, against the plan's total credits
    pub total_percent: u32,
    /// Checkbox requirements in plan order
    pub checkboxes: Vec<CheckboxStatus>,
    /// Mean grade excluding common core; `None` when nothing qualifies
    pub grade_average: Option<f64>,
}

/// Percentage rounded to the nearest integer and clamped to 100.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(part: f64, whole: f64) -> u32 {
    if whole <= 0.0 {
        return 0;
    }
    (100.0 * part / whole).round().clamp(0.0, 100.0) as u32
}

/// Compute the progress snapshot. Pure; neither input is modified.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute(state: &NormalizedState, plan: &DegreePlan) -> ProgressSnapshot {
    let subjects: Vec<_> = plan
        .courses
        .iter()
        .filter(|c| c.category.counts_as_subject())
        .collect();
    let approved_count = subjects.iter().filter(|c| state.is_approved(&c.id)).count();

    let checkboxes: Vec<CheckboxStatus> = plan
        .credits
        .checkboxes
        .iter()
        .map(|c| CheckboxStatus {
            name: c.name.clone(),
            short_name: c.short_name.clone(),
            color: c.color.clone(),
            checked: codec::flag_is_set(state, &c.name).unwrap_or(false),
        })
        .collect();
    let course_like: Vec<bool> = plan
        .credits
        .checkboxes
        .iter()
        .zip(&checkboxes)
        .filter(|(def, _)| def.counts_as_course)
        .map(|(_, status)| status.checked)
        .collect();

    let mandatory_total = plan.courses_in(Category::Mandatory).count() + course_like.len();
    let mandatory_approved = plan
        .courses_in(Category::Mandatory)
        .filter(|c| state.is_approved(&c.id))
        .count()
        + course_like.iter().filter(|&&checked| checked).count();

    let elective_credits: u32 = plan
        .courses_in(Category::Elective)
        .filter(|c| state.is_approved(&c.id))
        .map(|c| c.credits)
        .sum();
    let elective_required = plan.credits.electives;

    let credits_earned: u32 = plan
        .courses
        .iter()
        .filter(|c| state.is_approved(&c.id))
        .map(|c| c.credits)
        .sum();

    let graded: Vec<i32> = state
        .approved
        .iter()
        .filter(|a| {
            plan.course(&a.id)
                .is_some_and(|c| c.category != Category::CommonCore)
        })
        .map(|a| a.grade)
        .collect();
    let grade_average = (!graded.is_empty()).then(|| {
        let mean = f64::from(graded.iter().sum::<i32>()) / graded.len() as f64;
        (mean * 100.0).round() / 100.0
    });

    ProgressSnapshot {
        approved_count,
        total_course_count: subjects.len(),
        mandatory_total,
        mandatory_approved,
        mandatory_percent: percent(mandatory_approved as f64, mandatory_total as f64),
        elective_credits,
        elective_credits_required: elective_required,
        elective_percent: percent(f64::from(elective_credits), f64::from(elective_required.max(1))),
        credits_earned,
        total_percent: percent(f64::from(credits_earned), f64::from(plan.credits.total)),
        checkboxes,
        grade_average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ApprovedCourse;

    const PLAN: &str = r#"
id = "test-plan"

[credits]
total = 40
electives = 8

[[credits.checkbox]]
name = "Proficiency test"
short_name = "Proficiency"
color = "blue"
counts_as_course = true

[[credits.checkbox]]
name = "Professional practicum"
short_name = "Practicum"

[[courses]]
id = "CBC.1"
name = "Intro"
credits = 6
category = "common-core"

[[courses]]
id = "M1"
name = "Mandatory one"
credits = 8
category = "mandatory"

[[courses]]
id = "M2"
name = "Mandatory two"
credits = 8
category = "mandatory"

[[courses]]
id = "E1"
name = "Elective one"
credits = 4
category = "elective"

[[courses]]
id = "E2"
name = "Elective two"
credits = 6
category = "elective"

[[courses]]
id = "TP"
name = "Thesis"
credits = 12
category = "capstone"
"#;

    fn plan() -> DegreePlan {
        DegreePlan::from_toml(PLAN).unwrap()
    }

    fn approved(pairs: &[(&str, i32)]) -> NormalizedState {
        NormalizedState {
            approved: pairs
                .iter()
                .map(|(id, grade)| ApprovedCourse {
                    id: (*id).to_string(),
                    grade: *grade,
                })
                .collect(),
            ..NormalizedState::default()
        }
    }

    #[test]
    fn test_empty_state() {
        let snapshot = compute(&NormalizedState::default(), &plan());
        assert_eq!(snapshot.approved_count, 0);
        assert_eq!(snapshot.total_course_count, 4);
        assert_eq!(snapshot.mandatory_total, 3);
        assert_eq!(snapshot.mandatory_percent, 0);
        assert_eq!(snapshot.elective_percent, 0);
        assert_eq!(snapshot.grade_average, None);
        assert!(snapshot.checkboxes.iter().all(|c| !c.checked));
    }

    #[test]
    fn test_counts_skip_common_core_and_capstone() {
        let snapshot = compute(&approved(&[("CBC.1", 10), ("TP", 9), ("M1", 7)]), &plan());
        assert_eq!(snapshot.approved_count, 1);
        assert_eq!(snapshot.credits_earned, 26);
    }

    #[test]
    fn test_mandatory_includes_course_like_checkbox() {
        let mut state = approved(&[("M1", 7)]);
        state.language_requirement = true;
        state.professional_practice = true;
        let snapshot = compute(&state, &plan());
        assert_eq!(snapshot.mandatory_approved, 2);
        assert_eq!(snapshot.mandatory_total, 3);
        assert_eq!(snapshot.mandatory_percent, 67);
        assert!(snapshot.checkboxes.iter().all(|c| c.checked));
        assert_eq!(snapshot.checkboxes[0].color, "blue");
    }

    #[test]
    fn test_no_mandatory_courses_is_zero_percent() {
        let plan = DegreePlan::from_toml(
            "id = \"empty\"\n[credits]\ntotal = 0\n[[courses]]\nid = \"E\"\nname = \"E\"\ncategory = \"elective\"\n",
        )
        .unwrap();
        let snapshot = compute(&approved(&[("E", 8)]), &plan);
        assert_eq!(snapshot.mandatory_total, 0);
        assert_eq!(snapshot.mandatory_percent, 0);
        assert_eq!(snapshot.total_percent, 0);
        assert_eq!(snapshot.elective_percent, 0);
    }

    #[test]
    fn test_elective_percent_is_clamped() {
        let mut plan = plan();
        plan.credits.electives = 4;
        let snapshot = compute(&approved(&[("E1", 6), ("E2", 7)]), &plan);
        assert_eq!(snapshot.elective_credits, 10);
        assert_eq!(snapshot.elective_percent, 100);
    }

    #[test]
    fn test_elective_percent_rounds() {
        let snapshot = compute(&approved(&[("E1", 6)]), &plan());
        assert_eq!(snapshot.elective_percent, 50);
    }

    #[test]
    fn test_average_excludes_common_core() {
        let snapshot = compute(&approved(&[("CBC.1", 4), ("M1", 7), ("M2", 8), ("E1", 8)]), &plan());
        assert_eq!(snapshot.grade_average, Some(7.67));
    }

    #[test]
    fn test_average_ignores_courses_outside_plan() {
        let snapshot = compute(&approved(&[("M1", 7), ("ZZ.99", 2)]), &plan());
        assert_eq!(snapshot.grade_average, Some(7.0));

        let snapshot = compute(&approved(&[("ZZ.99", 2)]), &plan());
        assert_eq!(snapshot.grade_average, None);
    }

    #[test]
    fn test_average_of_only_common_core_is_none() {
        let snapshot = compute(&approved(&[("CBC.1", 9)]), &plan());
        assert_eq!(snapshot.grade_average, None);
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let state = approved(&[("M1", 7)]);
        let plan = plan();
        let before = (state.clone(), plan.clone());
        let _ = compute(&state, &plan);
        assert_eq!((state, plan), before);
    }
}
