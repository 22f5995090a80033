//! Progress computed from state round-tripped through a backend

use plan_tracker::core::models::{Category, DegreePlan, PlanIdentity, PlanMap};
use plan_tracker::core::progress;
use plan_tracker::core::storage::LocalStore;
use plan_tracker::core::sync::{ActiveBackend, SyncOrchestrator};
use tempfile::TempDir;

fn sync_in(dir: &TempDir) -> SyncOrchestrator {
    SyncOrchestrator::new(
        ActiveBackend::Local(LocalStore::in_dir(dir.path())),
        PlanIdentity::new("biomedica-2022"),
    )
}

#[test]
fn progress_of_saved_plan() {
    let dir = TempDir::new().unwrap();
    let sync = sync_in(&dir);
    let mut map = PlanMap::new();
    map.push_course("61.03", 8);
    map.push_course("61.08", -1);
    map.push_course("61.09", -3);
    map.push_course("CBC.AM", 4);
    map.add_flag("language exam");
    assert!(sync.save_state("12345", &map).is_confirmed());

    let state = sync.load_normalized("12345").unwrap();
    let plan = DegreePlan::embedded();
    let snapshot = progress::compute(&state, &plan);

    assert_eq!(snapshot.approved_count, 1);
    assert_eq!(snapshot.total_course_count, 15);
    // Ten mandatory courses plus the proficiency test
    assert_eq!(snapshot.mandatory_total, 11);
    assert_eq!(snapshot.mandatory_approved, 2);
    assert_eq!(snapshot.mandatory_percent, 18);
    assert_eq!(snapshot.credits_earned, 17);
    assert_eq!(snapshot.total_percent, 7);
    assert_eq!(snapshot.grade_average, Some(8.0));
    assert!(snapshot.checkboxes[0].checked);
    assert!(!snapshot.checkboxes[1].checked);
}

#[test]
fn elective_percent_clamps_when_over_requirement() {
    let plan = DegreePlan::embedded();
    let mut map = PlanMap::new();
    for course in plan.courses_in(Category::Elective) {
        map.push_course(course.id.clone(), 7);
    }
    let state = plan_tracker::core::codec::encode(&map);
    let snapshot = progress::compute(&state, &plan);

    assert!(snapshot.elective_credits > plan.credits.electives);
    assert_eq!(snapshot.elective_percent, 100);
    assert_eq!(snapshot.grade_average, Some(7.0));
}

#[test]
fn empty_state_has_no_average() {
    let snapshot = progress::compute(&Default::default(), &DegreePlan::embedded());
    assert_eq!(snapshot.grade_average, None);
    assert_eq!(snapshot.mandatory_percent, 0);
    assert_eq!(snapshot.credits_earned, 0);
}

#[test]
fn snapshot_serializes_without_average() {
    let snapshot = progress::compute(&Default::default(), &DegreePlan::embedded());
    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json["grade_average"].is_null());
    assert_eq!(json["checkboxes"].as_array().map(Vec::len), Some(2));
}
