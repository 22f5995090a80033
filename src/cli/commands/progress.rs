//! Progress command handler

use super::CommandResult;
use plan_tracker::config::Config;
use plan_tracker::core::models::DegreePlan;
use plan_tracker::core::progress::{self, ProgressSnapshot};
use plan_tracker::core::sync::SyncOrchestrator;
use plan_tracker::{debug, warn};
use std::error::Error;

/// Catalog from config `catalog`, or the built-in plan when unset
pub fn load_catalog(config: &Config) -> Result<DegreePlan, Box<dyn Error>> {
    let path = config.catalog.path.trim();
    if path.is_empty() {
        debug!("Using built-in catalog");
        return Ok(DegreePlan::embedded());
    }
    let plan = DegreePlan::from_file(path)
        .map_err(|e| format!("Failed to load catalog {path}: {e}"))?;
    if plan.id != config.catalog.plan_id {
        warn!(
            "Catalog {path} describes plan '{}' but the configured plan is '{}'",
            plan.id, config.catalog.plan_id
        );
    }
    Ok(plan)
}

/// Print progress statistics for the student
pub fn run(sync: &SyncOrchestrator, student: &str, config: &Config, json: bool) -> CommandResult {
    let plan = load_catalog(config)?;
    let state = sync.load_normalized(student).unwrap_or_default();
    let snapshot = progress::compute(&state, &plan);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(student, &plan, &snapshot);
    }
    Ok(())
}

fn print_snapshot(student: &str, plan: &DegreePlan, s: &ProgressSnapshot) {
    let title = if plan.name.is_empty() { &plan.id } else { &plan.name };
    println!("\n=== {title}: {student} ===\n");
    println!(
        "Courses approved:   {} of {}",
        s.approved_count, s.total_course_count
    );
    println!(
        "Mandatory:          {} of {} ({}%)",
        s.mandatory_approved, s.mandatory_total, s.mandatory_percent
    );
    println!(
        "Elective credits:   {} of {} ({}%)",
        s.elective_credits, s.elective_credits_required, s.elective_percent
    );
    println!(
        "Credits:            {} of {} ({}%)",
        s.credits_earned, plan.credits.total, s.total_percent
    );
    for checkbox in &s.checkboxes {
        let mark = if checkbox.checked { "✓" } else { "✗" };
        println!("{:<20}{mark}", format!("{}:", checkbox.short_name));
    }
    match s.grade_average {
        Some(avg) => println!("Average:            {avg:.2}"),
        None => println!("Average:            -"),
    }
}
