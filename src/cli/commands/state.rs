//! Handlers for the state commands: backend, enrollment, load, save, register

use super::CommandResult;
use plan_tracker::config::Config;
use plan_tracker::core::models::{PlanMap, UserIdentity};
use plan_tracker::core::sync::{BackendConfig, SaveOutcome, SyncOrchestrator};
use plan_tracker::{info, verbose};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Print the backend the configuration selects. Makes no network calls.
pub fn backend(config: &Config) {
    let selected = BackendConfig::select(config);
    println!("Backend: {}", selected.kind());
    match &selected {
        BackendConfig::Offline { dir: Some(dir) } => println!("Directory: {}", dir.display()),
        BackendConfig::Offline { dir: None } => println!("Directory: (none, state is not persisted)"),
        BackendConfig::Remote(settings) => {
            println!("URL: {}", settings.url);
            println!("Table: {}", settings.table);
        }
        BackendConfig::Legacy(settings) => {
            let url = if settings.spreadsheet_url.is_empty() {
                "(not configured)"
            } else {
                settings.spreadsheet_url.as_str()
            };
            println!("Spreadsheet: {url}");
        }
    }
    println!("Plan: {}", config.catalog.plan_id);
}

/// Print the plan the student has saved state for
pub fn enrollment(sync: &SyncOrchestrator, student: &str) {
    match sync.query_enrollment(student) {
        Some(plan) => {
            println!("{}", plan.plan_id);
            if let Some(track) = &plan.track {
                verbose!("Track: {track}");
            }
            if let Some(capstone) = &plan.capstone_track {
                verbose!("Capstone: {capstone}");
            }
        }
        None => println!("No saved plan for {student}"),
    }
}

/// Print or write the student's plan map as JSON
pub fn load(sync: &SyncOrchestrator, student: &str, output: Option<&Path>) -> CommandResult {
    let map = sync.load_state(student);
    let json = map.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            println!("✓ Wrote {} courses to {}", map.courses.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn read_input(input: &Path) -> io::Result<String> {
    if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(input)
    }
}

fn report(outcome: SaveOutcome, action: &str, student: &str) -> CommandResult {
    match outcome {
        SaveOutcome::Confirmed => {
            println!("✓ {action} {student}");
            Ok(())
        }
        SaveOutcome::Unconfirmed => {
            println!("✓ {action} {student} (submitted; the legacy store does not confirm writes)");
            Ok(())
        }
        SaveOutcome::Failed(e) => Err(e.into()),
    }
}

/// Save a plan map read from a JSON file (or stdin)
pub fn save(sync: &SyncOrchestrator, student: &str, input: &Path) -> CommandResult {
    let map = PlanMap::from_json(&read_input(input)?)?;
    info!("Read {} courses from {}", map.courses.len(), input.display());
    report(sync.save_state(student, &map), "Saved", student)
}

/// Register the student for the configured plan
pub fn register(
    sync: &SyncOrchestrator,
    student: &str,
    track: Option<String>,
    capstone: Option<String>,
) -> CommandResult {
    let user = UserIdentity::new(student, sync.plan().plan_id.as_str())
        .with_track(track)
        .with_capstone_track(capstone);
    report(sync.register_student(&user), "Registered", student)
}
