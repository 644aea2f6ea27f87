use std::time::SystemTime;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use topoff_core::models::{CoreError, UpdateResult};
use topoff_core::orchestration::UpdateOrchestrator;

pub fn run(orchestrator: &UpdateOrchestrator, clear: bool) -> Result<(), CoreError> {
    if clear {
        orchestrator.clear_history()?;
        println!("History cleared");
        return Ok(());
    }

    let history = orchestrator.snapshot().history;
    if history.is_empty() {
        println!("No upgrades recorded yet");
        return Ok(());
    }

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    for entry in &history {
        print_entry(entry, offset);
    }
    Ok(())
}

fn print_entry(entry: &UpdateResult, offset: UtcOffset) {
    println!(
        "{}  {} package(s)",
        format_timestamp(entry.timestamp, offset),
        entry.count()
    );
    for package in &entry.packages {
        println!(
            "    {} {} -> {}",
            package.name, package.old_version, package.new_version
        );
    }
}

fn format_timestamp(timestamp: SystemTime, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::from(timestamp)
        .to_offset(offset)
        .format(&format)
        .unwrap_or_else(|_| "unknown time".to_string())
}
