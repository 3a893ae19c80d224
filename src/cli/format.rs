// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Formatting helpers for command output.

use chrono::{DateTime, Utc};

use crate::alerts::ScaleDownOutcome;
use crate::audit::Event;
use crate::inventory::EnvironmentSummary;

/// Print environments as a table.
pub fn print_environments_human(envs: &[EnvironmentSummary], now: DateTime<Utc>) {
    println!("Environments ({})", envs.len());
    println!("  Team         | Name                 | Ready | Age      | CPU      | Memory     | Service");
    println!("  -------------+----------------------+-------+----------+----------+------------+----------------------");
    for env in envs {
        println!("{}", environment_row(env, now));
    }
}

/// One table row for an environment.
pub fn environment_row(env: &EnvironmentSummary, now: DateTime<Utc>) -> String {
    let age = env
        .status
        .created
        .map(|created| format_age((now - created).num_seconds().max(0) as u64))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "  {:12} | {:20} | {:>2}/{:<2} | {:8} | {:>8} | {:>10} | {}",
        truncate(&env.spec.team, 12),
        truncate(&env.spec.name, 20),
        env.status.ready,
        env.status.replicas,
        age,
        format_millicores(env.status.cpu_used_m),
        format_mebibytes(env.status.mem_used_mi),
        env.status.service.as_deref().unwrap_or("-")
    )
}

pub fn print_events_human(events: &[Event]) {
    if events.is_empty() {
        println!("No events");
        return;
    }
    for event in events {
        println!("{}", event.to_log_string());
    }
}

pub fn print_outcome_human(outcome: &ScaleDownOutcome) {
    println!(
        "Scaled: {}   Skipped: {}   Failed: {}",
        outcome.scaled.len(),
        outcome.skipped,
        outcome.failed.len()
    );
    for target in &outcome.scaled {
        println!("  scaled {}", target);
    }
    for failure in &outcome.failed {
        println!("  failed {}: {}", failure.target, failure.error);
    }
}

/// Format an age in seconds.
pub fn format_age(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn format_millicores(value: Option<f64>) -> String {
    match value {
        Some(m) if m >= 1000.0 => format!("{:.2}", m / 1000.0),
        Some(m) => format!("{:.0}m", m),
        None => "-".to_string(),
    }
}

pub fn format_mebibytes(value: Option<f64>) -> String {
    match value {
        Some(mi) if mi >= 1024.0 => format!("{:.1} GiB", mi / 1024.0),
        Some(mi) => format!("{:.1} MiB", mi),
        None => "-".to_string(),
    }
}

/// Truncate a string to a maximum length in characters.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
