// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subcommand implementations.
//!
//! Each takes the arguments after its own name and returns an exit code.

use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::args::{self, ParsedArgs};
use super::format::{print_environments_human, print_events_human, print_outcome_human};
use super::{Context, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};
use crate::alerts::AlertBatch;
use crate::audit::{AuditFilter, EventKind};
use crate::config::Settings;
use crate::environment::EnvironmentSpec;

/// `apply <spec.json|->`: dispatch an apply and wait for it to finish.
pub async fn run_apply(ctx: &Context, argv: &[String]) -> i32 {
    let parsed = match parse_or_usage(argv, &[], &[]) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(source) = parsed.positional.first() else {
        eprintln!("Usage: devbox apply <spec.json|->");
        return EXIT_USAGE;
    };

    let spec: EnvironmentSpec = match read_json(source) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Cannot read spec: {}", e);
            return EXIT_USAGE;
        }
    };

    let submission = match ctx.dispatcher().submit(spec) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid spec: {}", e);
            return EXIT_FAILURE;
        }
    };
    print_json(&submission);

    match submission.handle.await {
        Ok(Ok(_)) => {
            print_json(&json!({"status": "ready", "team": submission.team, "name": submission.name}));
            EXIT_OK
        }
        Ok(Err(e)) => {
            eprintln!("Apply failed: {}", e);
            EXIT_FAILURE
        }
        Err(e) => {
            eprintln!("Apply task did not complete: {}", e);
            EXIT_FAILURE
        }
    }
}

/// `delete <team> <name> [--owner O]`
pub async fn run_delete(ctx: &Context, argv: &[String]) -> i32 {
    let parsed = match parse_or_usage(argv, &["--owner"], &[]) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let [team, name] = parsed.positional.as_slice() else {
        eprintln!("Usage: devbox delete <team> <name> [--owner OWNER]");
        return EXIT_USAGE;
    };

    match ctx.reconciler().delete(team, name, parsed.value("--owner")).await {
        Ok(()) => {
            print_json(&json!({"status": "deleting", "team": team.to_lowercase(), "name": name.to_lowercase()}));
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Delete failed: {}", e);
            EXIT_FAILURE
        }
    }
}

/// `list [--team T] [--json]`
pub async fn run_list(ctx: &Context, argv: &[String]) -> i32 {
    let parsed = match parse_or_usage(argv, &["--team"], &["--json"]) {
        Ok(p) => p,
        Err(code) => return code,
    };

    match ctx.inventory().list_environments(parsed.value("--team")).await {
        Ok(envs) => {
            if parsed.switch("--json") {
                print_json(&envs);
            } else {
                print_environments_human(&envs, Utc::now());
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("List failed: {}", e);
            EXIT_FAILURE
        }
    }
}

/// `events [--limit N] [--json]`
pub fn run_events(ctx: &Context, argv: &[String]) -> i32 {
    let parsed = match parse_or_usage(argv, &["--limit"], &["--json"]) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let limit = match parsed.number("--limit") {
        Ok(limit) => limit,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_USAGE;
        }
    };

    let events = ctx.inventory().tail_events(limit);
    if parsed.switch("--json") {
        print_json(&events);
    } else {
        print_events_human(&events);
    }
    EXIT_OK
}

/// `audit [--team T] [--owner O] [--kind K] [--limit N]`, one JSON record per line.
pub fn run_audit(ctx: &Context, argv: &[String]) -> i32 {
    let parsed = match parse_or_usage(argv, &["--team", "--owner", "--kind", "--limit"], &[]) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let kind = match parsed.value("--kind").map(str::parse::<EventKind>).transpose() {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_USAGE;
        }
    };
    let limit = match parsed.number("--limit") {
        Ok(limit) => limit,
        Err(e) => {
            eprintln!("{}", e);
            return EXIT_USAGE;
        }
    };

    let filter = AuditFilter {
        namespace: parsed.value("--team").map(str::to_string),
        kind,
        owner: parsed.value("--owner").map(str::to_string),
    };
    for event in ctx.inventory().query_audit(&filter, limit) {
        match event.to_json() {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Cannot encode event: {}", e),
        }
    }
    EXIT_OK
}

/// `alerts <batch.json|-> [--json]`
pub async fn run_alerts(ctx: &Context, argv: &[String]) -> i32 {
    let parsed = match parse_or_usage(argv, &[], &["--json"]) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Some(source) = parsed.positional.first() else {
        eprintln!("Usage: devbox alerts <batch.json|->");
        return EXIT_USAGE;
    };

    let batch: AlertBatch = match read_json(source) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("Cannot read alert batch: {}", e);
            return EXIT_USAGE;
        }
    };

    let outcome = ctx.idle_handler().handle(&batch).await;
    if parsed.switch("--json") {
        print_json(&outcome);
    } else {
        print_outcome_human(&outcome);
    }

    if outcome.failed.is_empty() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

/// `config show`
pub fn run_config_show(settings: &Settings) -> i32 {
    print_toml(settings)
}

/// `config defaults`
pub fn run_config_defaults() -> i32 {
    print_toml(&Settings::default())
}

/// `config validate`: load from `path` plus the environment and report.
pub fn run_config_validate(path: Option<&Path>) -> i32 {
    match Settings::load(path) {
        Ok(_) => {
            println!("Configuration is valid");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            EXIT_USAGE
        }
    }
}

fn print_toml(settings: &Settings) -> i32 {
    match settings.to_toml() {
        Ok(text) => {
            print!("{}", text);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Cannot render configuration: {}", e);
            EXIT_FAILURE
        }
    }
}

fn parse_or_usage(argv: &[String], value_flags: &[&str], switch_flags: &[&str]) -> Result<ParsedArgs, i32> {
    args::parse(argv, value_flags, switch_flags).map_err(|e| {
        eprintln!("{}", e);
        EXIT_USAGE
    })
}

/// Read and decode JSON from a file, or stdin for `-`.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(source: &str) -> Result<T, String> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("stdin: {}", e))?;
        buf
    } else {
        std::fs::read_to_string(source).map_err(|e| format!("{}: {}", source, e))?
    };
    serde_json::from_str(&text).map_err(|e| format!("{}: {}", source, e))
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Cannot encode output: {}", e),
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
