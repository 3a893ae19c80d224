// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

use super::*;

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_positionals_values_and_switches() {
    let parsed = parse(&argv(&["red", "--owner", "ana", "dev", "--json"]), &["--owner"], &["--json"]).unwrap();
    assert_eq!(parsed.positional, vec!["red", "dev"]);
    assert_eq!(parsed.value("--owner"), Some("ana"));
    assert!(parsed.switch("--json"));
    assert_eq!(parsed.value("--team"), None);
}

#[test]
fn test_stdin_dash_is_positional() {
    let parsed = parse(&argv(&["-"]), &[], &[]).unwrap();
    assert_eq!(parsed.positional, vec!["-"]);
}

#[test]
fn test_missing_value_and_unknown_flag() {
    assert_eq!(parse(&argv(&["--limit"]), &["--limit"], &[]).unwrap_err(), "Missing value for --limit");
    assert_eq!(parse(&argv(&["--bogus"]), &["--limit"], &[]).unwrap_err(), "Unknown argument: --bogus");
}

#[test]
fn test_number() {
    let parsed = parse(&argv(&["--limit", "25"]), &["--limit"], &[]).unwrap();
    assert_eq!(parsed.number("--limit"), Ok(Some(25)));
    assert_eq!(parsed.number("--other"), Ok(None));

    let parsed = parse(&argv(&["--limit", "lots"]), &["--limit"], &[]).unwrap();
    assert!(parsed.number("--limit").is_err());
}
