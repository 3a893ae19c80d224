// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for spec field validation.

use super::validation::*;

#[test]
fn test_dns1123_accepts_lowercase_alphanumeric_and_hyphens() {
    for value in ["a", "0", "dev", "team-red", "a1-b2-c3", "x--y", "123"] {
        assert!(is_dns1123_label(value), "{:?} should be accepted", value);
    }
}

#[test]
fn test_dns1123_rejects_bad_labels() {
    for value in ["", "-dev", "dev-", "-", "Dev", "DEV", "my_env", "dev.env", "dev env", "dév"] {
        assert!(!is_dns1123_label(value), "{:?} should be rejected", value);
    }
}

#[test]
fn test_validate_label_lowercases_before_matching() {
    assert_eq!(validate_dns1123_label("MyEnv", "name").unwrap(), "myenv");
    assert_eq!(validate_dns1123_label("team-a", "team").unwrap(), "team-a");
}

#[test]
fn test_validate_label_reports_field() {
    let err = validate_dns1123_label("bad_name", "name").unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidLabel { field: "name".to_string(), value: "bad_name".to_string() }
    );
    assert!(err.to_string().contains("DNS-1123"));

    let err = validate_dns1123_label("-team", "team").unwrap_err();
    assert!(matches!(err, ValidationError::InvalidLabel { ref field, .. } if field == "team"));
}

#[test]
fn test_validate_label_empty() {
    assert_eq!(
        validate_dns1123_label("", "team").unwrap_err(),
        ValidationError::EmptyField("team".to_string())
    );
}

#[test]
fn test_validate_image() {
    assert!(validate_image("python:3.12-slim").is_ok());
    assert!(validate_image("registry.local:5000/team/dev@sha256:abcd").is_ok());
    assert!(validate_image("").is_err());
    assert!(validate_image("img; rm -rf /").is_err());
    assert!(validate_image("$(whoami)").is_err());
    assert!(validate_image("-flag").is_err());
    assert!(validate_image(&"a".repeat(MAX_FIELD_LENGTH + 1)).is_err());
}

#[test]
fn test_validate_quantity() {
    for value in ["500m", "1", "1.5", "1Gi", "512Mi", "2G"] {
        assert!(validate_quantity(value, "cpu").is_ok(), "{:?} should be accepted", value);
    }
    for value in ["", "m", "abc", "1Gib", "1 Gi", "-1"] {
        assert!(validate_quantity(value, "cpu").is_err(), "{:?} should be rejected", value);
    }
}
