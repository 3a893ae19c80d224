// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for settings loading.

use std::collections::HashMap;
use std::io::Write;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_match_documented_values() {
    let settings = Settings::default();
    assert_eq!(settings.backend, BackendKind::Kubectl);
    assert_eq!(settings.audit.path, PathBuf::from("/data/audit.jsonl"));
    assert_eq!(settings.audit.max_bytes, 5_242_880);
    assert_eq!(settings.audit.mirror_capacity, 200);
    assert_eq!(settings.service.service_type, ServiceType::ClusterIp);
    assert!(settings.service.node_port.is_none());
    assert!(settings.autoscaler.enabled);
    assert_eq!(settings.autoscaler.min_replicas, 1);
    assert_eq!(settings.autoscaler.max_replicas, 5);
    assert_eq!(settings.autoscaler.cpu_utilization, 70);
    assert_eq!(settings.autoscaler.memory_utilization, 80);
    assert_eq!(settings.autoscaler.scale_down_stabilization_secs, 60);
    assert_eq!(settings.alerts.idle_alert_name, "EnvIdleCPU");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_env_overrides() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[
        ("EVENT_LOG_MAX", "50"),
        ("AUDIT_PATH", "/tmp/audit.jsonl"),
        ("AUDIT_MAX_BYTES", "1024"),
        ("SERVICE_TYPE", "NodePort"),
        ("NODE_PORT", "30080"),
        ("HPA_ENABLED", "FALSE"),
        ("HPA_MIN", "2"),
        ("HPA_MAX", "8"),
        ("HPA_SD_STAB", "120"),
        ("DEVBOX_BACKEND", "memory"),
    ]));

    assert_eq!(settings.backend, BackendKind::Memory);
    assert_eq!(settings.audit.mirror_capacity, 50);
    assert_eq!(settings.audit.path, PathBuf::from("/tmp/audit.jsonl"));
    assert_eq!(settings.audit.max_bytes, 1024);
    assert_eq!(settings.service.service_type, ServiceType::NodePort);
    assert_eq!(settings.service.pinned_node_port(), Some(30080));
    assert!(!settings.autoscaler.enabled);
    assert_eq!(settings.autoscaler.min_replicas, 2);
    assert_eq!(settings.autoscaler.max_replicas, 8);
    assert_eq!(settings.autoscaler.scale_down_stabilization_secs, 120);
}

#[test]
fn test_env_int_accepts_floats_and_falls_back() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("HPA_MAX", "7.9"), ("HPA_MIN", "many"), ("EVENT_LOG_MAX", "")]));
    assert_eq!(settings.autoscaler.max_replicas, 7);
    assert_eq!(settings.autoscaler.min_replicas, 1);
    assert_eq!(settings.audit.mirror_capacity, 200);
}

#[test]
fn test_node_port_requires_digits_and_node_port_type() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("NODE_PORT", "30080")]));
    assert_eq!(settings.service.node_port, Some(30080));
    assert_eq!(settings.service.pinned_node_port(), None);

    let mut settings = Settings::default();
    settings.apply_env(env(&[("SERVICE_TYPE", "NodePort"), ("NODE_PORT", "30o80")]));
    assert_eq!(settings.service.pinned_node_port(), None);
}

#[test]
fn test_unknown_service_type_ignored() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("SERVICE_TYPE", "Headless")]));
    assert_eq!(settings.service.service_type, ServiceType::ClusterIp);
}

#[test]
fn test_toml_partial_file_keeps_defaults() {
    let settings = Settings::from_toml(
        r#"
backend = "memory"

[audit]
path = "/var/lib/devbox/audit.jsonl"

[autoscaler]
max_replicas = 3
"#,
    )
    .unwrap();

    assert_eq!(settings.backend, BackendKind::Memory);
    assert_eq!(settings.audit.path, PathBuf::from("/var/lib/devbox/audit.jsonl"));
    assert_eq!(settings.audit.mirror_capacity, 200);
    assert_eq!(settings.autoscaler.max_replicas, 3);
    assert_eq!(settings.autoscaler.min_replicas, 1);
}

#[test]
fn test_toml_roundtrip_of_defaults() {
    let text = Settings::default().to_toml().unwrap();
    assert_eq!(Settings::from_toml(&text).unwrap(), Settings::default());
}

#[test]
fn test_from_file_errors() {
    let missing = Settings::from_file(Path::new("/nonexistent/devbox.toml"));
    assert!(matches!(missing, Err(ConfigError::Read { .. })));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "backend = [").unwrap();
    let parse = Settings::from_file(file.path());
    assert!(matches!(parse, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_validate_rejects_bad_bounds() {
    let mut settings = Settings::default();
    settings.autoscaler.min_replicas = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.autoscaler.min_replicas = 6;
    let err = settings.validate().unwrap_err();
    assert!(err.to_string().contains("autoscaler.max_replicas"));

    let mut settings = Settings::default();
    settings.autoscaler.cpu_utilization = 150;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.audit.mirror_capacity = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_oversized_env_values_keep_slots_in_range() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("HPA_MAX", "5000000000"), ("HPA_SD_STAB", "1e30")]));
    assert_eq!(settings.autoscaler.max_replicas, 5);
    assert_eq!(settings.autoscaler.scale_down_stabilization_secs, 60);

    settings.apply_env(env(&[("HPA_MAX", "-3")]));
    assert_eq!(settings.autoscaler.max_replicas, 0);
}

#[test]
fn test_huge_mirror_capacity_rejected_before_allocation() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[("EVENT_LOG_MAX", "1e30")]));
    let err = settings.validate().unwrap_err();
    assert!(err.to_string().contains("audit.mirror_capacity"));

    let mut settings = Settings::default();
    settings.audit.mirror_capacity = MAX_MIRROR_CAPACITY;
    assert!(settings.validate().is_ok());
    settings.audit.mirror_capacity = MAX_MIRROR_CAPACITY + 1;
    assert!(settings.validate().is_err());
}
