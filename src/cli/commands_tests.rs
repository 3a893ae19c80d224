// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for subcommand exit codes and side effects.

use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::backend::{BackendHandles, MemoryBackend};
use crate::k8s::ResourceKind;

fn context(dir: &TempDir) -> (Context, Arc<MemoryBackend>) {
    let mut settings = Settings::default();
    settings.audit.path = dir.path().join("audit.jsonl");
    let backend = Arc::new(MemoryBackend::new());
    let handles = BackendHandles { cluster: backend.clone(), usage: backend.clone() };
    (Context::new(settings, handles), backend)
}

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_apply_then_delete() {
    let dir = TempDir::new().unwrap();
    let (ctx, backend) = context(&dir);
    let spec = write(&dir, "spec.json", r#"{"name":"dev","team":"red","base_image":"python:3.12-slim"}"#);

    assert_eq!(run_apply(&ctx, &argv(&[&spec])).await, EXIT_OK);
    assert!(backend.contains(ResourceKind::Workload, "red", "dev"));

    assert_eq!(run_list(&ctx, &argv(&["--team", "red", "--json"])).await, EXIT_OK);
    assert_eq!(run_delete(&ctx, &argv(&["red", "dev", "--owner", "ana"])).await, EXIT_OK);
    assert!(!backend.contains(ResourceKind::Workload, "red", "dev"));
    assert_eq!(ctx.audit.len(), 4);
}

#[tokio::test]
async fn test_apply_usage_and_validation_errors() {
    let dir = TempDir::new().unwrap();
    let (ctx, backend) = context(&dir);

    assert_eq!(run_apply(&ctx, &[]).await, EXIT_USAGE);
    assert_eq!(run_apply(&ctx, &argv(&["/nonexistent/spec.json"])).await, EXIT_USAGE);

    let garbage = write(&dir, "bad.json", "{not json");
    assert_eq!(run_apply(&ctx, &argv(&[&garbage])).await, EXIT_USAGE);

    let invalid = write(&dir, "invalid.json", r#"{"name":"-dev","team":"red","base_image":"img"}"#);
    assert_eq!(run_apply(&ctx, &argv(&[&invalid])).await, EXIT_FAILURE);
    assert!(backend.operations().is_empty());
}

#[tokio::test]
async fn test_delete_usage() {
    let dir = TempDir::new().unwrap();
    let (ctx, _backend) = context(&dir);
    assert_eq!(run_delete(&ctx, &argv(&["red"])).await, EXIT_USAGE);
    assert_eq!(run_delete(&ctx, &argv(&["red", "dev", "--owner"])).await, EXIT_USAGE);
    assert_eq!(run_delete(&ctx, &argv(&["red", "Bad_Name"])).await, EXIT_FAILURE);
}

#[tokio::test]
async fn test_alerts_command() {
    let dir = TempDir::new().unwrap();
    let (ctx, backend) = context(&dir);
    let spec = write(&dir, "spec.json", r#"{"name":"dev","team":"red","base_image":"python:3.12-slim"}"#);
    assert_eq!(run_apply(&ctx, &argv(&[&spec])).await, EXIT_OK);

    let batch = write(
        &dir,
        "alerts.json",
        r#"{"alerts":[{"status":"firing","labels":{"alertname":"EnvIdleCPU","namespace":"red","env":"dev"}}]}"#,
    );
    assert_eq!(run_alerts(&ctx, &argv(&[&batch, "--json"])).await, EXIT_OK);
    assert_eq!(backend.workload("red", "dev").unwrap().spec.replicas, 0);

    let missing = write(
        &dir,
        "missing.json",
        r#"{"alerts":[{"status":"firing","labels":{"alertname":"EnvIdleCPU","namespace":"red","env":"ghost"}}]}"#,
    );
    assert_eq!(run_alerts(&ctx, &argv(&[&missing])).await, EXIT_FAILURE);
    assert_eq!(run_alerts(&ctx, &[]).await, EXIT_USAGE);
}

#[test]
fn test_events_and_audit_flags() {
    let dir = TempDir::new().unwrap();
    let (ctx, _backend) = context(&dir);

    assert_eq!(run_events(&ctx, &argv(&["--limit", "5"])), EXIT_OK);
    assert_eq!(run_events(&ctx, &argv(&["--limit", "many"])), EXIT_USAGE);
    assert_eq!(run_audit(&ctx, &argv(&["--team", "red", "--kind", "delete"])), EXIT_OK);
    assert_eq!(run_audit(&ctx, &argv(&["--kind", "resize"])), EXIT_USAGE);
    assert_eq!(run_audit(&ctx, &argv(&["--verbose"])), EXIT_USAGE);
}

#[test]
fn test_config_commands() {
    let dir = TempDir::new().unwrap();
    assert_eq!(run_config_defaults(), EXIT_OK);
    assert_eq!(run_config_show(&Settings::default()), EXIT_OK);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[autoscaler]\nmin_replicas = 9\nmax_replicas = 2\n").unwrap();
    assert_eq!(run_config_validate(Some(&bad)), EXIT_USAGE);
    assert_eq!(run_config_validate(Some(&dir.path().join("absent.toml"))), EXIT_USAGE);
}

#[test]
fn test_read_json_reports_source() {
    let err = read_json::<AlertBatch>("/nonexistent/batch.json").unwrap_err();
    assert!(err.starts_with("/nonexistent/batch.json"));
}
