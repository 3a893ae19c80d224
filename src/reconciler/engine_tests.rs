// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for reconciler apply/delete against the in-memory backend.

use tempfile::TempDir;

use super::*;
use crate::backend::{MemoryBackend, Verb};
use crate::config::AuditSettings;
use crate::k8s::ValidationError;

struct Harness {
    backend: Arc<MemoryBackend>,
    audit: Arc<AuditEventLog>,
    reconciler: Reconciler,
    _dir: TempDir,
}

fn harness_with(settings: Settings) -> Harness {
    let dir = TempDir::new().unwrap();
    let audit = Arc::new(AuditEventLog::new(AuditSettings {
        path: dir.path().join("audit.jsonl"),
        ..AuditSettings::default()
    }));
    let backend = Arc::new(MemoryBackend::new());
    let reconciler = Reconciler::new(backend.clone(), audit.clone(), Arc::new(settings));
    Harness { backend, audit, reconciler, _dir: dir }
}

fn harness() -> Harness {
    harness_with(Settings::default())
}

fn spec() -> EnvironmentSpec {
    let mut spec = EnvironmentSpec::new("dev", "red", "python:3.12-slim");
    spec.owner = Some("ana".to_string());
    spec
}

fn messages(audit: &AuditEventLog) -> Vec<String> {
    let mut msgs: Vec<String> = audit.tail(100).into_iter().map(|e| e.msg).collect();
    msgs.reverse();
    msgs
}

#[tokio::test]
async fn test_apply_creates_full_graph() {
    let h = harness();
    h.reconciler.apply(spec()).await.unwrap();

    assert!(h.backend.contains(ResourceKind::Namespace, "", "red"));
    assert!(h.backend.contains(ResourceKind::Workload, "red", "dev"));
    assert!(h.backend.contains(ResourceKind::Service, "red", "dev"));
    assert!(h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
    assert_eq!(messages(&h.audit), vec![MSG_SUBMITTED, MSG_READY]);

    let events = h.audit.tail(2);
    assert!(events.iter().all(|e| e.kind == EventKind::Create));
    assert_eq!(events[0].extra.owner.as_deref(), Some("ana"));
}

#[tokio::test]
async fn test_apply_is_idempotent() {
    let h = harness();
    h.reconciler.apply(spec()).await.unwrap();
    let first = h.backend.workload("red", "dev").unwrap();

    h.reconciler.apply(spec()).await.unwrap();
    let second = h.backend.workload("red", "dev").unwrap();

    assert_eq!(h.backend.object_count(), 4);
    assert_eq!(first.spec, second.spec);
    assert_eq!(first.metadata.labels, second.metadata.labels);
    assert_eq!(first.metadata.creation_timestamp, second.metadata.creation_timestamp);
    assert_eq!(h.backend.count(Verb::Replace, ResourceKind::Workload), 1);
    assert_eq!(h.backend.count(Verb::Patch, ResourceKind::Service), 1);
    assert_eq!(h.backend.count(Verb::Replace, ResourceKind::Autoscaler), 1);
}

#[tokio::test]
async fn test_reapply_replaces_workload_wholesale() {
    let h = harness();
    h.reconciler.apply(spec()).await.unwrap();

    let mut updated = spec();
    updated.base_image = "python:3.13-slim".to_string();
    updated.cpu = "2".to_string();
    h.reconciler.apply(updated).await.unwrap();

    let dep = h.backend.workload("red", "dev").unwrap();
    let container = dep.primary_container().unwrap();
    assert_eq!(container.image, "python:3.13-slim");
    assert_eq!(container.resources.requests.get("cpu").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_apply_restores_replicas_after_scale_down() {
    let h = harness();
    h.reconciler.apply(spec()).await.unwrap();
    h.backend.scale_workload("red", "dev", 0).await.unwrap();

    h.reconciler.apply(spec()).await.unwrap();
    assert_eq!(h.backend.workload("red", "dev").unwrap().spec.replicas, 1);
}

#[tokio::test]
async fn test_apply_rejects_invalid_spec_without_side_effects() {
    let h = harness();
    let bad = EnvironmentSpec::new("Bad_Name", "red", "python:3.12-slim");

    let err = h.reconciler.apply(bad).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(ValidationError::InvalidLabel { .. })));
    assert!(h.backend.operations().is_empty());
    assert!(h.audit.is_empty());
}

#[tokio::test]
async fn test_apply_lowercases_identity() {
    let h = harness();
    let graph = h
        .reconciler
        .apply(EnvironmentSpec::new("Dev", "RED", "python:3.12-slim"))
        .await
        .unwrap();
    assert_eq!(graph.workload.metadata.namespace.as_deref(), Some("red"));
    assert!(h.backend.contains(ResourceKind::Workload, "red", "dev"));
}

#[tokio::test]
async fn test_apply_aborts_on_backend_error_and_keeps_earlier_steps() {
    let h = harness();
    h.backend
        .fail_next(Verb::Create, ResourceKind::Service, BackendError::Api("quota exceeded".to_string()));

    let err = h.reconciler.apply(spec()).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Backend { step: ResourceKind::Service, source: BackendError::Api(_) }
    ));
    assert!(h.backend.contains(ResourceKind::Workload, "red", "dev"));
    assert!(!h.backend.contains(ResourceKind::Service, "red", "dev"));
    assert!(!h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
    assert_eq!(messages(&h.audit), vec![MSG_SUBMITTED]);

    // Re-applying is the recovery path.
    h.reconciler.apply(spec()).await.unwrap();
    assert!(h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
    assert_eq!(messages(&h.audit), vec![MSG_SUBMITTED, MSG_SUBMITTED, MSG_READY]);
}

#[tokio::test]
async fn test_concurrent_edit_surfaces_conflict() {
    let h = harness();
    h.reconciler.apply(spec()).await.unwrap();
    h.backend.fail_next(
        Verb::Replace,
        ResourceKind::Workload,
        BackendError::Conflict {
            kind: ResourceKind::Workload,
            name: "dev".to_string(),
            message: "the object has been modified".to_string(),
        },
    );

    let err = h.reconciler.apply(spec()).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Backend { step: ResourceKind::Workload, source: BackendError::Conflict { .. } }
    ));
}

#[tokio::test]
async fn test_autoscaler_skipped_when_disabled() {
    let mut settings = Settings::default();
    settings.autoscaler.enabled = false;
    let h = harness_with(settings);

    h.reconciler.apply(spec()).await.unwrap();
    assert!(!h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
    assert_eq!(h.backend.count(Verb::Create, ResourceKind::Autoscaler), 0);
}

#[tokio::test]
async fn test_delete_removes_members_and_resolves_owner() {
    let h = harness();
    let mut s = spec();
    s.pool = Some("highmem".to_string());
    h.reconciler.apply(s).await.unwrap();

    h.reconciler.delete("red", "dev", None).await.unwrap();

    assert!(!h.backend.contains(ResourceKind::Workload, "red", "dev"));
    assert!(!h.backend.contains(ResourceKind::Service, "red", "dev"));
    assert!(!h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
    assert!(h.backend.contains(ResourceKind::Namespace, "", "red"));

    let latest = h.audit.tail(2);
    assert_eq!(latest[0].msg, MSG_DELETE_ISSUED);
    assert_eq!(latest[1].msg, MSG_DELETE_REQUESTED);
    for event in &latest {
        assert_eq!(event.kind, EventKind::Delete);
        assert_eq!(event.extra.owner.as_deref(), Some("ana"));
        assert_eq!(event.extra.pool.as_deref(), Some("highmem"));
    }
}

#[tokio::test]
async fn test_delete_of_missing_environment_emits_both_events() {
    let h = harness();
    h.reconciler.delete("red", "ghost", Some("bo")).await.unwrap();

    assert_eq!(messages(&h.audit), vec![MSG_DELETE_REQUESTED, MSG_DELETE_ISSUED]);
    assert_eq!(h.audit.tail(1)[0].extra.owner.as_deref(), Some("bo"));
    assert_eq!(h.backend.count(Verb::Delete, ResourceKind::Workload), 1);
    assert_eq!(h.backend.count(Verb::Delete, ResourceKind::Service), 1);
    assert_eq!(h.backend.count(Verb::Delete, ResourceKind::Autoscaler), 1);
}

#[tokio::test]
async fn test_delete_aborts_on_backend_error() {
    let h = harness();
    h.reconciler.apply(spec()).await.unwrap();
    h.backend
        .fail_next(Verb::Delete, ResourceKind::Service, BackendError::Transport("timeout".to_string()));

    let err = h.reconciler.delete("red", "dev", None).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Backend { step: ResourceKind::Service, .. }));
    assert!(!h.backend.contains(ResourceKind::Workload, "red", "dev"));
    assert!(h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
    assert_eq!(h.audit.tail(1)[0].msg, MSG_DELETE_REQUESTED);

    h.reconciler.delete("red", "dev", None).await.unwrap();
    assert!(!h.backend.contains(ResourceKind::Autoscaler, "red", "dev"));
}

#[tokio::test]
async fn test_delete_rejects_malformed_identity() {
    let h = harness();
    let err = h.reconciler.delete("red", "-bad-", None).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
    assert!(h.audit.is_empty());
    assert!(h.backend.operations().is_empty());
}
