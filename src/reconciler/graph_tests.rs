// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for the resource graph builder.

use super::*;
use crate::k8s::placement::GPU_RESOURCE;
use crate::k8s::{ResourceKind, ServiceType};

fn spec() -> EnvironmentSpec {
    EnvironmentSpec::new("dev", "red", "python:3.12-slim").validated().unwrap()
}

#[test]
fn test_labels_include_optional_owner_and_pool() {
    let plain = environment_labels(&spec());
    assert_eq!(plain.len(), 2);
    assert_eq!(plain.get("app").map(String::as_str), Some("dev"));
    assert_eq!(plain.get("team").map(String::as_str), Some("red"));

    let mut s = spec();
    s.owner = Some("ana".to_string());
    s.pool = Some("highmem".to_string());
    let full = environment_labels(&s);
    assert_eq!(full.get("owner").map(String::as_str), Some("ana"));
    assert_eq!(full.get("pool").map(String::as_str), Some("highmem"));
    assert_eq!(selector_labels(&s).len(), 2);
}

#[test]
fn test_workload_shape() {
    let graph = ResourceGraph::build(&spec(), &Settings::default());
    let dep = &graph.workload;

    assert_eq!(dep.metadata.name, "dev");
    assert_eq!(dep.metadata.namespace.as_deref(), Some("red"));
    assert_eq!(dep.spec.replicas, 1);
    assert_eq!(dep.spec.selector.match_labels, selector_labels(&spec()));
    assert_eq!(dep.spec.template.metadata.labels, dep.metadata.labels);

    let container = dep.primary_container().unwrap();
    assert_eq!(container.name, CONTAINER_NAME);
    assert_eq!(container.image, "python:3.12-slim");
    assert_eq!(container.ports[0].container_port, CONTAINER_PORT);
    assert_eq!(container.resources.requests.get("cpu").map(String::as_str), Some("500m"));
    assert_eq!(container.resources.requests.get("memory").map(String::as_str), Some("1Gi"));
    assert!(container.resources.limits.is_empty());

    let csec = container.security_context.as_ref().unwrap();
    assert_eq!(csec.allow_privilege_escalation, Some(false));
    assert_eq!(csec.run_as_non_root, Some(true));
    assert_eq!(csec.run_as_user, Some(RUN_AS_ID));

    let psec = dep.spec.template.spec.security_context.as_ref().unwrap();
    assert_eq!(psec.fs_group, Some(RUN_AS_ID));
    assert!(dep.spec.template.spec.node_selector.is_empty());
    assert!(dep.spec.template.spec.tolerations.is_empty());
}

#[test]
fn test_gpu_pool_and_priority_placement() {
    let mut s = spec();
    s.gpu = 2;
    s.pool = Some("gpu-a100".to_string());
    s.priority = Some("high".to_string());

    let graph = ResourceGraph::build(&s, &Settings::default());
    let pod = &graph.workload.spec.template.spec;

    assert_eq!(pod.node_selector.get("gpu").map(String::as_str), Some("true"));
    assert_eq!(pod.node_selector.get("pool").map(String::as_str), Some("gpu-a100"));
    assert_eq!(pod.tolerations.len(), 2);
    assert!(pod.tolerations.iter().all(|t| t.effect == "NoSchedule" && t.operator == "Equal"));
    assert_eq!(pod.priority_class_name.as_deref(), Some("high"));

    let limits = &pod.containers[0].resources.limits;
    assert_eq!(limits.get(GPU_RESOURCE).map(String::as_str), Some("2"));
}

#[test]
fn test_service_targets_named_port() {
    let graph = ResourceGraph::build(&spec(), &Settings::default());
    let svc = &graph.service;

    assert_eq!(svc.spec.service_type, ServiceType::ClusterIp);
    assert_eq!(svc.spec.selector, selector_labels(&spec()));
    assert_eq!(svc.spec.ports.len(), 1);
    assert_eq!(svc.spec.ports[0].port, CONTAINER_PORT);
    assert_eq!(svc.spec.ports[0].target_port, Some(Value::String(PORT_NAME.to_string())));
    assert_eq!(svc.spec.ports[0].node_port, None);
}

#[test]
fn test_node_port_pinned_only_for_node_port_services() {
    let mut settings = Settings::default();
    settings.service.node_port = Some(30080);
    let graph = ResourceGraph::build(&spec(), &settings);
    assert_eq!(graph.service.spec.ports[0].node_port, None);

    settings.service.service_type = ServiceType::NodePort;
    let graph = ResourceGraph::build(&spec(), &settings);
    assert_eq!(graph.service.spec.service_type, ServiceType::NodePort);
    assert_eq!(graph.service.spec.ports[0].node_port, Some(30080));
}

#[test]
fn test_autoscaler_follows_settings() {
    let mut settings = Settings::default();
    settings.autoscaler.min_replicas = 2;
    settings.autoscaler.max_replicas = 7;
    settings.autoscaler.scale_down_stabilization_secs = 120;

    let graph = ResourceGraph::build(&spec(), &settings);
    let hpa = graph.autoscaler.as_ref().unwrap();
    assert_eq!(hpa.spec.scale_target_ref.kind, "Deployment");
    assert_eq!(hpa.spec.scale_target_ref.name, "dev");
    assert_eq!((hpa.spec.min_replicas, hpa.spec.max_replicas), (2, 7));

    let targets: Vec<(&str, u32)> = hpa
        .spec
        .metrics
        .iter()
        .map(|m| (m.resource.name.as_str(), m.resource.target.average_utilization))
        .collect();
    assert_eq!(targets, vec![("cpu", 70), ("memory", 80)]);

    let rules = hpa.spec.behavior.as_ref().and_then(|b| b.scale_down.as_ref()).unwrap();
    assert_eq!(rules.stabilization_window_seconds, 120);
    assert_eq!(rules.policies[0].policy_type, "Percent");
    assert_eq!(rules.policies[0].value, 100);

    settings.autoscaler.enabled = false;
    let graph = ResourceGraph::build(&spec(), &settings);
    assert!(graph.autoscaler.is_none());
    let kinds: Vec<_> = graph.resources().iter().map(Resource::kind).collect();
    assert_eq!(kinds, vec![ResourceKind::Namespace, ResourceKind::Workload, ResourceKind::Service]);
}

#[test]
fn test_workload_serializes_to_api_shape() {
    let graph = ResourceGraph::build(&spec(), &Settings::default());
    let json = serde_json::to_value(Resource::Workload(graph.workload)).unwrap();

    assert_eq!(json["apiVersion"], "apps/v1");
    assert_eq!(json["kind"], "Deployment");
    assert_eq!(json["spec"]["selector"]["matchLabels"]["app"], "dev");
    assert_eq!(json["spec"]["template"]["spec"]["containers"][0]["ports"][0]["containerPort"], 8080);
    assert!(json["metadata"].get("resourceVersion").is_none());

    let ns = serde_json::to_value(Resource::Namespace(graph.namespace)).unwrap();
    assert_eq!(ns["metadata"]["labels"]["team"], "red");
}
