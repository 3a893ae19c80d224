// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Desired-state builder for one environment.
//!
//! Everything the cluster should hold for a `(team, name)` pair is derived
//! here as plain data, with no backend calls, so the shape of the graph can
//! be inspected and tested on its own.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::Settings;
use crate::environment::EnvironmentSpec;
use crate::k8s::placement::Placement;
use crate::k8s::types::{
    AutoscalerBehavior, AutoscalerSpec, Container, ContainerPort, CrossVersionObjectReference,
    DeploymentSpec, MetricSpec, PodSecurityContext, PodSpec, PodTemplateSpec, ResourceRequirements,
    ScalingPolicy, ScalingRules, SecurityContext, SelectorSpec, ServicePort, ServiceSpec, TemplateMeta,
};
use crate::k8s::{
    Deployment, HorizontalPodAutoscaler, Labels, Namespace, ObjectMeta, Resource, Service,
};

/// Name of the single environment container.
pub const CONTAINER_NAME: &str = "app";

/// Named port the container listens on; the service targets it by name.
pub const PORT_NAME: &str = "http";
pub const CONTAINER_PORT: u16 = 8080;

/// Fixed non-root user and group every environment runs as.
pub const RUN_AS_ID: u32 = 10001;

const ENTRYPOINT: [&str; 2] = ["/bin/sh", "-lc"];
const ENTRYPOINT_ARGS: &str = "PYTHONDONTWRITEBYTECODE=1 python3 -m http.server 8080";

pub const LABEL_APP: &str = "app";
pub const LABEL_TEAM: &str = "team";
pub const LABEL_OWNER: &str = "owner";
pub const LABEL_POOL: &str = "pool";

/// Namespace, workload, service and optional autoscaler for one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGraph {
    pub namespace: Namespace,
    pub workload: Deployment,
    pub service: Service,
    pub autoscaler: Option<HorizontalPodAutoscaler>,
}

impl ResourceGraph {
    /// Build the graph for an already-validated spec.
    pub fn build(spec: &EnvironmentSpec, settings: &Settings) -> Self {
        let labels = environment_labels(spec);
        Self {
            namespace: build_namespace(&spec.team),
            workload: build_workload(spec, &labels),
            service: build_service(spec, &labels, settings),
            autoscaler: settings
                .autoscaler
                .enabled
                .then(|| build_autoscaler(spec, &labels, settings)),
        }
    }

    /// Graph members in apply order.
    pub fn resources(&self) -> Vec<Resource> {
        let mut out = vec![
            Resource::Namespace(self.namespace.clone()),
            Resource::Workload(self.workload.clone()),
            Resource::Service(self.service.clone()),
        ];
        if let Some(ref hpa) = self.autoscaler {
            out.push(Resource::Autoscaler(hpa.clone()));
        }
        out
    }
}

/// `{app, team, owner?, pool?}`
pub fn environment_labels(spec: &EnvironmentSpec) -> Labels {
    let mut labels = Labels::new();
    labels.insert(LABEL_APP.to_string(), spec.name.clone());
    labels.insert(LABEL_TEAM.to_string(), spec.team.clone());
    if let Some(ref owner) = spec.owner {
        labels.insert(LABEL_OWNER.to_string(), owner.clone());
    }
    if let Some(ref pool) = spec.pool {
        labels.insert(LABEL_POOL.to_string(), pool.clone());
    }
    labels
}

/// Selector labels. Limited to the immutable identity so owner or pool
/// changes never touch a workload's selector.
pub fn selector_labels(spec: &EnvironmentSpec) -> Labels {
    let mut labels = Labels::new();
    labels.insert(LABEL_APP.to_string(), spec.name.clone());
    labels.insert(LABEL_TEAM.to_string(), spec.team.clone());
    labels
}

fn build_namespace(team: &str) -> Namespace {
    let mut meta = ObjectMeta::named(team);
    meta.labels.insert(LABEL_TEAM.to_string(), team.to_string());
    Namespace::new(meta)
}

fn build_workload(spec: &EnvironmentSpec, labels: &Labels) -> Deployment {
    let placement = Placement::for_request(spec.pool.as_deref(), spec.gpu, spec.priority.as_deref());

    let mut requests = BTreeMap::new();
    requests.insert("cpu".to_string(), spec.cpu.clone());
    requests.insert("memory".to_string(), spec.memory.clone());

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: spec.base_image.clone(),
        command: ENTRYPOINT.iter().map(|s| s.to_string()).collect(),
        args: vec![ENTRYPOINT_ARGS.to_string()],
        ports: vec![ContainerPort { name: PORT_NAME.to_string(), container_port: CONTAINER_PORT }],
        resources: ResourceRequirements { requests, limits: placement.limits },
        security_context: Some(SecurityContext {
            allow_privilege_escalation: Some(false),
            read_only_root_filesystem: Some(false),
            run_as_non_root: Some(true),
            run_as_user: Some(RUN_AS_ID),
            run_as_group: Some(RUN_AS_ID),
        }),
    };

    let pod = PodSpec {
        security_context: Some(PodSecurityContext {
            run_as_non_root: Some(true),
            run_as_user: Some(RUN_AS_ID),
            run_as_group: Some(RUN_AS_ID),
            fs_group: Some(RUN_AS_ID),
        }),
        containers: vec![container],
        node_selector: placement.node_selector,
        tolerations: placement.tolerations,
        priority_class_name: placement.priority_class,
    };

    let spec_body = DeploymentSpec {
        // Scaling belongs to the autoscaler and the idle handler.
        replicas: 1,
        selector: SelectorSpec { match_labels: selector_labels(spec) },
        template: PodTemplateSpec {
            metadata: TemplateMeta { labels: labels.clone() },
            spec: pod,
        },
    };

    Deployment::new(ObjectMeta::namespaced(&spec.name, &spec.team, labels.clone()), spec_body)
}

fn build_service(spec: &EnvironmentSpec, labels: &Labels, settings: &Settings) -> Service {
    let port = ServicePort {
        name: PORT_NAME.to_string(),
        port: CONTAINER_PORT,
        target_port: Some(Value::String(PORT_NAME.to_string())),
        node_port: settings.service.pinned_node_port(),
    };
    let body = ServiceSpec {
        service_type: settings.service.service_type,
        selector: selector_labels(spec),
        ports: vec![port],
        cluster_ip: None,
    };
    Service::new(ObjectMeta::namespaced(&spec.name, &spec.team, labels.clone()), body)
}

fn build_autoscaler(spec: &EnvironmentSpec, labels: &Labels, settings: &Settings) -> HorizontalPodAutoscaler {
    let hpa = &settings.autoscaler;
    let body = AutoscalerSpec {
        scale_target_ref: CrossVersionObjectReference {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: spec.name.clone(),
        },
        min_replicas: hpa.min_replicas,
        max_replicas: hpa.max_replicas,
        metrics: vec![
            MetricSpec::utilization("cpu", hpa.cpu_utilization),
            MetricSpec::utilization("memory", hpa.memory_utilization),
        ],
        // Once the window passes without higher demand, drop straight to target.
        behavior: Some(AutoscalerBehavior {
            scale_down: Some(ScalingRules {
                stabilization_window_seconds: hpa.scale_down_stabilization_secs,
                policies: vec![ScalingPolicy {
                    policy_type: "Percent".to_string(),
                    value: 100,
                    period_seconds: 60,
                }],
            }),
        }),
    };
    HorizontalPodAutoscaler::new(ObjectMeta::namespaced(&spec.name, &spec.team, labels.clone()), body)
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
