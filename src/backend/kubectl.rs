// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Backend adapter driving the `kubectl` binary.
//!
//! Objects travel as JSON on stdin/stdout. Failures are classified from the
//! `Error from server (Reason)` line kubectl prints on stderr.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{BackendError, ClusterBackend, Propagation, UsageSource};
use crate::config::KubectlSettings;
use crate::k8s::types::ObjectList;
use crate::k8s::{Deployment, LabelSelector, ObjectMeta, Resource, ResourceKind};
use crate::usage::RawUsage;

/// `kubectl` subprocess adapter.
pub struct KubectlBackend {
    binary: PathBuf,
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodRef {
    metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
struct PodMetrics {
    #[serde(default)]
    containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetrics {
    usage: RawUsage,
}

impl KubectlBackend {
    pub fn new(settings: &KubectlSettings) -> Self {
        Self { binary: settings.binary.clone(), context: settings.context.clone() }
    }

    async fn run(
        &self,
        args: Vec<String>,
        stdin: Option<Vec<u8>>,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let mut command = Command::new(&self.binary);
        if let Some(ref context) = self.context {
            command.arg("--context").arg(context);
        }
        command
            .args(&args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(binary = %self.binary.display(), args = ?args, "Invoking kubectl");

        let mut child = command
            .spawn()
            .map_err(|e| BackendError::Transport(format!("cannot run {}: {}", self.binary.display(), e)))?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(&input)
                    .await
                    .map_err(|e| BackendError::Transport(format!("writing to kubectl: {}", e)))?;
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| BackendError::Transport(format!("waiting for kubectl: {}", e)))?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(classify(&String::from_utf8_lossy(&output.stderr), kind, name))
        }
    }

    async fn submit(&self, verb: &str, resource: &Resource) -> Result<(), BackendError> {
        let body = encode(resource)?;
        let args = vec![verb.to_string(), "-f".to_string(), "-".to_string()];
        self.run(args, Some(body), resource.kind(), resource.name()).await.map(|_| ())
    }
}

fn encode(resource: &Resource) -> Result<Vec<u8>, BackendError> {
    serde_json::to_vec(resource).map_err(|e| BackendError::Decode(e.to_string()))
}

fn decode_err(e: serde_json::Error) -> BackendError {
    BackendError::Decode(e.to_string())
}

/// Map kubectl's stderr to a backend error.
pub(crate) fn classify(stderr: &str, kind: ResourceKind, name: &str) -> BackendError {
    let message = stderr.trim().to_string();
    let name = name.to_string();

    if message.contains("(AlreadyExists)") || message.contains("already exists") {
        BackendError::AlreadyExists { kind, name }
    } else if message.contains("(NotFound)") || message.contains("not found") {
        BackendError::NotFound { kind, name }
    } else if message.contains("(Conflict)") || message.contains("the object has been modified") {
        BackendError::Conflict { kind, name, message }
    } else if message.contains("Unable to connect to the server") || message.contains("connection refused") {
        BackendError::Transport(message)
    } else {
        BackendError::Api(message)
    }
}

/// `<verb> <resource> <name> [-n <namespace>]`
pub(crate) fn object_args(verb: &str, kind: ResourceKind, namespace: &str, name: &str) -> Vec<String> {
    let mut args = vec![verb.to_string(), kind.api_resource().to_string(), name.to_string()];
    if kind.is_namespaced() {
        args.push("-n".to_string());
        args.push(namespace.to_string());
    }
    args
}

pub(crate) fn delete_args(kind: ResourceKind, namespace: &str, name: &str, propagation: Propagation) -> Vec<String> {
    let mut args = object_args("delete", kind, namespace, name);
    args.push(format!("--cascade={}", propagation.as_str()));
    args.push("--wait=false".to_string());
    args
}

pub(crate) fn list_args(selector: &LabelSelector) -> Vec<String> {
    let mut args = vec!["get".to_string(), "deployments".to_string(), "--all-namespaces".to_string()];
    let rendered = selector.to_string();
    if !rendered.is_empty() {
        args.push("-l".to_string());
        args.push(rendered);
    }
    args.push("-o".to_string());
    args.push("json".to_string());
    args
}

#[async_trait]
impl ClusterBackend for KubectlBackend {
    async fn create(&self, resource: &Resource) -> Result<(), BackendError> {
        self.submit("create", resource).await
    }

    async fn replace(&self, resource: &Resource) -> Result<(), BackendError> {
        self.submit("replace", resource).await
    }

    async fn patch(&self, resource: &Resource) -> Result<(), BackendError> {
        let kind = resource.kind();
        let body = String::from_utf8(encode(resource)?).map_err(|e| BackendError::Decode(e.to_string()))?;
        let mut args = object_args("patch", kind, resource.namespace().unwrap_or(""), resource.name());
        args.extend(["--type".to_string(), "merge".to_string(), "-p".to_string(), body]);
        self.run(args, None, kind, resource.name()).await.map(|_| ())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        propagation: Propagation,
    ) -> Result<(), BackendError> {
        self.run(delete_args(kind, namespace, name, propagation), None, kind, name)
            .await
            .map(|_| ())
    }

    async fn read(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<Resource, BackendError> {
        let mut args = object_args("get", kind, namespace, name);
        args.extend(["-o".to_string(), "json".to_string()]);
        let out = self.run(args, None, kind, name).await?;
        Resource::from_json(kind, &out).map_err(decode_err)
    }

    async fn list_workloads(&self, selector: &LabelSelector) -> Result<Vec<Deployment>, BackendError> {
        let out = self
            .run(list_args(selector), None, ResourceKind::Workload, &selector.to_string())
            .await?;
        let list: ObjectList<Deployment> = serde_json::from_slice(&out).map_err(decode_err)?;
        Ok(list.items)
    }

    async fn scale_workload(&self, namespace: &str, name: &str, replicas: u32) -> Result<(), BackendError> {
        let mut args = object_args("scale", ResourceKind::Workload, namespace, name);
        args.push(format!("--replicas={}", replicas));
        self.run(args, None, ResourceKind::Workload, name).await.map(|_| ())
    }
}

#[async_trait]
impl UsageSource for KubectlBackend {
    async fn pod_usage(&self, namespace: &str, app: &str) -> Result<Option<RawUsage>, BackendError> {
        let args = vec![
            "get".to_string(),
            "pods".to_string(),
            "-n".to_string(),
            namespace.to_string(),
            "-l".to_string(),
            format!("app={}", app),
            "-o".to_string(),
            "json".to_string(),
        ];
        let out = self.run(args, None, ResourceKind::Workload, app).await?;
        let pods: ObjectList<PodRef> = serde_json::from_slice(&out).map_err(decode_err)?;
        let Some(pod) = pods.items.first() else { return Ok(None) };

        let raw_path = format!(
            "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods/{}",
            namespace, pod.metadata.name
        );
        let args = vec!["get".to_string(), "--raw".to_string(), raw_path];
        let out = match self.run(args, None, ResourceKind::Workload, &pod.metadata.name).await {
            Ok(out) => out,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let metrics: PodMetrics = serde_json::from_slice(&out).map_err(decode_err)?;
        Ok(metrics.containers.into_iter().next().map(|c| c.usage))
    }
}
