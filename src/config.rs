// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime settings.
//!
//! Built once at startup from defaults, an optional TOML file, and
//! environment overrides, then shared by `Arc` with every component.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::k8s::ServiceType;

/// Environment variable naming the TOML settings file.
pub const CONFIG_PATH_ENV: &str = "DEVBOX_CONFIG";

/// Largest accepted `audit.mirror_capacity`.
pub const MAX_MIRROR_CAPACITY: usize = 100_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Which orchestration adapter to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Kubectl,
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubectl" => Ok(Self::Kubectl),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubectlSettings {
    pub binary: PathBuf,
    pub context: Option<String>,
}

impl Default for KubectlSettings {
    fn default() -> Self {
        Self { binary: PathBuf::from("kubectl"), context: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Persisted JSONL file.
    pub path: PathBuf,
    /// Rotate once the file grows past this many bytes.
    pub max_bytes: u64,
    /// In-memory mirror size.
    pub mirror_capacity: usize,
    /// Upper bound on a single audit query.
    pub query_max: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/data/audit.jsonl"),
            max_bytes: 5_242_880,
            mirror_capacity: 200,
            query_max: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub service_type: ServiceType,
    /// Pinned only when `service_type` is `NodePort`.
    pub node_port: Option<u16>,
}

impl ServiceSettings {
    pub fn pinned_node_port(&self) -> Option<u16> {
        match self.service_type {
            ServiceType::NodePort => self.node_port,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoscalerSettings {
    pub enabled: bool,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub cpu_utilization: u32,
    pub memory_utilization: u32,
    pub scale_down_stabilization_secs: u32,
}

impl Default for AutoscalerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_replicas: 1,
            max_replicas: 5,
            cpu_utilization: 70,
            memory_utilization: 80,
            scale_down_stabilization_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Alert name that triggers idle scale-down.
    pub idle_alert_name: String,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self { idle_alert_name: "EnvIdleCPU".to_string() }
    }
}

/// All runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendKind,
    pub kubectl: KubectlSettings,
    pub audit: AuditSettings,
    pub service: ServiceSettings,
    pub autoscaler: AutoscalerSettings,
    pub alerts: AlertSettings,
}

impl Settings {
    /// Defaults, then the optional file, then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Unparsable values leave the current setting untouched.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = get("DEVBOX_BACKEND").and_then(|v| v.parse().ok()) {
            self.backend = kind;
        }

        if let Some(v) = get("EVENT_LOG_MAX") {
            self.audit.mirror_capacity = env_num(&v, self.audit.mirror_capacity);
        }
        if let Some(v) = get("AUDIT_PATH") {
            self.audit.path = PathBuf::from(v);
        }
        if let Some(v) = get("AUDIT_MAX_BYTES") {
            self.audit.max_bytes = env_num(&v, self.audit.max_bytes);
        }

        if let Some(kind) = get("SERVICE_TYPE").and_then(|v| v.trim().parse().ok()) {
            self.service.service_type = kind;
        }
        if let Some(v) = get("NODE_PORT") {
            let v = v.trim();
            if v.chars().all(|c| c.is_ascii_digit()) {
                self.service.node_port = v.parse().ok();
            }
        }

        if let Some(v) = get("HPA_ENABLED") {
            self.autoscaler.enabled = v.trim().eq_ignore_ascii_case("true");
        }
        let hpa = &mut self.autoscaler;
        for (key, slot) in [
            ("HPA_MIN", &mut hpa.min_replicas),
            ("HPA_MAX", &mut hpa.max_replicas),
            ("HPA_CPU_UTIL", &mut hpa.cpu_utilization),
            ("HPA_MEM_UTIL", &mut hpa.memory_utilization),
            ("HPA_SD_STAB", &mut hpa.scale_down_stabilization_secs),
        ] {
            if let Some(v) = get(key) {
                *slot = env_num(&v, *slot);
            }
        }
    }

    /// Reject settings the reconciler cannot act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hpa = &self.autoscaler;
        if hpa.min_replicas == 0 {
            return Err(invalid("autoscaler.min_replicas", "must be at least 1"));
        }
        if hpa.min_replicas > hpa.max_replicas {
            return Err(invalid(
                "autoscaler.max_replicas",
                format!("{} is below min_replicas {}", hpa.max_replicas, hpa.min_replicas),
            ));
        }
        for (field, value) in [
            ("autoscaler.cpu_utilization", hpa.cpu_utilization),
            ("autoscaler.memory_utilization", hpa.memory_utilization),
        ] {
            if !(1..=100).contains(&value) {
                return Err(invalid(field, format!("{} is outside 1..=100", value)));
            }
        }
        if !(1..=MAX_MIRROR_CAPACITY).contains(&self.audit.mirror_capacity) {
            return Err(invalid(
                "audit.mirror_capacity",
                format!("{} is outside 1..={}", self.audit.mirror_capacity, MAX_MIRROR_CAPACITY),
            ));
        }
        if self.audit.query_max == 0 {
            return Err(invalid("audit.query_max", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

/// Integer from env text: integers, then truncated floats. Negative values
/// clamp to zero.
fn env_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        .map(|v| v.max(0))
}

/// `env_int` narrowed to the slot's type. Unparsable or out-of-range text
/// keeps `current`.
fn env_num<T>(raw: &str, current: T) -> T
where
    T: TryFrom<i64>,
{
    env_int(raw).and_then(|v| T::try_from(v).ok()).unwrap_or(current)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
