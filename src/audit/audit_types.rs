// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Types for the audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle action an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Delete,
    Scale,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Create => write!(f, "create"),
            EventKind::Delete => write!(f, "delete"),
            EventKind::Scale => write!(f, "scale"),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(EventKind::Create),
            "delete" => Ok(EventKind::Delete),
            "scale" => Ok(EventKind::Scale),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

/// Ownership context attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventExtra {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub pool: Option<String>,
}

impl EventExtra {
    pub fn new(owner: Option<String>, pool: Option<String>) -> Self {
        Self { owner, pool }
    }
}

/// One audit record. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// UTC, second precision. Stamped on append when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,
    pub kind: EventKind,
    pub namespace: String,
    pub name: String,
    pub msg: String,
    #[serde(default)]
    pub extra: EventExtra,
}

impl Event {
    pub fn new(
        kind: EventKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            ts: None,
            kind,
            namespace: namespace.into(),
            name: name.into(),
            msg: msg.into(),
            extra: EventExtra::default(),
        }
    }

    pub fn with_extra(mut self, extra: EventExtra) -> Self {
        self.extra = extra;
        self
    }

    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = Some(ts);
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_log_string(&self) -> String {
        let ts = self
            .ts
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "[{}] {} {}/{} - {} (owner={:?}, pool={:?})",
            ts, self.kind, self.namespace, self.name, self.msg, self.extra.owner, self.extra.pool
        )
    }
}

/// Equality filters for audit queries. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub namespace: Option<String>,
    pub kind: Option<EventKind>,
    pub owner: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref ns) = self.namespace {
            if &event.namespace != ns {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if event.kind != kind {
                return false;
            }
        }
        if let Some(ref owner) = self.owner {
            if event.extra.owner.as_ref() != Some(owner) {
                return false;
            }
        }
        true
    }
}
