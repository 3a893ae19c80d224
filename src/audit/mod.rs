// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Append-only audit trail of environment lifecycle actions.
//!
//! A bounded in-memory mirror (newest first) backs live views; a rotating
//! newline-delimited JSON file backs history and restarts.

pub mod event_log;
pub mod audit_types;

pub use event_log::AuditEventLog;
pub use audit_types::{AuditFilter, Event, EventExtra, EventKind};
