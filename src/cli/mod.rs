// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface for the `devbox` binary.
//!
//! Commands return process exit codes: 0 success, 1 operation failure,
//! 2 usage or configuration error.

pub mod args;
pub mod commands;
pub mod format;

use std::sync::Arc;

use crate::alerts::IdleScaleDownHandler;
use crate::audit::AuditEventLog;
use crate::backend::{self, BackendHandles};
use crate::config::Settings;
use crate::dispatch::ApplyDispatcher;
use crate::inventory::Inventory;
use crate::reconciler::Reconciler;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Components built once at startup and shared by every command.
#[derive(Clone)]
pub struct Context {
    pub settings: Arc<Settings>,
    pub audit: Arc<AuditEventLog>,
    pub backends: BackendHandles,
}

impl Context {
    pub fn new(settings: Settings, backends: BackendHandles) -> Self {
        let audit = Arc::new(AuditEventLog::new(settings.audit.clone()));
        Self { settings: Arc::new(settings), audit, backends }
    }

    /// Context with the adapter `settings.backend` names.
    pub fn from_settings(settings: Settings) -> Self {
        let backends = backend::select(&settings);
        Self::new(settings, backends)
    }

    pub fn reconciler(&self) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            self.backends.cluster.clone(),
            self.audit.clone(),
            self.settings.clone(),
        ))
    }

    pub fn dispatcher(&self) -> ApplyDispatcher {
        ApplyDispatcher::new(self.reconciler())
    }

    pub fn inventory(&self) -> Inventory {
        Inventory::new(&self.backends, self.audit.clone())
    }

    pub fn idle_handler(&self) -> IdleScaleDownHandler {
        IdleScaleDownHandler::new(
            self.backends.cluster.clone(),
            self.audit.clone(),
            self.settings.alerts.idle_alert_name.clone(),
        )
    }
}
