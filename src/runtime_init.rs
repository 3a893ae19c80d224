// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Startup sequencing for the devbox binary.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use devbox_core::cli::Context;
use devbox_core::config::{ConfigError, Settings, CONFIG_PATH_ENV};

/// Environment variable selecting the log formatter.
const LOG_FORMAT_ENV: &str = "DEVBOX_LOG_FORMAT";

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Settings file named by `DEVBOX_CONFIG`, if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    Settings::load(config_path().as_deref())
}

/// Build the shared components and restore recent audit history.
pub fn build_context(settings: Settings) -> Context {
    let ctx = Context::from_settings(settings);
    let seeded = ctx.audit.seed_from_disk();
    info!(
        backend = ?ctx.settings.backend,
        audit_path = %ctx.settings.audit.path.display(),
        seeded,
        "Runtime initialized"
    );
    ctx
}
