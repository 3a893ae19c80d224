// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Converts metrics-collector quantities into canonical units.
//!
//! CPU is reported as millicores and memory as mebibytes. Anything that
//! does not parse is "unavailable" (`None`): usage only enriches listings,
//! so a bad sample must never fail the caller.

use serde::{Deserialize, Serialize};

const BYTES_PER_MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Raw usage strings for one running instance, as the collector reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsage {
    pub cpu: String,
    pub memory: String,
}

impl RawUsage {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self { cpu: cpu.into(), memory: memory.into() }
    }

    /// Normalize both quantities; unavailable if either fails.
    pub fn normalize(&self) -> Option<NormalizedUsage> {
        Some(NormalizedUsage {
            cpu_millicores: cpu_millicores(&self.cpu)?,
            memory_mebibytes: memory_mebibytes(&self.memory)?,
        })
    }
}

/// Usage in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedUsage {
    pub cpu_millicores: f64,
    pub memory_mebibytes: f64,
}

fn parse_magnitude(digits: &str) -> Option<f64> {
    let trimmed = digits.trim();
    if trimmed.is_empty() || trimmed.starts_with(['+', '-']) {
        return None;
    }
    let value: f64 = trimmed.parse().ok()?;
    value.is_finite().then_some(value)
}

/// CPU quantity to millicores.
///
/// Suffixes are checked `n`, `u`, `m`, then bare cores.
pub fn cpu_millicores(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Some(nanos) = raw.strip_suffix('n') {
        parse_magnitude(nanos).map(|v| v / 1_000_000.0)
    } else if let Some(micros) = raw.strip_suffix('u') {
        parse_magnitude(micros).map(|v| v / 1_000.0)
    } else if let Some(millis) = raw.strip_suffix('m') {
        parse_magnitude(millis)
    } else {
        parse_magnitude(raw).map(|cores| cores * 1000.0)
    }
}

/// Memory quantity to mebibytes.
///
/// `Ki`, `Mi`, `Gi` are matched case-insensitively; a bare number is bytes.
pub fn memory_mebibytes(raw: &str) -> Option<f64> {
    let lowered = raw.trim().to_ascii_lowercase();
    if let Some(kib) = lowered.strip_suffix("ki") {
        parse_magnitude(kib).map(|v| v / 1024.0)
    } else if let Some(mib) = lowered.strip_suffix("mi") {
        parse_magnitude(mib)
    } else if let Some(gib) = lowered.strip_suffix("gi") {
        parse_magnitude(gib).map(|v| v * 1024.0)
    } else {
        parse_magnitude(&lowered).map(|bytes| bytes / BYTES_PER_MEBIBYTE)
    }
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
