// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Audit event log: bounded in-memory mirror plus a rotating JSONL file.
//!
//! The mirror is the live-view guarantee. The file is best-effort: a
//! persistence failure is logged and swallowed so auditing can never fail a
//! reconciliation.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SubsecRound, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::audit_types::{AuditFilter, Event, EventExtra, EventKind};
use crate::config::AuditSettings;

/// Audit log shared by every component that mutates the cluster.
pub struct AuditEventLog {
    settings: AuditSettings,
    /// Newest first. Append and Tail both go through this lock, and the
    /// file write happens under it so file order matches mirror order.
    mirror: Mutex<VecDeque<Event>>,
}

impl AuditEventLog {
    pub fn new(settings: AuditSettings) -> Self {
        Self { settings, mirror: Mutex::new(VecDeque::new()) }
    }

    pub fn settings(&self) -> &AuditSettings {
        &self.settings
    }

    /// Path of the single rotated backup generation.
    pub fn backup_path(&self) -> PathBuf {
        backup_path_for(&self.settings.path)
    }

    /// Append an event, stamping the current time if it carries none.
    ///
    /// Returns the event as stored.
    pub fn append(&self, mut event: Event) -> Event {
        if event.ts.is_none() {
            event.ts = Some(Utc::now().trunc_subsecs(0));
        }

        let mut mirror = self.mirror.lock();
        mirror.push_front(event.clone());
        mirror.truncate(self.settings.mirror_capacity);

        if let Err(e) = self.persist(&event) {
            warn!(
                path = %self.settings.path.display(),
                error = %e,
                "Failed to persist audit event"
            );
        }

        event
    }

    /// Convenience wrapper building and appending an event.
    pub fn record(
        &self,
        kind: EventKind,
        namespace: &str,
        name: &str,
        msg: &str,
        extra: EventExtra,
    ) -> Event {
        self.append(Event::new(kind, namespace, name, msg).with_extra(extra))
    }

    /// The `min(limit, len)` most recent events, newest first.
    pub fn tail(&self, limit: usize) -> Vec<Event> {
        self.mirror.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.mirror.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.lock().is_empty()
    }

    /// Load the most recent persisted records into an empty mirror.
    ///
    /// Unparsable lines are skipped. Returns the number of events loaded.
    pub fn seed_from_disk(&self) -> usize {
        let contents = match fs::read_to_string(&self.settings.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(path = %self.settings.path.display(), error = %e, "Cannot read audit log for seeding");
                return 0;
            }
        };

        let parsed = parse_lines(contents.lines());
        let skip = parsed.len().saturating_sub(self.settings.mirror_capacity);

        let mut mirror = self.mirror.lock();
        if !mirror.is_empty() {
            warn!(existing = mirror.len(), "Audit mirror already populated, skipping seed");
            return 0;
        }
        // Chronological on disk; push_front leaves the newest at the head.
        for event in parsed.into_iter().skip(skip) {
            mirror.push_front(event);
        }

        debug!(loaded = mirror.len(), "Seeded audit mirror from disk");
        mirror.len()
    }

    /// Scan the persisted log newest to oldest, collecting up to `limit`
    /// events that pass `filter`. A missing file is an empty result.
    pub fn query(&self, filter: &AuditFilter, limit: usize) -> Vec<Event> {
        let contents = match fs::read_to_string(&self.settings.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.settings.path.display(), error = %e, "Cannot read audit log");
                return Vec::new();
            }
        };

        let mut matched = Vec::new();
        if limit == 0 {
            return matched;
        }
        for line in contents.lines().rev() {
            let Some(event) = parse_line(line) else { continue };
            if filter.matches(&event) {
                matched.push(event);
                if matched.len() >= limit {
                    break;
                }
            }
        }
        matched
    }

    fn persist(&self, event: &Event) -> io::Result<()> {
        let path = &self.settings.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        self.rotate_if_oversized(path)?;

        let mut line = event.to_json().map_err(io::Error::other)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }

    /// One-generation rotation: the live file replaces any prior backup.
    fn rotate_if_oversized(&self, path: &Path) -> io::Result<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.settings.max_bytes => {
                let backup = backup_path_for(path);
                fs::rename(path, &backup)?;
                debug!(
                    size = meta.len(),
                    backup = %backup.display(),
                    "Rotated audit log"
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

fn parse_line(line: &str) -> Option<Event> {
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(error = %e, "Skipping unparsable audit line");
            None
        }
    }
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Event> {
    lines.filter_map(parse_line).collect()
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
