//! Audit logger (§4.11): an append-only event sink over the five
//! tracked categories.

use anyhow::{Context, Result};
use evo_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    MutationGenerated,
    InfectionStarted,
    InfectionSucceeded,
    InfectionFailed,
    RolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub category: AuditCategory,
    pub subject: String,
    pub detail: String,
    pub timestamp: Timestamp,
}

#[derive(Default)]
pub struct AuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, category: AuditCategory, subject: impl Into<String>, detail: impl Into<String>) {
        let event = AuditEvent {
            category,
            subject: subject.into(),
            detail: detail.into(),
            timestamp: Timestamp::now(),
        };
        tracing::info!(category = ?event.category, subject = %event.subject, "audit event");
        self.events.write().expect("audit log poisoned").push(event);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().expect("audit log poisoned").clone()
    }

    pub fn events_of(&self, category: AuditCategory) -> Vec<AuditEvent> {
        self.events
            .read()
            .expect("audit log poisoned")
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }

    /// Appends the in-memory log to a JSON-lines file on disk. Never
    /// truncates — each call appends, preserving append-only semantics
    /// across process restarts.
    pub fn flush_to(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let events = self.events();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        for event in &events {
            let line = serde_json::to_string(event)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// Reads back every event previously flushed to `path`, for
    /// introspection tooling — not loaded into a live `AuditLog`, since
    /// the log only ever grows by appending from the current process.
    pub fn read_jsonl(path: &Path) -> Result<Vec<AuditEvent>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("reading audit log {}", path.display()))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("parsing audit log line"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_filters_by_category() {
        let log = AuditLog::new();
        log.record(AuditCategory::MutationGenerated, "mod_a", "hot spot hit");
        log.record(AuditCategory::RolledBack, "mod_a", "tests failed");
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events_of(AuditCategory::RolledBack).len(), 1);
    }

    #[test]
    fn flush_appends_jsonl_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let log = AuditLog::new();
        log.record(AuditCategory::MutationGenerated, "mod_a", "first");
        log.flush_to(&path).unwrap();

        let log2 = AuditLog::new();
        log2.record(AuditCategory::InfectionSucceeded, "mod_a", "second");
        log2.flush_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
