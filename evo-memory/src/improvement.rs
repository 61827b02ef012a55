//! Improvement Memory: an append-only past-attempt ledger, deduplicated
//! by normalized hash (§3 `ImprovementRecord`, §9 Open Question — the
//! normalized-hash variant is used as the default, not fuzzy Levenshtein).

use evo_core::{Fingerprint, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Accepted,
    Rejected,
    Held,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementRecord {
    pub module: String,
    pub hypothesis_hash: Fingerprint,
    pub description: String,
    pub outcome: Outcome,
    pub timestamp: Timestamp,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    records: Vec<ImprovementRecord>,
}

/// Serializes writes via an internal lock and exposes only atomic
/// methods (`record`, `was_rejected`), per §5's shared-resource
/// discipline.
pub struct ImprovementMemory {
    ledger: RwLock<Ledger>,
    // module -> hash -> index into ledger.records, for O(1) dedup lookups
    index: RwLock<HashMap<(String, Fingerprint), usize>>,
}

impl ImprovementMemory {
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(Ledger::default()),
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn record(&self, module: &str, hypothesis: &str, outcome: Outcome, description: &str, rejection_reason: Option<String>) {
        let hash = Fingerprint::of_text(hypothesis);
        let record = ImprovementRecord {
            module: module.to_string(),
            hypothesis_hash: hash,
            description: description.to_string(),
            outcome,
            timestamp: Timestamp::now(),
            rejection_reason,
        };
        let mut ledger = self.ledger.write().unwrap();
        let idx = ledger.records.len();
        ledger.records.push(record);
        self.index.write().unwrap().insert((module.to_string(), hash), idx);
    }

    /// True if `hypothesis` (or any normalized-hash-equal variant) was
    /// previously recorded as rejected for `module` (P9).
    pub fn was_rejected(&self, module: &str, hypothesis: &str) -> bool {
        let hash = Fingerprint::of_text(hypothesis);
        let index = self.index.read().unwrap();
        match index.get(&(module.to_string(), hash)) {
            Some(&idx) => {
                let ledger = self.ledger.read().unwrap();
                matches!(ledger.records[idx].outcome, Outcome::Rejected)
            }
            None => false,
        }
    }

    /// True if a fuzzy-matched hypothesis was recently accepted for this
    /// module (used by the pipeline to skip redundant re-proposals).
    pub fn was_recently_accepted(&self, module: &str, hypothesis: &str) -> bool {
        let hash = Fingerprint::of_text(hypothesis);
        let index = self.index.read().unwrap();
        match index.get(&(module.to_string(), hash)) {
            Some(&idx) => {
                let ledger = self.ledger.read().unwrap();
                matches!(ledger.records[idx].outcome, Outcome::Accepted)
            }
            None => false,
        }
    }

    pub fn records_for(&self, module: &str) -> Vec<ImprovementRecord> {
        self.ledger
            .read()
            .unwrap()
            .records
            .iter()
            .filter(|r| r.module == module)
            .cloned()
            .collect()
    }

    /// All recorded attempts across every module, in insertion order.
    pub fn all(&self) -> Vec<ImprovementRecord> {
        self.ledger.read().unwrap().records.clone()
    }

    /// Persist as `{"records": [...]}` per §6's persisted-state layout.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let ledger = self.ledger.read().unwrap();
        let text = serde_json::to_string_pretty(&*ledger)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let ledger: Ledger = serde_json::from_str(&text)?;
        let mut index = HashMap::new();
        for (i, record) in ledger.records.iter().enumerate() {
            index.insert((record.module.clone(), record.hypothesis_hash), i);
        }
        Ok(Self {
            ledger: RwLock::new(ledger),
            index: RwLock::new(index),
        })
    }
}

impl Default for ImprovementMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn was_rejected_collides_on_whitespace_variants() {
        let memory = ImprovementMemory::new();
        memory.record("types", "Add __hash__ to Agent", Outcome::Rejected, "no", None);
        assert!(memory.was_rejected("types", "add  __hash__  to   agent"));
        assert!(!memory.was_rejected("other_module", "Add __hash__ to Agent"));
    }

    #[test]
    fn save_and_load_round_trips() {
        let memory = ImprovementMemory::new();
        memory.record("mod_a", "do a thing", Outcome::Accepted, "did it", None);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("improvements.json");
        memory.save(&path).unwrap();

        let loaded = ImprovementMemory::load(&path).unwrap();
        assert!(loaded.was_recently_accepted("mod_a", "do a thing"));
    }
}
