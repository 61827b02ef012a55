//! Registry: an indexed `id -> CatalogEntry` map with idempotent
//! registration and EMA-smoothed usage stats (§4.2).

use crate::entry::{CatalogEntry, CatalogId, EntryStatus};
use evo_core::Timestamp;
use std::collections::HashMap;
use std::sync::RwLock;

const USAGE_EMA_ALPHA: f64 = 0.1;

pub struct Registry {
    entries: RwLock<HashMap<CatalogId, CatalogEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Idempotent on id: registering the same id again overwrites the
    /// entry and bumps `updated_at`, per scenario 1.
    pub fn register(&self, mut entry: CatalogEntry) {
        entry.updated_at = Timestamp::now();
        self.entries.write().unwrap().insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<CatalogEntry> {
        self.entries.read().unwrap().get(id).cloned()
    }

    pub fn list(&self) -> Vec<CatalogEntry> {
        self.entries.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn filter_by_type(&self, entity_type: &str) -> Vec<CatalogEntry> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect()
    }

    pub fn filter_by_status(&self, status: EntryStatus) -> Vec<CatalogEntry> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    pub fn filter_by_author(&self, author: &str) -> Vec<CatalogEntry> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.author == author)
            .cloned()
            .collect()
    }

    pub fn filter_by_keyword(&self, keyword: &str) -> Vec<CatalogEntry> {
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| e.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)))
            .cloned()
            .collect()
    }

    /// `success_rate` updated via exponential moving average, α=0.1.
    pub fn update_usage(&self, id: &str, success: bool, _error: Option<&str>) {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.usage_count += 1;
            let sample = if success { 1.0 } else { 0.0 };
            entry.success_rate = USAGE_EMA_ALPHA * sample + (1.0 - USAGE_EMA_ALPHA) * entry.success_rate;
            entry.updated_at = Timestamp::now();
        }
    }

    pub fn add_relationship(&self, id: &str, kind: &str, target: &str) {
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.relationships.entry(kind.to_string()).or_default().push(target.to_string());
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_on_id() {
        let registry = Registry::new();
        let mut entry = CatalogEntry::new("x", "agent", "thing", "1.0", "alice");
        registry.register(entry.clone());
        entry.version = "2.0".to_string();
        registry.register(entry);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("x").unwrap().version, "2.0");
    }

    #[test]
    fn update_usage_applies_ema() {
        let registry = Registry::new();
        registry.register(CatalogEntry::new("x", "agent", "thing", "1.0", "alice"));
        registry.update_usage("x", true, None);
        let entry = registry.get("x").unwrap();
        assert!((entry.success_rate - 1.0).abs() < 1e-9);
        registry.update_usage("x", false, None);
        let entry = registry.get("x").unwrap();
        assert!((entry.success_rate - 0.9).abs() < 1e-9);
    }
}
