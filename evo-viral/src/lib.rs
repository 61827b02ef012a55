//! Viral Library (§4.9): fitness-weighted pattern store, sampling by
//! context similarity × fitness, periodic pruning.

use evo_core::{cosine_similarity, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const PRUNE_FITNESS_FLOOR: f64 = 0.05;
const PRUNE_STALE_HOURS: f64 = 24.0 * 14.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: EntityId,
    pub schema_name: String,
    pub embedding: Vec<f32>,
    pub successes: u32,
    pub failures: u32,
    pub mean_impact: f64,
    pub last_used: Timestamp,
}

impl Pattern {
    pub fn new(schema_name: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: EntityId::generate(),
            schema_name: schema_name.into(),
            embedding,
            successes: 0,
            failures: 0,
            mean_impact: 0.0,
            last_used: Timestamp::now(),
        }
    }

    /// `fitness = success_rate × avg_impact`.
    pub fn fitness(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            return 0.0;
        }
        let success_rate = self.successes as f64 / total as f64;
        success_rate * self.mean_impact
    }

    /// `tanh(fitness)` — monotone odds a wager on this pattern pays off.
    pub fn market_odds(&self) -> f64 {
        self.fitness().tanh()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ViralLibrary {
    patterns: HashMap<EntityId, Pattern>,
}

impl ViralLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: Pattern) -> EntityId {
        let id = pattern.id;
        self.patterns.insert(id, pattern);
        id
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    /// A phage traced back to `id` succeeded with the given `impact`.
    /// Updates the running mean impact incrementally.
    pub fn record_success(&mut self, id: &EntityId, impact: f64) {
        if let Some(pattern) = self.patterns.get_mut(id) {
            let n = pattern.successes as f64;
            pattern.mean_impact = (pattern.mean_impact * n + impact) / (n + 1.0);
            pattern.successes += 1;
            pattern.last_used = Timestamp::now();
        }
    }

    /// A phage traced back to `id` failed; fitness decays implicitly
    /// through the success-rate denominator.
    pub fn record_failure(&mut self, id: &EntityId) {
        if let Some(pattern) = self.patterns.get_mut(id) {
            pattern.failures += 1;
            pattern.last_used = Timestamp::now();
        }
    }

    /// Top-`top_k` patterns by `cosine(context, pattern.embedding) ×
    /// fitness`, excluding anything below `min_fitness`.
    pub fn suggest_mutations(&self, context_embedding: &[f32], top_k: usize, min_fitness: f64) -> Vec<&Pattern> {
        let mut scored: Vec<(&Pattern, f64)> = self
            .patterns
            .values()
            .filter(|p| p.fitness() >= min_fitness)
            .map(|p| {
                let similarity = cosine_similarity(context_embedding, &p.embedding) as f64;
                (p, similarity * p.fitness())
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(top_k).map(|(p, _)| p).collect()
    }

    /// Deletes patterns with fitness below the floor that have not been
    /// used recently. Returns the number pruned.
    pub fn prune(&mut self) -> usize {
        let now = Timestamp::now();
        let before = self.patterns.len();
        self.patterns.retain(|_, p| {
            let stale = p.last_used.hours_since(now) > PRUNE_STALE_HOURS;
            !(p.fitness() < PRUNE_FITNESS_FLOOR && stale)
        });
        before - self.patterns.len()
    }

    /// All patterns ordered by fitness, highest first — the shape the
    /// CLI's `stats` verb wants for the fitness table.
    pub fn ranked_by_fitness(&self) -> Vec<&Pattern> {
        let mut patterns: Vec<&Pattern> = self.patterns.values().collect();
        patterns.sort_by(|a, b| b.fitness().partial_cmp(&a.fitness()).unwrap_or(std::cmp::Ordering::Equal));
        patterns
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitness_tracks_success_rate_times_impact() {
        let mut pattern = Pattern::new("loop_to_iterator", vec![1.0, 0.0]);
        pattern.successes = 3;
        pattern.failures = 1;
        pattern.mean_impact = 0.5;
        assert!((pattern.fitness() - 0.375).abs() < 1e-9);
    }

    #[test]
    fn suggest_mutations_ranks_by_similarity_times_fitness() {
        let mut library = ViralLibrary::new();
        let mut strong = Pattern::new("a", vec![1.0, 0.0]);
        strong.successes = 10;
        strong.mean_impact = 0.9;
        let id = library.insert(strong);
        library.record_success(&id, 0.9);

        let mut weak = Pattern::new("b", vec![0.0, 1.0]);
        weak.successes = 1;
        weak.mean_impact = 0.1;
        library.insert(weak);

        let suggestions = library.suggest_mutations(&[1.0, 0.0], 1, 0.0);
        assert_eq!(suggestions[0].schema_name, "a");
    }

    #[test]
    fn prune_removes_only_low_fitness_stale_patterns() {
        let mut library = ViralLibrary::new();
        let mut healthy = Pattern::new("keep", vec![1.0]);
        healthy.successes = 5;
        healthy.mean_impact = 0.8;
        library.insert(healthy);

        let mut dead = Pattern::new("drop", vec![1.0]);
        dead.failures = 10;
        dead.mean_impact = 0.0;
        dead.last_used = Timestamp::from_chrono(dead.last_used.as_chrono() - chrono::Duration::days(30));
        library.insert(dead);

        assert_eq!(library.prune(), 1);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn save_and_load_round_trips() {
        let mut library = ViralLibrary::new();
        let mut pattern = Pattern::new("loop_to_iterator", vec![1.0, 0.0]);
        pattern.successes = 4;
        pattern.mean_impact = 0.6;
        let id = library.insert(pattern);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viral.json");
        library.save(&path).unwrap();

        let loaded = ViralLibrary::load(&path).unwrap();
        assert_eq!(loaded.get(&id).unwrap().schema_name, "loop_to_iterator");
    }
}
