//! Holographic Memory: store-by-superposition, retrieve-by-resonance,
//! tiered cache with a hypnagogic consolidation pass (§4.3).

use evo_core::{cosine_similarity, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compression {
    Full,
    High,
    Medium,
    Low,
    Minimal,
}

impl Compression {
    /// Resolution a retrieval at this compression level reports.
    pub fn resolution(self) -> f32 {
        match self {
            Self::Full => 1.0,
            Self::High => 0.75,
            Self::Medium => 0.5,
            Self::Low => 0.25,
            Self::Minimal => 0.1,
        }
    }

    pub fn promote(self) -> Self {
        match self {
            Self::Minimal => Self::Low,
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Full => Self::Full,
        }
    }

    pub fn demote(self) -> Self {
        match self {
            Self::Full => Self::High,
            Self::High => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low | Self::Minimal => Self::Minimal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPattern {
    pub id: EntityId,
    pub content: String,
    pub embedding: Vec<f32>,
    pub timestamp: Timestamp,
    pub last_accessed: Timestamp,
    pub access_count: u64,
    pub compression: Compression,
    pub strength: f32,
    pub concepts: Vec<String>,
}

impl MemoryPattern {
    fn new(content: String, concepts: Vec<String>, embedding: Vec<f32>) -> Self {
        let now = Timestamp::now();
        Self {
            id: EntityId::generate(),
            content,
            embedding,
            timestamp: now,
            last_accessed: now,
            access_count: 0,
            compression: Compression::Full,
            strength: 1.0,
            concepts,
        }
    }

    /// `0.6·recency + 0.4·log-frequency`.
    pub fn temperature(&self, now: Timestamp) -> f64 {
        let hours = self.last_accessed.hours_since(now);
        let recency = (-hours / 24.0).exp();
        let frequency = ((self.access_count + 1) as f64).ln();
        0.6 * recency + 0.4 * (frequency / (frequency + 1.0))
    }

    /// `exp(-hours_since_access / (24·strength))`.
    pub fn retention(&self, now: Timestamp) -> f64 {
        let hours = self.last_accessed.hours_since(now);
        (-hours / (24.0 * self.strength as f64)).exp()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub pattern: MemoryPattern,
    pub similarity: f32,
    pub resolution: f32,
}

/// A set of patterns addressed by content, not by key: every retrieval
/// scores against every pattern (resonance), not an indexed lookup.
pub struct HolographicMemory {
    patterns: HashMap<EntityId, MemoryPattern>,
}

impl HolographicMemory {
    pub fn new() -> Self {
        Self { patterns: HashMap::new() }
    }

    pub fn store(&mut self, content: String, concepts: Vec<String>, embedding: Vec<f32>) -> EntityId {
        let pattern = MemoryPattern::new(content, concepts, embedding);
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

    /// Cosine-similarity resonance against every pattern. Per P5, a
    /// `threshold` of 0 on a non-empty store always yields at least one
    /// result: missing memories degrade to low-resolution reconstructions
    /// rather than hard misses, so the best match is always returned when
    /// the threshold permits it.
    pub fn retrieve(&mut self, query_embedding: &[f32], limit: usize, threshold: f32) -> Vec<RetrievalResult> {
        let mut scored: Vec<(EntityId, f32)> = self
            .patterns
            .values()
            .map(|p| (p.id, cosine_similarity(query_embedding, &p.embedding)))
            .filter(|(_, sim)| *sim >= threshold)
            .collect();

        // Graceful degradation: if nothing clears the threshold but the
        // store is non-empty and the threshold is 0, fall back to the
        // single best match rather than returning empty.
        if scored.is_empty() && threshold <= 0.0 && !self.patterns.is_empty() {
            if let Some((id, pattern)) = self
                .patterns
                .iter()
                .max_by(|a, b| {
                    let sa = cosine_similarity(query_embedding, &a.1.embedding);
                    let sb = cosine_similarity(query_embedding, &b.1.embedding);
                    sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(id, p)| (*id, p))
            {
                let sim = cosine_similarity(query_embedding, &pattern.embedding);
                scored.push((id, sim.max(0.0001)));
            }
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(id, sim)| {
                let pattern = self.patterns.get_mut(&id).expect("pattern exists");
                pattern.last_accessed = Timestamp::now();
                pattern.access_count += 1;
                pattern.strength = (pattern.strength * 1.1).min(10.0);
                RetrievalResult {
                    resolution: pattern.compression.resolution(),
                    similarity: sim,
                    pattern: pattern.clone(),
                }
            })
            .collect()
    }

    pub fn promote(&mut self, id: EntityId, levels: u32) {
        if let Some(pattern) = self.patterns.get_mut(&id) {
            for _ in 0..levels {
                pattern.compression = pattern.compression.promote();
            }
        }
    }

    pub fn demote(&mut self, id: EntityId, levels: u32) {
        if let Some(pattern) = self.patterns.get_mut(&id) {
            for _ in 0..levels {
                pattern.compression = pattern.compression.demote();
            }
        }
    }

    /// The hypnagogic pass: demote cold patterns, promote hot ones,
    /// cluster near-duplicates (cosine ≥ 0.95) into their hottest member.
    pub fn consolidate(&mut self) {
        let now = Timestamp::now();
        let ids: Vec<EntityId> = self.patterns.keys().copied().collect();
        for id in &ids {
            let temperature = self.patterns[id].temperature(now);
            if temperature < 0.3 {
                self.demote(*id, 1);
            } else if temperature > 0.7 {
                self.promote(*id, 1);
            }
        }

        let mut clusters: Vec<Vec<EntityId>> = Vec::new();
        let mut assigned: std::collections::HashSet<EntityId> = std::collections::HashSet::new();
        for &id in &ids {
            if assigned.contains(&id) {
                continue;
            }
            let mut cluster = vec![id];
            assigned.insert(id);
            for &other in &ids {
                if assigned.contains(&other) {
                    continue;
                }
                let sim = cosine_similarity(&self.patterns[&id].embedding, &self.patterns[&other].embedding);
                if sim >= 0.95 {
                    cluster.push(other);
                    assigned.insert(other);
                }
            }
            if cluster.len() > 1 {
                clusters.push(cluster);
            }
        }

        for cluster in clusters {
            let hottest = cluster
                .iter()
                .max_by(|a, b| {
                    self.patterns[a]
                        .temperature(now)
                        .partial_cmp(&self.patterns[b].temperature(now))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .copied()
                .unwrap();
            let mut merged_concepts = Vec::new();
            for &id in &cluster {
                merged_concepts.extend(self.patterns[&id].concepts.clone());
            }
            merged_concepts.sort();
            merged_concepts.dedup();
            if let Some(hot) = self.patterns.get_mut(&hottest) {
                hot.concepts = merged_concepts;
            }
            for id in cluster {
                if id != hottest {
                    self.patterns.remove(&id);
                }
            }
        }
    }
}

impl Default for HolographicMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed(words: &[&str]) -> Vec<f32> {
        evo_core::FallbackEmbedder::new().embed(&words.join(" "))
    }

    #[test]
    fn retrieve_always_yields_something_at_zero_threshold() {
        let mut memory = HolographicMemory::new();
        memory.store(
            "user prefers dark mode".into(),
            vec!["preference".into()],
            embed(&["user", "prefers", "dark", "mode"]),
        );
        memory.store(
            "user is nocturnal".into(),
            vec!["schedule".into()],
            embed(&["user", "is", "nocturnal"]),
        );

        let query = embed(&["what", "does", "the", "user", "like"]);
        let results = memory.retrieve(&query, 10, 0.0);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.similarity > 0.0));
    }

    #[test]
    fn consolidate_merges_near_duplicate_patterns() {
        let mut memory = HolographicMemory::new();
        let shared = embed(&["identical", "content", "here"]);
        memory.store("a".into(), vec!["x".into()], shared.clone());
        memory.store("a variant".into(), vec!["y".into()], shared);
        assert_eq!(memory.len(), 2);
        memory.consolidate();
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn retrieval_updates_strength_and_access_count() {
        let mut memory = HolographicMemory::new();
        let id = memory.store("x".into(), vec![], embed(&["hello", "world"]));
        let query = embed(&["hello", "world"]);
        memory.retrieve(&query, 10, 0.0);
        let pattern = &memory.patterns[&id];
        assert_eq!(pattern.access_count, 1);
        assert!(pattern.strength > 1.0);
    }
}
