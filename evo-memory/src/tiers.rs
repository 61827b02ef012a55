//! Three-tier memory movement: Sensory → Working via attention, Working
//! → Long-term via consolidation, Long-term → Working via recall (§4.3).

use crate::holographic::HolographicMemory;
use evo_core::{cosine_similarity, Timestamp};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SensoryItem {
    pub content: String,
    pub embedding: Vec<f32>,
    pub concepts: Vec<String>,
    pub salience: f32,
    pub received_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct WorkingItem {
    pub content: String,
    pub embedding: Vec<f32>,
    pub concepts: Vec<String>,
    pub activation: f32,
    pub entered_at: Timestamp,
}

/// Bounded TTL sensory buffer plus a capacity-bounded working set. The
/// discarded tail of each `attend` call — items below threshold that
/// never advance — is the "accursed share": dropped, not buffered, and
/// only observable through `dropped_count`.
pub struct TieredMemory {
    sensory_ttl_secs: u64,
    working_capacity: usize,
    sensory: VecDeque<SensoryItem>,
    working: Vec<WorkingItem>,
    dropped_count: u64,
}

impl TieredMemory {
    pub fn new(sensory_ttl_secs: u64, working_capacity: usize) -> Self {
        Self {
            sensory_ttl_secs,
            working_capacity,
            sensory: VecDeque::new(),
            working: Vec::new(),
            dropped_count: 0,
        }
    }

    pub fn perceive(&mut self, content: String, embedding: Vec<f32>, concepts: Vec<String>, salience: f32) {
        self.expire_sensory();
        self.sensory.push_back(SensoryItem {
            content,
            embedding,
            concepts,
            salience,
            received_at: Timestamp::now(),
        });
    }

    fn expire_sensory(&mut self) {
        let now = Timestamp::now();
        self.sensory
            .retain(|item| item.received_at.hours_since(now) * 3600.0 < self.sensory_ttl_secs as f64);
    }

    /// score = salience + novelty bonus + relevance-to-focus; top-k above
    /// `threshold` advance to Working, the rest are the accursed share.
    pub fn attend(&mut self, focus_embedding: &[f32], threshold: f32) {
        self.expire_sensory();
        let mut scored: Vec<(f32, SensoryItem)> = self
            .sensory
            .drain(..)
            .map(|item| {
                let relevance = cosine_similarity(focus_embedding, &item.embedding);
                let novelty = if self
                    .working
                    .iter()
                    .any(|w| cosine_similarity(&w.embedding, &item.embedding) > 0.9)
                {
                    0.0
                } else {
                    0.2
                };
                let score = item.salience + novelty + relevance;
                (score, item)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        for (score, item) in scored {
            if score >= threshold {
                self.working.push(WorkingItem {
                    content: item.content,
                    embedding: item.embedding,
                    concepts: item.concepts,
                    activation: score,
                    entered_at: Timestamp::now(),
                });
            } else {
                self.dropped_count += 1;
            }
        }

        self.decay_working();
        self.enforce_working_capacity();
    }

    fn decay_working(&mut self) {
        let now = Timestamp::now();
        for item in &mut self.working {
            let minutes = item.entered_at.hours_since(now) * 60.0;
            item.activation *= (-minutes / 10.0).exp().max(0.01) as f32;
        }
    }

    fn enforce_working_capacity(&mut self) {
        if self.working.len() <= self.working_capacity {
            return;
        }
        self.working
            .sort_by(|a, b| b.activation.partial_cmp(&a.activation).unwrap_or(std::cmp::Ordering::Equal));
        self.working.truncate(self.working_capacity);
    }

    /// Working → Long-term: move everything currently in Working into
    /// the holographic store and clear the working set.
    pub fn consolidate_into(&mut self, long_term: &mut HolographicMemory) {
        for item in self.working.drain(..) {
            long_term.store(item.content, item.concepts, item.embedding);
        }
    }

    /// Long-term → Working: load resonant matches back at high priority.
    pub fn recall(&mut self, long_term: &mut HolographicMemory, query_embedding: &[f32], limit: usize) {
        for result in long_term.retrieve(query_embedding, limit, 0.0) {
            self.working.push(WorkingItem {
                content: result.pattern.content,
                embedding: result.pattern.embedding,
                concepts: result.pattern.concepts,
                activation: 1.0,
                entered_at: Timestamp::now(),
            });
        }
        self.enforce_working_capacity();
    }

    pub fn working_items(&self) -> &[WorkingItem] {
        &self.working
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attend_advances_high_salience_items_and_drops_the_rest() {
        let mut tiers = TieredMemory::new(10, 7);
        tiers.perceive("important".into(), vec![1.0, 0.0], vec![], 0.9);
        tiers.perceive("noise".into(), vec![0.0, 1.0], vec![], 0.05);
        tiers.attend(&[1.0, 0.0], 0.5);
        assert_eq!(tiers.working_items().len(), 1);
        assert_eq!(tiers.dropped_count(), 1);
    }

    #[test]
    fn consolidate_moves_working_items_into_long_term() {
        let mut tiers = TieredMemory::new(10, 7);
        let mut long_term = HolographicMemory::new();
        tiers.perceive("a".into(), vec![1.0, 0.0], vec![], 1.0);
        tiers.attend(&[1.0, 0.0], 0.1);
        assert_eq!(tiers.working_items().len(), 1);
        tiers.consolidate_into(&mut long_term);
        assert_eq!(tiers.working_items().len(), 0);
        assert_eq!(long_term.len(), 1);
    }
}
