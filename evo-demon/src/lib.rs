//! Teleological Demon (§4.8): five-layer admissibility filter plus a
//! parasitic-pattern detector, with per-layer rejection statistics.

pub mod layers;
pub mod parasitic;

use evo_memory::HolographicMemory;
use layers::{run_layers, Candidate, Layer};
use parasitic::{detect, ParasiticPattern};
use std::collections::HashMap;

pub use layers::LayerOutcome;

/// Resonance threshold above which a candidate is treated as the same
/// mutation as a previously rejected one, per the Demon's holographic
/// rejection memory rather than its five admissibility layers.
const MEMORY_REJECTION_THRESHOLD: f32 = 0.95;

#[derive(Debug, Clone)]
pub enum Verdict {
    Admitted,
    RejectedAtLayer { layer: Layer, reason: String },
    RejectedParasitic { patterns: Vec<ParasiticPattern> },
    RejectedByMemory { similarity: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct LayerStats {
    pub seen: u64,
    pub rejected: u64,
}

impl LayerStats {
    pub fn rejection_rate(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            self.rejected as f64 / self.seen as f64
        }
    }
}

#[derive(Default)]
pub struct DemonStats {
    pub per_layer: HashMap<Layer, LayerStats>,
    pub parasitic_rejections: u64,
    pub total_candidates: u64,
}

/// The Teleological Demon: runs the five admissibility layers followed
/// by the parasitic-pattern detector, tracking per-layer statistics.
/// Every rejection is also stored in a holographic memory keyed by the
/// candidate's mutation embedding, so a near-identical mutation (§2:
/// "the Cycle treats mutations as Phages filtered by the Demon using
/// Lattice/Memory semantics") is rejected by resonance before paying
/// for the layer pipeline again.
pub struct Demon {
    pub stats: DemonStats,
    rejection_memory: HolographicMemory,
}

impl Default for Demon {
    fn default() -> Self {
        Self { stats: DemonStats::default(), rejection_memory: HolographicMemory::new() }
    }
}

impl Demon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, candidate: &Candidate, lattice: &evo_lattice::TypeLattice) -> Verdict {
        self.stats.total_candidates += 1;

        if !self.rejection_memory.is_empty() {
            if let Some(resonant) = self
                .rejection_memory
                .retrieve(&candidate.mutation_embedding, 1, MEMORY_REJECTION_THRESHOLD)
                .into_iter()
                .next()
            {
                return Verdict::RejectedByMemory { similarity: resonant.similarity };
            }
        }

        let outcomes = run_layers(candidate, lattice);
        for outcome in &outcomes {
            let entry = self.stats.per_layer.entry(outcome.layer).or_default();
            entry.seen += 1;
            if !outcome.passed {
                entry.rejected += 1;
            }
        }

        if let Some(failed) = outcomes.iter().find(|o| !o.passed) {
            self.remember_rejection(candidate, format!("{:?}: {}", failed.layer, failed.reason.clone().unwrap_or_default()));
            return Verdict::RejectedAtLayer {
                layer: failed.layer,
                reason: failed.reason.clone().unwrap_or_default(),
            };
        }

        let patterns = detect(&candidate.original_source, &candidate.source);
        if !patterns.is_empty() {
            self.stats.parasitic_rejections += 1;
            self.remember_rejection(candidate, format!("parasitic: {patterns:?}"));
            return Verdict::RejectedParasitic { patterns };
        }

        Verdict::Admitted
    }

    fn remember_rejection(&mut self, candidate: &Candidate, reason: String) {
        self.rejection_memory.store(candidate.source.clone(), vec![reason], candidate.mutation_embedding.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_candidate() -> Candidate {
        Candidate {
            source: "fn f(a: i32, b: i32) -> i32 { a + b }".to_string(),
            original_source: "fn f(a: i32, b: i32) -> i32 { a - b }".to_string(),
            mutated_type: None,
            declared_type: None,
            mutation_embedding: vec![1.0, 0.0],
            intent_embedding: vec![1.0, 0.0],
            confidence_threshold: 0.5,
            gibbs_free_energy: -0.1,
            library_odds: 0.8,
            expected_payoff: 2.0,
            stake: 1.0,
        }
    }

    #[test]
    fn admits_a_clean_candidate_and_tracks_stats() {
        let mut demon = Demon::new();
        let lattice = evo_lattice::TypeLattice::new();
        let verdict = demon.admit(&base_candidate(), &lattice);
        assert!(matches!(verdict, Verdict::Admitted));
        assert_eq!(demon.stats.total_candidates, 1);
        assert_eq!(demon.stats.per_layer.len(), 5);
    }

    #[test]
    fn parasitic_pattern_is_a_final_rejection_even_with_favorable_layers() {
        let mut demon = Demon::new();
        let lattice = evo_lattice::TypeLattice::new();
        let mut candidate = base_candidate();
        candidate.original_source = "fn f(a: i32, b: i32) -> i32 { return a + b; }".to_string();
        candidate.source = "fn f(a: i32, b: i32) -> i32 { return 7; }".to_string();
        let verdict = demon.admit(&candidate, &lattice);
        assert!(matches!(verdict, Verdict::RejectedParasitic { .. }));
    }

    #[test]
    fn a_repeated_rejection_is_caught_by_memory_resonance() {
        let mut demon = Demon::new();
        let lattice = evo_lattice::TypeLattice::new();
        let mut candidate = base_candidate();
        candidate.original_source = "fn f(a: i32, b: i32) -> i32 { return a + b; }".to_string();
        candidate.source = "fn f(a: i32, b: i32) -> i32 { return 7; }".to_string();

        let first = demon.admit(&candidate, &lattice);
        assert!(matches!(first, Verdict::RejectedParasitic { .. }));

        let second = demon.admit(&candidate, &lattice);
        assert!(matches!(second, Verdict::RejectedByMemory { .. }));
    }
}
