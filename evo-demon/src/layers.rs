//! The five admissibility layers (§4.8), applied in order with
//! short-circuit on first failure.

use evo_core::cosine_similarity;
use evo_lattice::TypeLattice;
use serde::{Deserialize, Serialize};

/// The minimal shape of a candidate mutation the Demon inspects. The
/// Phage (§4.10) builds one of these from its own richer record before
/// calling `admit`.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source: String,
    pub original_source: String,
    pub mutated_type: Option<String>,
    pub declared_type: Option<String>,
    pub mutation_embedding: Vec<f32>,
    pub intent_embedding: Vec<f32>,
    pub confidence_threshold: f64,
    pub gibbs_free_energy: f64,
    pub library_odds: f64,
    pub expected_payoff: f64,
    pub stake: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Syntactic,
    SemanticStability,
    TeleologicalAlignment,
    Thermodynamic,
    Economic,
}

impl Layer {
    pub fn all() -> [Layer; 5] {
        [Layer::Syntactic, Layer::SemanticStability, Layer::TeleologicalAlignment, Layer::Thermodynamic, Layer::Economic]
    }
}

#[derive(Debug, Clone)]
pub struct LayerOutcome {
    pub layer: Layer,
    pub passed: bool,
    pub reason: Option<String>,
}

fn check_syntactic(candidate: &Candidate) -> LayerOutcome {
    let report = evo_analyzer::validate(&candidate.source);
    LayerOutcome {
        layer: Layer::Syntactic,
        passed: report.valid,
        reason: (!report.valid).then(|| "parse failure".to_string()),
    }
}

fn check_semantic_stability(candidate: &Candidate, lattice: &TypeLattice) -> LayerOutcome {
    let passed = match (&candidate.mutated_type, &candidate.declared_type) {
        (Some(mutated), Some(declared)) => lattice.is_subtype(mutated, declared),
        _ => true, // no declared type to check against; nothing to violate
    };
    LayerOutcome {
        layer: Layer::SemanticStability,
        passed,
        reason: (!passed).then(|| "mutated region no longer subtypes its declared type".to_string()),
    }
}

fn check_teleological_alignment(candidate: &Candidate) -> LayerOutcome {
    let similarity = cosine_similarity(&candidate.mutation_embedding, &candidate.intent_embedding) as f64;
    let passed = similarity >= candidate.confidence_threshold;
    LayerOutcome {
        layer: Layer::TeleologicalAlignment,
        passed,
        reason: (!passed).then(|| format!("alignment {similarity:.3} below threshold {:.3}", candidate.confidence_threshold)),
    }
}

fn check_thermodynamic(candidate: &Candidate) -> LayerOutcome {
    let passed = candidate.gibbs_free_energy < 0.0;
    LayerOutcome {
        layer: Layer::Thermodynamic,
        passed,
        reason: (!passed).then(|| format!("gibbs_free_energy={:.3} is not favorable", candidate.gibbs_free_energy)),
    }
}

fn check_economic(candidate: &Candidate) -> LayerOutcome {
    let expected_return = candidate.library_odds * candidate.expected_payoff;
    let passed = expected_return >= candidate.stake;
    LayerOutcome {
        layer: Layer::Economic,
        passed,
        reason: (!passed).then(|| format!("expected return {expected_return:.3} below stake {:.3}", candidate.stake)),
    }
}

/// Runs all five layers in order, stopping at the first failure.
pub fn run_layers(candidate: &Candidate, lattice: &TypeLattice) -> Vec<LayerOutcome> {
    let mut outcomes = Vec::with_capacity(5);
    for layer in Layer::all() {
        let outcome = match layer {
            Layer::Syntactic => check_syntactic(candidate),
            Layer::SemanticStability => check_semantic_stability(candidate, lattice),
            Layer::TeleologicalAlignment => check_teleological_alignment(candidate),
            Layer::Thermodynamic => check_thermodynamic(candidate),
            Layer::Economic => check_economic(candidate),
        };
        let passed = outcome.passed;
        outcomes.push(outcome);
        if !passed {
            break;
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_candidate() -> Candidate {
        Candidate {
            source: "fn f() -> i32 { 1 }".to_string(),
            original_source: "fn f() -> i32 { 0 }".to_string(),
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
    fn all_layers_pass_for_a_well_formed_favorable_candidate() {
        let candidate = base_candidate();
        let lattice = TypeLattice::new();
        let outcomes = run_layers(&candidate, &lattice);
        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.passed));
    }

    #[test]
    fn syntax_failure_short_circuits_remaining_layers() {
        let mut candidate = base_candidate();
        candidate.source = "fn broken( {".to_string();
        let lattice = TypeLattice::new();
        let outcomes = run_layers(&candidate, &lattice);
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].passed);
    }

    #[test]
    fn unfavorable_thermodynamics_is_rejected() {
        let mut candidate = base_candidate();
        candidate.gibbs_free_energy = 0.5;
        let lattice = TypeLattice::new();
        let outcomes = run_layers(&candidate, &lattice);
        assert_eq!(outcomes.last().unwrap().layer, Layer::Thermodynamic);
        assert!(!outcomes.last().unwrap().passed);
    }
}
