//! Mutation vector synthesis (§4.7): schemas applied to hot spots,
//! filtered by Gibbs free energy.

use crate::hotspot::score_hot_spot;
use crate::schema::{apply_schema, Schema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationVector {
    pub schema: Schema,
    pub original: String,
    pub candidate: String,
    pub enthalpy_delta: f64,
    pub entropy_delta: f64,
}

impl MutationVector {
    /// `ΔG = ΔH − T·ΔS`. Negative is thermodynamically favorable: the
    /// mutation is "worth" the complexity it adds given the prevailing
    /// temperature (how exploratory the pipeline currently is).
    pub fn gibbs_free_energy(&self, temperature: f64) -> f64 {
        self.enthalpy_delta - temperature * self.entropy_delta
    }
}

fn normalized_complexity_delta(original: &str, candidate: &str) -> f64 {
    let before = score_hot_spot(original).map(|s| s.complexity.cyclomatic_complexity).unwrap_or(1);
    let after = score_hot_spot(candidate).map(|s| s.complexity.cyclomatic_complexity).unwrap_or(before);
    (after as f64 - before as f64) / before.max(1) as f64
}

/// A heuristic stand-in for "added expressiveness": iterator/combinator
/// adoption and named-constant extraction both read as capability
/// gains even though the line count may be flat or shrinking.
fn capability_delta(original: &str, candidate: &str) -> f64 {
    let markers = [".iter(", ".map(", ".filter(", ".and_then(", "const "];
    let before: usize = markers.iter().map(|m| original.matches(m).count()).sum();
    let after: usize = markers.iter().map(|m| candidate.matches(m).count()).sum();
    (after as f64 - before as f64).max(0.0) / (before.max(1)) as f64
}

/// Applies every schema to `source`, keeping only candidates with
/// favorable (negative) ΔG at the given `temperature`.
pub fn synthesize(source: &str, temperature: f64) -> Vec<MutationVector> {
    Schema::all()
        .into_iter()
        .filter_map(|schema| apply_schema(schema, source).map(|candidate| (schema, candidate)))
        .map(|(schema, candidate)| {
            let enthalpy_delta = normalized_complexity_delta(source, &candidate);
            let entropy_delta = capability_delta(source, &candidate);
            MutationVector { schema, original: source.to_string(), candidate, enthalpy_delta, entropy_delta }
        })
        .filter(|v| v.gibbs_free_energy(temperature) < 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesize_emits_only_favorable_vectors() {
        let source = "fn sum(items: &[i32]) -> i32 { let mut total = 0; for i in 0..items.len() { total += items[i]; } total }";
        let vectors = synthesize(source, 1.0);
        for v in &vectors {
            assert!(v.gibbs_free_energy(1.0) < 0.0);
        }
    }

    #[test]
    fn high_temperature_admits_more_candidates_than_zero_temperature() {
        let source = "fn sum(items: &[i32]) -> i32 { let mut total = 0; for i in 0..items.len() { total += items[i]; } total }";
        let cold = synthesize(source, 0.0).len();
        let hot = synthesize(source, 10.0).len();
        assert!(hot >= cold);
    }
}
