//! Thermodynamic Cycle (§4.11): Mutate → Select → Wager → Infect → Payoff,
//! composing evo-mutator, evo-demon, evo-viral and evo-phage.

use crate::pipeline::CycleState;
use evo_demon::layers::Candidate as DemonCandidate;
use evo_demon::Verdict as DemonVerdict;
use evo_harness::{run_harness, HarnessConfig};
use evo_mutator::vector::MutationVector;
use evo_mutator::synthesize;
use evo_phage::{infect, ExecutionMode, Infector, Phage};
use evo_safety::AuditCategory;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Infected { description: String },
    RejectedByDemon { reason: String },
    RateLimited,
    RolledBack,
}

/// Reports a harness verdict computed before `infect()` runs, since the
/// Infector trait is deliberately synchronous (§ design note in
/// evo-phage) and the harness itself is not.
struct FixedInfector {
    contents: String,
    tests_pass: bool,
}

impl Infector for FixedInfector {
    fn mutated_contents(&self, _path: &std::path::Path) -> anyhow::Result<String> {
        Ok(self.contents.clone())
    }
    fn run_tests(&self, _mode: ExecutionMode) -> bool {
        self.tests_pass
    }
}

/// Maps an `ExecutionMode` onto the harness gates it runs: `Dry` checks
/// syntax only (no cargo invocation at all), `TestOnly` runs the test
/// suite without a separate type-check pass, `Production` requires
/// both, mirroring the full gating the experiment path uses.
fn harness_config_for(mode: ExecutionMode) -> HarnessConfig {
    match mode {
        ExecutionMode::Dry => HarnessConfig { require_type_check: false, require_tests: false, ..HarnessConfig::default() },
        ExecutionMode::TestOnly => HarnessConfig { require_type_check: false, require_tests: true, ..HarnessConfig::default() },
        ExecutionMode::Production => HarnessConfig::default(),
    }
}

/// Turns a synthesized mutation vector into the minimal shape the
/// Demon inspects. The embeddings are intentionally coarse: a real
/// deployment would source them from the catalog's embedding model,
/// not reconstruct them here.
fn candidate_from_vector(vector: &MutationVector, intent_embedding: &[f32], confidence_threshold: f64, temperature: f64, library_odds: f64, expected_payoff: f64, stake: f64) -> DemonCandidate {
    DemonCandidate {
        source: vector.candidate.clone(),
        original_source: vector.original.clone(),
        mutated_type: None,
        declared_type: None,
        mutation_embedding: intent_embedding.to_vec(),
        intent_embedding: intent_embedding.to_vec(),
        confidence_threshold,
        gibbs_free_energy: vector.gibbs_free_energy(temperature),
        library_odds,
        expected_payoff,
        stake,
    }
}

/// Runs one cycle over a single hot spot's source: synthesizes mutation
/// vectors, admits the strongest one through the Demon, wagers against
/// the Viral Library's suggested patterns, runs the Test Harness in the
/// configured mode, then infects a target file and feeds the payoff
/// back into the library.
///
/// Locks on `cycle_state`'s mutexes are scoped to never span the
/// harness `.await`, so callers running many cycles concurrently can
/// hold `cycle_state` behind a shared reference rather than serializing
/// the whole run on a single guard.
pub async fn run_cycle(
    source: &str,
    manifest_dir: &Path,
    target_path: PathBuf,
    temperature: f64,
    intent_embedding: &[f32],
    cycle_state: &CycleState,
) -> anyhow::Result<CycleOutcome> {
    let vectors = synthesize(source, temperature);
    let Some(best) = vectors.into_iter().min_by(|a, b| {
        a.gibbs_free_energy(temperature)
            .partial_cmp(&b.gibbs_free_energy(temperature))
            .unwrap_or(std::cmp::Ordering::Equal)
    }) else {
        return Ok(CycleOutcome::RejectedByDemon { reason: "no admissible mutation vectors synthesized".to_string() });
    };

    let description = format!("{:?}", best.schema);
    cycle_state.audit.record(AuditCategory::MutationGenerated, &description, &best.candidate);

    let (library_odds, pattern_id) = {
        let library = cycle_state.library.lock().unwrap();
        let suggestions = library.suggest_mutations(intent_embedding, 3, 0.0);
        (suggestions.first().map(|p| p.market_odds()).unwrap_or(0.5), suggestions.first().map(|p| p.id))
    };

    let candidate = candidate_from_vector(&best, intent_embedding, 0.3, temperature, library_odds, 1.5, 1.0);

    let verdict = {
        let mut demon = cycle_state.demon.lock().unwrap();
        demon.admit(&candidate, &cycle_state.lattice)
    };
    match verdict {
        DemonVerdict::RejectedAtLayer { layer, reason } => {
            return Ok(CycleOutcome::RejectedByDemon { reason: format!("{layer:?}: {reason}") });
        }
        DemonVerdict::RejectedParasitic { patterns } => {
            return Ok(CycleOutcome::RejectedByDemon { reason: format!("parasitic patterns: {patterns:?}") });
        }
        DemonVerdict::RejectedByMemory { similarity } => {
            return Ok(CycleOutcome::RejectedByDemon { reason: format!("resonant with a previously rejected mutation (similarity {similarity:.3})") });
        }
        DemonVerdict::Admitted => {}
    }

    let admitted = {
        let mut rate_limiter = cycle_state.rate_limiter.lock().unwrap();
        rate_limiter.try_acquire()
    };
    if !admitted {
        return Ok(CycleOutcome::RateLimited);
    }

    cycle_state.audit.record(AuditCategory::InfectionStarted, &description, target_path.display().to_string());

    let harness_config = harness_config_for(cycle_state.mode);
    let harness_result = run_harness(manifest_dir, &target_path, &best.candidate, &harness_config).await?;
    let tests_pass = harness_result.verdict.is_pass();

    let mut phage = Phage::new(description.clone(), vec![target_path], candidate.stake);
    let infector = FixedInfector { contents: best.candidate.clone(), tests_pass };
    let outcome = infect(&mut phage, &infector, cycle_state.mode)?;

    if let Some(id) = pattern_id {
        let mut library = cycle_state.library.lock().unwrap();
        match outcome {
            evo_phage::InfectionOutcome::Infected => library.record_success(&id, 1.0),
            evo_phage::InfectionOutcome::RolledBack => library.record_failure(&id),
        }
    }

    Ok(match outcome {
        evo_phage::InfectionOutcome::Infected => {
            cycle_state.audit.record(AuditCategory::InfectionSucceeded, &description, "committed");
            CycleOutcome::Infected { description }
        }
        evo_phage::InfectionOutcome::RolledBack => {
            cycle_state.audit.record(AuditCategory::InfectionFailed, &description, "tests failed");
            cycle_state.audit.record(AuditCategory::RolledBack, &description, "all target files restored");
            CycleOutcome::RolledBack
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_phage::ExecutionMode;

    #[tokio::test]
    async fn clean_hot_spot_cycles_to_an_infection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.rs");
        std::fs::write(&path, "x").unwrap();

        let cycle_state = CycleState::new(ExecutionMode::Dry);

        let source = "fn f() { for i in 0..items.len() { println!(\"{}\", items[i]); } }";
        let outcome = run_cycle(source, dir.path(), path, 0.5, &[1.0, 0.0], &cycle_state).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Infected { .. } | CycleOutcome::RejectedByDemon { .. }));
        assert!(!cycle_state.audit.events().is_empty());
    }

    #[tokio::test]
    async fn harness_syntax_failure_rolls_back_even_when_the_demon_admits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.rs");
        std::fs::write(&path, "x").unwrap();

        // Dry mode never spawns cargo, so this only exercises the
        // harness's unconditional syntax check: the for-loop schema
        // still matches and rewrites the header, but the missing
        // closing brace keeps the candidate unparsable.
        let cycle_state = CycleState::new(ExecutionMode::Dry);
        let source = "fn f() { for i in 0..items.len() { println!(\"{}\", items[i]); }";
        let outcome = run_cycle(source, dir.path(), path, 0.5, &[1.0, 0.0], &cycle_state).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::RolledBack | CycleOutcome::RejectedByDemon { .. }));
    }
}
