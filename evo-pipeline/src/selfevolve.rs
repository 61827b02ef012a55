//! Fixed-point self-evolution driver (§4.11, P8): repeatedly improves a
//! meta-target module and stops once the Safety Kernel's convergence
//! check says the old and new source have stabilized.

use crate::experiment::{run_experiment, ExperimentConfig, ExperimentOutcome};
use crate::incorporator::apply_experiment;
use crate::llm::LlmClient;
use evo_analyzer::{analyze, propose_hypotheses};
use evo_safety::{record_step, ConvergenceConfig, ConvergenceStep};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SelfEvolutionReport {
    pub steps: Vec<ConvergenceStep>,
    pub final_source: String,
    pub applied: bool,
}

/// Drives the fixed-point loop for a single meta-target module: each
/// iteration proposes one hypothesis against the current source, runs
/// an experiment for it, and feeds the old/new text into
/// `evo_safety::record_step` to decide whether to keep iterating. Stops
/// early the first iteration an experiment fails to produce an accepted
/// candidate, since there is nothing further to converge on. When
/// `auto_apply` is set and at least one iteration converged, writes and
/// commits the final source via the Incorporator.
#[allow(clippy::too_many_arguments)]
pub async fn run_self_evolution(
    client: &dyn LlmClient,
    module_name: &str,
    manifest_dir: &Path,
    module_path: &Path,
    config: &ConvergenceConfig,
    experiment_config: &ExperimentConfig,
    auto_apply: bool,
) -> anyhow::Result<SelfEvolutionReport> {
    let mut current = std::fs::read_to_string(module_path)?;
    let mut steps = Vec::new();
    let mut iteration = 0;

    loop {
        iteration += 1;
        let structure = analyze(&current)?;
        let Some(hypothesis) = propose_hypotheses(&structure, 1).into_iter().next() else {
            break;
        };

        let outcome = run_experiment(client, module_name, &hypothesis, &structure, &current, manifest_dir, module_path, experiment_config).await?;
        let ExperimentOutcome::Accepted { code: next, .. } = outcome else {
            break;
        };

        let step = record_step(iteration, &current, &next, config);
        let converged = step.converged;
        steps.push(step);
        current = next;
        if converged || iteration >= config.max_iterations {
            break;
        }
    }

    let mut applied = false;
    if auto_apply && !steps.is_empty() {
        apply_experiment(manifest_dir, module_path, &current, &format!("self-evolution converged after {} iterations", steps.len()))?;
        applied = true;
    }

    Ok(SelfEvolutionReport { steps, final_source: current, applied })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::EchoClient;

    #[tokio::test]
    async fn stops_once_similarity_crosses_the_threshold() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"tmp\"\nversion=\"0.1.0\"\nedition=\"2021\"\n").unwrap();
        let module_path = dir.path().join("lib.rs");
        let original = "pub fn add(a: i32, b: i32) -> i32 { a + b }";
        std::fs::write(&module_path, original).unwrap();

        // The echo client always returns the same documented candidate,
        // so the second iteration's candidate matches the first's
        // output and similarity crosses the default threshold quickly.
        let client = EchoClient {
            fixed_response: "{\"description\": \"doc it\"}\n```rust\n/// adds two numbers\npub fn add(a: i32, b: i32) -> i32 { a + b }\n```".to_string(),
        };
        let config = ConvergenceConfig::default();
        let experiment_config = ExperimentConfig { max_retries: 0, require_type_check: false, require_tests: false };

        let report = run_self_evolution(&client, "demo", dir.path(), &module_path, &config, &experiment_config, false)
            .await
            .unwrap();

        assert!(!report.steps.is_empty());
        assert!(report.steps.last().unwrap().converged);
        assert!(!report.applied);
    }

    #[tokio::test]
    async fn auto_apply_writes_the_converged_source_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"tmp\"\nversion=\"0.1.0\"\nedition=\"2021\"\n").unwrap();
        let module_path = dir.path().join("lib.rs");
        let original = "pub fn add(a: i32, b: i32) -> i32 { a + b }";
        std::fs::write(&module_path, original).unwrap();

        let client = EchoClient {
            fixed_response: "{\"description\": \"doc it\"}\n```rust\n/// adds two numbers\npub fn add(a: i32, b: i32) -> i32 { a + b }\n```".to_string(),
        };
        let config = ConvergenceConfig::default();
        let experiment_config = ExperimentConfig { max_retries: 0, require_type_check: false, require_tests: false };

        let report = run_self_evolution(&client, "demo", dir.path(), &module_path, &config, &experiment_config, true)
            .await
            .unwrap();

        assert!(report.applied);
        let on_disk = std::fs::read_to_string(&module_path).unwrap();
        assert_eq!(on_disk, report.final_source);
    }
}
