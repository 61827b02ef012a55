//! Per-module evolution loop (§4.12 steps 1-5): analyze, propose
//! hypotheses, run experiments gated by the Improvement Memory, and
//! optionally incorporate accepted ones.

use crate::cycle::{run_cycle, CycleOutcome};
use crate::experiment::{run_experiment, ExperimentConfig, ExperimentOutcome};
use crate::incorporator::apply_experiment;
use crate::llm::LlmClient;
use evo_analyzer::{analyze, propose_hypotheses};
use evo_catalog::{CatalogEntry, Registry};
use evo_core::FallbackEmbedder;
use evo_demon::Demon;
use evo_lattice::TypeLattice;
use evo_memory::{ImprovementMemory, Outcome};
use evo_phage::ExecutionMode;
use evo_safety::{AuditLog, RateLimiter};
use evo_viral::ViralLibrary;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Shared state for the Thermodynamic Cycle, threaded across every
/// module in a run so the Viral Library and Demon statistics accumulate
/// instead of resetting per module.
pub struct CycleState {
    pub demon: Mutex<Demon>,
    pub lattice: TypeLattice,
    pub library: Mutex<ViralLibrary>,
    pub rate_limiter: Mutex<RateLimiter>,
    pub audit: AuditLog,
    pub embedder: FallbackEmbedder,
    pub mode: ExecutionMode,
}

impl CycleState {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            demon: Mutex::new(Demon::new()),
            lattice: TypeLattice::new(),
            library: Mutex::new(ViralLibrary::new()),
            rate_limiter: Mutex::new(RateLimiter::new(Default::default())),
            audit: AuditLog::new(),
            embedder: FallbackEmbedder::new(),
            mode,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_improvements_per_module: usize,
    pub auto_apply: bool,
    pub dry_run: bool,
    /// Maximum number of modules evolved concurrently (§5: "per-module
    /// work runs concurrently on a task pool (parallelism parameter)").
    pub module_parallelism: usize,
    pub experiment: ExperimentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_improvements_per_module: 3,
            auto_apply: false,
            dry_run: true,
            module_parallelism: 4,
            experiment: ExperimentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModuleReport {
    pub module: String,
    pub accepted: usize,
    pub rejected: usize,
    pub held: usize,
    pub skipped_as_known: usize,
    pub cycle_infected: usize,
    pub cycle_rejected: usize,
    pub cycle_rate_limited: usize,
    pub cycle_rolled_back: usize,
}

/// Runs the loop for a single module: analyze its structure, propose up
/// to `max_improvements_per_module` hypotheses, skip any the memory
/// already knows about, run an experiment for each survivor, and
/// incorporate accepted ones unless `dry_run` or `!auto_apply`.
pub async fn evolve_module(
    client: &dyn LlmClient,
    module_name: &str,
    manifest_dir: &Path,
    module_path: &Path,
    memory: &ImprovementMemory,
    registry: &Registry,
    cycle_state: &CycleState,
    config: &PipelineConfig,
) -> anyhow::Result<ModuleReport> {
    let source = std::fs::read_to_string(module_path)?;
    let structure = analyze(&source)?;
    let hypotheses = propose_hypotheses(&structure, config.max_improvements_per_module);

    let mut report = ModuleReport {
        module: module_name.to_string(),
        ..Default::default()
    };

    for hypothesis in &hypotheses {
        let key = format!("{}:{}", hypothesis.subject, hypothesis.description);
        if memory.was_rejected(module_name, &key) || memory.was_recently_accepted(module_name, &key) {
            report.skipped_as_known += 1;
            continue;
        }

        let outcome = run_experiment(
            client,
            module_name,
            hypothesis,
            &structure,
            &source,
            manifest_dir,
            module_path,
            &config.experiment,
        )
        .await?;

        match outcome {
            ExperimentOutcome::Accepted { code, average_score } => {
                memory.record(module_name, &key, Outcome::Accepted, &hypothesis.description, None);
                report.accepted += 1;

                let mut entry = CatalogEntry::new(
                    format!("{module_name}::{}", hypothesis.subject),
                    "module_improvement",
                    hypothesis.subject.clone(),
                    "0.1.0",
                    "evoforge",
                );
                entry.description = hypothesis.description.clone();
                entry.success_rate = average_score;
                registry.register(entry);

                if config.auto_apply && !config.dry_run {
                    apply_experiment(manifest_dir, module_path, &code, &hypothesis.description)?;
                }
            }
            ExperimentOutcome::Rejected { reason } => {
                memory.record(module_name, &key, Outcome::Rejected, &hypothesis.description, Some(reason));
                report.rejected += 1;
            }
            ExperimentOutcome::Held { reason } => {
                memory.record(module_name, &key, Outcome::Held, &hypothesis.description, Some(reason));
                report.held += 1;
            }
        }
    }

    // Runs alongside the LLM-driven experiment loop above: a purely
    // AST-derived pathway that never calls the LLM, reusing the same
    // source for whichever hot spot the schema library can rewrite.
    // `infect()` writes the target file directly on success, so this
    // only runs under the same apply gate the Incorporator uses above.
    if config.auto_apply && !config.dry_run {
        let intent_embedding = cycle_state.embedder.embed(&structure.module_doc.clone().unwrap_or_default());
        let cycle_outcome = run_cycle(&source, manifest_dir, module_path.to_path_buf(), 1.0, &intent_embedding, cycle_state).await?;

        match cycle_outcome {
            CycleOutcome::Infected { .. } => report.cycle_infected += 1,
            CycleOutcome::RejectedByDemon { .. } => report.cycle_rejected += 1,
            CycleOutcome::RateLimited => report.cycle_rate_limited += 1,
            CycleOutcome::RolledBack => report.cycle_rolled_back += 1,
        }
    }

    Ok(report)
}

/// Runs `evolve_module` over every `(module_name, module_path)` pair
/// concurrently, bounded by `config.module_parallelism` in-flight
/// modules at a time (§5's task-pool requirement, following the same
/// owned-permit-around-the-call shape as the teacher's
/// `LimitProvider`). Experiments within a module stay sequential —
/// only the module dimension is parallelized.
pub async fn evolve_target(
    client: Arc<dyn LlmClient>,
    manifest_dir: &Path,
    modules: &[(String, PathBuf)],
    memory: Arc<ImprovementMemory>,
    registry: Arc<Registry>,
    cycle_state: Arc<CycleState>,
    config: &PipelineConfig,
) -> anyhow::Result<Vec<ModuleReport>> {
    let semaphore = Arc::new(Semaphore::new(config.module_parallelism.max(1)));
    let mut set = tokio::task::JoinSet::new();

    for (name, path) in modules.iter().cloned() {
        let client = client.clone();
        let memory = memory.clone();
        let registry = registry.clone();
        let cycle_state = cycle_state.clone();
        let manifest_dir = manifest_dir.to_path_buf();
        let semaphore = semaphore.clone();
        let config = config.clone();

        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("module concurrency limiter closed");
            evolve_module(client.as_ref(), &name, &manifest_dir, &path, memory.as_ref(), registry.as_ref(), cycle_state.as_ref(), &config).await
        });
    }

    let mut reports = Vec::with_capacity(modules.len());
    while let Some(result) = set.join_next().await {
        reports.push(result.expect("module evolution task panicked")?);
    }
    reports.sort_by(|a: &ModuleReport, b: &ModuleReport| a.module.cmp(&b.module));
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::EchoClient;

    #[tokio::test]
    async fn skips_a_hypothesis_already_known_to_the_memory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"tmp\"\nversion=\"0.1.0\"\nedition=\"2021\"\n").unwrap();
        let module_path = dir.path().join("lib.rs");
        std::fs::write(&module_path, "pub fn f(a: i32, b: i32, c: i32, d: i32, e: i32, g: i32) -> i32 { a + b + c + d + e + g }").unwrap();

        let memory = ImprovementMemory::new();
        let structure = analyze(&std::fs::read_to_string(&module_path).unwrap()).unwrap();
        let hypotheses = propose_hypotheses(&structure, 3);
        for h in &hypotheses {
            let key = format!("{}:{}", h.subject, h.description);
            memory.record("demo", &key, Outcome::Rejected, &h.description, Some("no".to_string()));
        }

        let client = EchoClient { fixed_response: "irrelevant".to_string() };
        let registry = Registry::new();
        let config = PipelineConfig { max_improvements_per_module: 3, ..PipelineConfig::default() };
        let cycle_state = CycleState::new(ExecutionMode::TestOnly);

        let report = evolve_module(&client, "demo", dir.path(), &module_path, &memory, &registry, &cycle_state, &config).await.unwrap();

        assert_eq!(report.skipped_as_known, hypotheses.len());
        assert_eq!(report.accepted + report.rejected + report.held, 0);
    }

    #[tokio::test]
    async fn evolve_target_runs_every_module_and_reports_each() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"tmp\"\nversion=\"0.1.0\"\nedition=\"2021\"\n").unwrap();

        let mut modules = Vec::new();
        for name in ["a", "b", "c"] {
            let path = dir.path().join(format!("{name}.rs"));
            std::fs::write(&path, "pub fn f(a: i32, b: i32, c: i32, d: i32, e: i32, g: i32) -> i32 { a + b + c + d + e + g }").unwrap();
            modules.push((name.to_string(), path));
        }

        let client: Arc<dyn LlmClient> = Arc::new(EchoClient { fixed_response: "irrelevant".to_string() });
        let memory = Arc::new(ImprovementMemory::new());
        let registry = Arc::new(Registry::new());
        let cycle_state = Arc::new(CycleState::new(ExecutionMode::TestOnly));
        let config = PipelineConfig { module_parallelism: 2, ..PipelineConfig::default() };

        let reports = evolve_target(client, dir.path(), &modules, memory, registry, cycle_state, &config).await.unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports.iter().map(|r| r.module.clone()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
