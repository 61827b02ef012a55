mod llm_client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use evo_catalog::Registry;
use evo_core::EvoConfig;
use evo_memory::{ImprovementMemory, Outcome};
use evo_phage::ExecutionMode;
use evo_pipeline::{evolve_target, run_self_evolution, CycleState, ExperimentConfig, PipelineConfig};
use evo_safety::{AuditLog, ConvergenceConfig};
use evo_viral::ViralLibrary;
use llm_client::HttpLlmClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// `evoforge` — evolutionary self-improvement for a Rust codebase.
#[derive(Parser, Debug)]
#[command(name = "evoforge")]
#[command(about = "Run the mutate-select-wager-infect-payoff cycle over a target crate")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the evolution pipeline against a target crate.
    Evolve {
        /// Path to the crate root to evolve.
        target: PathBuf,

        /// Run experiments without writing or committing any change.
        #[arg(long)]
        dry_run: bool,

        /// Write and commit accepted experiments.
        #[arg(long)]
        auto_apply: bool,

        /// Skip type-check and test gating for a faster, looser pass.
        #[arg(long)]
        quick: bool,

        /// Maximum hypotheses to try per module.
        #[arg(long)]
        hypotheses: Option<usize>,
    },

    /// Run the fixed-point self-evolution loop against one meta-target
    /// module: repeatedly improve it until its text converges.
    SelfEvolve {
        /// Crate root containing `module`.
        target: PathBuf,

        /// Module path (relative to `target`) to self-evolve.
        module: PathBuf,

        /// Write and commit the converged source.
        #[arg(long)]
        auto_apply: bool,

        /// Maximum iterations before forcing convergence.
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Print the Improvement Memory ledger for a target crate.
    Stats { target: PathBuf },

    /// Print every recorded attempt for a target crate, most recent last.
    Archive { target: PathBuf },
}

fn init_logging() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn memory_path(target: &Path) -> PathBuf {
    target.join(".evoforge").join("improvements.json")
}

fn audit_path(target: &Path) -> PathBuf {
    target.join(".evoforge").join("audit.jsonl")
}

fn viral_path(target: &Path) -> PathBuf {
    target.join(".evoforge").join("viral.json")
}

fn load_viral_library(target: &Path) -> Result<ViralLibrary> {
    let path = viral_path(target);
    if path.exists() {
        ViralLibrary::load(&path)
    } else {
        Ok(ViralLibrary::new())
    }
}

fn load_memory(target: &Path) -> Result<ImprovementMemory> {
    let path = memory_path(target);
    if path.exists() {
        Ok(ImprovementMemory::load(&path)?)
    } else {
        Ok(ImprovementMemory::new())
    }
}

fn save_memory(target: &Path, memory: &ImprovementMemory) -> Result<()> {
    let path = memory_path(target);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    memory.save(&path)
}

/// Walks `target` collecting `.rs` files, skipping `target/` build
/// output and the evoforge state directory, keyed by their path
/// relative to `target` with the extension stripped.
fn discover_modules(target: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut modules = Vec::new();
    let mut stack = vec![target.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name == "target" || name == ".git" || name == ".evoforge" {
                    continue;
                }
                stack.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                let relative = path.strip_prefix(target).unwrap_or(&path);
                modules.push((relative.with_extension("").to_string_lossy().into_owned(), path));
            }
        }
    }
    modules.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(modules)
}

async fn run_evolve(target: PathBuf, dry_run: bool, auto_apply: bool, quick: bool, hypotheses: Option<usize>) -> Result<()> {
    let config_path = EvoConfig::default_path().unwrap_or_else(|| PathBuf::from("evoforge.toml"));
    let evo_config = EvoConfig::load(&config_path)?;

    let pipeline_config = PipelineConfig {
        max_improvements_per_module: hypotheses.unwrap_or(evo_config.pipeline.max_improvements_per_module),
        auto_apply: auto_apply || evo_config.pipeline.auto_apply,
        dry_run: dry_run || evo_config.pipeline.dry_run,
        module_parallelism: evo_config.pipeline.module_parallelism,
        experiment: ExperimentConfig {
            max_retries: evo_config.pipeline.max_retries_per_experiment,
            require_type_check: !quick,
            require_tests: !quick,
        },
    };

    let client: Arc<dyn evo_pipeline::LlmClient> = Arc::new(HttpLlmClient::from_env()?);
    let memory = Arc::new(load_memory(&target)?);
    let registry = Arc::new(Registry::new());
    let modules = discover_modules(&target)?;
    info!(count = modules.len(), "discovered modules");

    let mode = if pipeline_config.dry_run { ExecutionMode::Dry } else { ExecutionMode::Production };
    let cycle_state = Arc::new(CycleState {
        library: std::sync::Mutex::new(load_viral_library(&target)?),
        audit: AuditLog::new(),
        ..CycleState::new(mode)
    });

    let reports = evolve_target(client, &target, &modules, memory.clone(), registry, cycle_state.clone(), &pipeline_config).await?;
    save_memory(&target, &memory)?;

    let dir = target.join(".evoforge");
    std::fs::create_dir_all(&dir)?;
    cycle_state.audit.flush_to(&audit_path(&target))?;
    cycle_state.library.lock().unwrap().save(&viral_path(&target))?;

    for report in &reports {
        info!(
            module = %report.module,
            accepted = report.accepted,
            rejected = report.rejected,
            held = report.held,
            skipped = report.skipped_as_known,
            infected = report.cycle_infected,
            cycle_rejected = report.cycle_rejected,
            "module evolved"
        );
    }

    Ok(())
}

/// Drives `evo_pipeline::run_self_evolution` for one module and prints
/// its convergence trace.
async fn run_self_evolve(target: PathBuf, module: PathBuf, auto_apply: bool, max_iterations: Option<u32>) -> Result<()> {
    let module_path = target.join(&module);
    let module_name = module.with_extension("").to_string_lossy().into_owned();

    let client: Arc<dyn evo_pipeline::LlmClient> = Arc::new(HttpLlmClient::from_env()?);
    let convergence_config = ConvergenceConfig {
        max_iterations: max_iterations.unwrap_or(ConvergenceConfig::default().max_iterations),
        ..ConvergenceConfig::default()
    };
    let experiment_config = ExperimentConfig::default();

    let report = run_self_evolution(client.as_ref(), &module_name, &target, &module_path, &convergence_config, &experiment_config, auto_apply).await?;

    for step in &report.steps {
        println!("iteration {}: similarity={:.3} converged={}", step.iteration, step.similarity, step.converged);
    }
    println!("applied: {}", report.applied);
    Ok(())
}

/// Prints the Safety Kernel's audit log summary and the Viral
/// Library's fitness table, plus a short Improvement Memory tally.
fn run_stats(target: PathBuf) -> Result<()> {
    let events = AuditLog::read_jsonl(&audit_path(&target))?;
    println!("audit events: {}", events.len());
    for category in [
        evo_safety::AuditCategory::MutationGenerated,
        evo_safety::AuditCategory::InfectionStarted,
        evo_safety::AuditCategory::InfectionSucceeded,
        evo_safety::AuditCategory::InfectionFailed,
        evo_safety::AuditCategory::RolledBack,
    ] {
        let count = events.iter().filter(|e| e.category == category).count();
        println!("  {category:?}: {count}");
    }

    let library = load_viral_library(&target)?;
    println!("\nviral library patterns: {}", library.len());
    for pattern in library.ranked_by_fitness() {
        println!(
            "  {:<24} fitness={:.3} odds={:.3} successes={} failures={}",
            pattern.schema_name,
            pattern.fitness(),
            pattern.market_odds(),
            pattern.successes,
            pattern.failures
        );
    }

    let memory = load_memory(&target)?;
    let records = memory.all();
    let accepted = records.iter().filter(|r| matches!(r.outcome, Outcome::Accepted)).count();
    let rejected = records.iter().filter(|r| matches!(r.outcome, Outcome::Rejected)).count();
    let held = records.iter().filter(|r| matches!(r.outcome, Outcome::Held)).count();
    println!("\nimprovement memory: {} attempts ({accepted} accepted, {rejected} rejected, {held} held)", records.len());
    Ok(())
}

/// Prints every audit event in order, followed by every Improvement
/// Memory record, most recent last.
fn run_archive(target: PathBuf) -> Result<()> {
    let events = AuditLog::read_jsonl(&audit_path(&target))?;
    for event in &events {
        println!("{} [{:?}] {} — {}", event.timestamp, event.category, event.subject, event.detail);
    }

    let memory = load_memory(&target)?;
    for record in memory.all() {
        println!(
            "{} [{:?}] {} — {}",
            record.module, record.outcome, record.description,
            record.rejection_reason.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Evolve { target, dry_run, auto_apply, quick, hypotheses } => {
            run_evolve(target, dry_run, auto_apply, quick, hypotheses).await
        }
        Commands::SelfEvolve { target, module, auto_apply, max_iterations } => {
            run_self_evolve(target, module, auto_apply, max_iterations).await
        }
        Commands::Stats { target } => run_stats(target),
        Commands::Archive { target } => run_archive(target),
    }
}
