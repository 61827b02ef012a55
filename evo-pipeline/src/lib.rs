//! Evolution Pipeline (§4.12): the top-level orchestration of the AST
//! Analyzer, Prompt Builder, LLM roundtrip, Test Harness, Judge, and the
//! Thermodynamic Cycle, gated by the Improvement Memory.

pub mod cycle;
pub mod experiment;
pub mod incorporator;
pub mod llm;
pub mod pipeline;
pub mod selfevolve;

pub use cycle::{run_cycle, CycleOutcome};
pub use experiment::{run_experiment, ExperimentConfig, ExperimentOutcome};
pub use incorporator::{apply_experiment, IncorporationReport};
pub use llm::{roundtrip, EchoClient, LlmClient, LlmResponse};
pub use pipeline::{evolve_module, evolve_target, CycleState, ModuleReport, PipelineConfig};
pub use selfevolve::{run_self_evolution, SelfEvolutionReport};
