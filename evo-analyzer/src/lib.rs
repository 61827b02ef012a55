//! AST Analyzer + Prompt Builder + Validator/Repairer (§4.4).

pub mod complexity;
pub mod prompt;
pub mod repairer;
pub mod structure;
pub mod validator;

pub use complexity::{analyze_complexity, structural_signature, structural_similarity, ComplexityMetrics, StructuralSignature};
pub use prompt::{build_prompt, PromptLevel, PromptPayload};
pub use repairer::{repair, RepairOutcome};
pub use structure::{analyze, find_hot_spots, propose_hypotheses, ClassInfo, CodeStructure, FunctionInfo, HotSpot, HotSpotKind, Hypothesis};
pub use validator::{validate, Issue, IssueCategory, Severity, ValidationReport};
