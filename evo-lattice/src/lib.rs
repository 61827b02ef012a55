//! The Type Lattice: a bounded partial order over type identifiers
//! supporting subtyping, meet/join, and composition planning (spec §4.1).

pub mod compose;
pub mod lattice;
pub mod types;

pub use compose::{can_compose, find_path, verify_pipeline, AgentSignature, CompositionResult, PipelineVerification};
pub use lattice::{LatticeError, TypeLattice};
pub use types::{SubtypeEdge, TypeId, TypeKind, TypeNode, Variance};
