//! Shared primitives for the evolutionary code improvement workspace:
//! entity ids, timestamps, the error-kind taxonomy, and layered config.

pub mod config;
pub mod error;
pub mod types;
pub mod vector;

pub use config::{
    CatalogConfig, EvoConfig, MemoryConfig, MutatorConfig, PipelineConfig, SafetyConfig,
    SandboxConfig,
};
pub use error::{downcast_evo_error, ErrorKind, EvoError};
pub use types::{EntityId, Fingerprint, ResourceLimits, Timestamp, Versioned};
pub use vector::{cosine_similarity, FallbackEmbedder};

/// Crate version, exposed for diagnostic logging.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
