//! Holographic resonance memory (§4.3) and the Improvement Memory
//! rejection ledger (§3, §4.12, P9).

pub mod holographic;
pub mod improvement;
pub mod tiers;

pub use holographic::{Compression, HolographicMemory, MemoryPattern, RetrievalResult};
pub use improvement::{ImprovementMemory, ImprovementRecord, Outcome};
pub use tiers::{SensoryItem, TieredMemory, WorkingItem};
