//! `CatalogEntry` (§3) and the relationship edges it carries.

use evo_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Active,
    Deprecated,
    Retired,
}

/// Catalog entries are keyed by a caller-chosen human-readable id (e.g.
/// `"x"`, the name of an agent), unlike the random `EntityId`s used for
/// transient entities elsewhere.
pub type CatalogId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub entity_type: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub author: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub input_type: Option<String>,
    pub output_type: Option<String>,
    pub contracts_implemented: Vec<String>,
    pub contracts_required: Vec<String>,
    /// relationship kind (e.g. "successor_to", "forked_from",
    /// "depends_on", "composed_with") -> target entry ids.
    pub relationships: HashMap<String, Vec<CatalogId>>,
    pub status: EntryStatus,
    pub usage_count: u64,
    pub success_rate: f64,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>, name: impl Into<String>, version: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            keywords: Vec::new(),
            embedding: None,
            author: author.into(),
            created_at: now,
            updated_at: now,
            input_type: None,
            output_type: None,
            contracts_implemented: Vec::new(),
            contracts_required: Vec::new(),
            relationships: HashMap::new(),
            status: EntryStatus::Active,
            usage_count: 0,
            success_rate: 1.0,
        }
    }
}
