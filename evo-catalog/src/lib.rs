//! Catalog Registry + Search: indexed artifact metadata and three-brain
//! fusion search (§4.2).

pub mod entry;
pub mod fusion;
pub mod registry;
pub mod search;

pub use entry::{CatalogEntry, CatalogId, EntryStatus};
pub use fusion::{classify_query, fused_search, weights_for, FusedResult, FusedSearchResults, QueryClass};
pub use registry::Registry;
pub use search::{find_composable, graph_search, keyword_search, semantic_search, GraphResult, ScoredEntry};
