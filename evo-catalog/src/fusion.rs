//! Reciprocal Rank Fusion over the three search brains (§4.2).

use crate::entry::CatalogEntry;
use crate::registry::Registry;
use crate::search::{graph_search, keyword_search, semantic_search, ScoredEntry};
use evo_lattice::TypeLattice;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    ExactName,
    SemanticIntent,
    TypeQuery,
    Relationship,
}

fn type_query_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(type|signature|input|output|returns?)\b").unwrap())
}

fn relationship_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(depends on|forked from|successor|composed with|related to)\b").unwrap())
}

/// Regex-based heuristic classification of the query text.
pub fn classify_query(query: &str) -> QueryClass {
    if relationship_pattern().is_match(query) {
        QueryClass::Relationship
    } else if type_query_pattern().is_match(query) {
        QueryClass::TypeQuery
    } else if query.split_whitespace().count() <= 2 {
        QueryClass::ExactName
    } else {
        QueryClass::SemanticIntent
    }
}

/// `(keyword, semantic, graph)` weight triples per query class.
pub fn weights_for(class: QueryClass) -> (f64, f64, f64) {
    match class {
        QueryClass::ExactName => (0.8, 0.1, 0.1),
        QueryClass::SemanticIntent => (0.2, 0.7, 0.1),
        QueryClass::TypeQuery => (0.3, 0.2, 0.5),
        QueryClass::Relationship => (0.1, 0.1, 0.8),
    }
}

#[derive(Debug, Clone)]
pub struct FusedResult {
    pub entry: CatalogEntry,
    pub fused_score: f64,
}

#[derive(Debug, Clone)]
pub struct FusedSearchResults {
    pub top: Vec<FusedResult>,
    /// Results only one brain found with high score but low fused rank.
    pub serendipity: Vec<FusedResult>,
}

/// Runs all three brains, classifies the query, and combines ranks via
/// `score = Σ weight/(k+rank)`.
pub fn fused_search(
    registry: &Registry,
    lattice: &TypeLattice,
    query: &str,
    query_embedding: &[f32],
    anchor_id: Option<&str>,
    top_k: usize,
    rrf_k: f64,
) -> FusedSearchResults {
    let class = classify_query(query);
    let (w_keyword, w_semantic, w_graph) = weights_for(class);

    let keyword_ranked = keyword_search(registry, query);
    let semantic_ranked = semantic_search(registry, query_embedding);
    let graph_ranked: Vec<ScoredEntry> = anchor_id
        .map(|id| {
            graph_search(registry, lattice, id)
                .into_iter()
                .map(|g| ScoredEntry { entry: g.entry, score: 1.0 })
                .collect()
        })
        .unwrap_or_default();

    let mut fused: HashMap<String, f64> = HashMap::new();
    let mut solo_high: HashMap<String, (usize, f64)> = HashMap::new(); // id -> (brains_seen, best_raw_score)

    for (weight, ranked) in [
        (w_keyword, &keyword_ranked),
        (w_semantic, &semantic_ranked),
        (w_graph, &graph_ranked),
    ] {
        for (rank, scored) in ranked.iter().enumerate() {
            *fused.entry(scored.entry.id.clone()).or_insert(0.0) += weight / (rrf_k + rank as f64 + 1.0);
            let slot = solo_high.entry(scored.entry.id.clone()).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 = slot.1.max(scored.score as f64);
        }
    }

    let mut all: Vec<FusedResult> = fused
        .into_iter()
        .filter_map(|(id, score)| registry.get(&id).map(|entry| FusedResult { entry, fused_score: score }))
        .collect();
    all.sort_by(|a, b| b.fused_score.partial_cmp(&a.fused_score).unwrap_or(std::cmp::Ordering::Equal));

    let top: Vec<FusedResult> = all.iter().take(top_k).cloned().collect();
    let top_ids: std::collections::HashSet<String> = top.iter().map(|r| r.entry.id.clone()).collect();

    let serendipity: Vec<FusedResult> = all
        .into_iter()
        .filter(|r| !top_ids.contains(&r.entry.id))
        .filter(|r| solo_high.get(&r.entry.id).is_some_and(|(count, score)| *count == 1 && *score >= 0.7))
        .take(5)
        .collect();

    FusedSearchResults { top, serendipity }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_short_query_as_exact_name() {
        assert_eq!(classify_query("darkmode"), QueryClass::ExactName);
    }

    #[test]
    fn classify_long_query_as_semantic_intent() {
        assert_eq!(classify_query("what does the user like to configure"), QueryClass::SemanticIntent);
    }

    #[test]
    fn classify_type_query() {
        assert_eq!(classify_query("what is the input type of this agent"), QueryClass::TypeQuery);
    }
}
