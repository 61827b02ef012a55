//! The three search brains (§4.2): keyword, semantic, graph.

use crate::entry::CatalogEntry;
use crate::registry::Registry;
use evo_core::cosine_similarity;
use evo_lattice::{can_compose, AgentSignature, TypeLattice};

#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: CatalogEntry,
    pub score: f32,
}

/// Exact name match +1.0; partial +0.5; keyword match +0.3; description
/// +0.2; contract match +0.1.
pub fn keyword_search(registry: &Registry, query: &str) -> Vec<ScoredEntry> {
    let q = query.to_lowercase();
    let mut results: Vec<ScoredEntry> = registry
        .list()
        .into_iter()
        .filter_map(|entry| {
            let mut score = 0.0f32;
            let name = entry.name.to_lowercase();
            if name == q {
                score += 1.0;
            } else if name.contains(&q) || q.contains(name.as_str()) {
                score += 0.5;
            }
            if entry.keywords.iter().any(|k| k.to_lowercase() == q) {
                score += 0.3;
            }
            if entry.description.to_lowercase().contains(&q) {
                score += 0.2;
            }
            if entry
                .contracts_implemented
                .iter()
                .any(|c| c.to_lowercase() == q)
            {
                score += 0.1;
            }
            (score > 0.0).then_some(ScoredEntry { entry, score })
        })
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Cosine similarity over embeddings. Caller supplies the query
/// embedding; when no external embedder is configured, callers should
/// embed with `evo_core::FallbackEmbedder`, the deterministic TF-IDF
/// fallback named in §6.
pub fn semantic_search(registry: &Registry, query_embedding: &[f32]) -> Vec<ScoredEntry> {
    let mut results: Vec<ScoredEntry> = registry
        .list()
        .into_iter()
        .filter_map(|entry| {
            entry.embedding.as_ref().map(|emb| {
                let score = cosine_similarity(query_embedding, emb);
                ScoredEntry { entry, score }
            })
        })
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results
}

#[derive(Debug, Clone)]
pub struct GraphResult {
    pub entry: CatalogEntry,
    pub relation: String,
}

/// Over lineage + lattice: upstream/downstream compatible agents,
/// dependents, ancestors/descendants.
pub fn graph_search(registry: &Registry, lattice: &TypeLattice, from_id: &str) -> Vec<GraphResult> {
    let Some(from) = registry.get(from_id) else {
        return Vec::new();
    };
    let mut results = Vec::new();

    for (kind, targets) in &from.relationships {
        for target in targets {
            if let Some(entry) = registry.get(target) {
                results.push(GraphResult { entry, relation: kind.clone() });
            }
        }
    }

    if let Some(from_output) = from.output_type.clone() {
        for candidate in registry.list() {
            if candidate.id == from.id {
                continue;
            }
            if let Some(candidate_input) = &candidate.input_type {
                if lattice.is_subtype(&from_output, candidate_input) {
                    results.push(GraphResult { entry: candidate, relation: "composes_downstream".into() });
                }
            }
        }
    }

    results
}

pub fn find_composable(
    lattice: &TypeLattice,
    registry: &Registry,
    from_id: &str,
) -> Vec<CatalogEntry> {
    let Some(from) = registry.get(from_id) else {
        return Vec::new();
    };
    let Some(from_output) = &from.output_type else {
        return Vec::new();
    };
    let from_sig = AgentSignature {
        id: from.id.clone(),
        input_type: from.input_type.clone().unwrap_or_default(),
        output_type: from_output.clone(),
    };
    registry
        .list()
        .into_iter()
        .filter(|candidate| {
            candidate.id != from.id
                && candidate.input_type.as_ref().is_some_and(|input| {
                    let candidate_sig = AgentSignature {
                        id: candidate.id.clone(),
                        input_type: input.clone(),
                        output_type: candidate.output_type.clone().unwrap_or_default(),
                    };
                    can_compose(lattice, &from_sig, &candidate_sig, &[]).compatible
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_search_scores_exact_name_highest() {
        let registry = Registry::new();
        registry.register(CatalogEntry::new("x", "agent", "darkmode", "1.0", "alice"));
        registry.register(CatalogEntry::new("y", "agent", "other", "1.0", "alice"));
        let results = keyword_search(&registry, "darkmode");
        assert_eq!(results[0].entry.id, "x");
        assert_eq!(results[0].score, 1.0);
    }
}
