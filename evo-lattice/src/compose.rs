//! Composition planning: `can_compose`, `verify_pipeline`, `find_path`
//! (§4.1). These operate over caller-supplied agent descriptors so that
//! `evo-lattice` never needs to depend on the catalog crate that sits
//! above it in the dependency order.

use crate::lattice::TypeLattice;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Minimal view of a catalog entry needed for composition checks.
#[derive(Debug, Clone)]
pub struct AgentSignature {
    pub id: String,
    pub input_type: String,
    pub output_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionResult {
    pub compatible: bool,
    pub reason: String,
    pub output_type: String,
    pub input_type: String,
    pub requires_adapter: Option<String>,
    pub suggested_fix: Option<String>,
}

/// Resolves both signatures and composes iff `is_subtype(first.output,
/// second.input)`; otherwise searches `adapters` for a signature whose
/// input accepts `first.output` and whose output the second stage
/// accepts, per P10.
pub fn can_compose(
    lattice: &TypeLattice,
    first: &AgentSignature,
    second: &AgentSignature,
    adapters: &[AgentSignature],
) -> CompositionResult {
    if lattice.is_subtype(&first.output_type, &second.input_type) {
        return CompositionResult {
            compatible: true,
            reason: format!(
                "{} is a subtype of {}",
                first.output_type, second.input_type
            ),
            output_type: first.output_type.clone(),
            input_type: second.input_type.clone(),
            requires_adapter: None,
            suggested_fix: None,
        };
    }

    let adapter = adapters.iter().find(|a| {
        lattice.is_subtype(&first.output_type, &a.input_type)
            && lattice.is_subtype(&a.output_type, &second.input_type)
    });

    match adapter {
        Some(a) => CompositionResult {
            compatible: true,
            reason: format!("bridged via adapter {}", a.id),
            output_type: first.output_type.clone(),
            input_type: second.input_type.clone(),
            requires_adapter: Some(a.id.clone()),
            suggested_fix: None,
        },
        None => CompositionResult {
            compatible: false,
            reason: format!(
                "{} is not a subtype of {} and no adapter bridges them",
                first.output_type, second.input_type
            ),
            output_type: first.output_type.clone(),
            input_type: second.input_type.clone(),
            requires_adapter: None,
            suggested_fix: Some(format!(
                "insert an adapter from {} to {}",
                first.output_type, second.input_type
            )),
        },
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineVerification {
    pub valid: bool,
    pub stages: Vec<CompositionResult>,
    pub first_incompatible_stage: Option<usize>,
}

/// Stagewise composition check across a chain of agents.
pub fn verify_pipeline(
    lattice: &TypeLattice,
    chain: &[AgentSignature],
    adapters: &[AgentSignature],
) -> PipelineVerification {
    let mut stages = Vec::new();
    let mut first_incompatible_stage = None;
    for (i, pair) in chain.windows(2).enumerate() {
        let result = can_compose(lattice, &pair[0], &pair[1], adapters);
        if !result.compatible && first_incompatible_stage.is_none() {
            first_incompatible_stage = Some(i);
        }
        stages.push(result);
    }
    PipelineVerification {
        valid: first_incompatible_stage.is_none(),
        stages,
        first_incompatible_stage,
    }
}

/// BFS over the agent graph (edges = `can_compose` compatibility),
/// respecting type compatibility, returning all simple paths from `src`
/// to `dst` up to `max_len` hops.
pub fn find_path(
    lattice: &TypeLattice,
    agents: &[AgentSignature],
    adapters: &[AgentSignature],
    src: &str,
    dst: &str,
    max_len: usize,
) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    let mut queue: VecDeque<(Vec<String>, HashSet<String>)> = VecDeque::new();
    let mut start = HashSet::new();
    start.insert(src.to_string());
    queue.push_back((vec![src.to_string()], start));

    while let Some((path, visited)) = queue.pop_front() {
        if path.len() > max_len {
            continue;
        }
        let current_id = path.last().unwrap();
        if current_id == dst && path.len() > 1 {
            paths.push(path.clone());
            continue;
        }
        let Some(current) = agents.iter().find(|a| &a.id == current_id) else {
            continue;
        };
        for next in agents {
            if visited.contains(&next.id) {
                continue;
            }
            let result = can_compose(lattice, current, next, adapters);
            if result.compatible {
                let mut next_path = path.clone();
                next_path.push(next.id.clone());
                let mut next_visited = visited.clone();
                next_visited.insert(next.id.clone());
                queue.push_back((next_path, next_visited));
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SubtypeEdge, TypeKind, TypeNode};

    fn lattice_with_str_int_bool_float() -> TypeLattice {
        let mut lattice = TypeLattice::new();
        for ty in ["str", "int", "bool", "float"] {
            lattice.insert_node(TypeNode::new(ty, TypeKind::Primitive));
        }
        lattice
            .add_subtype_edge(SubtypeEdge::new("bool", "int", "bool is an int"))
            .unwrap();
        lattice
    }

    #[test]
    fn verify_pipeline_accepts_compatible_chain() {
        let lattice = lattice_with_str_int_bool_float();
        let chain = vec![
            AgentSignature { id: "A".into(), input_type: "str".into(), output_type: "int".into() },
            AgentSignature { id: "B".into(), input_type: "int".into(), output_type: "bool".into() },
            AgentSignature { id: "C".into(), input_type: "bool".into(), output_type: "str".into() },
        ];
        let result = verify_pipeline(&lattice, &chain, &[]);
        assert!(result.valid);
        assert_eq!(result.stages.len(), 2);
    }

    #[test]
    fn verify_pipeline_flags_incompatible_stage() {
        let lattice = lattice_with_str_int_bool_float();
        let chain = vec![
            AgentSignature { id: "A".into(), input_type: "str".into(), output_type: "int".into() },
            AgentSignature { id: "D".into(), input_type: "float".into(), output_type: "bool".into() },
            AgentSignature { id: "B".into(), input_type: "int".into(), output_type: "bool".into() },
        ];
        let result = verify_pipeline(&lattice, &chain, &[]);
        assert!(!result.valid);
        assert_eq!(result.first_incompatible_stage, Some(0));
        assert!(result.stages[0].reason.contains("int") || result.stages[0].reason.contains("float"));
    }
}
