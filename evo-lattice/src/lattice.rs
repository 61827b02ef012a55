//! The bounded partial order itself: storage, subtyping, meet/join,
//! normalization, and a memoizing cache (§4.1).

use crate::types::{SubtypeEdge, TypeId, TypeKind, TypeNode};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum LatticeError {
    #[error("adding edge {sub} -> {sup} would create a cycle")]
    WouldCreateCycle { sub: TypeId, sup: TypeId },
    #[error("unknown type id: {0}")]
    UnknownType(TypeId),
}

#[derive(Default)]
struct Cache {
    is_subtype: HashMap<(TypeId, TypeId), bool>,
    meet: HashMap<(TypeId, TypeId), TypeId>,
    join: HashMap<(TypeId, TypeId), TypeId>,
}

/// A bounded partial order over type identifiers. `ANY` and `NEVER` are
/// always present and absorbing.
pub struct TypeLattice {
    nodes: HashMap<TypeId, TypeNode>,
    // sub -> set of direct supertypes
    up_edges: HashMap<TypeId, Vec<SubtypeEdge>>,
    // sup -> set of direct subtypes
    down_edges: HashMap<TypeId, Vec<TypeId>>,
    cache: RwLock<Cache>,
}

impl TypeLattice {
    pub fn new() -> Self {
        let mut lattice = Self {
            nodes: HashMap::new(),
            up_edges: HashMap::new(),
            down_edges: HashMap::new(),
            cache: RwLock::new(Cache::default()),
        };
        lattice.insert_node(TypeNode::any());
        lattice.insert_node(TypeNode::never());
        lattice
    }

    pub fn insert_node(&mut self, node: TypeNode) {
        self.up_edges.entry(node.id.clone()).or_default();
        self.down_edges.entry(node.id.clone()).or_default();
        self.nodes.insert(node.id.clone(), node);
        self.invalidate_cache();
    }

    pub fn node(&self, id: &str) -> Option<&TypeNode> {
        self.nodes.get(id)
    }

    fn invalidate_cache(&self) {
        let mut cache = self.cache.write().unwrap();
        cache.is_subtype.clear();
        cache.meet.clear();
        cache.join.clear();
    }

    /// Rejects edges that would create a cycle (invariant: the lattice is
    /// a DAG).
    pub fn add_subtype_edge(&mut self, edge: SubtypeEdge) -> Result<(), LatticeError> {
        if !self.nodes.contains_key(&edge.sub) {
            return Err(LatticeError::UnknownType(edge.sub));
        }
        if !self.nodes.contains_key(&edge.sup) {
            return Err(LatticeError::UnknownType(edge.sup));
        }
        // Adding sub -> sup creates a cycle iff sup already reaches sub
        // going upward (i.e. sub is already an ancestor of sup).
        if edge.sub == edge.sup || self.reaches_upward(&edge.sup, &edge.sub) {
            return Err(LatticeError::WouldCreateCycle {
                sub: edge.sub,
                sup: edge.sup,
            });
        }
        self.down_edges
            .entry(edge.sup.clone())
            .or_default()
            .push(edge.sub.clone());
        self.up_edges.entry(edge.sub.clone()).or_default().push(edge);
        self.invalidate_cache();
        Ok(())
    }

    fn reaches_upward(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(from.to_string());
        seen.insert(from.to_string());
        while let Some(cur) = queue.pop_front() {
            if cur == to {
                return true;
            }
            if let Some(edges) = self.up_edges.get(&cur) {
                for e in edges {
                    if seen.insert(e.sup.clone()) {
                        queue.push_back(e.sup.clone());
                    }
                }
            }
        }
        false
    }

    /// Reflexive, transitive. `ANY` absorbs as top, `NEVER` as bottom.
    pub fn is_subtype(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        if b == "Any" || a == "Never" {
            return true;
        }
        if a == "Any" || b == "Never" {
            return false;
        }
        let key = (a.to_string(), b.to_string());
        if let Some(hit) = self.cache.read().unwrap().is_subtype.get(&key) {
            return *hit;
        }

        let result = if let (Some(a_node), Some(b_node)) = (self.nodes.get(a), self.nodes.get(b)) {
            self.is_subtype_structural(a, b, a_node, b_node) || self.reaches_upward(a, b)
        } else {
            self.reaches_upward(a, b)
        };

        self.cache.write().unwrap().is_subtype.insert(key, result);
        result
    }

    fn is_subtype_structural(&self, a: &str, b: &str, a_node: &TypeNode, b_node: &TypeNode) -> bool {
        match (&a_node.kind, &b_node.kind) {
            // A ∨ B ≤ C ⇔ A ≤ C ∧ B ≤ C
            (TypeKind::Union, _) => a_node.members.iter().all(|m| self.is_subtype(m, b)),
            (_, TypeKind::Union) => b_node.members.iter().any(|m| self.is_subtype(a, m)),
            // Dual for intersection (meet of members).
            (TypeKind::Generic, TypeKind::Generic)
                if a_node.invariants.contains(&"intersection".to_string()) =>
            {
                a_node.members.iter().any(|m| self.is_subtype(m, b))
            }
            (_, TypeKind::Generic)
                if b_node.invariants.contains(&"intersection".to_string()) =>
            {
                b_node.members.iter().all(|m| self.is_subtype(a, m))
            }
            (TypeKind::Record, TypeKind::Record) => {
                // Structural subtyping: every required field of b must be
                // present in a with a compatible (subtype) field type.
                b_node.fields.iter().all(|(name, b_ty)| {
                    a_node
                        .fields
                        .get(name)
                        .is_some_and(|a_ty| a_ty == b_ty || self.is_subtype(a_ty, b_ty))
                })
            }
            _ => {
                let _ = (a, b);
                false
            }
        }
    }

    fn ancestors(&self, id: &str) -> HashSet<TypeId> {
        let mut seen = HashSet::new();
        seen.insert(id.to_string());
        seen.insert("Any".to_string());
        if id == "Never" {
            return self.nodes.keys().cloned().collect();
        }
        let mut queue = VecDeque::new();
        queue.push_back(id.to_string());
        while let Some(cur) = queue.pop_front() {
            if let Some(edges) = self.up_edges.get(&cur) {
                for e in edges {
                    if seen.insert(e.sup.clone()) {
                        queue.push_back(e.sup.clone());
                    }
                }
            }
        }
        seen
    }

    fn descendants(&self, id: &str) -> HashSet<TypeId> {
        let mut seen = HashSet::new();
        seen.insert(id.to_string());
        seen.insert("Never".to_string());
        if id == "Any" {
            return self.nodes.keys().cloned().collect();
        }
        let mut queue = VecDeque::new();
        queue.push_back(id.to_string());
        while let Some(cur) = queue.pop_front() {
            if let Some(subs) = self.down_edges.get(&cur) {
                for s in subs {
                    if seen.insert(s.clone()) {
                        queue.push_back(s.clone());
                    }
                }
            }
        }
        seen
    }

    /// Most specific common ancestor; `Any` if none found (should not
    /// happen since `Any` is always an ancestor of everything).
    pub fn join(&self, a: &str, b: &str) -> TypeId {
        if a == b {
            return a.to_string();
        }
        let key = (a.to_string(), b.to_string());
        if let Some(hit) = self.cache.read().unwrap().join.get(&key) {
            return hit.clone();
        }
        let common = self.ancestors(a).intersection(&self.ancestors(b)).cloned().collect();
        let result = self.most_specific(&common).unwrap_or_else(|| "Any".to_string());
        self.cache.write().unwrap().join.insert(key, result.clone());
        result
    }

    /// Most general common descendant; `Never` if none found.
    pub fn meet(&self, a: &str, b: &str) -> TypeId {
        if a == b {
            return a.to_string();
        }
        let key = (a.to_string(), b.to_string());
        if let Some(hit) = self.cache.read().unwrap().meet.get(&key) {
            return hit.clone();
        }
        let common = self.descendants(a).intersection(&self.descendants(b)).cloned().collect();
        let result = self.most_general(&common).unwrap_or_else(|| "Never".to_string());
        self.cache.write().unwrap().meet.insert(key, result.clone());
        result
    }

    /// The element of `set` that every other element is a supertype of
    /// (i.e. is a subtype of all of them). Used to pick the join.
    fn most_specific(&self, set: &HashSet<TypeId>) -> Option<TypeId> {
        set.iter()
            .find(|candidate| set.iter().all(|other| self.is_subtype(candidate, other)))
            .cloned()
    }

    /// The element of `set` that is a supertype of all the others. Used
    /// to pick the meet.
    fn most_general(&self, set: &HashSet<TypeId>) -> Option<TypeId> {
        set.iter()
            .find(|candidate| set.iter().all(|other| self.is_subtype(other, candidate)))
            .cloned()
    }

    /// A∨Never=A; A∧Any=A; flatten nested unions/intersections; dedup and
    /// canonically sort members. Idempotent (P3).
    pub fn normalize(&self, id: &str) -> TypeId {
        let Some(node) = self.nodes.get(id) else {
            return id.to_string();
        };
        match node.kind {
            TypeKind::Union => {
                let mut members: Vec<TypeId> = node
                    .members
                    .iter()
                    .flat_map(|m| self.flatten_union_members(m))
                    .filter(|m| m != "Never")
                    .collect();
                members.sort();
                members.dedup();
                match members.len() {
                    0 => "Never".to_string(),
                    1 => members.into_iter().next().unwrap(),
                    _ => id.to_string(),
                }
            }
            _ => id.to_string(),
        }
    }

    fn flatten_union_members(&self, id: &str) -> Vec<TypeId> {
        match self.nodes.get(id) {
            Some(node) if node.kind == TypeKind::Union => node
                .members
                .iter()
                .flat_map(|m| self.flatten_union_members(m))
                .collect(),
            _ => vec![id.to_string()],
        }
    }
}

impl Default for TypeLattice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lattice() -> TypeLattice {
        let mut lattice = TypeLattice::new();
        lattice.insert_node(TypeNode::new("str", TypeKind::Primitive));
        lattice.insert_node(TypeNode::new("int", TypeKind::Primitive));
        lattice.insert_node(TypeNode::new("bool", TypeKind::Primitive));
        lattice.insert_node(TypeNode::new("float", TypeKind::Primitive));
        lattice
            .add_subtype_edge(SubtypeEdge::new("bool", "int", "bool is an int"))
            .unwrap();
        lattice
    }

    #[test]
    fn is_subtype_is_reflexive_and_transitive() {
        let lattice = sample_lattice();
        assert!(lattice.is_subtype("bool", "bool"));
        assert!(lattice.is_subtype("bool", "int"));
        assert!(lattice.is_subtype("bool", "Any"));
        assert!(lattice.is_subtype("Never", "bool"));
        assert!(!lattice.is_subtype("int", "bool"));
    }

    #[test]
    fn meet_and_join_identities_hold() {
        let lattice = sample_lattice();
        assert_eq!(lattice.meet("bool", "bool"), "bool");
        assert_eq!(lattice.join("bool", "bool"), "bool");
        assert_eq!(lattice.meet("bool", "Any"), "bool");
        assert_eq!(lattice.join("bool", "Never"), "bool");
    }

    #[test]
    fn add_subtype_edge_rejects_cycles() {
        let mut lattice = sample_lattice();
        let err = lattice
            .add_subtype_edge(SubtypeEdge::new("int", "bool", "would cycle"))
            .unwrap_err();
        assert!(matches!(err, LatticeError::WouldCreateCycle { .. }));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut lattice = sample_lattice();
        let mut union = TypeNode::new("StrOrInt", TypeKind::Union);
        union.members = vec!["str".to_string(), "int".to_string(), "int".to_string()];
        lattice.insert_node(union);
        let once = lattice.normalize("StrOrInt");
        // normalize() returns a type id; re-normalizing that id again
        // must return the same id.
        let twice = lattice.normalize(&once);
        assert_eq!(once, twice);
    }
}
