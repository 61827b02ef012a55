//! Node and edge types for the type lattice (§3 `TypeNode`/`SubtypeEdge`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Primitive,
    Container,
    Record,
    Union,
    Literal,
    Generic,
    Contract,
    /// Top of the lattice: subtype of nothing, supertype of everything.
    Any,
    /// Bottom of the lattice: subtype of everything, supertype of nothing.
    Never,
}

pub type TypeId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeNode {
    pub id: TypeId,
    pub kind: TypeKind,
    pub element_type: Option<TypeId>,
    pub fields: BTreeMap<String, TypeId>,
    pub members: Vec<TypeId>,
    pub invariants: Vec<String>,
}

impl TypeNode {
    pub fn new(id: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            element_type: None,
            fields: BTreeMap::new(),
            members: Vec::new(),
            invariants: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::new("Any", TypeKind::Any)
    }

    pub fn never() -> Self {
        Self::new("Never", TypeKind::Never)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variance {
    Covariant,
    Contravariant,
    Invariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtypeEdge {
    pub sub: TypeId,
    pub sup: TypeId,
    pub reason: String,
    pub covariant_positions: Vec<usize>,
    pub contravariant_positions: Vec<usize>,
}

impl SubtypeEdge {
    pub fn new(sub: impl Into<String>, sup: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            sup: sup.into(),
            reason: reason.into(),
            covariant_positions: Vec::new(),
            contravariant_positions: Vec::new(),
        }
    }
}
