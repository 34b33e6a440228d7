// Canonical annotation tree. No tokens or markers survive here.

use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Leaf(String),            // identifier or literal, resolved at compile time
    Union(Vec<Node>),        // ≥1 member, satisfy at least one
    Intersection(Vec<Node>), // ≥1 member, satisfy all
    Array(Box<Node>),        // every element satisfies the element type
    Tuple(Vec<Node>),        // exact arity, position-wise
    Shape(Shape),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub exact: bool,
    pub properties: IndexMap<String, Property>, // declaration order
    pub indexer: Option<Indexer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub optional: bool, // `key?: T`, absence tolerated even when exact
    pub ty: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indexer {
    pub key: Box<Node>,
    pub value: Box<Node>,
}

impl Node {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf(name.into())
    }

    /// `?T`
    pub fn nullable(inner: Node) -> Self {
        Self::Union(vec![Self::leaf("null"), inner])
    }
}
