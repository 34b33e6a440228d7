//! Canonical annotation tree → validator graph.
use std::fmt;

use tracing::warn;

use crate::ast::{Node, Shape};
use crate::error::{Error, Result};
use crate::registry::TypeResolver;
use crate::validator::{IndexerValidator, PropertyValidator, ShapeValidator, Validator};

/// Non-fatal remarks about an annotation, reported while compiling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `{| [string]: T |}`: an indexer on an exact shape.
    ExactShapeIndexer,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactShapeIndexer => f.write_str("indexers are usually meant for inexact shapes"),
        }
    }
}

pub struct Compiler<'a> {
    resolver: &'a dyn TypeResolver,
    diagnostics: Option<&'a dyn Fn(&Diagnostic)>,
}

impl<'a> Compiler<'a> {
    /// Diagnostics go to `tracing` until a sink is installed.
    pub fn new(resolver: &'a dyn TypeResolver) -> Self {
        Self { resolver, diagnostics: None }
    }

    pub fn with_diagnostics(mut self, sink: &'a dyn Fn(&Diagnostic)) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    fn report(&self, diagnostic: Diagnostic) {
        match self.diagnostics {
            Some(sink) => sink(&diagnostic),
            None => warn!(%diagnostic, "annotation diagnostic"),
        }
    }

    pub fn compile(&self, node: &Node) -> Result<Validator> {
        match node {
            Node::Leaf(name) => self.resolver.resolve(name),
            Node::Union(members) => Ok(Validator::Union(self.compile_members(members, "union")?)),
            Node::Intersection(members) => {
                Ok(Validator::Intersection(self.compile_members(members, "intersection")?))
            }
            Node::Array(element) => Ok(Validator::Array(Box::new(self.compile(element)?))),
            Node::Tuple(elements) => Ok(Validator::Tuple(
                elements.iter().map(|e| self.compile(e)).collect::<Result<_>>()?,
            )),
            Node::Shape(shape) => self.compile_shape(shape),
        }
    }

    fn compile_members(&self, members: &[Node], kind: &str) -> Result<Vec<Validator>> {
        if members.is_empty() {
            return Err(Error::conflict(format!("empty AST: {kind} without members")));
        }
        members.iter().map(|m| self.compile(m)).collect()
    }

    fn compile_shape(&self, shape: &Shape) -> Result<Validator> {
        if shape.exact && shape.indexer.is_some() {
            self.report(Diagnostic::ExactShapeIndexer);
        }
        let properties = shape
            .properties
            .iter()
            .map(|(name, property)| {
                let validator = self.compile(&property.ty)?;
                Ok((name.clone(), PropertyValidator { optional: property.optional, validator }))
            })
            .collect::<Result<_>>()?;
        let indexer = match &shape.indexer {
            Some(indexer) => Some(IndexerValidator {
                key: Box::new(self.compile(&indexer.key)?),
                value: Box::new(self.compile(&indexer.value)?),
            }),
            None => None,
        };
        Ok(Validator::Shape(ShapeValidator { exact: shape.exact, properties, indexer }))
    }
}

/// Compiles with diagnostics logged through `tracing`.
pub fn compile(node: &Node, resolver: &dyn TypeResolver) -> Result<Validator> {
    Compiler::new(resolver).compile(node)
}
