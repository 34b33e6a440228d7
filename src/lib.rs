//! Flow-style type annotations compiled into runtime validators for JSON
//! values.
//!
//! ```text
//! annotation ─ lexer ─▶ tokens ─ tree ─▶ groups ─ normalize ─▶ Node ─ compile ─▶ Validator
//! ```
pub mod ast;
pub mod compile;
pub mod config;
pub mod error;
pub mod incompatible;
pub mod lexer;
pub mod normalize;
pub mod registry;
pub mod token;
pub mod tree;
pub mod types;
pub mod validator;

pub use ast::Node;
pub use compile::{Compiler, Diagnostic};
pub use config::Config;
pub use error::{Error, Result};
pub use incompatible::{Incompatible, Key, Messages, Unexpected};
pub use registry::{Registry, TypeResolver};
pub use types::Types;
pub use validator::Validator;

/// Parses an annotation into its canonical tree.
pub fn parse(annotation: &str) -> Result<Node> {
    let tokens = lexer::tokenize(annotation)?;
    let groups = tree::build_tree(tokens)?;
    normalize::normalize(groups)
}

/// Parses and compiles `annotation` against `resolver`.
pub fn compile_annotation(annotation: &str, resolver: &dyn TypeResolver) -> Result<Validator> {
    tracing::debug!(annotation, "compiling annotation");
    compile::compile(&parse(annotation)?, resolver)
}
