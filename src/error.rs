use thiserror::Error;

use crate::incompatible::Incompatible;

/// Everything that can go wrong between an annotation string and a verdict.
///
/// Only [`Error::Incompatible`] describes the *value*; every other variant is
/// an authoring bug in the annotation, the registry or the configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed annotation: reserved characters, unbalanced groups,
    /// dangling operators, misplaced keys.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The annotation parses but describes an impossible tree.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Recognized syntax the language does not support (yet).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A leaf name is neither an alias, a primitive nor a literal.
    #[error("type does not exist: `{0}`")]
    NotFound(String),

    /// Refused registration, e.g. aliasing `any`.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Incompatible(#[from] Incompatible),
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// The structured incompatibility, if this is one.
    pub fn as_incompatible(&self) -> Option<&Incompatible> {
        match self {
            Self::Incompatible(incompatible) => Some(incompatible),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
