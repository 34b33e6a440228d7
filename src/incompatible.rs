//! Structured incompatibility report and its path-qualified messages.
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// What the rejecting validator found unexpected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unexpected {
    WithUnion,
    WithIntersection,
    WithShape,
    WithExactShape,
    InShapeProperties,
    InExactShapeProperties,
    WithArray,
    InArrayMembers,
    WithTuple,
    InTupleMembers,
    /// Leaf-specific description, e.g. "incompatible with int".
    Other(String),
}

impl Unexpected {
    fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::WithUnion
                | Self::WithIntersection
                | Self::InShapeProperties
                | Self::InExactShapeProperties
                | Self::InArrayMembers
                | Self::InTupleMembers
        )
    }
}

impl fmt::Display for Unexpected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::WithUnion => "incompatible with union",
            Self::WithIntersection => "incompatible with intersection",
            Self::WithShape => "incompatible with shape",
            Self::WithExactShape => "incompatible with exact shape",
            Self::InShapeProperties => "incompatible in shape properties",
            Self::InExactShapeProperties => "incompatible in exact shape properties",
            Self::WithArray => "incompatible with array",
            Self::InArrayMembers => "incompatible in array members",
            Self::WithTuple => "incompatible with tuple",
            Self::InTupleMembers => "incompatible in tuple members",
            Self::Other(text) => text,
        };
        f.write_str(text)
    }
}

/// Child position inside a composite value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Property(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Property(name) => f.write_str(name),
        }
    }
}

/// Created by the validator that rejected a value, wrapped by every
/// enclosing composite on the way out.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{given} is {unexpected}")]
pub struct Incompatible {
    given: String,
    unexpected: Unexpected,
    children: IndexMap<Key, Incompatible>,
}

impl Incompatible {
    /// Leaf failure about a concrete value.
    pub fn new(value: Option<&Value>, unexpected: impl Into<String>) -> Self {
        Self::described(describe(value), unexpected)
    }

    /// Leaf failure with a free-form subject, e.g. "property `foo`".
    pub fn described(given: impl Into<String>, unexpected: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            unexpected: Unexpected::Other(unexpected.into()),
            children: IndexMap::new(),
        }
    }

    /// Leaf failure explained by exactly one underlying cause.
    pub fn caused_by(given: impl Into<String>, unexpected: impl Into<String>, cause: Incompatible) -> Self {
        let mut error = Self::described(given, unexpected);
        error.children.insert(Key::Index(0), cause);
        error
    }

    /// Immediate rejection by a composite validator (`With*` kinds).
    pub(crate) fn rejected(value: Option<&Value>, unexpected: Unexpected) -> Self {
        Self {
            given: describe(value),
            unexpected,
            children: IndexMap::new(),
        }
    }

    /// Aggregated failure of a composite validator (`In*`, union, intersection).
    pub(crate) fn nested(
        value: Option<&Value>,
        unexpected: Unexpected,
        children: IndexMap<Key, Incompatible>,
    ) -> Self {
        debug_assert!(unexpected.is_composite());
        Self {
            given: describe(value),
            unexpected,
            children,
        }
    }

    pub fn given(&self) -> &str {
        &self.given
    }

    pub fn unexpected(&self) -> &Unexpected {
        &self.unexpected
    }

    pub fn children(&self) -> &IndexMap<Key, Incompatible> {
        &self.children
    }

    pub fn child(&self, key: &Key) -> Option<&Incompatible> {
        self.children.get(key)
    }

    /// Human readable messages for the whole tree.
    pub fn messages(&self) -> Messages {
        self.messages_at("")
    }

    /// Messages with property paths rooted at `path`.
    pub fn messages_at(&self, path: &str) -> Messages {
        match &self.unexpected {
            Unexpected::WithUnion => {
                let flattened: Vec<Messages> =
                    self.children.values().map(|child| child.messages_at(path)).collect();
                if flattened.iter().any(Messages::is_many) {
                    return Messages::Many(flattened.into_iter().flat_map(Messages::into_vec).collect());
                }
                let alternatives = self
                    .children
                    .values()
                    .map(|child| child.unexpected.to_string())
                    .collect::<Vec<_>>()
                    .join(" or ");
                Messages::One(format!("{self} because {} is either {alternatives}", self.given))
            }
            Unexpected::WithIntersection => Messages::Many(
                self.children
                    .values()
                    .flat_map(|child| child.messages_at(path).into_vec())
                    .collect(),
            ),
            Unexpected::InArrayMembers | Unexpected::InTupleMembers => {
                let container = if self.unexpected == Unexpected::InArrayMembers {
                    "array"
                } else {
                    "tuple"
                };
                let mut out = Vec::new();
                for (key, child) in &self.children {
                    match child.messages_at(&format!("{path}[{key}]")) {
                        Messages::One(message) => out.push(format!(
                            "{message} at index #{key} in {container} members{}",
                            of_property(path)
                        )),
                        Messages::Many(messages) => out.extend(messages),
                    }
                }
                Messages::Many(out)
            }
            Unexpected::InShapeProperties | Unexpected::InExactShapeProperties => {
                let mut out = Vec::new();
                for (key, child) in &self.children {
                    let full_path = if path.is_empty() {
                        key.to_string()
                    } else {
                        format!("{path}.{key}")
                    };
                    match child.messages_at(&full_path) {
                        Messages::One(message) => {
                            out.push(format!("{message} in {} of property `{full_path}`", self.given))
                        }
                        Messages::Many(messages) => out.extend(messages),
                    }
                }
                Messages::Many(out)
            }
            Unexpected::WithShape
            | Unexpected::WithExactShape
            | Unexpected::WithArray
            | Unexpected::WithTuple => Messages::One(self.to_string()),
            Unexpected::Other(_) => match (self.children.len(), self.children.first()) {
                (0, _) => Messages::One(self.to_string()),
                (1, Some((_, cause))) => {
                    let mut out = vec![self.to_string()];
                    out.extend(cause.messages_at(path).into_vec());
                    Messages::Many(out)
                }
                // Leaf kinds are only built through `new`, `described` and
                // `caused_by`, which never attach more than one child.
                (count, _) => unreachable!("leaf incompatibility with {count} children"),
            },
        }
    }
}

/// Empty for members of a root-level array or tuple.
fn of_property(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" of property `{path}`")
    }
}

/// Flattened messages: a single sentence or a flat list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Messages {
    One(String),
    Many(Vec<String>),
}

impl Messages {
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(message) => vec![message],
            Self::Many(messages) => messages,
        }
    }
}

impl fmt::Display for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(message) => f.write_str(message),
            Self::Many(messages) => f.write_str(&messages.join("\n")),
        }
    }
}

/// Short description of a value for messages: `string literal "foo"`,
/// `int literal 3`, `array literal`, `null`, `undefined`.
pub fn describe(value: Option<&Value>) -> String {
    match value {
        None => "undefined".into(),
        Some(Value::Null) => "null".into(),
        Some(Value::Bool(b)) => format!("bool literal {b}"),
        Some(Value::Number(n)) if n.is_f64() => format!("float literal {n}"),
        Some(Value::Number(n)) => format!("int literal {n}"),
        Some(Value::String(s)) => format!("string literal {}", Value::String(s.clone())),
        Some(Value::Array(_)) => "array literal".into(),
        Some(Value::Object(_)) => "object literal".into(),
    }
}
