//! Compiled validator graph.
//!
//! A [`Validator`] mirrors the annotation tree it was compiled from: leaves
//! check a single value, composites fan out over members, elements or
//! properties and wrap whatever their children report.
pub mod leaf;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::incompatible::{Incompatible, Key, Unexpected};

pub use leaf::{Custom, Literal, Primitive};

#[derive(Debug, Clone)]
pub enum Validator {
    Primitive(Primitive),
    Literal(Literal),
    Custom(Custom),
    Union(Vec<Validator>),
    Intersection(Vec<Validator>),
    Array(Box<Validator>),
    Tuple(Vec<Validator>),
    Shape(ShapeValidator),
}

#[derive(Debug, Clone)]
pub struct ShapeValidator {
    pub exact: bool,
    pub properties: IndexMap<String, PropertyValidator>,
    pub indexer: Option<IndexerValidator>,
}

#[derive(Debug, Clone)]
pub struct PropertyValidator {
    pub optional: bool,
    pub validator: Validator,
}

#[derive(Debug, Clone)]
pub struct IndexerValidator {
    pub key: Box<Validator>,
    pub value: Box<Validator>,
}

impl Validator {
    /// Satisfied when every member is.
    pub fn all(members: impl IntoIterator<Item = Validator>) -> Self {
        Self::Intersection(members.into_iter().collect())
    }

    /// Satisfied when at least one member is.
    pub fn any(members: impl IntoIterator<Item = Validator>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    /// Checks a present value.
    pub fn check(&self, value: &Value) -> Result<(), Incompatible> {
        self.validate(Some(value))
    }

    pub fn is_valid(&self, value: Option<&Value>) -> bool {
        self.validate(value).is_ok()
    }

    /// `None` stands for an absent value (missing argument or property).
    pub fn validate(&self, value: Option<&Value>) -> Result<(), Incompatible> {
        match self {
            Self::Primitive(primitive) => primitive.validate(value),
            Self::Literal(literal) => literal.validate(value),
            Self::Custom(custom) => custom.validate(value),
            Self::Union(members) => validate_union(members, value),
            Self::Intersection(members) => validate_intersection(members, value),
            Self::Array(element) => validate_array(element, value),
            Self::Tuple(elements) => validate_tuple(elements, value),
            Self::Shape(shape) => shape.validate(value),
        }
    }
}

fn validate_union(members: &[Validator], value: Option<&Value>) -> Result<(), Incompatible> {
    let mut errors = IndexMap::new();
    for (index, member) in members.iter().enumerate() {
        match member.validate(value) {
            Ok(()) => return Ok(()),
            Err(error) => {
                errors.insert(Key::Index(index), error);
            }
        }
    }
    if errors.len() == 1 {
        if let Some((_, error)) = errors.pop() {
            return Err(error);
        }
    }
    Err(Incompatible::nested(value, Unexpected::WithUnion, errors))
}

fn validate_intersection(members: &[Validator], value: Option<&Value>) -> Result<(), Incompatible> {
    let errors: IndexMap<Key, Incompatible> = members
        .iter()
        .enumerate()
        .filter_map(|(index, member)| member.validate(value).err().map(|e| (Key::Index(index), e)))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Incompatible::nested(value, Unexpected::WithIntersection, errors))
    }
}

fn validate_array(element: &Validator, value: Option<&Value>) -> Result<(), Incompatible> {
    let Some(Value::Array(items)) = value else {
        return Err(Incompatible::rejected(value, Unexpected::WithArray));
    };
    let errors = validate_members(items.iter().map(|item| (element, item)));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Incompatible::nested(value, Unexpected::InArrayMembers, errors))
    }
}

fn validate_tuple(elements: &[Validator], value: Option<&Value>) -> Result<(), Incompatible> {
    let Some(Value::Array(items)) = value else {
        return Err(Incompatible::rejected(value, Unexpected::WithTuple));
    };
    if items.len() != elements.len() {
        return Err(Incompatible::described(
            format!("array literal with arity of {}", items.len()),
            format!("incompatible with tuple type with arity of {}", elements.len()),
        ));
    }
    let errors = validate_members(elements.iter().zip(items));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Incompatible::nested(value, Unexpected::InTupleMembers, errors))
    }
}

fn validate_members<'a>(
    pairs: impl Iterator<Item = (&'a Validator, &'a Value)>,
) -> IndexMap<Key, Incompatible> {
    pairs
        .enumerate()
        .filter_map(|(index, (validator, item))| {
            validator.check(item).err().map(|e| (Key::Index(index), e))
        })
        .collect()
}

impl ShapeValidator {
    fn kind(&self) -> &'static str {
        if self.exact { "exact shape" } else { "shape" }
    }

    /// Undeclared keys are tolerated by an exact shape only through its indexer.
    fn indexer_accepts(&self, key: &str) -> bool {
        self.indexer
            .as_ref()
            .is_some_and(|indexer| indexer.key.check(&Value::String(key.to_string())).is_ok())
    }

    pub fn validate(&self, value: Option<&Value>) -> Result<(), Incompatible> {
        let (with, within) = if self.exact {
            (Unexpected::WithExactShape, Unexpected::InExactShapeProperties)
        } else {
            (Unexpected::WithShape, Unexpected::InShapeProperties)
        };

        // An empty list doubles as an empty map.
        let empty = Map::new();
        let object = match value {
            Some(Value::Object(map)) => map,
            Some(Value::Array(items)) if items.is_empty() => &empty,
            _ => return Err(Incompatible::rejected(value, with)),
        };

        let mut errors = IndexMap::new();
        for (key, item) in object {
            let declared = self.properties.get(key);
            if declared.is_none() && self.exact && !self.indexer_accepts(key) {
                errors.insert(
                    Key::Property(key.clone()),
                    Incompatible::described(
                        format!("property `{key}`"),
                        format!("missing in {} but exists in value", self.kind()),
                    ),
                );
                continue;
            }
            let validator = declared
                .map(|property| &property.validator)
                .or_else(|| self.indexer.as_ref().map(|indexer| indexer.value.as_ref()));
            if let Some(validator) = validator {
                if let Err(error) = validator.check(item) {
                    errors.insert(Key::Property(key.clone()), error);
                }
            }
        }

        for (name, property) in &self.properties {
            if property.optional || object.contains_key(name) {
                continue;
            }
            let error = if self.exact {
                Incompatible::described(
                    format!("property `{name}`"),
                    format!("missing in value but exists in {}", self.kind()),
                )
            } else {
                match property.validator.validate(None) {
                    Ok(()) => continue,
                    Err(error) => error,
                }
            };
            errors.insert(Key::Property(name.clone()), error);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Incompatible::nested(value, within, errors))
        }
    }
}
