use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::incompatible::Incompatible;

static INT_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));
static FLOAT_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("valid regex"));

/// Built-in keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Existential,
    Null,
    Undefined,
    Number,
    Numeric,
    String,
    Int,
    Float,
    Bool,
    Boolean,
    True,
    False,
    Array,
    Object,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "*" => Self::Existential,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            "number" => Self::Number,
            "numeric" => Self::Numeric,
            "string" => Self::String,
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "boolean" => Self::Boolean,
            "true" => Self::True,
            "false" => Self::False,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        };
        Some(primitive)
    }

    pub fn accepts(self, value: Option<&Value>) -> bool {
        match self {
            Self::Existential => !matches!(value, None | Some(Value::Null)),
            Self::Null => matches!(value, Some(Value::Null)),
            Self::Undefined => matches!(value, None | Some(Value::Null)),
            Self::Number => matches!(value, Some(Value::Number(_))),
            Self::Numeric => match value {
                Some(Value::Number(_)) => true,
                Some(Value::String(s)) => is_numeric_str(s),
                _ => false,
            },
            Self::String => matches!(value, Some(Value::String(_))),
            Self::Int => matches!(value, Some(Value::Number(n)) if !n.is_f64()),
            Self::Float => matches!(value, Some(Value::Number(n)) if n.is_f64()),
            Self::Bool | Self::Boolean => matches!(value, Some(Value::Bool(_))),
            Self::True => matches!(value, Some(Value::Bool(true))),
            Self::False => matches!(value, Some(Value::Bool(false))),
            Self::Array => matches!(value, Some(Value::Array(_))),
            Self::Object => matches!(value, Some(Value::Object(_))),
        }
    }

    /// Name used in "incompatible with …".
    fn expected(self) -> &'static str {
        match self {
            Self::Existential => "existential",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Number => "number",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool | Self::Boolean | Self::True | Self::False => "bool",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    pub fn validate(self, value: Option<&Value>) -> Result<(), Incompatible> {
        if self.accepts(value) {
            return Ok(());
        }
        Err(Incompatible::new(value, format!("incompatible with {}", self.expected())))
    }
}

/// Number or a string that reads as one (`"100"`, `" 1.5"`, `"1e3"`).
fn is_numeric_str(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty()
        && t.bytes().any(|b| b.is_ascii_digit())
        && t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        && t.parse::<f64>().is_ok()
}

/// Exact-value types written inline in an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    String { source: String, value: String },
    Int { source: String, value: u64 },
    Float { source: String, value: OrderedFloat<f64> },
}

impl Literal {
    /// `Ok(None)` when `source` does not look like a literal at all.
    pub fn parse(source: &str) -> Result<Option<Self>> {
        if let Some(value) = unquote(source)? {
            return Ok(Some(Self::String { source: source.to_string(), value }));
        }
        if INT_LITERAL.is_match(source) {
            let value = source
                .parse::<u64>()
                .map_err(|_| Error::syntax(format!("int literal {source} is out of range")))?;
            return Ok(Some(Self::Int { source: source.to_string(), value }));
        }
        if FLOAT_LITERAL.is_match(source) {
            let value = source
                .parse::<f64>()
                .map_err(|_| Error::syntax(format!("unable to parse float literal {source}")))?;
            return Ok(Some(Self::Float {
                source: source.to_string(),
                value: OrderedFloat(value),
            }));
        }
        Ok(None)
    }

    pub fn accepts(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::String { value: expected, .. }, Some(Value::String(s))) => s == expected,
            (Self::Int { value: expected, .. }, Some(Value::Number(n))) => {
                !n.is_f64() && n.as_u64() == Some(*expected)
            }
            (Self::Float { value: expected, .. }, Some(Value::Number(n))) => {
                n.is_f64() && n.as_f64().map(OrderedFloat) == Some(*expected)
            }
            _ => false,
        }
    }

    pub fn validate(&self, value: Option<&Value>) -> Result<(), Incompatible> {
        if self.accepts(value) {
            return Ok(());
        }
        let (kind, source) = match self {
            Self::String { source, .. } => ("string", source),
            Self::Int { source, .. } => ("int", source),
            Self::Float { source, .. } => ("float", source),
        };
        Err(Incompatible::new(value, format!("incompatible with {kind} literal {source}")))
    }
}

/// Content of a `"…"` or `'…'` literal; an unescaped inner quote is an error.
fn unquote(source: &str) -> Result<Option<String>> {
    let Some(quote) = source.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Ok(None);
    };
    if source.len() < 2 || !source.ends_with(quote) {
        return Ok(None);
    }
    let inner = &source[1..source.len() - 1];
    let escaped = format!("\\{quote}");
    if inner.replace(&escaped, "").contains(quote) {
        return Err(Error::syntax(format!("unable to parse string literal {source}")));
    }
    Ok(Some(inner.replace(&escaped, &quote.to_string())))
}

pub type CheckFn = dyn Fn(Option<&Value>) -> Result<(), Incompatible> + Send + Sync;

/// User supplied leaf validator.
#[derive(Clone)]
pub struct Custom {
    name: String,
    check: Arc<CheckFn>,
}

impl Custom {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(Option<&Value>) -> Result<(), Incompatible> + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), check: Arc::new(check) }
    }

    /// Wraps a boolean predicate; `false` reads as "incompatible with <name>".
    pub fn predicate(
        name: impl Into<String>,
        predicate: impl Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let message = format!("incompatible with {name}");
        Self::new(name, move |value| {
            if predicate(value) {
                Ok(())
            } else {
                Err(Incompatible::new(value, message.clone()))
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validate(&self, value: Option<&Value>) -> Result<(), Incompatible> {
        (self.check)(value)
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accepts(name: &str, value: Value) -> bool {
        Primitive::from_name(name).unwrap().accepts(Some(&value))
    }

    #[test]
    fn primitives_accept_matching_values() {
        assert!(accepts("null", json!(null)));
        assert!(accepts("number", json!(100)));
        assert!(accepts("number", json!(1.5)));
        assert!(accepts("numeric", json!("100")));
        assert!(accepts("numeric", json!(" 1e3")));
        assert!(accepts("string", json!("hello")));
        assert!(accepts("int", json!(42)));
        assert!(accepts("float", json!(33.33)));
        assert!(accepts("bool", json!(true)));
        assert!(accepts("boolean", json!(false)));
        assert!(accepts("true", json!(true)));
        assert!(accepts("false", json!(false)));
        assert!(accepts("array", json!([])));
        assert!(accepts("object", json!({})));
        assert!(accepts("*", json!("hi")));
        assert!(Primitive::Undefined.accepts(None));
    }

    #[test]
    fn primitives_reject_other_values() {
        assert!(!accepts("null", json!(0)));
        assert!(!accepts("undefined", json!("hello")));
        assert!(!accepts("number", json!("100")));
        assert!(!accepts("numeric", json!("foo")));
        assert!(!accepts("numeric", json!("inf")));
        assert!(!accepts("string", json!(false)));
        assert!(!accepts("int", json!("42")));
        assert!(!accepts("int", json!(1.0)));
        assert!(!accepts("float", json!("33.33")));
        assert!(!accepts("bool", json!(null)));
        assert!(!accepts("boolean", json!("true")));
        assert!(!accepts("true", json!("true")));
        assert!(!accepts("false", json!("false")));
        assert!(!accepts("array", json!(null)));
        assert!(!accepts("object", json!([])));
        assert!(!Primitive::Existential.accepts(None));
        assert!(!accepts("*", json!(null)));
    }

    #[test]
    fn boolean_keywords_report_bool() {
        let err = Primitive::Boolean.validate(Some(&json!("true"))).unwrap_err();
        assert_eq!(err.to_string(), "string literal \"true\" is incompatible with bool");
        let err = Primitive::Existential.validate(None).unwrap_err();
        assert_eq!(err.to_string(), "undefined is incompatible with existential");
    }

    #[test]
    fn literals() {
        let hello = Literal::parse("'hello'").unwrap().unwrap();
        assert!(hello.accepts(Some(&json!("hello"))));
        assert!(!hello.accepts(Some(&json!("world"))));
        assert_eq!(
            hello.validate(Some(&json!("world"))).unwrap_err().to_string(),
            "string literal \"world\" is incompatible with string literal 'hello'"
        );

        let escaped = Literal::parse(r#""say \"hi\"""#).unwrap().unwrap();
        assert!(escaped.accepts(Some(&json!("say \"hi\""))));

        let one = Literal::parse("1").unwrap().unwrap();
        assert!(one.accepts(Some(&json!(1))));
        assert!(!one.accepts(Some(&json!(1.0))));
        assert!(!one.accepts(Some(&json!("1"))));

        let half = Literal::parse("0.5").unwrap().unwrap();
        assert!(half.accepts(Some(&json!(0.5))));
        assert!(!half.accepts(Some(&json!(1))));

        assert_eq!(Literal::parse("Foo").unwrap(), None);
        assert_eq!(Literal::parse("-1").unwrap(), None);
        assert!(matches!(Literal::parse("'a'b'"), Err(Error::Syntax(_))));
    }

    #[test]
    fn custom_predicate() {
        let even = Custom::predicate("even", |v| v.and_then(Value::as_u64).is_some_and(|n| n % 2 == 0));
        assert_eq!(even.name(), "even");
        assert!(even.validate(Some(&json!(4))).is_ok());
        assert_eq!(
            even.validate(Some(&json!(3))).unwrap_err().to_string(),
            "int literal 3 is incompatible with even"
        );
    }
}
