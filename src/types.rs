//! Annotation-level entry points: compile, check, pass-through.
use serde_json::Value;
use tracing::debug;

use crate::compile::{Compiler, Diagnostic};
use crate::config::Config;
use crate::error::Result;
use crate::incompatible::{Incompatible, describe};
use crate::registry::Registry;
use crate::validator::Validator;

/// A [`Registry`] plus the switches from [`Config`].
#[derive(Default)]
pub struct Types {
    registry: Registry,
    config: Config,
}

fn is_unset(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

impl Types {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every configured alias.
    pub fn with_config(config: Config) -> Result<Self> {
        let mut registry = Registry::new();
        for (name, annotation) in &config.aliases {
            registry.set_annotation(name, annotation)?;
        }
        Ok(Self { registry, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn define(&mut self, name: &str, annotation: &str) -> Result<()> {
        self.registry.set_annotation(name, annotation)
    }

    pub fn define_fn(
        &mut self,
        name: &str,
        predicate: impl Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Result<()> {
        self.registry.set_fn(name, predicate)
    }

    pub fn compile(&self, annotation: &str) -> Result<Validator> {
        debug!(annotation, "compiling annotation");
        let node = crate::parse(annotation)?;
        let silent = |_: &Diagnostic| {};
        let mut compiler = Compiler::new(&self.registry);
        if !self.config.warn_exact_shape_indexers {
            compiler = compiler.with_diagnostics(&silent);
        }
        compiler.compile(&node)
    }

    /// `Err(Error::Incompatible)` when the value does not match.
    pub fn check(&self, annotation: &str, value: Option<&Value>) -> Result<()> {
        self.compile(annotation)?.validate(value)?;
        Ok(())
    }

    /// Only authoring errors (syntax, unknown names, …) are `Err`.
    pub fn is(&self, annotation: &str, value: Option<&Value>) -> Result<bool> {
        Ok(self.compile(annotation)?.is_valid(value))
    }

    /// Returns `value`, or `default` when `value` is absent or null, after
    /// checking both against `annotation`.
    pub fn pass(
        &self,
        value: Option<Value>,
        annotation: &str,
        default: Option<Value>,
    ) -> Result<Option<Value>> {
        let default = default.filter(|d| !d.is_null());
        if !self.config.enabled {
            return Ok(if is_unset(value.as_ref()) { default } else { value });
        }

        let validator = self.compile(annotation)?;
        let expected = format!("incompatible with `{annotation}`");

        if let Some(default) = default.as_ref() {
            validator
                .check(default)
                .map_err(|cause| Incompatible::caused_by("Default value", expected.clone(), cause))?;
        }
        if is_unset(value.as_ref()) {
            return Ok(default);
        }
        validator
            .validate(value.as_ref())
            .map_err(|cause| Incompatible::caused_by(describe(value.as_ref()), expected, cause))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn is_separates_mismatch_from_authoring_errors() {
        let types = Types::new();
        assert!(types.is("int|string", Some(&json!("a"))).unwrap());
        assert!(!types.is("int", Some(&json!("a"))).unwrap());
        assert!(matches!(types.is("Nope", Some(&json!(1))), Err(Error::NotFound(_))));
    }

    #[test]
    fn check_returns_the_structured_error() {
        let types = Types::new();
        let err = types.check("string[]", Some(&json!(["a", 1]))).unwrap_err();
        let incompatible = err.as_incompatible().unwrap();
        assert_eq!(
            incompatible.messages().into_vec(),
            vec!["int literal 1 is incompatible with string at index #1 in array members"]
        );
    }

    #[test]
    fn pass_returns_value_or_default() {
        let types = Types::new();
        assert_eq!(types.pass(Some(json!(3)), "int", None).unwrap(), Some(json!(3)));
        assert_eq!(types.pass(None, "int", Some(json!(7))).unwrap(), Some(json!(7)));
        assert_eq!(types.pass(Some(json!(null)), "?int", None).unwrap(), None);
    }

    #[test]
    fn pass_wraps_failures() {
        let types = Types::new();
        let err = types.pass(Some(json!("x")), "int", None).unwrap_err();
        assert_eq!(
            err.as_incompatible().unwrap().messages().into_vec(),
            vec![
                "string literal \"x\" is incompatible with `int`",
                "string literal \"x\" is incompatible with int",
            ]
        );

        let err = types.pass(Some(json!(1)), "int", Some(json!("d"))).unwrap_err();
        assert_eq!(
            err.as_incompatible().unwrap().to_string(),
            "Default value is incompatible with `int`"
        );
    }

    #[test]
    fn disabled_pass_skips_validation() {
        let config = Config { enabled: false, ..Config::default() };
        let types = Types::with_config(config).unwrap();
        assert_eq!(types.pass(Some(json!("x")), "int", None).unwrap(), Some(json!("x")));
        assert_eq!(types.pass(None, "int", Some(json!("d"))).unwrap(), Some(json!("d")));
        // disabled pass does not even parse
        assert!(types.pass(Some(json!(1)), "{", None).is_ok());
    }

    #[test]
    fn defined_types_resolve() {
        let mut types = Types::new();
        types.define("Id", "int | numeric").unwrap();
        types.define_fn("Even", |v| v.and_then(Value::as_u64).is_some_and(|n| n % 2 == 0)).unwrap();
        assert!(types.is("Id[]", Some(&json!([1, "2"]))).unwrap());
        assert!(types.is("Even & Id", Some(&json!(4))).unwrap());
        assert!(!types.is("Even", Some(&json!(3))).unwrap());
    }

    #[test]
    fn configured_aliases_are_registered() {
        let config = Config::from_json_str(r#"{"aliases": {"Name": "string", "Names": "Name[]"}}"#)
            .unwrap();
        let types = Types::with_config(config).unwrap();
        assert!(types.is("Names", Some(&json!(["a", "b"]))).unwrap());
    }
}
