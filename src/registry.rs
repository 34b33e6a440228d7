//! Named types: aliases, primitive keywords and inline literals.
use std::cell::RefCell;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::debug;

use crate::compile::Compiler;
use crate::error::{Error, Result};
use crate::validator::{Custom, Literal, Primitive, Validator};

/// Maps a leaf name to its validator.
pub trait TypeResolver {
    fn resolve(&self, name: &str) -> Result<Validator>;
}

enum Entry {
    Ready(Validator),
    /// Compiled on first resolution, at most once.
    Lazy { annotation: String, compiled: OnceCell<Validator> },
}

thread_local! {
    // (registry address, alias) pairs currently being compiled on this thread.
    static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// Pops its alias off the resolution stack, also on early return.
struct Resolving;

impl Resolving {
    fn enter(registry: usize, name: &str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(owner, alias)| *owner == registry && alias == name) {
                let chain: Vec<&str> = stack
                    .iter()
                    .filter(|(owner, _)| *owner == registry)
                    .map(|(_, alias)| alias.as_str())
                    .collect();
                return Err(Error::conflict(format!(
                    "recursive type alias `{name}` ({} -> {name})",
                    chain.join(" -> ")
                )));
            }
            stack.push((registry, name.to_string()));
            Ok(Self)
        })
    }
}

impl Drop for Resolving {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[derive(Default)]
pub struct Registry {
    aliases: IndexMap<String, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, entry: Entry) -> Result<()> {
        if name == "any" {
            return Err(Error::Forbidden(
                "using `any` is unsafe and should be avoided whenever possible".to_string(),
            ));
        }
        debug!(alias = name, "registering type");
        self.aliases.insert(name.to_string(), entry);
        Ok(())
    }

    /// Registers an already built validator under `name`.
    pub fn set(&mut self, name: &str, validator: Validator) -> Result<()> {
        self.insert(name, Entry::Ready(validator))
    }

    /// Registers a predicate; `false` is reported as "incompatible with `name`".
    pub fn set_fn(
        &mut self,
        name: &str,
        predicate: impl Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Result<()> {
        self.set(name, Validator::Custom(Custom::predicate(name, predicate)))
    }

    /// Registers an annotation, compiled against this registry when first used.
    pub fn set_annotation(&mut self, name: &str, annotation: &str) -> Result<()> {
        self.insert(
            name,
            Entry::Lazy { annotation: annotation.to_string(), compiled: OnceCell::new() },
        )
    }

    /// Whether `resolve` would find `name`. Aliases are not compiled.
    pub fn exists(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
            || Primitive::from_name(name).is_some()
            || matches!(Literal::parse(name), Ok(Some(_)))
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    fn resolve_alias(&self, name: &str, entry: &Entry) -> Result<Validator> {
        match entry {
            Entry::Ready(validator) => Ok(validator.clone()),
            Entry::Lazy { annotation, compiled } => {
                if let Some(validator) = compiled.get() {
                    return Ok(validator.clone());
                }
                // The guard must be taken before the cell is locked for init.
                let _guard = Resolving::enter(self as *const Self as usize, name)?;
                let validator = compiled.get_or_try_init(|| {
                    debug!(alias = name, annotation = %annotation, "compiling type alias");
                    Compiler::new(self).compile(&crate::parse(annotation)?)
                })?;
                Ok(validator.clone())
            }
        }
    }
}

impl TypeResolver for Registry {
    fn resolve(&self, name: &str) -> Result<Validator> {
        if let Some(entry) = self.aliases.get(name) {
            return self.resolve_alias(name, entry);
        }
        if let Some(primitive) = Primitive::from_name(name) {
            return Ok(Validator::Primitive(primitive));
        }
        if let Some(literal) = Literal::parse(name)? {
            return Ok(Validator::Literal(literal));
        }
        Err(Error::NotFound(name.to_string()))
    }
}
