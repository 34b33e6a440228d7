//! Runs a JSON fixture of `{annotation, value, valid}` cases.
//!
//! ```text
//! dev-test-runner [cases.json] [annotation-regex]
//! ```
use std::path::PathBuf;
use std::process::ExitCode;

use duck_types::{Error, Types};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Fixture {
    #[serde(default)]
    aliases: Vec<Alias>,
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Alias {
    name: String,
    annotation: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    annotation: String,
    /// Missing means "undefined"; `null` stays an explicit null.
    #[serde(default, deserialize_with = "present")]
    value: Option<Value>,
    #[serde(default)]
    valid: Option<bool>,
    /// Expected authoring error kind: syntax | conflict | not_implemented | not_found.
    #[serde(default)]
    error: Option<String>,
    /// Expected flattened messages, when the case is invalid.
    #[serde(default)]
    messages: Option<Vec<String>>,
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(de).map(Some)
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::Syntax(_) => "syntax",
        Error::Conflict(_) => "conflict",
        Error::NotImplemented(_) => "not_implemented",
        Error::NotFound(_) => "not_found",
        Error::Forbidden(_) => "forbidden",
        Error::Config(_) => "config",
        Error::Incompatible(_) => "incompatible",
    }
}

fn load(path: &PathBuf) -> Result<Fixture, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    duck_types::config::from_str_with_path(&source).map_err(|e| format!("{}: {e}", path.display()))
}

/// `None` when the case holds.
fn run_case(types: &Types, case: &Case) -> Option<String> {
    let outcome = types.check(&case.annotation, case.value.as_ref());
    match (outcome, case.error.as_deref()) {
        (Err(Error::Incompatible(_)), Some(kind)) | (Ok(()), Some(kind)) => {
            Some(format!("expected {kind} error, annotation compiled"))
        }
        (Err(error), Some(kind)) if error_kind(&error) == kind => None,
        (Err(error), Some(kind)) => Some(format!("expected {kind} error, got {error}")),
        (Ok(()), None) if case.valid != Some(false) => None,
        (Ok(()), None) => Some("value accepted, expected rejection".to_string()),
        (Err(Error::Incompatible(incompatible)), None) if case.valid == Some(false) => {
            let got = incompatible.messages().into_vec();
            match case.messages.as_ref() {
                Some(expected) if *expected != got => {
                    Some(format!("messages differ:\n  expected {expected:?}\n  got      {got:?}"))
                }
                _ => None,
            }
        }
        (Err(error), None) => Some(format!("unexpected error: {error}")),
    }
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let path = PathBuf::from(args.next().unwrap_or_else(|| "dev-test-runner/cases.json".into()));
    let filter = match args.next().map(|p| Regex::new(&p)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid filter: {error}");
            return ExitCode::from(2);
        }
    };

    let fixture = match load(&path) {
        Ok(fixture) => fixture,
        Err(error) => {
            eprintln!("❌ {error}");
            return ExitCode::from(2);
        }
    };

    let mut types = Types::new();
    for alias in &fixture.aliases {
        if let Err(error) = types.define(&alias.name, &alias.annotation) {
            eprintln!("❌ alias `{}`: {error}", alias.name);
            return ExitCode::from(2);
        }
    }

    let (mut passed, mut failed) = (0usize, 0usize);
    for (index, case) in fixture.cases.iter().enumerate() {
        if filter.as_ref().is_some_and(|f| !f.is_match(&case.annotation)) {
            continue;
        }
        match run_case(&types, case) {
            None => passed += 1,
            Some(reason) => {
                failed += 1;
                eprintln!("❌ case #{index} `{}` with {:?}: {reason}", case.annotation, case.value);
            }
        }
    }

    eprintln!("{passed} passed, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
