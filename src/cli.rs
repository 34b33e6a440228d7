//! CLI: check JSON documents against an annotation, or inspect how it parses.
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use duck_types::{Config, Types};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON/NDJSON documents against Flow-style type annotations
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// check every input document against the annotation
    Check(CheckCmd),
    /// print the normalized annotation tree as JSON
    Ast(AnnotationArgs),
    /// print the lexer token stream
    Tokens(AnnotationArgs),
}

#[derive(Args, Debug, Clone)]
struct AnnotationArgs {
    /// type annotation, e.g. '{| id: int, tags?: string[] |}'
    #[arg(long = "type", short = 't')]
    annotation: String,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    annotation: AnnotationArgs,

    #[command(flatten)]
    input_settings: InputSettings,

    /// JSON config with `enabled`, `warn_exact_shape_indexers` and `aliases`
    #[arg(long)]
    config: Option<PathBuf>,

    /// only print documents that fail
    #[arg(long, default_value_t = false)]
    failures_only: bool,
}

/// One value to check. `value` is `None` when a JSON Pointer selected nothing.
#[derive(Debug)]
struct Document {
    label: String,
    value: Option<Value>,
}

enum Verdict {
    Pass,
    Fail(Vec<String>),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .map_err(|e| anyhow::anyhow!("failed to resolve input file paths: {e}"))?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let value = serde_json::from_str::<Value>(line).with_context(|| {
                        format!("failed to parse NDJSON line {} of {source_path_str}", line_no + 1)
                    })?;
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    self.select(label, value, &mut documents)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file {source_path_str}"))?;
                self.select(source_path_str, value, &mut documents)?;
            }
        }
        Ok(documents)
    }

    /// Applies the pointer, then the jq filter.
    fn select(&self, label: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => Some(value),
            Some(pointer) => value.pointer(pointer).cloned(),
        };
        let (Some(jq_expr), Some(value)) = (self.jq_expr.as_ref(), value.as_ref()) else {
            out.push(Document { label, value });
            return Ok(());
        };
        let results = crate::jq_exec::run_jaq(jq_expr, value)
            .with_context(|| format!("failed to apply jq expression to {label}"))?;
        let many = results.len() > 1;
        for (index, value) in results.into_iter().enumerate() {
            let label = if many { format!("{label}#{index}") } else { label.clone() };
            out.push(Document { label, value: Some(value) });
        }
        Ok(())
    }
}

impl CheckCmd {
    fn types(&self) -> Result<Types> {
        let config = match self.config.as_ref() {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        Ok(Types::with_config(config.with_env_overrides()?)?)
    }

    fn run(&self) -> Result<bool> {
        let types = self.types()?;
        let annotation = self.annotation.annotation.as_str();
        if !types.config().enabled {
            eprintln!("{}", "validation disabled, nothing checked".yellow());
            return Ok(true);
        }
        let validator = types
            .compile(annotation)
            .with_context(|| format!("invalid annotation `{annotation}`"))?;

        let documents = self.input_settings.load()?;
        if documents.is_empty() {
            bail!("no input documents");
        }
        let verdicts: Vec<Verdict> = documents
            .par_iter()
            .map(|doc| match validator.validate(doc.value.as_ref()) {
                Ok(()) => Verdict::Pass,
                Err(error) => Verdict::Fail(error.messages().into_vec()),
            })
            .collect();

        let mut failed = 0usize;
        for (doc, verdict) in documents.iter().zip(&verdicts) {
            match verdict {
                Verdict::Pass => {
                    if !self.failures_only {
                        println!("{} {}", "✔".green(), doc.label);
                    }
                }
                Verdict::Fail(messages) => {
                    failed += 1;
                    println!("{} {}", "✘".red(), doc.label.bold());
                    for message in messages {
                        println!("    {message}");
                    }
                }
            }
        }

        let total = documents.len();
        let summary = format!("{}/{total} documents match `{annotation}`", total - failed);
        if failed == 0 {
            eprintln!("{}", summary.green());
        } else {
            eprintln!("{}", summary.red());
        }
        Ok(failed == 0)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// `Ok(false)` when at least one document did not match.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Ast(target) => {
                let node = duck_types::parse(&target.annotation)?;
                println!("{}", serde_json::to_string_pretty(&node)?);
                Ok(true)
            }
            Command::Tokens(target) => {
                for token in duck_types::lexer::tokenize(&target.annotation)? {
                    println!("{token}");
                }
                Ok(true)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(p) => {
                        matched_any = true;
                        out.push(p);
                    }
                    Err(e) => return Err(Box::new(e)),
                }
            }
            if !matched_any {
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
