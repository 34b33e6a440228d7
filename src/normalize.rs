//! Token tree → canonical AST.
//!
//! Every group is normalized bottom-up: children first, then an ordered
//! pipeline of marker passes runs over the current level. Each pass consumes
//! the level and returns a new one, so no pass ever sees indices shifted by
//! another and no pattern produced by a later pass is revisited by an
//! earlier one.
//!
//! Pass order (binding strength, strongest first):
//!
//! 1. exact shape `{| … |}`
//! 2. shape `{ … }`
//! 3. `Array<T>`
//! 4. tuple `[T, …]`
//! 5. array suffix `T[]`
//! 6. optional `?T`
//! 7. intersection `&`
//! 8. union `|` (a comma ends the chain)
//! 9. commas dropped
//! 10. `key: T` pairs turn the whole level into a shape body
use indexmap::IndexMap;

use crate::ast::{Indexer, Node, Property, Shape};
use crate::error::{Error, Result};
use crate::token::{self, Token};
use crate::tree::Tree;

/// Intermediate slot of a level under normalization.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// Structural token not consumed yet.
    Marker(Token),
    Leaf(String),
    /// Plain parenthesized sequence; a union unless a marker claims it.
    Group(Vec<Slot>),
    Node(Node),
    /// A level made of `key: T` pairs, waiting for its shape marker.
    Body(ShapeBody),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ShapeBody {
    properties: IndexMap<String, Property>,
    indexer: Option<Indexer>,
}

impl Slot {
    fn is_marker(&self) -> bool {
        matches!(self, Slot::Marker(_))
    }

    fn is_nested(&self) -> bool {
        matches!(self, Slot::Group(_) | Slot::Node(_) | Slot::Body(_))
    }
}

pub fn normalize(tree: Vec<Tree>) -> Result<Node> {
    if tree.is_empty() {
        return Err(Error::conflict("unexpected empty AST"));
    }
    into_node(normalize_level(tree)?)
}

fn normalize_level(items: Vec<Tree>) -> Result<Slot> {
    let level = items
        .into_iter()
        .map(|item| match item {
            Tree::Group(children) => normalize_level(children),
            Tree::Token(Token::Word(word)) => Ok(Slot::Leaf(word)),
            Tree::Token(marker) => Ok(Slot::Marker(marker)),
        })
        .collect::<Result<Vec<_>>>()?;

    let level = resolve_prefix(level, Token::ExactShape, |next| shape(next, true))?;
    let level = resolve_prefix(level, Token::Shape, |next| shape(next, false))?;
    let level = resolve_prefix(level, Token::ArrayOf, |next| {
        Ok(Node::Array(Box::new(into_node(next)?)))
    })?;
    let level = resolve_prefix(level, Token::Tuple, tuple)?;
    let level = resolve_array_suffix(level)?;
    reject_optional_keys(&level)?;
    let level = resolve_prefix(level, Token::Optional, |next| Ok(Node::nullable(into_node(next)?)))?;
    let level = fold_operator(level, Token::Intersection)?;
    let mut level = fold_operator(level, Token::Union)?;
    level.retain(|slot| *slot != Slot::Marker(Token::Comma));

    if level.contains(&Slot::Marker(Token::Colon)) {
        return Ok(Slot::Body(key_value_pairs(level)?));
    }
    if level.len() == 1 && level[0].is_nested() {
        if let Some(only) = level.pop() {
            return Ok(only);
        }
    }
    Ok(Slot::Group(level))
}

/// Replaces `marker next` with the node built from `next`.
fn resolve_prefix(
    level: Vec<Slot>,
    marker: Token,
    build: impl Fn(Slot) -> Result<Node>,
) -> Result<Vec<Slot>> {
    let mut out = Vec::with_capacity(level.len());
    let mut slots = level.into_iter();
    while let Some(slot) = slots.next() {
        match slot {
            Slot::Marker(ref token) if *token == marker => {
                let next = slots
                    .next()
                    .ok_or_else(|| Error::syntax(format!("`{marker}` must be followed by a type")))?;
                out.push(Slot::Node(build(next)?));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn shape(body: Slot, exact: bool) -> Result<Node> {
    let ShapeBody { properties, indexer } = match body {
        Slot::Body(body) => body,
        Slot::Group(items) if items.is_empty() => ShapeBody::default(),
        other => {
            return Err(Error::syntax(format!(
                "shape expects `key: type` pairs, got {}",
                describe(&other)
            )));
        }
    };
    Ok(Node::Shape(Shape { exact, properties, indexer }))
}

fn tuple(members: Slot) -> Result<Node> {
    match members {
        Slot::Group(items) => Ok(Node::Tuple(
            items.into_iter().map(into_node).collect::<Result<_>>()?,
        )),
        Slot::Body(_) => Err(Error::NotImplemented("labeled tuple members are not supported".into())),
        single => Ok(Node::Tuple(vec![into_node(single)?])),
    }
}

/// `T[]` wraps the preceding slot. `*[]` keeps its legacy reading: the
/// marker becomes the plain `array` leaf next to `*`.
fn resolve_array_suffix(level: Vec<Slot>) -> Result<Vec<Slot>> {
    let mut out: Vec<Slot> = Vec::with_capacity(level.len());
    for slot in level {
        if slot != Slot::Marker(Token::ArraySuffix) {
            out.push(slot);
            continue;
        }
        match out.pop() {
            Some(Slot::Leaf(name)) if name == token::EXISTENTIAL => {
                out.push(Slot::Leaf(name));
                out.push(Slot::Leaf("array".into()));
            }
            Some(previous) if !previous.is_marker() => {
                out.push(Slot::Node(Node::Array(Box::new(into_node(previous)?))));
            }
            _ => return Err(Error::syntax("`[]` must follow a type")),
        }
    }
    Ok(out)
}

/// `?key:` would otherwise read as a nullable type used as the indexer key.
fn reject_optional_keys(level: &[Slot]) -> Result<()> {
    for window in level.windows(3) {
        if let [Slot::Marker(Token::Optional), key, Slot::Marker(Token::Colon)] = window {
            if !key.is_marker() {
                return Err(Error::syntax(format!(
                    "unexpected syntax error; did you misplace `?` on an object property? \
                     Object properties must be written `{{ key?: string }}`, found `?` before {}",
                    describe(key)
                )));
            }
        }
    }
    Ok(())
}

/// Left fold of a binary operator: `a op b op c` becomes one n-ary node.
/// Any slot that is not an operator or its right operand ends the chain.
fn fold_operator(level: Vec<Slot>, operator: Token) -> Result<Vec<Slot>> {
    let dangling = || Error::syntax(format!("dangling `{operator}`"));
    let close = |members: Vec<Node>| match operator {
        Token::Intersection => Slot::Node(Node::Intersection(members)),
        _ => Slot::Node(Node::Union(members)),
    };

    let mut out: Vec<Slot> = Vec::with_capacity(level.len());
    let mut chain: Option<Vec<Node>> = None;
    let mut awaiting_operand = false;

    for slot in level {
        if slot == Slot::Marker(operator.clone()) {
            if awaiting_operand {
                return Err(dangling());
            }
            if chain.is_none() {
                let left = out.pop().filter(|left| !left.is_marker()).ok_or_else(dangling)?;
                chain = Some(vec![into_node(left)?]);
            }
            awaiting_operand = true;
            continue;
        }
        if awaiting_operand {
            if slot.is_marker() {
                return Err(dangling());
            }
            if let Some(members) = chain.as_mut() {
                members.push(into_node(slot)?);
            }
            awaiting_operand = false;
            continue;
        }
        if let Some(members) = chain.take() {
            out.push(close(members));
        }
        out.push(slot);
    }

    if awaiting_operand {
        return Err(dangling());
    }
    if let Some(members) = chain {
        out.push(close(members));
    }
    Ok(out)
}

/// Groups `key : value…` runs. Quoted keys are properties (a masked `?`
/// marks them optional); any other key is the indexer key.
fn key_value_pairs(level: Vec<Slot>) -> Result<ShapeBody> {
    let mut entries: Vec<(Slot, Vec<Slot>)> = Vec::new();
    let mut slots = level.into_iter().peekable();

    while let Some(slot) = slots.next() {
        if slot == Slot::Marker(Token::Colon) {
            return Err(Error::syntax("expected a property key before `:`"));
        }
        if slots.next_if_eq(&Slot::Marker(Token::Colon)).is_some() {
            entries.push((slot, Vec::new()));
            continue;
        }
        match entries.last_mut() {
            Some((_, values)) => values.push(slot),
            None => {
                return Err(Error::syntax(format!(
                    "expected `key: type`, found {} before the first key",
                    describe(&slot)
                )));
            }
        }
    }

    let mut body = ShapeBody::default();
    for (key, mut values) in entries {
        let value = match values.len() {
            0 => return Err(Error::syntax(format!("missing type for {}", describe(&key)))),
            1 => values.pop().map(into_node).transpose()?,
            _ => Some(into_node(Slot::Group(values))?),
        };
        let Some(ty) = value else { continue };

        match key {
            Slot::Leaf(raw) if is_quoted(&raw) => {
                let optional = raw.contains(token::OPTIONAL_KEY);
                let name = property_name(&raw);
                if body.properties.contains_key(&name) {
                    return Err(Error::conflict(format!("duplicate property `{name}`")));
                }
                body.properties.insert(name, Property { optional, ty });
            }
            other => {
                if body.indexer.is_some() {
                    return Err(Error::conflict("more than one indexer property"));
                }
                body.indexer = Some(Indexer {
                    key: Box::new(into_node(other)?),
                    value: Box::new(ty),
                });
            }
        }
    }
    Ok(body)
}

fn into_node(slot: Slot) -> Result<Node> {
    match slot {
        Slot::Leaf(name) => Ok(Node::Leaf(name)),
        Slot::Node(node) => Ok(node),
        Slot::Group(mut items) => match items.len() {
            0 => Err(Error::syntax("unexpected `()` or missing `,` where a type is expected")),
            1 => match items.pop() {
                Some(only) => into_node(only),
                None => Err(Error::syntax("unexpected `()`")),
            },
            _ => Ok(Node::Union(items.into_iter().map(into_node).collect::<Result<_>>()?)),
        },
        Slot::Body(_) => Err(Error::conflict(
            "empty AST: `key: type` pairs must be wrapped in `{ }` or `{| |}`",
        )),
        Slot::Marker(token) => Err(Error::syntax(format!("unexpected `{token}`"))),
    }
}

fn is_quoted(raw: &str) -> bool {
    raw.starts_with('"') || raw.starts_with('\'')
}

fn property_name(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == token::OPTIONAL_KEY)
        .to_string()
}

fn describe(slot: &Slot) -> String {
    match slot {
        Slot::Marker(token) => format!("`{token}`"),
        Slot::Leaf(name) => format!("`{name}`"),
        Slot::Group(_) => "a group".into(),
        Slot::Node(_) => "a type".into(),
        Slot::Body(_) => "`key: type` pairs".into(),
    }
}
