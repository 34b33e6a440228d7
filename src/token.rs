//! Lexer output: structural markers and leaf words.
use std::fmt;

use serde::Serialize;

// Sentinels the lexer rewrites surface syntax into. They are reserved and may
// only appear inside quoted literals.
pub const EXACT_SHAPE: char = '#';
pub const SHAPE: char = '@';
pub const TUPLE: char = '^';
pub const ARRAY_SUFFIX: char = '$';
pub const ARRAY_OF: char = '~';

pub const RESERVED: [char; 5] = [EXACT_SHAPE, SHAPE, TUPLE, ARRAY_SUFFIX, ARRAY_OF];

/// Masks the `?` of an optional key (`key?:`) so it is not read as the
/// optional-type operator.
pub const OPTIONAL_KEY: char = '¿';

/// Name of the existential type.
pub const EXISTENTIAL: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    Open,
    Close,
    Union,
    Intersection,
    Optional,
    Comma,
    Colon,
    /// `{| … |}`
    ExactShape,
    /// `{ … }`
    Shape,
    /// `Array<…>`
    ArrayOf,
    /// `[ … ]`
    Tuple,
    /// `T[]`
    ArraySuffix,
    /// Identifier, quoted key or literal.
    Word(String),
}

impl Token {
    /// Maps a separator character to its marker; `None` for word characters.
    pub fn separator(c: char) -> Option<Self> {
        let token = match c {
            '(' => Self::Open,
            ')' => Self::Close,
            '|' => Self::Union,
            '&' => Self::Intersection,
            '?' => Self::Optional,
            ',' => Self::Comma,
            ':' => Self::Colon,
            EXACT_SHAPE => Self::ExactShape,
            SHAPE => Self::Shape,
            ARRAY_OF => Self::ArrayOf,
            TUPLE => Self::Tuple,
            ARRAY_SUFFIX => Self::ArraySuffix,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
            Self::Union => f.write_str("|"),
            Self::Intersection => f.write_str("&"),
            Self::Optional => f.write_str("?"),
            Self::Comma => f.write_str(","),
            Self::Colon => f.write_str(":"),
            Self::ExactShape => f.write_str("{|"),
            Self::Shape => f.write_str("{"),
            Self::ArrayOf => f.write_str("Array<"),
            Self::Tuple => f.write_str("["),
            Self::ArraySuffix => f.write_str("[]"),
            Self::Word(word) => f.write_str(word),
        }
    }
}
