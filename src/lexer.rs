//! Annotation string → flat token sequence.
//!
//! Surface syntax is first rewritten into reserved sentinel characters
//! (`{|` → `#(`, `{` → `@(`, `T[]` → `T$`, `Array<` → `~(`, `[` → `^(`),
//! so that every bracket kind becomes a plain `( … )` group preceded by a
//! marker. Quoted literals are lifted out before any rewrite and put back
//! into their words after the rewritten string is split on the separator set.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::token::{self, Token};

/// Identifiers immediately followed by `:` are object keys; quote them so
/// they are not mistaken for leaf types.
static OBJECT_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\w¿]+):").expect("valid regex"));

/// `[name: K]:` (after key quoting, braces already rewritten).
static NAMED_INDEXER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]]*:[^\[\]]*\]:").expect("valid regex"));

/// `[K]:` → `K:`; an unquoted key is later read as the shape indexer.
static UNNAMED_INDEXER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]:").expect("valid regex"));

/// Stands in for a quoted literal while the source is rewritten. Private use
/// code point, so never a word character or separator.
const LITERAL_SLOT: char = '\u{E000}';

static SLOT_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x{E000}(\d+)\x{E000}").expect("valid regex"));

pub fn tokenize(annotation: &str) -> Result<Vec<Token>> {
    let source = strip_insignificant(annotation);
    let (source, literals) = lift_literals(&source)?;
    let source = trim_dangling_operators(&source);

    // Object notations
    let source = source.replace("?:", &format!("{}:", token::OPTIONAL_KEY));
    let source = OBJECT_KEY.replace_all(&source, "\"${1}\":").into_owned();
    let source = source
        .replace("{|", "#(")
        .replace("|}", ")")
        .replace('{', "@(")
        .replace('}', ")");

    if NAMED_INDEXER.is_match(&source) {
        return Err(Error::NotImplemented("naming an indexer key is not supported".into()));
    }
    let source = UNNAMED_INDEXER.replace_all(&source, "${1}:").into_owned();

    // Array and tuple notations
    let source = source
        .replace("[]", "$")
        .replace("Array<", "~(")
        .replace('>', ")")
        .replace('[', "^(")
        .replace(']', ")");

    let tokens = split(&source, &literals);
    tracing::trace!(annotation, ?tokens, "tokenized");
    Ok(tokens)
}

/// Replaces every quoted literal with a numbered slot, so the rewrites below
/// only ever see unquoted text. Reserved characters are rejected outside
/// quotes.
fn lift_literals(source: &str) -> Result<(String, Vec<String>)> {
    let mut out = String::with_capacity(source.len());
    let mut literals = Vec::new();
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            let mut literal = String::from(c);
            while let Some(next) = chars.next() {
                literal.push(next);
                if next == '\\' {
                    if let Some(escaped) = chars.next() {
                        literal.push(escaped);
                    }
                } else if next == c {
                    break;
                }
            }
            out.push(LITERAL_SLOT);
            out.push_str(&literals.len().to_string());
            out.push(LITERAL_SLOT);
            literals.push(literal);
            continue;
        }
        if c == LITERAL_SLOT || token::RESERVED.contains(&c) {
            return Err(Error::syntax(format!(
                "`{c}` is reserved; none of `#@^$~` may appear in an annotation"
            )));
        }
        out.push(c);
    }
    Ok((out, literals))
}

fn restore_literals(word: &str, literals: &[String]) -> String {
    SLOT_REF
        .replace_all(word, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| literals.get(index))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Drops `//` line comments and whitespace outside quoted literals.
fn strip_insignificant(annotation: &str) -> String {
    let mut out = String::with_capacity(annotation.len());
    let mut chars = annotation.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(open) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&next| next != '\n').is_some() {}
            }
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}

/// Leading and trailing `|`/`&` (also right after `(`, `[` and `:`) are
/// tolerated, so multi-line unions may start every line with `|`.
fn trim_dangling_operators(source: &str) -> String {
    source
        .trim_matches(|c| c == '|' || c == '&')
        .replace(":|", ":")
        .replace(":&", ":")
        .replace("[|", "[")
        .replace("[&", "[")
        .replace("(|", "(")
        .replace("(&", "(")
}

/// Splits on separators, keeping them as tokens and discarding empty words.
fn split(source: &str, literals: &[String]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(restore_literals(&std::mem::take(word), literals)));
        }
    };

    for c in source.chars() {
        match Token::separator(c) {
            Some(separator) => {
                flush(&mut word, &mut tokens);
                tokens.push(separator);
            }
            None => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(w: &str) -> Token {
        Token::Word(w.to_string())
    }

    #[test]
    fn splits_unions_and_keeps_delimiters() {
        let tokens = tokenize("string | int").unwrap();
        assert_eq!(tokens, vec![word("string"), Token::Union, word("int")]);
    }

    #[test]
    fn strips_comments_and_whitespace() {
        let tokens = tokenize("string // a comment\n  | int").unwrap();
        assert_eq!(tokens, vec![word("string"), Token::Union, word("int")]);
    }

    #[test]
    fn keeps_whitespace_and_separators_inside_literals() {
        let tokens = tokenize("'a | b' | \"c d\"").unwrap();
        assert_eq!(tokens, vec![word("'a | b'"), Token::Union, word("\"c d\"")]);
    }

    #[test]
    fn literals_survive_rewrites() {
        for literal in ["'http://x'", "'a{b}'", "'x>y'", "'t[]'", "'Array<int>'", "'a:b'", "\"{|x|}\""] {
            assert_eq!(tokenize(literal).unwrap(), vec![word(literal)], "{literal}");
        }
        assert_eq!(
            tokenize("{ url: 'http://x', tag: '#a' }").unwrap(),
            vec![
                Token::Shape,
                Token::Open,
                word("\"url\""),
                Token::Colon,
                word("'http://x'"),
                Token::Comma,
                word("\"tag\""),
                Token::Colon,
                word("'#a'"),
                Token::Close,
            ]
        );
    }

    #[test]
    fn quoted_indexer_keys() {
        assert_eq!(
            tokenize("{ ['a' | 'b']: int }").unwrap(),
            vec![
                Token::Shape,
                Token::Open,
                word("'a'"),
                Token::Union,
                word("'b'"),
                Token::Colon,
                word("int"),
                Token::Close,
            ]
        );
    }

    #[test]
    fn rewrites_shapes_and_quotes_keys() {
        let tokens = tokenize("{| foo: string, bar?: int |}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::ExactShape,
                Token::Open,
                word("\"foo\""),
                Token::Colon,
                word("string"),
                Token::Comma,
                word("\"bar¿\""),
                Token::Colon,
                word("int"),
                Token::Close,
            ]
        );

        let tokens = tokenize("{ a: int }").unwrap();
        assert_eq!(tokens[0], Token::Shape);
    }

    #[test]
    fn rewrites_arrays_and_tuples() {
        let tokens = tokenize("string[]").unwrap();
        assert_eq!(tokens, vec![word("string"), Token::ArraySuffix]);

        let tokens = tokenize("Array<int>").unwrap();
        assert_eq!(tokens, vec![Token::ArrayOf, Token::Open, word("int"), Token::Close]);

        let tokens = tokenize("[int, string]").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tuple, Token::Open, word("int"), Token::Comma, word("string"), Token::Close]
        );
    }

    #[test]
    fn unnamed_indexer_becomes_unquoted_key() {
        let tokens = tokenize("{ [string]: int }").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Shape, Token::Open, word("string"), Token::Colon, word("int"), Token::Close]
        );
    }

    #[test]
    fn named_indexer_is_not_implemented() {
        let err = tokenize("{ [key: string]: int }").unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)), "{err:?}");
    }

    #[test]
    fn reserved_characters_are_rejected() {
        for annotation in ["#", "a@b", "^int", "$", "~x", "a\u{E000}0\u{E000}"] {
            let err = tokenize(annotation).unwrap_err();
            assert!(matches!(err, Error::Syntax(_)), "{annotation}: {err:?}");
        }
    }

    #[test]
    fn dangling_edge_operators_are_trimmed() {
        assert_eq!(tokenize("| int | string |").unwrap(), tokenize("int|string").unwrap());
        assert_eq!(tokenize("& int").unwrap(), vec![word("int")]);
        assert_eq!(tokenize("{ a: | 'x' | 'y' }").unwrap(), tokenize("{a:'x'|'y'}").unwrap());
    }

    #[test]
    fn empty_annotation_has_no_tokens() {
        assert!(tokenize("  // nothing here").unwrap().is_empty());
    }
}
