//! Flat token sequence → nested token tree mirroring `( … )` groups.
use crate::error::{Error, Result};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Token(Token),
    Group(Vec<Tree>),
}

/// Stack machine over the token stream.
///
/// Each frame is the sequence being filled when a group was opened; the
/// insertion point of a frame is always its end, so the closed group lands in
/// the slot right after the last token of its parent.
pub fn build_tree(tokens: Vec<Token>) -> Result<Vec<Tree>> {
    let mut current: Vec<Tree> = Vec::new();
    let mut frames: Vec<Vec<Tree>> = Vec::new();

    for token in tokens {
        match token {
            Token::Open => frames.push(std::mem::take(&mut current)),
            Token::Close => {
                let parent = frames
                    .pop()
                    .ok_or_else(|| Error::syntax("unbalanced closing bracket"))?;
                let group = std::mem::replace(&mut current, parent);
                current.push(Tree::Group(group));
            }
            other => current.push(Tree::Token(other)),
        }
    }

    if !frames.is_empty() {
        return Err(Error::syntax(format!(
            "{} unclosed bracket(s) at end of annotation",
            frames.len()
        )));
    }
    Ok(current)
}
