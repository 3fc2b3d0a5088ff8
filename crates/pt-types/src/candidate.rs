use serde::{Deserialize, Serialize};
use std::fmt;

/// A single optimization pass name, e.g. `"instcombine"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered pass list under evaluation.
///
/// Candidates are never edited in place: the mutation helpers return a new
/// value and leave `self` untouched, so anything holding a reference (the
/// result log, the optimum store) always sees a complete list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate {
    tokens: Vec<Token>,
}

impl Candidate {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| t.as_str() == name)
    }

    /// New candidate with `extra` appended after the existing tokens.
    pub fn appended<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        let mut tokens = self.tokens.clone();
        tokens.extend(extra);
        Self { tokens }
    }

    /// New candidate without the tokens at `positions`.
    ///
    /// Out-of-range and duplicate positions are ignored.
    pub fn without_positions(&self, positions: &[usize]) -> Self {
        let mut keep = vec![true; self.tokens.len()];
        for &pos in positions {
            if let Some(slot) = keep.get_mut(pos) {
                *slot = false;
            }
        }
        let tokens = self
            .tokens
            .iter()
            .zip(keep)
            .filter_map(|(token, keep)| keep.then(|| token.clone()))
            .collect();
        Self { tokens }
    }

    /// Token names joined with `sep`.
    pub fn join(&self, sep: &str) -> String {
        self.tokens
            .iter()
            .map(Token::as_str)
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// Pass-list file encoding: one token per line, each line newline-terminated.
    pub fn to_pass_list(&self) -> String {
        let mut out = String::with_capacity(self.tokens.iter().map(|t| t.0.len() + 1).sum());
        for token in &self.tokens {
            out.push_str(token.as_str());
            out.push('\n');
        }
        out
    }

    /// Parse a pass-list file. Surrounding whitespace is trimmed and blank
    /// lines are skipped.
    pub fn parse_pass_list(text: &str) -> Self {
        let tokens = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Token::from)
            .collect();
        Self { tokens }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join(", "))
    }
}

impl FromIterator<Token> for Candidate {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for Candidate {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(Token::from).collect()
    }
}

impl<'a> IntoIterator for &'a Candidate {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
