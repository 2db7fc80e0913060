//! Token sequences produced from command text.
//!
//! The default tokenizer splits on runs of whitespace and drops empty
//! fields. Custom parsers build a [`Tokens`] through [`Tokens::new`] so the
//! raw text always travels with the split form.

use std::ops::Index;
use std::slice::Iter;

/// An immutable, ordered sequence of command tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    raw: String,
    toks: Vec<String>,
}

/// Splits `text` on runs of whitespace.
///
/// Never fails. Empty or whitespace-only input yields an empty sequence.
///
/// ```rust
/// use herald_core::tokenize;
///
/// let toks = tokenize("  echo   hello world ");
/// assert_eq!(toks.as_slice(), ["echo", "hello", "world"]);
/// ```
pub fn tokenize(text: &str) -> Tokens {
    Tokens {
        raw: text.to_string(),
        toks: text.split_whitespace().map(str::to_string).collect(),
    }
}

impl Tokens {
    /// Creates a token sequence from an already-split list.
    pub fn new(raw: impl Into<String>, toks: Vec<String>) -> Self {
        Self {
            raw: raw.into(),
            toks,
        }
    }

    /// The text the tokens were produced from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.toks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toks.is_empty()
    }

    /// Returns the token at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.toks.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.toks
    }

    pub fn iter(&self) -> Iter<'_, String> {
        self.toks.iter()
    }

    /// Splits into the leading `depth` tokens and the rest.
    ///
    /// `depth` is clamped to the sequence length.
    pub fn split_at(&self, depth: usize) -> (&[String], &[String]) {
        self.toks.split_at(depth.min(self.toks.len()))
    }
}

impl Index<usize> for Tokens {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.toks[index]
    }
}

impl<'a> IntoIterator for &'a Tokens {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.toks.iter()
    }
}

impl From<&str> for Tokens {
    fn from(text: &str) -> Self {
        tokenize(text)
    }
}
