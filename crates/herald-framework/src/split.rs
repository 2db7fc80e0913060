//! Shell-style command splitting.
//!
//! [`ShellParser`] is a ready-made [`CommandParser`] for commands whose
//! arguments may contain spaces:
//!
//! ```rust,ignore
//! let route = Route::new().alias("say").parser(ShellParser).handler(say);
//! // `say "hello world" again` -> alias ["say"], args ["hello world", "again"]
//! ```

use herald_core::Tokens;
use thiserror::Error;

use crate::error::BoxError;
use crate::handler::CommandParser;

/// Errors from [`shell_split`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellSplitError {
    /// A quote was opened and never closed.
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    /// The input ended right after a backslash.
    #[error("trailing escape character")]
    TrailingEscape,
}

/// Splits `input` on whitespace, honouring quotes.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Single-quoted strings, taken literally
/// - Double-quoted strings, where `\` escapes the next character
/// - `""` and `''` as explicit empty arguments
pub fn shell_split(input: &str) -> Result<Vec<String>, ShellSplitError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match (quote, ch) {
            (Some('"'), '\\') => escape_next = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if escape_next {
        return Err(ShellSplitError::TrailingEscape);
    }
    if let Some(q) = quote {
        return Err(ShellSplitError::UnterminatedQuote(q));
    }
    if in_token {
        args.push(current);
    }

    Ok(args)
}

/// A [`CommandParser`] backed by [`shell_split`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellParser;

impl CommandParser for ShellParser {
    fn parse(&self, command: &str) -> Result<Tokens, BoxError> {
        let toks = shell_split(command)?;
        Ok(Tokens::new(command, toks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_split_simple() {
        let args = shell_split("echo hello world").unwrap();
        assert_eq!(args, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_shell_split_quoted() {
        let args = shell_split(r#"echo "hello world" test"#).unwrap();
        assert_eq!(args, vec!["echo", "hello world", "test"]);
    }

    #[test]
    fn test_shell_split_single_quoted() {
        let args = shell_split(r#"echo 'say "hi"' test"#).unwrap();
        assert_eq!(args, vec!["echo", r#"say "hi""#, "test"]);
    }

    #[test]
    fn test_shell_split_escape_in_double_quotes() {
        let args = shell_split(r#"echo "a \"b\" c""#).unwrap();
        assert_eq!(args, vec!["echo", r#"a "b" c"#]);
    }

    #[test]
    fn test_shell_split_empty_quotes() {
        let args = shell_split(r#"set name """#).unwrap();
        assert_eq!(args, vec!["set", "name", ""]);
    }

    #[test]
    fn test_shell_split_errors() {
        assert_eq!(
            shell_split(r#"echo "oops"#),
            Err(ShellSplitError::UnterminatedQuote('"'))
        );
        assert_eq!(
            shell_split(r#"echo "oops\"#),
            Err(ShellSplitError::TrailingEscape)
        );
    }

    #[test]
    fn test_shell_parser_keeps_raw() {
        let toks = ShellParser.parse("say 'a b'").unwrap();
        assert_eq!(toks.as_slice(), ["say", "a b"]);
        assert_eq!(toks.raw(), "say 'a b'");
        assert!(ShellParser.parse("say 'a b").is_err());
    }
}
