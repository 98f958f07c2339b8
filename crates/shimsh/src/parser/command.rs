//! A single command: argv plus an optional output redirection

use super::expand::Expander;
use super::lexer::Lexer;
use crate::error::Result;

/// Output redirection parsed from `> target` or `>> target`.
///
/// The target is still the raw word; it goes through the jail before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Target path as typed (after expansion)
    pub target: String,
    /// `>>` rather than `>`
    pub append: bool,
}

/// A command ready for dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command name followed by its arguments
    pub argv: Vec<String>,
    /// Output redirection, if any
    pub redirect: Option<Redirect>,
}

impl ParsedCommand {
    /// Split, expand and pull out redirections.
    ///
    /// Every unquoted `>`/`>>` word and the word after it are removed from
    /// argv. The last operator wins; one with nothing after it means no
    /// redirection.
    pub fn parse(text: &str, expander: &Expander<'_>) -> Result<Self> {
        let words = Lexer::new(text).words()?;

        let mut argv = Vec::with_capacity(words.len());
        let mut redirect = None;
        let mut words = words.into_iter();

        while let Some(word) = words.next() {
            let append = if word.is_operator(">>") {
                true
            } else if word.is_operator(">") {
                false
            } else {
                argv.push(expander.expand(&word.text));
                continue;
            };

            redirect = words.next().map(|target| Redirect {
                target: expander.expand(&target.text),
                append,
            });
        }

        Ok(Self { argv, redirect })
    }

    /// Command name, if there is one.
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// True when there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}
