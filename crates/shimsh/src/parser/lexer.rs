//! Word lexer for a single command
//!
//! POSIX-shell word splitting: whitespace separates words, single quotes are
//! literal, double quotes honor `\"` and `\\`, and a backslash outside quotes
//! escapes the next character. Operators (`;`, `&&`, `||`, `|`) are split off
//! before this runs, so they are ordinary characters here.

use crate::error::{Error, Result};

/// A word produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Text with quotes removed and escapes applied
    pub text: String,
    /// True if any part of the word was quoted or escaped
    pub quoted: bool,
}

impl Word {
    /// A bare word equal to `op`, i.e. an operator the user actually typed.
    pub fn is_operator(&self, op: &str) -> bool {
        !self.quoted && self.text == op
    }
}

#[derive(Clone, Copy)]
enum Quote {
    None,
    Single,
    Double,
}

/// Lexer for one command's text.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    /// Split the whole input into words.
    pub fn words(mut self) -> Result<Vec<Word>> {
        let mut words = Vec::new();
        while let Some(word) = self.next_word()? {
            words.push(word);
        }
        Ok(words)
    }

    fn next_word(&mut self) -> Result<Option<Word>> {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
        if self.chars.peek().is_none() {
            return Ok(None);
        }

        let mut text = String::new();
        let mut quoted = false;
        let mut quote = Quote::None;

        loop {
            match quote {
                Quote::None => match self.chars.next() {
                    None => break,
                    Some(c) if c.is_whitespace() => break,
                    Some('\'') => {
                        quoted = true;
                        quote = Quote::Single;
                    }
                    Some('"') => {
                        quoted = true;
                        quote = Quote::Double;
                    }
                    Some('\\') => {
                        let escaped = self
                            .chars
                            .next()
                            .ok_or_else(|| Error::Parse("No escaped character".to_string()))?;
                        quoted = true;
                        text.push(escaped);
                    }
                    Some(c) => text.push(c),
                },
                Quote::Single => match self.chars.next() {
                    None => return Err(Error::Parse("No closing quotation".to_string())),
                    Some('\'') => quote = Quote::None,
                    Some(c) => text.push(c),
                },
                Quote::Double => match self.chars.next() {
                    None => return Err(Error::Parse("No closing quotation".to_string())),
                    Some('"') => quote = Quote::None,
                    Some('\\') => match self.chars.next_if(|c| *c == '"' || *c == '\\') {
                        Some(escaped) => text.push(escaped),
                        None => text.push('\\'),
                    },
                    Some(c) => text.push(c),
                },
            }
        }

        Ok(Some(Word { text, quoted }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        Lexer::new(input)
            .words()
            .unwrap()
            .into_iter()
            .map(|w| w.text)
            .collect()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(texts("echo  hello\tworld "), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_quotes_group_words() {
        assert_eq!(
            texts(r#"echo "hello world" 'a b' c"d e"f"#),
            vec!["echo", "hello world", "a b", "cd ef"]
        );
    }

    #[test]
    fn test_empty_quotes_make_empty_word() {
        assert_eq!(texts("echo '' \"\""), vec!["echo", "", ""]);
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(texts(r#"echo a\ b "x\"y" "p\q""#), vec!["echo", "a b", "x\"y", "p\\q"]);
        assert_eq!(texts(r"echo 'no\escape'"), vec!["echo", "no\\escape"]);
    }

    #[test]
    fn test_unclosed_quote_is_error() {
        let err = Lexer::new("echo 'oops").words().unwrap_err();
        assert!(err.to_string().contains("No closing quotation"));
        assert!(Lexer::new("echo \"oops").words().is_err());
    }

    #[test]
    fn test_trailing_backslash_is_error() {
        assert!(Lexer::new("echo oops\\").words().is_err());
    }

    #[test]
    fn test_quoted_operator_is_not_operator() {
        let words = Lexer::new("echo '>' >").words().unwrap();
        assert!(!words[1].is_operator(">"));
        assert!(words[2].is_operator(">"));
    }

    #[test]
    fn test_glued_redirect_stays_one_word() {
        assert_eq!(texts("echo hi >out.txt"), vec!["echo", "hi", ">out.txt"]);
    }
}
