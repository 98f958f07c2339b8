//! Splitting a line on `;`, `&&`, `||` and `|`
//!
//! Neither splitter looks at quotes: `echo 'a;b'` is two commands and
//! `echo 'a|b'` is a two-stage pipe. Word splitting inside a command is
//! quote-aware.

use std::fmt;

/// Operator between two commands on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `;` always continue
    Seq,
    /// `&&` continue only after success
    And,
    /// `||` continue only after failure
    Or,
}

impl Operator {
    /// Whether evaluation carries on past this operator given the exit code
    /// of the command before it.
    pub fn continues_after(self, exit_code: i32) -> bool {
        match self {
            Operator::Seq => true,
            Operator::And => exit_code == 0,
            Operator::Or => exit_code != 0,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Seq => ";",
            Operator::And => "&&",
            Operator::Or => "||",
        })
    }
}

/// Either a command's text or the operator after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceToken {
    Command(String),
    Operator(Operator),
}

/// Tokenize a line into commands and operators, left to right.
///
/// `&&` and `||` are matched before `;`. Empty commands are dropped, so
/// `;;` yields two operators and no command between them.
pub fn tokenize(line: &str) -> Vec<SequenceToken> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let bytes = line.as_bytes();

    while i < bytes.len() {
        let (op, width) = match (bytes[i], bytes.get(i + 1)) {
            (b'&', Some(b'&')) => (Operator::And, 2),
            (b'|', Some(b'|')) => (Operator::Or, 2),
            (b';', _) => (Operator::Seq, 1),
            _ => {
                i += 1;
                continue;
            }
        };
        flush(&line[start..i], &mut tokens);
        tokens.push(SequenceToken::Operator(op));
        i += width;
        start = i;
    }
    flush(&line[start..], &mut tokens);

    tokens
}

fn flush(text: &str, tokens: &mut Vec<SequenceToken>) {
    let text = text.trim();
    if !text.is_empty() {
        tokens.push(SequenceToken::Command(text.to_string()));
    }
}

/// Split a command on every `|`, trimming each stage.
pub fn split_pipes(line: &str) -> Vec<String> {
    line.split('|').map(|s| s.trim().to_string()).collect()
}
