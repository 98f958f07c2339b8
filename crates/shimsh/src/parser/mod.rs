//! Command-line parsing
//!
//! A line is taken apart in three layers:
//! 1. [`tokenize`] splits on `;`, `&&`, `||`
//! 2. [`split_pipes`] splits each command on `|`
//! 3. [`ParsedCommand::parse`] splits a stage into words, expands variables
//!    and extracts the `>`/`>>` redirection

mod command;
mod expand;
mod lexer;
mod sequence;

pub use command::{ParsedCommand, Redirect};
pub use expand::{Expander, expand};
pub use lexer::{Lexer, Word};
pub use sequence::{Operator, SequenceToken, split_pipes, tokenize};
