//! echo builtin command

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// The echo builtin command.
///
/// Joins its arguments with single spaces. Leading `-n` drops the trailing
/// newline and `-e` turns on backslash escapes.
pub struct Echo;

#[async_trait]
impl Builtin for Echo {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut newline = true;
        let mut escapes = false;
        let mut words = ctx.args;

        while let Some((first, rest)) = words.split_first() {
            match first.as_str() {
                "-n" => newline = false,
                "-e" => escapes = true,
                "-E" => escapes = false,
                _ => break,
            }
            words = rest;
        }

        let mut output = words.join(" ");
        if escapes {
            output = unescape(&output);
        }
        if newline {
            output.push('\n');
        }

        ctx.log(format!("shimsh: echo {}", words.join(" ")));
        Ok(CommandResult::ok(output))
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('a') => out.push('\x07'),
            Some('e') => out.push('\x1b'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
