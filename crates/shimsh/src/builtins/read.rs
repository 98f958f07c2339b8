//! read builtin - read one line into variables
//!
//! The line comes from the session's [`InputSource`] (the terminal in the
//! CLI) or, when a file operand is given, from the first line of that file.
//! An operand containing `/` is a file. Piped output reaches `read` through
//! `-`, which becomes an absolute path: `echo hi | read NAME -`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Builtin, Context, is_valid_name};
use crate::error::{Error, Result};
use crate::interpreter::CommandResult;

const USAGE: &str = "read: usage: read [-r] [-p prompt] [name ...] [file]\n";

/// Where interactive input for `read` comes from.
#[async_trait]
pub trait InputSource: Send + Sync {
    /// Show `prompt` and return one line without its newline.
    ///
    /// `None` means end of input.
    async fn read_line(&self, prompt: &str) -> Result<Option<String>>;
}

/// No interactive input: every read hits end of input.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

#[async_trait]
impl InputSource for NoInput {
    async fn read_line(&self, _prompt: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Canned lines handed out in order. Prompts are ignored.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: Mutex<VecDeque<String>>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Mutex::new(lines.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn read_line(&self, _prompt: &str) -> Result<Option<String>> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| Error::Internal("input lock poisoned".to_string()))?;
        Ok(lines.pop_front())
    }
}

/// read builtin - read a line into variables.
///
/// Usage: read [-r] [-p PROMPT] [NAME...] [FILE]
///
/// With no names the line goes to `REPLY` and is echoed back. With names,
/// words are assigned in order and the last name takes the rest of the line.
/// End of input exits 1.
pub struct Read;

#[async_trait]
impl Builtin for Read {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut prompt = String::new();
        let mut names: Vec<&str> = Vec::new();
        let mut file = None;

        let args: &[String] = ctx.args;
        let mut args = args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-r" => {}
                "-p" => match args.next() {
                    Some(p) => prompt = p.clone(),
                    None => {
                        return Ok(CommandResult::err(
                            format!("read: -p: option requires an argument\n{USAGE}"),
                            2,
                        ));
                    }
                },
                a if a.starts_with('-') && a.len() > 1 => {
                    return Ok(CommandResult::err(
                        format!("read: {a}: invalid option\n{USAGE}"),
                        2,
                    ));
                }
                a if a.contains('/') && file.is_none() => file = Some(a),
                a if a.contains('/') => return Ok(CommandResult::err(USAGE, 2)),
                a if is_valid_name(a) => names.push(a),
                a => {
                    return Ok(CommandResult::err(
                        format!("read: `{a}': not a valid identifier\n"),
                        1,
                    ));
                }
            }
        }

        ctx.log(format!("shimsh: read prompt='{prompt}'"));

        let line = match file {
            Some(raw) => {
                let path = ctx.resolve(raw).await;
                match ctx.fs.read_file(path.host()).await {
                    Ok(bytes) => {
                        let text = String::from_utf8_lossy(&bytes);
                        text.lines().next().map(str::to_string)
                    }
                    Err(e) => {
                        return Ok(CommandResult::err(
                            format!("read: {raw}: {}\n", e.reason()),
                            1,
                        ));
                    }
                }
            }
            None => match ctx.input.read_line(&prompt).await {
                Ok(line) => line,
                Err(e) => return Ok(CommandResult::err(format!("read: {}\n", e.reason()), 1)),
            },
        };
        let Some(line) = line else {
            return Ok(CommandResult::err("", 1));
        };

        if names.is_empty() {
            ctx.session
                .variables
                .insert("REPLY".to_string(), line.clone());
            return Ok(CommandResult::ok(format!("{line}\n")));
        }

        let mut rest = line.trim_start();
        let last = names.len() - 1;
        for (i, name) in names.iter().enumerate() {
            let value = if i == last {
                rest.trim_end()
            } else {
                let (word, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                rest = tail.trim_start();
                word
            };
            ctx.session
                .variables
                .insert(name.to_string(), value.to_string());
        }
        Ok(CommandResult::ok(""))
    }
}
