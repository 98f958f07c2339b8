//! grep - Pattern matching builtin
//!
//! Matches literal substrings by default; `-E` switches to regular
//! expressions (regex crate syntax).
//!
//! Usage:
//!   grep pattern file...
//!   grep -i pattern file        # case insensitive
//!   grep -v pattern file        # invert match
//!   grep -n pattern file        # show line numbers
//!   grep -c pattern file        # count matches
//!   grep -E pattern file        # regular expression

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

#[derive(Default)]
struct GrepOptions {
    ignore_case: bool,
    invert: bool,
    line_numbers: bool,
    count: bool,
    extended: bool,
}

/// The grep builtin.
pub struct Grep;

#[async_trait]
impl Builtin for Grep {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut opts = GrepOptions::default();
        let mut positional: Vec<&str> = Vec::new();
        for arg in ctx.args {
            match arg.strip_prefix('-') {
                Some(letters) if !letters.is_empty() && positional.is_empty() => {
                    for c in letters.chars() {
                        match c {
                            'i' => opts.ignore_case = true,
                            'v' => opts.invert = true,
                            'n' => opts.line_numbers = true,
                            'c' => opts.count = true,
                            'E' => opts.extended = true,
                            'F' => opts.extended = false,
                            _ => {
                                return Ok(CommandResult::err(
                                    format!("grep: invalid option -- '{c}'\n"),
                                    2,
                                ));
                            }
                        }
                    }
                }
                _ => positional.push(arg),
            }
        }

        let [pattern, files @ ..] = positional.as_slice() else {
            return Ok(usage());
        };
        if files.is_empty() {
            return Ok(usage());
        }

        let matcher = match build_matcher(pattern, &opts) {
            Ok(re) => re,
            Err(e) => {
                return Ok(CommandResult::err(format!("grep: {e}\n"), 2));
            }
        };

        let mut output = String::new();
        let mut matched_any = false;
        let mut failed = false;
        let show_names = files.len() > 1;

        for file in files {
            let path = ctx.resolve(file).await;
            let content = match ctx.fs.read_file(path.host()).await {
                Ok(content) => String::from_utf8_lossy(&content).into_owned(),
                Err(e) => {
                    output.push_str(&format!("grep: {file}: {}\n", e.reason()));
                    failed = true;
                    continue;
                }
            };

            let prefix = if show_names {
                format!("{file}:")
            } else {
                String::new()
            };
            let mut count = 0;
            for (i, line) in content.lines().enumerate() {
                if matcher.is_match(line) == opts.invert {
                    continue;
                }
                count += 1;
                if opts.count {
                    continue;
                }
                output.push_str(&prefix);
                if opts.line_numbers {
                    output.push_str(&format!("{}:", i + 1));
                }
                output.push_str(line);
                output.push('\n');
            }
            if opts.count {
                output.push_str(&format!("{prefix}{count}\n"));
            }
            matched_any |= count > 0;
        }

        let exit_code = if failed || !matched_any { 1 } else { 0 };
        ctx.log(format!("shimsh: grep {} -> code {exit_code}", ctx.args.join(" ")));
        Ok(CommandResult::err(output, exit_code))
    }
}

fn usage() -> CommandResult {
    CommandResult::err("usage: grep PATTERN FILE...\n", 1)
}

fn build_matcher(pattern: &str, opts: &GrepOptions) -> std::result::Result<Regex, regex::Error> {
    let source = if opts.extended {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    RegexBuilder::new(&source)
        .case_insensitive(opts.ignore_case)
        .build()
}
