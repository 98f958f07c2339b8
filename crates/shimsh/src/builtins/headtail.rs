//! Head and tail builtins - output first/last lines of files

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// Default number of lines to output
const DEFAULT_LINES: usize = 10;

/// The head builtin - output the first N lines of files.
///
/// Usage: head [-n NUM | -NUM] FILE...
pub struct Head;

#[async_trait]
impl Builtin for Head {
    async fn execute(&self, ctx: Context<'_>) -> Result<CommandResult> {
        run(End::Head, ctx).await
    }
}

/// The tail builtin - output the last N lines of files.
///
/// Usage: tail [-n NUM | -NUM] FILE...
pub struct Tail;

#[async_trait]
impl Builtin for Tail {
    async fn execute(&self, ctx: Context<'_>) -> Result<CommandResult> {
        run(End::Tail, ctx).await
    }
}

#[derive(Clone, Copy)]
enum End {
    Head,
    Tail,
}

impl End {
    fn name(self) -> &'static str {
        match self {
            End::Head => "head",
            End::Tail => "tail",
        }
    }

    fn select<'l, 'a>(self, lines: &'l [&'a str], count: usize) -> &'l [&'a str] {
        match self {
            End::Head => &lines[..count.min(lines.len())],
            End::Tail => &lines[lines.len().saturating_sub(count)..],
        }
    }
}

async fn run(end: End, mut ctx: Context<'_>) -> Result<CommandResult> {
    let name = end.name();
    let (count, files) = match parse_args(ctx.args) {
        Ok(parsed) => parsed,
        Err(arg) => {
            return Ok(CommandResult::err(
                format!("{name}: invalid number of lines: '{arg}'\n"),
                1,
            ));
        }
    };

    let mut output = String::new();
    let mut exit_code = 0;
    let multiple = files.len() > 1;

    for (i, file) in files.iter().enumerate() {
        let path = ctx.resolve(file).await;
        ctx.log(format!("shimsh: {name} -{count} {path}"));

        let content = match ctx.fs.read_file(path.host()).await {
            Ok(content) => String::from_utf8_lossy(&content).into_owned(),
            Err(e) => {
                output.push_str(&format!(
                    "{name}: cannot open '{file}' for reading: {}\n",
                    e.reason()
                ));
                exit_code = 1;
                continue;
            }
        };

        if multiple {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&format!("==> {file} <==\n"));
        }
        let lines: Vec<&str> = content.lines().collect();
        for line in end.select(&lines, count) {
            output.push_str(line);
            output.push('\n');
        }
    }

    Ok(CommandResult::err(output, exit_code))
}

/// Returns the line count and file operands, or the offending count text.
fn parse_args(args: &[String]) -> std::result::Result<(usize, Vec<&str>), String> {
    let mut count = DEFAULT_LINES;
    let mut files = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "-n" {
            let value = iter.next().map(String::as_str).unwrap_or("");
            count = value.parse().map_err(|_| value.to_string())?;
        } else if let Some(value) = arg.strip_prefix("-n") {
            count = value.parse().map_err(|_| value.to_string())?;
        } else if let Some(value) = arg.strip_prefix('-').filter(|v| !v.is_empty()) {
            count = value.parse().map_err(|_| value.to_string())?;
        } else {
            files.push(arg.as_str());
        }
    }

    Ok((count, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args(&strings(&["f"])), Ok((10, vec!["f"])));
        assert_eq!(parse_args(&strings(&["-3", "f"])), Ok((3, vec!["f"])));
        assert_eq!(parse_args(&strings(&["-n", "2", "f", "g"])), Ok((2, vec!["f", "g"])));
        assert_eq!(parse_args(&strings(&["-x"])), Err("x".to_string()));
    }

    #[tokio::test]
    async fn test_head_and_tail() {
        let mut shell = Shell::new();
        shell.evaluate("echo -e '1\\n2\\n3\\n4' > f").await;

        assert_eq!(shell.evaluate("head -2 f").await.output, "1\n2\n");
        assert_eq!(shell.evaluate("tail -2 f").await.output, "3\n4\n");
        assert_eq!(shell.evaluate("tail f").await.output, "1\n2\n3\n4\n");
    }

    #[tokio::test]
    async fn test_head_missing_file() {
        let mut shell = Shell::new();
        let result = shell.evaluate("head nope").await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(
            result.output,
            "head: cannot open 'nope' for reading: No such file or directory\n"
        );
    }
}
