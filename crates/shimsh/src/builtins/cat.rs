//! cat builtin command

use async_trait::async_trait;

use super::{Builtin, Context, split_flags};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// The cat builtin command.
///
/// Concatenates files in order. `-n` numbers output lines. Unreadable files
/// are reported and skipped.
pub struct Cat;

#[async_trait]
impl Builtin for Cat {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (flags, operands) = split_flags(ctx.args);
        let number_lines = flags.iter().any(|f| !f.starts_with("--") && f.contains('n'));

        let mut raw = String::new();
        let mut errors = String::new();
        let mut exit_code = 0;

        for operand in operands {
            let path = ctx.resolve(operand).await;
            ctx.log(format!("shimsh: cat {path}"));

            let meta = ctx.fs.stat(path.host()).await;
            let reason = match meta {
                Ok(meta) if meta.file_type.is_dir() => "Is a directory".to_string(),
                Ok(_) => match ctx.fs.read_file(path.host()).await {
                    Ok(content) => {
                        raw.push_str(&String::from_utf8_lossy(&content));
                        continue;
                    }
                    Err(e) => e.reason(),
                },
                Err(e) => e.reason(),
            };
            errors.push_str(&format!("shimsh: cat: {operand}: {reason}\n"));
            exit_code = 1;
        }

        let mut output = if number_lines {
            raw.lines()
                .enumerate()
                .map(|(i, line)| format!("{:>6}\t{line}\n", i + 1))
                .collect()
        } else {
            raw
        };
        output.push_str(&errors);

        Ok(CommandResult::err(output, exit_code))
    }
}
