//! dmesg builtin - print the session log

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// The dmesg builtin.
///
/// Prints every session log line recorded so far, including its own.
pub struct Dmesg;

#[async_trait]
impl Builtin for Dmesg {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        ctx.log("shimsh: outputting dmesg");
        let mut output = ctx.session.log.entries().join("\n");
        output.push('\n');
        Ok(CommandResult::ok(output))
    }
}
