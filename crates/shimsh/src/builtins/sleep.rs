//! Sleep builtin - pause execution for specified duration

use async_trait::async_trait;
use std::time::Duration;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// Maximum sleep duration in seconds
const MAX_SLEEP_SECONDS: f64 = 60.0;

/// The sleep builtin - pause execution for a specified number of seconds.
///
/// Usage: sleep [SECONDS]
///
/// SECONDS can be fractional and defaults to 1. Capped at 60 seconds.
pub struct Sleep;

#[async_trait]
impl Builtin for Sleep {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let seconds = match ctx.args.first() {
            None => 1.0,
            Some(arg) => match arg.parse::<f64>() {
                Ok(s) if s.is_finite() && s >= 0.0 => s.min(MAX_SLEEP_SECONDS),
                _ => {
                    ctx.log(format!("shimsh: sleep error: invalid time interval '{arg}'"));
                    return Ok(CommandResult::err(
                        format!("sleep: invalid time interval '{arg}'\n"),
                        1,
                    ));
                }
            },
        };

        if seconds > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        }
        ctx.log(format!("shimsh: sleep {seconds}s"));
        Ok(CommandResult::ok(""))
    }
}
