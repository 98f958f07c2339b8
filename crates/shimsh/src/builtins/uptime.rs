//! uptime builtin
//!
//! The system has been "up" exactly as long as the session.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

const UPTIME_HELP: &str = "\
Usage: uptime [OPTION]...
Show how long the system has been running.

  -p, --pretty   show uptime in a pretty format
  -s, --since    show system uptime start time
  -h, --help     display this help and exit
";

/// The uptime builtin.
///
/// Usage: uptime [-p | -s | -h]
pub struct Uptime;

#[async_trait]
impl Builtin for Uptime {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut pretty = false;
        let mut since = false;
        for arg in ctx.args {
            match arg.as_str() {
                "-p" | "--pretty" => pretty = true,
                "-s" | "--since" => since = true,
                "-h" | "--help" => return Ok(CommandResult::ok(UPTIME_HELP)),
                other => {
                    let message = format!(
                        "uptime: invalid option -- '{other}'\nTry 'uptime --help' for more information.\n"
                    );
                    ctx.log(format!("shimsh: uptime error -> {}", message.trim()));
                    return Ok(CommandResult::err(message, 1));
                }
            }
        }

        let output = if pretty {
            format!("{}\n", pretty_uptime(ctx.session.uptime()))
        } else if since {
            format!("{}\n", ctx.session.started_at().format("%Y-%m-%d %H:%M:%S"))
        } else {
            let mut rng = rand::thread_rng();
            let load: Vec<String> = (0..3)
                .map(|_| format!("{:.2}", rng.gen_range(0.01..0.20)))
                .collect();
            format!(
                "{} up {},  1 user,  load average: {}\n",
                ctx.profile.hostname,
                clock_uptime(ctx.session.uptime()),
                load.join(" ")
            )
        };

        ctx.log(format!("shimsh: uptime -> {}", output.trim()));
        Ok(CommandResult::ok(output))
    }
}

fn split(uptime: Duration) -> (u64, u64, u64, u64) {
    let total = uptime.as_secs();
    (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    )
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// `up 1 day, 2 hours, 5 seconds`
fn pretty_uptime(uptime: Duration) -> String {
    let (days, hours, minutes, seconds) = split(uptime);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(plural(seconds, "second"));
    }
    format!("up {}", parts.join(", "))
}

/// `2 days, 3:07`
fn clock_uptime(uptime: Duration) -> String {
    let (days, hours, minutes, _) = split(uptime);
    let prefix = if days > 0 {
        format!("{}, ", plural(days, "day"))
    } else {
        String::new()
    };
    format!("{prefix}{hours}:{minutes:02}")
}
