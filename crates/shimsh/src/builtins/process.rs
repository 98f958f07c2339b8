//! Process builtins - ps, kill, free
//!
//! The process table is whatever lives under `/proc/<pid>` in the jail; owners
//! come from the session. Nothing is ever signalled.

use async_trait::async_trait;
use rand::Rng;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// Total memory `free` reports, in KiB.
const TOTAL_MEMORY_KB: u64 = 4_096_000;

/// Index of the resident set size in `/proc/<pid>/stat`.
const RSS_FIELD: usize = 23;

/// Sorted pids that have a directory under `/proc`.
async fn pids(ctx: &Context<'_>) -> Vec<u32> {
    let proc_dir = ctx.resolve("/proc").await;
    let mut pids: Vec<u32> = match ctx.fs.read_dir(proc_dir.host()).await {
        Ok(entries) => entries
            .iter()
            .filter(|e| e.metadata.file_type.is_dir())
            .filter_map(|e| e.name.parse().ok())
            .collect(),
        Err(_) => Vec::new(),
    };
    pids.sort_unstable();
    pids
}

async fn read_proc(ctx: &Context<'_>, pid: u32, file: &str) -> Option<String> {
    let path = ctx.resolve(&format!("/proc/{pid}/{file}")).await;
    let bytes = ctx.fs.read_file(path.host()).await.ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn owner<'s>(ctx: &'s Context<'_>, pid: u32) -> &'s str {
    ctx.session
        .process_owners
        .get(&pid)
        .map(String::as_str)
        .unwrap_or("nobody")
}

/// The ps builtin - list the fabricated processes.
pub struct Ps;

#[async_trait]
impl Builtin for Ps {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut output = String::from("PID TTY      USER    TIME   CMD\n");
        for pid in pids(&ctx).await {
            let Some(cmdline) = read_proc(&ctx, pid, "cmdline").await else {
                continue;
            };
            let cmd = cmdline.trim_end().rsplit('/').next().unwrap_or_default();
            let tty = if pid < 100 { "?" } else { "pts/0" };
            let minutes: u32 = rand::thread_rng().gen_range(10..=59);
            let user = owner(&ctx, pid);
            output.push_str(&format!(
                "{pid:<5} {tty:<8} {user:<7} 00:{minutes:02}  {cmd}\n"
            ));
        }
        ctx.log("shimsh: ps (simulated process list)");
        Ok(CommandResult::ok(output))
    }
}

/// The kill builtin - pretend to signal a process.
///
/// Usage: kill PID...
///
/// Only root or the owning user may signal a process.
pub struct Kill;

#[async_trait]
impl Builtin for Kill {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        if ctx.args.is_empty() {
            return Ok(CommandResult::err("kill: usage: kill PID\n", 1));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for arg in ctx.args {
            let Ok(pid) = arg.parse::<u32>() else {
                output.push_str(&format!(
                    "kill: {arg}: arguments must be process or job IDs\n"
                ));
                exit_code = 1;
                continue;
            };

            let dir = ctx.resolve(&format!("/proc/{pid}")).await;
            let exists = matches!(ctx.fs.stat(dir.host()).await, Ok(m) if m.file_type.is_dir());
            if !exists {
                output.push_str(&format!("kill: ({pid}) - No such process\n"));
                exit_code = 1;
            } else if ctx.session.privileged || owner(&ctx, pid) == ctx.profile.username {
                output.push_str(&format!("shimsh: kill: ({pid}) signal sent\n"));
            } else {
                output.push_str(&format!("kill: ({pid}) - Operation not permitted\n"));
                exit_code = 1;
            }
        }

        ctx.log(format!("shimsh: kill {} -> code {exit_code}", ctx.args.join(" ")));
        Ok(CommandResult::err(output, exit_code))
    }
}

/// The free builtin - memory usage summed from `/proc/<pid>/stat`.
pub struct Free;

#[async_trait]
impl Builtin for Free {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut used: u64 = 0;
        for pid in pids(&ctx).await {
            let Some(stat) = read_proc(&ctx, pid, "stat").await else {
                continue;
            };
            let rss: u64 = stat
                .split_whitespace()
                .nth(RSS_FIELD)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            // 4 KiB pages
            used += rss * 4;
        }
        let free = TOTAL_MEMORY_KB.saturating_sub(used);

        ctx.log("shimsh: free (simulated)");
        Ok(CommandResult::ok(format!(
            "              total        used        free      shared  buff/cache   available\n\
             Mem:      {TOTAL_MEMORY_KB:8}   {used:8}   {free:8}      0      0      0\n\
             Swap:           0           0           0\n"
        )))
    }
}
