//! File inspection builtin - stat

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::{Builtin, Context, split_flags};
use crate::error::Result;
use crate::fs::Metadata;
use crate::interpreter::{CommandResult, is_protected};
use crate::jail::JailedPath;

/// The stat builtin - display file status.
///
/// Usage: stat FILE...
///
/// Ownership is made up from the path: system locations belong to root,
/// everything else to the session user.
pub struct Stat;

#[async_trait]
impl Builtin for Stat {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (_, operands) = split_flags(ctx.args);
        if operands.is_empty() {
            return Ok(CommandResult::err("stat: missing operand\n", 1));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for operand in &operands {
            let path = ctx.resolve(operand).await;
            match ctx.fs.stat(path.host()).await {
                Ok(meta) => {
                    let uid = if is_protected(&path) { 0 } else { ctx.profile.uid };
                    output.push_str(&format_stat(operand, &path, &meta, uid));
                }
                Err(e) => {
                    output.push_str(&format!("stat: cannot stat '{operand}': {}\n", e.reason()));
                    exit_code = 1;
                }
            }
        }

        ctx.log(format!("shimsh: stat {} -> code {exit_code}", operands.join(" ")));
        Ok(CommandResult::err(output, exit_code))
    }
}

fn format_stat(operand: &str, path: &JailedPath, meta: &Metadata, uid: u32) -> String {
    let blocks = meta.size.div_ceil(4096) * 8;
    let links = if meta.file_type.is_dir() { 2 } else { 1 };
    let modified: DateTime<Local> = meta.modified.into();
    let created: DateTime<Local> = meta.created.into();
    let stamp = |t: DateTime<Local>| t.format("%Y-%m-%d %H:%M:%S%.6f").to_string();

    format!(
        "  File: {operand}\n  Size: {}\tBlocks: {blocks}\tIO Block: 4096 {}\n\
         Device: 2049\tInode: {}\tLinks: {links}\n\
         Access: ({:04o})  Uid: ({uid})   Gid: ({uid})\n\
         Access: {}\nModify: {}\nChange: {}\n",
        meta.size,
        meta.file_type.describe(),
        inode(&path.virtual_path()),
        meta.mode & 0o7777,
        stamp(modified),
        stamp(modified),
        stamp(created),
    )
}

/// Stable made-up inode number (FNV-1a of the virtual path).
fn inode(virtual_path: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in virtual_path.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash % 10_000_000 + 1_000
}
