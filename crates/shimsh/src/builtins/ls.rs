//! Directory listing builtin - ls

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::{Builtin, Context};
use crate::error::Result;
use crate::fs::{FileType, Metadata};
use crate::interpreter::CommandResult;
use crate::jail::JailedPath;

/// Options for ls command
#[derive(Default)]
struct LsOptions {
    long: bool,
    all: bool,
}

/// The ls builtin - list directory contents.
///
/// Usage: ls [-l] [-a] [PATH...]
///
/// Options:
///   -l   Use long listing format
///   -a   Show hidden files (starting with .)
///
/// Entries are sorted by name; directories get a trailing `/`.
pub struct Ls;

#[async_trait]
impl Builtin for Ls {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut opts = LsOptions::default();
        let mut paths: Vec<&str> = Vec::new();
        for arg in ctx.args {
            if arg.starts_with('-') && arg.len() > 1 && !arg.starts_with("--") {
                for c in arg[1..].chars() {
                    match c {
                        'l' => opts.long = true,
                        'a' => opts.all = true,
                        '1' => {}
                        _ => {
                            return Ok(CommandResult::err(
                                format!("shimsh: ls: invalid option -- '{c}'\n"),
                                2,
                            ));
                        }
                    }
                }
            } else {
                paths.push(arg);
            }
        }
        if paths.is_empty() {
            paths.push(".");
        }

        let mut output = String::new();
        let mut exit_code = 0;
        let headers = paths.len() > 1;

        for (i, raw) in paths.iter().enumerate() {
            let path = ctx.resolve(raw).await;
            ctx.log(format!("shimsh: ls {path}"));

            let meta = ctx.fs.stat(path.host()).await;
            let meta = match meta {
                Ok(meta) => meta,
                Err(e) => {
                    ctx.log(format!("shimsh: ls error: {}", e.reason()));
                    output.push_str(&format!(
                        "shimsh: ls: cannot access '{raw}': {}\n",
                        e.reason()
                    ));
                    exit_code = 1;
                    continue;
                }
            };

            if !meta.file_type.is_dir() {
                output.push_str(&render(&ctx, &opts, raw, &meta, None).await);
                continue;
            }

            if headers {
                if i > 0 {
                    output.push('\n');
                }
                output.push_str(&format!("{raw}:\n"));
            }
            match list_dir(&ctx, &opts, &path).await {
                Ok(listing) => output.push_str(&listing),
                Err(e) => {
                    output.push_str(&format!("shimsh: ls: {}\n", e.reason()));
                    exit_code = 1;
                }
            }
        }

        Ok(CommandResult::err(output, exit_code))
    }
}

async fn list_dir(ctx: &Context<'_>, opts: &LsOptions, dir: &JailedPath) -> Result<String> {
    let mut entries = ctx.fs.read_dir(dir.host()).await?;
    entries.retain(|e| opts.all || !e.name.starts_with('.'));
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut output = String::new();
    let base = dir.virtual_path();
    for entry in entries {
        let virt = format!("{}/{}", base.trim_end_matches('/'), entry.name);
        output.push_str(&render(ctx, opts, &entry.name, &entry.metadata, Some(&virt)).await);
    }
    Ok(output)
}

/// One listing line. `virt` is given for directory entries so symlinks can
/// show their target and whether they lead to a directory.
async fn render(
    ctx: &Context<'_>,
    opts: &LsOptions,
    name: &str,
    meta: &Metadata,
    virt: Option<&str>,
) -> String {
    let mut is_dir = meta.file_type.is_dir();
    let mut target = None;
    if let (FileType::Symlink, Some(virt)) = (meta.file_type, virt) {
        let entry = ctx.jail.resolve_entry(&ctx.session.cwd, virt).await;
        if let Ok(raw) = ctx.fs.read_link(entry.host()).await {
            target = Some(ctx.jail.display_target(&raw));
        }
        let followed = ctx.resolve(virt).await;
        is_dir = matches!(ctx.fs.stat(followed.host()).await, Ok(m) if m.file_type.is_dir());
    }

    if !opts.long {
        let suffix = if is_dir { "/" } else { "" };
        return format!("{name}{suffix}\n");
    }

    let kind = match meta.file_type {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::File => '-',
    };
    let modified: DateTime<Local> = meta.modified.into();
    let owner = ctx.identity();
    let mut line = format!(
        "{kind}{} 1 {owner} {owner} {:>6} {} {name}",
        permissions(meta.mode),
        meta.size,
        modified.format("%b %e %H:%M"),
    );
    if let Some(target) = target {
        line.push_str(&format!(" -> {target}"));
    }
    line.push('\n');
    line
}

fn permissions(mode: u32) -> String {
    let mut out = String::with_capacity(9);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;

    #[test]
    fn test_permissions() {
        assert_eq!(permissions(0o755), "rwxr-xr-x");
        assert_eq!(permissions(0o640), "rw-r-----");
    }

    #[tokio::test]
    async fn test_ls_sorted_with_dir_suffix() {
        let mut shell = Shell::new();
        shell.evaluate("mkdir zeta; touch beta alpha .hidden").await;

        assert_eq!(shell.evaluate("ls").await.output, "alpha\nbeta\nzeta/\n");
        assert_eq!(
            shell.evaluate("ls -a").await.output,
            ".hidden\nalpha\nbeta\nzeta/\n"
        );
    }

    #[tokio::test]
    async fn test_ls_long() {
        let mut shell = Shell::new();
        shell.evaluate("echo hello > f").await;
        let output = shell.evaluate("ls -l").await.output;
        assert!(output.starts_with("-rw-r--r-- 1 inkling inkling      6 "));
        assert!(output.ends_with(" f\n"));
    }

    #[tokio::test]
    async fn test_ls_missing() {
        let mut shell = Shell::new();
        let result = shell.evaluate("ls nope").await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(
            result.output,
            "shimsh: ls: cannot access 'nope': No such file or directory\n"
        );
    }

    #[tokio::test]
    async fn test_ls_empty_directory() {
        let mut shell = Shell::new();
        shell.evaluate("mkdir empty").await;
        let result = shell.evaluate("ls empty").await;
        assert_eq!(result.output, "");
        assert_eq!(result.exit_code, 0);
    }
}
