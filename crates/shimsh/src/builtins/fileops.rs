//! File operation builtins - touch, rm, mkdir, rmdir, ln
//!
//! Every target is resolved through the jail. Paths under the protected
//! system prefixes can only be changed after `sudo`.

use async_trait::async_trait;
use std::path::PathBuf;

use super::{Builtin, Context, split_flags};
use crate::error::Result;
use crate::interpreter::CommandResult;
use crate::jail::JailedPath;

fn denied(cmd: &str, verb: &str, operand: &str) -> String {
    format!("{cmd}: cannot {verb} '{operand}': Permission denied\n")
}

/// The touch builtin - create empty files.
///
/// Usage: touch FILE...
///
/// Existing files keep their contents.
pub struct Touch;

#[async_trait]
impl Builtin for Touch {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (_, operands) = split_flags(ctx.args);
        if operands.is_empty() {
            return Ok(CommandResult::err("touch: missing file operand\n", 1));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for operand in operands {
            let path = ctx.resolve(operand).await;
            if !ctx.session.may_modify(&path) {
                output.push_str(&denied("touch", "touch", operand));
                exit_code = 1;
                continue;
            }

            let exists = ctx.fs.exists(path.host()).await.unwrap_or(false);
            let outcome = if exists {
                ctx.fs.append_file(path.host(), b"").await
            } else {
                ctx.fs.write_file(path.host(), b"").await
            };
            match outcome {
                Ok(()) => ctx.log(format!("shimsh: touch {path}")),
                Err(e) => {
                    output.push_str(&format!("shimsh: touch: {operand}: {}\n", e.reason()));
                    exit_code = 1;
                }
            }
        }

        Ok(CommandResult::err(output, exit_code))
    }
}

/// The rm builtin - remove files or directories.
///
/// Usage: rm [-rf] FILE...
///
/// Options:
///   -r, -R   Remove directories and their contents recursively
///   -f       Ignore nonexistent files
///
/// `rm -r /` is refused unless `--no-preserve-root` is given by root.
pub struct Rm;

#[async_trait]
impl Builtin for Rm {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (flags, operands) = split_flags(ctx.args);
        let mut recursive = false;
        let mut force = false;
        let mut no_preserve_root = false;
        for flag in flags {
            match flag {
                "--recursive" => recursive = true,
                "--force" => force = true,
                "--no-preserve-root" => no_preserve_root = true,
                short if !short.starts_with("--") => {
                    recursive |= short.contains('r') || short.contains('R');
                    force |= short.contains('f');
                }
                _ => {}
            }
        }

        if operands.is_empty() {
            if force {
                return Ok(CommandResult::ok(""));
            }
            return Ok(CommandResult::err("rm: missing operand\n", 1));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for operand in operands {
            let path = ctx.jail.resolve_entry(&ctx.session.cwd, operand).await;

            let meta = ctx.fs.symlink_metadata(path.host()).await;
            let meta = match meta {
                Ok(meta) => meta,
                Err(_) => {
                    if !force {
                        output.push_str(&format!(
                            "rm: cannot remove '{operand}': No such file or directory\n"
                        ));
                        exit_code = 1;
                    }
                    continue;
                }
            };

            if meta.file_type.is_dir() && !recursive {
                output.push_str(&format!("rm: cannot remove '{operand}': Is a directory\n"));
                exit_code = 1;
                continue;
            }
            if path.is_root() && !(no_preserve_root && ctx.session.privileged) {
                output.push_str(
                    "rm: it is dangerous to operate recursively on '/'\n\
                     rm: use --no-preserve-root to override this failsafe\n",
                );
                exit_code = 1;
                continue;
            }
            if !ctx.session.may_modify(&path) {
                output.push_str(&denied("rm", "remove", operand));
                exit_code = 1;
                continue;
            }

            match ctx.fs.remove(path.host(), recursive).await {
                Ok(()) => ctx.log(format!("shimsh: rm {path}")),
                Err(e) => {
                    output.push_str(&format!("rm: cannot remove '{operand}': {}\n", e.reason()));
                    exit_code = 1;
                }
            }
        }

        Ok(CommandResult::err(output, exit_code))
    }
}

/// The mkdir builtin - create directories.
///
/// Usage: mkdir [-p] DIRECTORY...
///
/// Options:
///   -p   Create parent directories as needed, no error if existing
pub struct Mkdir;

#[async_trait]
impl Builtin for Mkdir {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (flags, operands) = split_flags(ctx.args);
        let parents = flags.iter().any(|f| *f == "--parents" || f.contains('p'));
        if operands.is_empty() {
            return Ok(CommandResult::err("mkdir: missing operand\n", 1));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for operand in operands {
            let path = ctx.resolve(operand).await;
            if let Err(message) = make_dir(&mut ctx, &path, parents).await {
                output.push_str(&format!(
                    "mkdir: cannot create directory '{operand}': {message}\n"
                ));
                exit_code = 1;
            }
        }

        Ok(CommandResult::err(output, exit_code))
    }
}

async fn make_dir(
    ctx: &mut Context<'_>,
    path: &JailedPath,
    parents: bool,
) -> std::result::Result<(), String> {
    let meta = ctx.fs.stat(path.host()).await;
    match meta {
        Ok(meta) if meta.file_type.is_dir() && parents => return Ok(()),
        Ok(_) => return Err("File exists".to_string()),
        Err(_) => {}
    }
    if !ctx.session.may_modify(path) {
        return Err("Permission denied".to_string());
    }
    ctx.fs
        .mkdir(path.host(), parents)
        .await
        .map_err(|e| e.reason())?;
    ctx.log(format!("shimsh: mkdir {path}"));
    Ok(())
}

/// The rmdir builtin - remove empty directories.
///
/// Usage: rmdir DIRECTORY...
pub struct Rmdir;

#[async_trait]
impl Builtin for Rmdir {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (_, operands) = split_flags(ctx.args);
        if operands.is_empty() {
            return Ok(CommandResult::err("rmdir: missing operand\n", 1));
        }

        let mut output = String::new();
        let mut exit_code = 0;
        for operand in operands {
            let path = ctx.jail.resolve_entry(&ctx.session.cwd, operand).await;
            let meta = ctx.fs.symlink_metadata(path.host()).await;
            let failure = match meta {
                Err(e) => Some(e.reason()),
                Ok(meta) if !meta.file_type.is_dir() => Some("Not a directory".to_string()),
                Ok(_) if path.is_root() => Some("Device or resource busy".to_string()),
                Ok(_) if !ctx.session.may_modify(&path) => Some("Permission denied".to_string()),
                Ok(_) => match ctx.fs.remove(path.host(), false).await {
                    Ok(()) => {
                        ctx.log(format!("shimsh: rmdir {path}"));
                        None
                    }
                    Err(e) => Some(e.reason()),
                },
            };
            if let Some(reason) = failure {
                output.push_str(&format!("rmdir: failed to remove '{operand}': {reason}\n"));
                exit_code = 1;
            }
        }

        Ok(CommandResult::err(output, exit_code))
    }
}

/// The ln builtin - create symbolic links.
///
/// Usage: ln -s [-f] TARGET LINK_NAME
///
/// Absolute targets are stored as jailed host paths, relative ones verbatim.
/// Hard links are not supported.
pub struct Ln;

#[async_trait]
impl Builtin for Ln {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let (flags, operands) = split_flags(ctx.args);
        let mut symbolic = false;
        let mut force = false;
        for flag in &flags {
            match *flag {
                "--symbolic" => symbolic = true,
                "--force" => force = true,
                short if !short.starts_with("--") => {
                    symbolic |= short.contains('s');
                    force |= short.contains('f');
                }
                _ => {}
            }
        }

        let (target, link_name) = match operands.as_slice() {
            [target, link] => (*target, *link),
            [target] => (*target, target.rsplit('/').next().unwrap_or(target)),
            [] => return Ok(CommandResult::err("ln: missing file operand\n", 1)),
            _ => return Ok(CommandResult::err("ln: extra operand\n", 1)),
        };

        if !symbolic {
            return Ok(CommandResult::err(
                format!("ln: failed to create hard link '{link_name}': Operation not permitted\n"),
                1,
            ));
        }

        let mut link = ctx.jail.resolve_entry(&ctx.session.cwd, link_name).await;
        let link_meta = ctx.fs.symlink_metadata(link.host()).await;
        if matches!(link_meta, Ok(ref meta) if meta.file_type.is_dir()) {
            let name = target.trim_end_matches('/').rsplit('/').next().unwrap_or(target);
            let inside = format!("{}/{}", link.virtual_path().trim_end_matches('/'), name);
            link = ctx.jail.resolve_entry(&ctx.session.cwd, &inside).await;
        }

        if !ctx.session.may_modify(&link) {
            return Ok(CommandResult::err(
                format!("ln: failed to create symbolic link '{link_name}': Permission denied\n"),
                1,
            ));
        }

        if ctx.fs.symlink_metadata(link.host()).await.is_ok() {
            if !force {
                return Ok(CommandResult::err(
                    format!("ln: failed to create symbolic link '{link_name}': File exists\n"),
                    1,
                ));
            }
            if let Err(e) = ctx.fs.remove(link.host(), false).await {
                return Ok(CommandResult::err(
                    format!("ln: cannot remove '{link_name}': {}\n", e.reason()),
                    1,
                ));
            }
        }

        let stored = if target.starts_with('/') {
            ctx.resolve(target).await.host().to_path_buf()
        } else {
            PathBuf::from(target)
        };

        match ctx.fs.symlink(&stored, link.host()).await {
            Ok(()) => {
                ctx.log(format!("shimsh: ln -s {target} {link}"));
                Ok(CommandResult::ok(""))
            }
            Err(e) => Ok(CommandResult::err(
                format!(
                    "ln: failed to create symbolic link '{link_name}': {}\n",
                    e.reason()
                ),
                1,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Shell;

    #[tokio::test]
    async fn test_touch_and_rm() {
        let mut shell = Shell::new();
        let result = shell.evaluate("touch a b && ls").await;
        assert_eq!(result.output, "a\nb\n");

        let result = shell.evaluate("rm a; ls").await;
        assert_eq!(result.output, "b\n");

        let result = shell.evaluate("rm a").await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.output, "rm: cannot remove 'a': No such file or directory\n");

        assert_eq!(shell.evaluate("rm -f a").await.exit_code, 0);
    }

    #[tokio::test]
    async fn test_rm_directory_needs_recursive() {
        let mut shell = Shell::new();
        shell.evaluate("mkdir -p d/e && touch d/e/f").await;

        let result = shell.evaluate("rm d").await;
        assert_eq!(result.output, "rm: cannot remove 'd': Is a directory\n");

        let result = shell.evaluate("rm -rf d && ls").await;
        assert_eq!(result.output, "");
    }

    #[tokio::test]
    async fn test_rm_root_is_refused() {
        let mut shell = Shell::new();
        shell.evaluate("touch keep").await;
        let result = shell.evaluate("sudo rm -rf /").await;
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("dangerous to operate recursively"));
        assert_eq!(shell.evaluate("ls").await.output, "keep\n");
    }

    #[tokio::test]
    async fn test_protected_paths() {
        let mut shell = Shell::new();
        let result = shell.evaluate("mkdir /etc").await;
        assert_eq!(
            result.output,
            "mkdir: cannot create directory '/etc': Permission denied\n"
        );
        assert_eq!(shell.evaluate("sudo mkdir /etc").await.exit_code, 0);
        assert_eq!(shell.evaluate("touch /etc/motd").await.exit_code, 0);
    }

    #[tokio::test]
    async fn test_mkdir_exists() {
        let mut shell = Shell::new();
        shell.evaluate("mkdir x").await;
        let result = shell.evaluate("mkdir x").await;
        assert_eq!(result.output, "mkdir: cannot create directory 'x': File exists\n");
        assert_eq!(shell.evaluate("mkdir -p x/y/z").await.exit_code, 0);
    }

    #[tokio::test]
    async fn test_rmdir() {
        let mut shell = Shell::new();
        shell.evaluate("mkdir -p full/inner empty").await;

        assert_eq!(shell.evaluate("rmdir empty").await.exit_code, 0);
        let result = shell.evaluate("rmdir full").await;
        assert_eq!(
            result.output,
            "rmdir: failed to remove 'full': Directory not empty\n"
        );
        let result = shell.evaluate("rmdir missing").await;
        assert_eq!(
            result.output,
            "rmdir: failed to remove 'missing': No such file or directory\n"
        );
    }

    #[tokio::test]
    async fn test_ln_symbolic() {
        let mut shell = Shell::new();
        shell.evaluate("mkdir -p /srv/data && echo hi > /srv/data/f").await;

        assert_eq!(shell.evaluate("ln -s /srv/data link").await.exit_code, 0);
        assert_eq!(shell.evaluate("cat link/f").await.output, "hi\n");

        let result = shell.evaluate("ln -s /srv link").await;
        assert!(result.output.contains("File exists"));
        assert_eq!(shell.evaluate("ln -sf /srv link && ls link").await.output, "data/\n");

        // Removing the link leaves the target alone.
        shell.evaluate("rm link").await;
        assert_eq!(shell.evaluate("cat /srv/data/f").await.output, "hi\n");
    }

    #[tokio::test]
    async fn test_ln_hard_link_refused() {
        let mut shell = Shell::new();
        shell.evaluate("touch a").await;
        let result = shell.evaluate("ln a b").await;
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("hard link"));
    }
}
