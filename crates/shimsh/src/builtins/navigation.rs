//! Navigation builtins (cd, pwd)

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

/// The cd builtin - change directory.
///
/// With no argument goes to `$HOME`; `cd -` goes back to `$OLDPWD`. Paths
/// that would leave the jail land on its root.
pub struct Cd;

#[async_trait]
impl Builtin for Cd {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let target = match ctx.args.first().map(String::as_str) {
            Some("-") => ctx.lookup("OLDPWD").unwrap_or(".").to_string(),
            Some(arg) => arg.to_string(),
            None => ctx.lookup("HOME").unwrap_or("/").to_string(),
        };

        let path = ctx.resolve(&target).await;
        ctx.log(format!("shimsh: cd {target} -> {path}"));

        let meta = ctx.fs.stat(path.host()).await;
        match meta {
            Ok(meta) if meta.file_type.is_dir() => {
                let old = ctx.session.cwd.virtual_path();
                ctx.session.variables.insert("OLDPWD".to_string(), old);
                ctx.session.cwd = path;
                Ok(CommandResult::ok(""))
            }
            Ok(_) => Ok(CommandResult::err(
                format!("shimsh: cd: not a directory: {target}\n"),
                1,
            )),
            Err(_) => {
                ctx.log(format!("shimsh: cd failed, no such directory: {target}"));
                Ok(CommandResult::err(
                    format!("shimsh: cd: no such file or directory: {target}\n"),
                    1,
                ))
            }
        }
    }
}

/// The pwd builtin - print working directory.
pub struct Pwd;

#[async_trait]
impl Builtin for Pwd {
    async fn execute(&self, ctx: Context<'_>) -> Result<CommandResult> {
        Ok(CommandResult::ok(format!("{}\n", ctx.session.cwd)))
    }
}
