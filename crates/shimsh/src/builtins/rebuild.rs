//! rebuildfs builtin - recreate the fake root from scratch

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;
use crate::skeleton;

const REBUILD_HELP: &str = "\
Usage: rebuildfs [OPTION]...
Rebuild the simulated filesystem from scratch.

  -f, --force   do not prompt for confirmation
  -h, --help    display this help and exit
";

/// The rebuildfs builtin.
///
/// Usage: rebuildfs [-f|--force] [-h|--help]
///
/// There is no one to confirm with, so without `--force` the rebuild is
/// cancelled. A forced rebuild wipes everything except the session log,
/// repopulates the tree and logs the session out of root.
pub struct Rebuildfs;

#[async_trait]
impl Builtin for Rebuildfs {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let mut force = false;
        let mut help = false;
        let mut invalid = None;
        for arg in ctx.args {
            match arg.as_str() {
                "-h" | "--help" => help = true,
                "-f" | "--force" => force = true,
                other if other.starts_with('-') => {
                    invalid.get_or_insert(other);
                }
                _ => {}
            }
        }

        if help {
            return Ok(CommandResult::ok(REBUILD_HELP));
        }
        if let Some(arg) = invalid {
            let output = format!(
                "rebuildfs: invalid option -- '{arg}'\nTry 'rebuildfs --help' for more information.\n"
            );
            ctx.log(format!("shimsh: rebuildfs error -> {}", output.trim()));
            return Ok(CommandResult::err(output, 1));
        }
        if !force {
            ctx.log("shimsh: rebuildfs cancelled (no confirmation)");
            return Ok(CommandResult::err("Rebuild cancelled.\n", 1));
        }

        rebuild(&mut ctx).await?;
        Ok(CommandResult::ok("Rebuild complete\n"))
    }
}

/// Wipe, repopulate and reset the session in place.
pub(crate) async fn rebuild(ctx: &mut Context<'_>) -> Result<()> {
    ctx.log("shimsh: starting fakeroot rebuild");
    skeleton::wipe(ctx.fs.as_ref(), ctx.jail).await?;
    ctx.log("shimsh: fakeroot filesystem removed");

    let log = &mut ctx.session.log;
    skeleton::populate(ctx.fs.as_ref(), ctx.jail, ctx.profile, log).await?;
    let owners = skeleton::create_proc(ctx.fs.as_ref(), ctx.jail, ctx.profile, log).await?;

    ctx.session.process_owners = owners;
    ctx.session.reset(ctx.jail.root_path());
    ctx.log("shimsh: Rebuild complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Shell;

    #[tokio::test]
    async fn test_rebuild_requires_force() {
        let mut shell = Shell::new();
        let result = shell.evaluate("rebuildfs").await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.output, "Rebuild cancelled.\n");

        let result = shell.evaluate("rebuildfs -x").await;
        assert_eq!(
            result.output,
            "rebuildfs: invalid option -- '-x'\nTry 'rebuildfs --help' for more information.\n"
        );

        let result = shell.evaluate("rebuildfs --help").await;
        assert!(result.output.starts_with("Usage: rebuildfs [OPTION]...\n"));
    }

    #[tokio::test]
    async fn test_forced_rebuild() {
        let mut shell = Shell::new();
        shell.evaluate("sudo touch /junk; export A=1; cd /tmp").await;

        let result = shell.evaluate("rebuildfs --force").await;
        assert_eq!(result.output, "Rebuild complete\n");
        assert_eq!(result.exit_code, 0);

        assert_eq!(shell.evaluate("whoami").await.output, "inkling\n");
        assert_eq!(shell.evaluate("pwd").await.output, "/\n");
        assert_eq!(shell.evaluate("echo [$A]").await.output, "[]\n");
        assert_eq!(shell.evaluate("cat /junk").await.exit_code, 1);
        assert!(shell.evaluate("cat /etc/passwd").await.output.contains("inkling"));
        assert!(shell.evaluate("ps").await.output.contains("systemd"));
    }
}
