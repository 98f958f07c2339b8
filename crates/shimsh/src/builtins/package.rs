//! Package manager builtin
//!
//! Registered under the profile's package manager name (`apt` by default).
//! Nothing is ever installed.

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;

const APT_UPDATE_DENIED: &str = "\
Reading package lists... Done
E: Could not open lock file /var/lib/apt/lists/lock - open (13: Permission denied)
E: Unable to lock directory /var/lib/apt/lists/
W: Problem unlinking the file /var/cache/apt/pkgcache.bin - RemoveCaches (13: Permission denied)
W: Problem unlinking the file /var/cache/apt/srcpkgcache.bin - RemoveCaches (13: Permission denied)
";

/// Exit code apt uses for lock and permission failures.
const APT_FAILURE: i32 = 100;

/// The package manager builtin.
pub struct PackageManager {
    name: String,
}

impl PackageManager {
    /// Package manager answering to `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Builtin for PackageManager {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let name = self.name.as_str();
        ctx.log(format!("shimsh: {name} called with args: {}", ctx.args.join(" ")));

        let Some(subcommand) = ctx.args.first().map(String::as_str) else {
            return Ok(CommandResult::ok(format!("{name}: no command specified\n")));
        };

        if subcommand == "update" && name == "apt" {
            if !ctx.session.privileged {
                ctx.log("shimsh: apt update as non-root (simulated permission denied)");
                return Ok(CommandResult::err(APT_UPDATE_DENIED, APT_FAILURE));
            }
            ctx.log("shimsh: apt update as root (simulated success)");
            let mirror = &ctx.profile.package_mirror;
            let codename = &ctx.profile.distro_codename;
            return Ok(CommandResult::ok(format!(
                "Hit:1 {mirror}/packages {codename} InRelease\n\
                 Hit:2 {mirror}/security {codename}-security InRelease\n\
                 Hit:3 {mirror}/updates {codename}-updates InRelease\n\
                 Hit:4 {mirror}/backports {codename}-backports InRelease\n\
                 Reading package lists... Done\n\
                 Building dependency tree... Done\n\
                 Reading state information... Done\n\
                 32 packages can be upgraded. Run 'apt list --upgradable' to see them.\n"
            )));
        }

        if matches!(subcommand, "install" | "remove" | "update" | "upgrade" | "search") {
            let package = ctx.args.get(1).map(String::as_str).unwrap_or("<missing>");
            ctx.log(format!("shimsh: {name} {subcommand} '{package}' (simulated fail)"));
            return Ok(CommandResult::err(
                format!("{name}: Unable to locate package '{package}'\n"),
                1,
            ));
        }

        ctx.log(format!("shimsh: {name} command '{subcommand}' recognized (simulated)"));
        Ok(CommandResult::ok(format!(
            "{name}: command '{subcommand}' recognized (simulated)\n"
        )))
    }
}
