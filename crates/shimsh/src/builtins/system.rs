//! System info builtins - whoami, id, hostname, uname, passwd
//!
//! Everything is read from the [`SystemProfile`](crate::SystemProfile), never
//! from the host.

use async_trait::async_trait;
use chrono::Utc;

use super::{Builtin, Context};
use crate::error::Result;
use crate::interpreter::CommandResult;
use crate::profile::{OsFlavor, SystemProfile};

/// The whoami builtin - `root` after sudo, the profile user otherwise.
pub struct Whoami;

#[async_trait]
impl Builtin for Whoami {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let user = ctx.identity().to_string();
        ctx.log(format!("shimsh: whoami -> {user}"));
        Ok(CommandResult::ok(format!("{user}\n")))
    }
}

/// The id builtin - print user and group IDs.
pub struct Id;

#[async_trait]
impl Builtin for Id {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        let user = ctx.identity().to_string();
        let uid = if ctx.session.privileged { 0 } else { ctx.profile.uid };
        let line = format!("uid={uid}({user}) gid={uid}({user}) groups={uid}({user})");
        ctx.log(format!("shimsh: id -> {line}"));
        Ok(CommandResult::ok(format!("{line}\n")))
    }
}

/// The hostname builtin.
pub struct Hostname;

#[async_trait]
impl Builtin for Hostname {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        ctx.log("shimsh: hostname");
        Ok(CommandResult::ok(format!("{}\n", ctx.profile.hostname)))
    }
}

/// The passwd builtin - pretends to change the password.
pub struct Passwd;

#[async_trait]
impl Builtin for Passwd {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        ctx.log("shimsh: passwd (simulated, does nothing)");
        Ok(CommandResult::ok(
            "Changing password for user.\nCurrent password: \nNew password: \n\
             Retype new password: \npasswd: password updated successfully (simulated)\n",
        ))
    }
}

const UNAME_HELP: &str = "\
Usage: uname [OPTION]...
Print certain system information.  With no OPTION, same as -s.

  -a, --all                print all information
  -s, --kernel-name        print the kernel name
  -n, --nodename           print the network node hostname
  -r, --kernel-release     print the kernel release
  -v, --kernel-version     print the kernel version
  -m, --machine            print the machine hardware name
  -p, --processor          print the processor type
  -i, --hardware-platform  print the hardware platform
  -o, --operating-system   print the operating system
  -h, --help               display this help and exit
";

/// The fields `uname` can print, in output order.
struct UnameFields {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: &'static str,
    processor: &'static str,
    hardware: &'static str,
    os: &'static str,
}

impl UnameFields {
    fn for_profile(profile: &SystemProfile) -> Self {
        let release = profile.kernel_release().to_string();
        let nodename = profile.hostname.clone();
        match profile.flavor {
            OsFlavor::Linux => Self {
                sysname: "Linux".to_string(),
                nodename,
                release,
                version: format!("#1 SMP {}", Utc::now().format("%a %b %d %H:%M:%S UTC %Y")),
                machine: "x86_64",
                processor: "x86_64",
                hardware: "x86_64",
                os: "linux",
            },
            OsFlavor::Darwin => {
                let major: u32 = release
                    .split('.')
                    .next()
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(0);
                // Darwin 20 is Big Sur, the first release on Apple Silicon.
                let (build, machine, processor, hardware) = if major >= 20 {
                    ("RELEASE_ARM64_T8103", "arm64", "arm", "arm64")
                } else {
                    ("RELEASE_X86_64", "x86_64", "i386", "i386")
                };
                Self {
                    sysname: "Darwin".to_string(),
                    nodename,
                    version: format!(
                        "Darwin Kernel Version {release}: Wed Mar  8 22:21:07 PST 2023; \
                         root:xnu-8796.141.3~1/{build}"
                    ),
                    release,
                    machine,
                    processor,
                    hardware,
                    os: "darwin",
                }
            }
            OsFlavor::Bsd => Self {
                sysname: "FreeBSD".to_string(),
                nodename,
                release: "13.2-RELEASE".to_string(),
                version: "FreeBSD 13.2-RELEASE GENERIC".to_string(),
                machine: "amd64",
                processor: "amd64",
                hardware: "amd64",
                os: "freebsd",
            },
        }
    }
}

/// The uname builtin - print system information.
///
/// Usage: uname [-asnrvmpio]
pub struct Uname;

#[async_trait]
impl Builtin for Uname {
    async fn execute(&self, mut ctx: Context<'_>) -> Result<CommandResult> {
        // sysname, nodename, release, version, machine, processor, hardware, os
        let mut show = [false; 8];
        for arg in ctx.args {
            let slot = match arg.as_str() {
                "-a" | "--all" => {
                    show = [true; 8];
                    continue;
                }
                "-s" | "--kernel-name" => 0,
                "-n" | "--nodename" => 1,
                "-r" | "--kernel-release" => 2,
                "-v" | "--kernel-version" => 3,
                "-m" | "--machine" => 4,
                "-p" | "--processor" => 5,
                "-i" | "--hardware-platform" => 6,
                "-o" | "--operating-system" => 7,
                "-h" | "--help" => return Ok(CommandResult::ok(UNAME_HELP)),
                flag if flag.starts_with('-') => {
                    let message = format!(
                        "uname: invalid option -- '{}'\nTry 'uname --help' for more information.\n",
                        flag.trim_start_matches('-')
                    );
                    ctx.log(format!("shimsh: uname error -> {}", message.trim()));
                    return Ok(CommandResult::err(message, 1));
                }
                _ => continue,
            };
            show[slot] = true;
        }
        if !show.contains(&true) {
            show[0] = true;
        }

        let fields = UnameFields::for_profile(ctx.profile);
        let values: [&str; 8] = [
            &fields.sysname,
            &fields.nodename,
            &fields.release,
            &fields.version,
            fields.machine,
            fields.processor,
            fields.hardware,
            fields.os,
        ];
        let line = values
            .iter()
            .zip(show)
            .filter(|(_, on)| *on)
            .map(|(value, _)| *value)
            .collect::<Vec<_>>()
            .join(" ");

        ctx.log(format!("shimsh: uname {} -> {line}", ctx.args.join(" ")));
        Ok(CommandResult::ok(format!("{line}\n")))
    }
}
