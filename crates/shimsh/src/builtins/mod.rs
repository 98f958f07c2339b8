//! Simulated commands
//!
//! This module provides the [`Builtin`] trait for implementing commands and
//! the [`Context`] struct they run in. The shell ships a catalog of commands
//! that imitate their real counterparts' output; embedders can add or
//! replace entries.
//!
//! # Custom Builtins
//!
//! ```rust
//! use shimsh::{Builtin, BuiltinContext, CommandResult, async_trait};
//!
//! struct Fortune;
//!
//! #[async_trait]
//! impl Builtin for Fortune {
//!     async fn execute(&self, ctx: BuiltinContext<'_>) -> shimsh::Result<CommandResult> {
//!         let who = ctx.identity().to_string();
//!         Ok(CommandResult::ok(format!("{who}, you will stay in this shell forever.\n")))
//!     }
//! }
//! ```
//!
//! Register via [`ShellBuilder::builtin`](crate::ShellBuilder::builtin).

mod cat;
mod curl;
mod dmesg;
mod echo;
mod fileops;
mod flow;
mod grep;
mod headtail;
mod inspect;
mod ls;
mod navigation;
mod package;
mod process;
mod read;
mod rebuild;
mod sleep;
mod system;
mod uptime;
mod vars;

pub use cat::Cat;
pub use curl::Curl;
pub use dmesg::Dmesg;
pub use echo::Echo;
pub use fileops::{Ln, Mkdir, Rm, Rmdir, Touch};
pub use flow::{False, True};
pub use grep::Grep;
pub use headtail::{Head, Tail};
pub use inspect::Stat;
pub use ls::Ls;
pub use navigation::{Cd, Pwd};
pub use package::PackageManager;
pub use process::{Free, Kill, Ps};
pub use read::{InputSource, NoInput, Read, ScriptedInput};
pub use rebuild::Rebuildfs;
pub use sleep::Sleep;
pub use system::{Hostname, Id, Passwd, Uname, Whoami};
pub use uptime::Uptime;
pub use vars::{Env, Export, Unset};

pub(crate) use rebuild::rebuild;
pub(crate) use vars::is_valid_name;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::FileSystem;
use crate::interpreter::{CommandResult, Session};
use crate::jail::{Jail, JailedPath};
use crate::network::NetworkOverrides;
use crate::profile::SystemProfile;

/// Execution context for builtin commands.
///
/// Everything a command may look at or change. Paths must go through
/// [`Context::resolve`]; `fs` is only ever handed jailed host paths.
pub struct Context<'a> {
    /// Command arguments (not including the command name).
    ///
    /// For `mycommand arg1 arg2`, this contains `["arg1", "arg2"]`.
    pub args: &'a [String],

    /// Session state: cwd, privilege, variables, log.
    pub session: &'a mut Session,

    /// Environment the session was started with.
    pub env: &'a HashMap<String, String>,

    /// Backing filesystem.
    pub fs: Arc<dyn FileSystem>,

    /// Path jail.
    pub jail: &'a Jail,

    /// Identity of the simulated machine.
    pub profile: &'a SystemProfile,

    /// Canned HTTP responses for `curl`.
    pub network: &'a NetworkOverrides,

    /// Interactive input for `read`.
    pub input: &'a dyn InputSource,
}

impl<'a> Context<'a> {
    /// Resolve a user-supplied path against the cwd, inside the jail.
    pub async fn resolve(&self, raw: &str) -> JailedPath {
        self.jail.resolve(&self.session.cwd, raw).await
    }

    /// Record a line in the session log.
    pub fn log(&mut self, message: impl AsRef<str>) {
        self.session.log.record(message);
    }

    /// `root` when privileged, otherwise the profile's user.
    pub fn identity(&self) -> &str {
        self.profile.identity(self.session.privileged)
    }

    /// Session variable, then environment.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.session
            .variables
            .get(name)
            .or_else(|| self.env.get(name))
            .map(String::as_str)
    }
}

/// Trait for implementing builtin commands.
///
/// All builtins must implement this trait. The trait requires `Send + Sync`
/// for thread safety in async contexts.
///
/// # Return Values
///
/// Return [`CommandResult::ok`](crate::CommandResult::ok) for success with
/// output, or [`CommandResult::err`](crate::CommandResult::err) for an
/// ordinary failure with an exit code. `Err` (and panics) are reserved for
/// faults; the dispatcher turns them into exit code 1 with a diagnostic.
#[async_trait]
pub trait Builtin: Send + Sync {
    /// Execute the builtin command.
    async fn execute(&self, ctx: Context<'_>) -> Result<CommandResult>;
}

/// Names of the commands in the default catalog.
pub(crate) fn catalog_names(profile: &SystemProfile) -> Vec<String> {
    let mut names: Vec<String> = [
        "cat", "cd", "curl", "dmesg", "echo", "env", "export", "false", "free", "grep", "head",
        "hostname", "id", "kill", "ln", "ls", "mkdir", "passwd", "ps", "pwd", "read", "rebuildfs",
        "rm", "rmdir", "sleep", "stat", "tail", "touch", "true", "uname", "unset", "uptime",
        "whoami",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    names.push(profile.package_manager.clone());
    names
}

/// The default command table.
pub(crate) fn default_table(profile: &SystemProfile) -> HashMap<String, Box<dyn Builtin>> {
    let mut table: HashMap<String, Box<dyn Builtin>> = HashMap::new();

    table.insert("echo".into(), Box::new(Echo));
    table.insert("true".into(), Box::new(True));
    table.insert("false".into(), Box::new(False));
    table.insert("cd".into(), Box::new(Cd));
    table.insert("pwd".into(), Box::new(Pwd));
    table.insert("ls".into(), Box::new(Ls));
    table.insert("cat".into(), Box::new(Cat));
    table.insert("touch".into(), Box::new(Touch));
    table.insert("rm".into(), Box::new(Rm));
    table.insert("mkdir".into(), Box::new(Mkdir));
    table.insert("rmdir".into(), Box::new(Rmdir));
    table.insert("ln".into(), Box::new(Ln));
    table.insert("head".into(), Box::new(Head));
    table.insert("tail".into(), Box::new(Tail));
    table.insert("stat".into(), Box::new(Stat));
    table.insert("grep".into(), Box::new(Grep));
    table.insert("whoami".into(), Box::new(Whoami));
    table.insert("id".into(), Box::new(Id));
    table.insert("hostname".into(), Box::new(Hostname));
    table.insert("uname".into(), Box::new(Uname));
    table.insert("passwd".into(), Box::new(Passwd));
    table.insert("ps".into(), Box::new(Ps));
    table.insert("kill".into(), Box::new(Kill));
    table.insert("free".into(), Box::new(Free));
    table.insert("uptime".into(), Box::new(Uptime));
    table.insert("sleep".into(), Box::new(Sleep));
    table.insert("dmesg".into(), Box::new(Dmesg));
    table.insert("export".into(), Box::new(Export));
    table.insert("unset".into(), Box::new(Unset));
    table.insert("env".into(), Box::new(Env));
    table.insert("read".into(), Box::new(Read));
    table.insert("rebuildfs".into(), Box::new(Rebuildfs));
    table.insert("curl".into(), Box::new(Curl));
    table.insert(
        profile.package_manager.clone(),
        Box::new(PackageManager::new(profile.package_manager.clone())),
    );

    table
}

/// Split leading `-x` flags from operands. `--` ends flags.
pub(crate) fn split_flags(args: &[String]) -> (Vec<&str>, Vec<&str>) {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    let mut only_operands = false;
    for arg in args {
        if only_operands {
            operands.push(arg.as_str());
        } else if arg == "--" {
            only_operands = true;
        } else if arg.len() > 1 && arg.starts_with('-') {
            flags.push(arg.as_str());
        } else {
            operands.push(arg.as_str());
        }
    }
    (flags, operands)
}
