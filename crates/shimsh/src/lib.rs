//! shimsh - a fake interactive shell over a jailed filesystem
//!
//! Lines typed at the prompt are split on `;`, `&&`, `||` and `|`, expanded
//! and dispatched to simulated commands. Nothing is ever executed on the
//! host: every path is clamped inside a jail root and every command is a
//! Rust handler that fabricates plausible output.
//!
//! # Example
//!
//! ```rust
//! use shimsh::Shell;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut shell = Shell::new();
//!     let result = shell.evaluate("echo hello && whoami").await;
//!     assert_eq!(result.output, "hello\ninkling\n");
//!     assert_eq!(result.exit_code, 0);
//! }
//! ```
//!
//! # Configuration
//!
//! ```rust
//! use shimsh::{FallbackPolicy, OsFlavor, Shell, SystemProfile};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> shimsh::Result<()> {
//! let mut shell = Shell::builder()
//!     .profile(SystemProfile::new().flavor(OsFlavor::Darwin).hostname("mbp"))
//!     .fallback(FallbackPolicy::Null)
//!     .populate(true)
//!     .build()
//!     .await?;
//!
//! assert_eq!(shell.evaluate("uname").await.output, "Darwin\n");
//! assert_eq!(shell.evaluate("nmap -sS 10.0.0.1").await.exit_code, 0);
//! assert_eq!(shell.prompt(), "inkling@mbp:/ $ ");
//! # Ok(())
//! # }
//! ```

mod builtins;
mod error;
mod fallback;
mod fs;
mod interpreter;
mod jail;
mod log;
mod network;
mod parser;
mod profile;
mod skeleton;

pub use async_trait::async_trait;
pub use builtins::{Builtin, Context as BuiltinContext, InputSource, NoInput, ScriptedInput};
pub use error::{Error, Result};
pub use fallback::FallbackPolicy;
pub use fs::{DirEntry, FileSystem, FileType, HostFs, InMemoryFs, Metadata};
pub use interpreter::{CommandResult, DEFAULT_PANIC_DELAY, SESSION_TERMINATED, Session};
pub use jail::{Jail, JailedPath};
pub use log::{LOG_FILE_NAME, SessionLog, redact_url, sanitize_for_log};
pub use network::{HostRules, NetworkOverrides, Response, Route};
pub use parser::{
    Expander, Lexer, Operator, ParsedCommand, Redirect, SequenceToken, Word, expand, split_pipes,
    tokenize,
};
pub use profile::{OsFlavor, SystemProfile};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use interpreter::Interpreter;

/// Main entry point: one fake shell session.
///
/// Every evaluation yields a [`CommandResult`]; faults inside commands are
/// turned into exit codes and messages, never errors. Check
/// [`CommandResult::terminates_session`] to know when to hang up.
pub struct Shell {
    interpreter: Interpreter,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    /// Create a shell over an empty in-memory filesystem with default settings.
    ///
    /// The tree is not populated and no log file is written; use
    /// [`Shell::builder`] for either.
    pub fn new() -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
        let jail = Jail::new("/", Arc::clone(&fs));
        Self {
            interpreter: Interpreter::new(fs, jail, SystemProfile::default()),
        }
    }

    /// Create a new ShellBuilder for customized configuration.
    pub fn builder() -> ShellBuilder {
        ShellBuilder::default()
    }

    /// Evaluate one line and return its combined output and exit code.
    pub async fn evaluate(&mut self, line: &str) -> CommandResult {
        self.interpreter.evaluate(line).await
    }

    /// Prompt for the next line: `user@host:/cwd $ `, `#` when root.
    pub fn prompt(&self) -> String {
        let session = self.interpreter.session();
        let profile = self.interpreter.profile();
        let sigil = if session.privileged { '#' } else { '$' };
        format!(
            "{}@{}:{} {sigil} ",
            profile.identity(session.privileged),
            profile.hostname,
            session.cwd
        )
    }

    /// Wipe the jail root (keeping the log), repopulate it and reset the
    /// session, like `rebuildfs --force`.
    pub async fn rebuild(&mut self) -> Result<()> {
        self.interpreter.rebuild().await
    }

    /// Session state: cwd, privilege, variables, log.
    pub fn session(&self) -> &Session {
        self.interpreter.session()
    }

    /// Identity of the simulated machine.
    pub fn profile(&self) -> &SystemProfile {
        self.interpreter.profile()
    }

    /// The path jail commands resolve through.
    pub fn jail(&self) -> &Jail {
        self.interpreter.jail()
    }
}

/// Builder for customized Shell configuration.
///
/// # Example
///
/// ```rust
/// use shimsh::{FallbackPolicy, Shell};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> shimsh::Result<()> {
/// let mut shell = Shell::builder()
///     .env("EDITOR", "ed")
///     .fallback("segfault".parse::<FallbackPolicy>().unwrap())
///     .build()
///     .await?;
///
/// let result = shell.evaluate("nc -l 4444").await;
/// assert!(result.terminates_session());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ShellBuilder {
    fs: Option<Arc<dyn FileSystem>>,
    root: Option<PathBuf>,
    env: HashMap<String, String>,
    profile: SystemProfile,
    fallback: FallbackPolicy,
    network: NetworkOverrides,
    input: Option<Arc<dyn InputSource>>,
    builtins: Vec<(String, Box<dyn Builtin>)>,
    panic_delay: Option<Duration>,
    log_message_limit: Option<usize>,
    populate: bool,
    log_file: bool,
}

impl ShellBuilder {
    /// Set a custom filesystem.
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /// Set the jail root, in the filesystem's own namespace. Defaults to `/`.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set an environment variable on top of the login environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the simulated machine identity.
    pub fn profile(mut self, profile: SystemProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set what happens for unknown commands.
    pub fn fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the canned responses `curl` answers with.
    pub fn network_overrides(mut self, network: NetworkOverrides) -> Self {
        self.network = network;
        self
    }

    /// Set where `read` takes interactive input from. Defaults to
    /// [`NoInput`].
    pub fn input(mut self, input: Arc<dyn InputSource>) -> Self {
        self.input = Some(input);
        self
    }

    /// Register a custom builtin command.
    ///
    /// Custom builtins replace catalog commands of the same name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shimsh::{Builtin, BuiltinContext, CommandResult, Shell, async_trait};
    ///
    /// struct Nmap;
    ///
    /// #[async_trait]
    /// impl Builtin for Nmap {
    ///     async fn execute(&self, ctx: BuiltinContext<'_>) -> shimsh::Result<CommandResult> {
    ///         let target = ctx.args.last().cloned().unwrap_or_default();
    ///         Ok(CommandResult::ok(format!("Host {target} seems down.\n")))
    ///     }
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> shimsh::Result<()> {
    /// let mut shell = Shell::builder().builtin("nmap", Box::new(Nmap)).build().await?;
    /// let result = shell.evaluate("nmap 10.0.0.1").await;
    /// assert_eq!(result.output, "Host 10.0.0.1 seems down.\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn builtin(mut self, name: impl Into<String>, builtin: Box<dyn Builtin>) -> Self {
        self.builtins.push((name.into(), builtin));
        self
    }

    /// Set how long the `panic` fallback stalls before printing.
    pub fn panic_delay(mut self, delay: Duration) -> Self {
        self.panic_delay = Some(delay);
        self
    }

    /// Cap the length of each session log message; longer ones are truncated.
    pub fn log_message_limit(mut self, len: usize) -> Self {
        self.log_message_limit = Some(len);
        self
    }

    /// Fill an empty root with an OS-flavored tree and create `/proc`.
    pub fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    /// Append the session log to `shimsh.log` at the root after each line.
    pub fn log_file(mut self, enabled: bool) -> Self {
        self.log_file = enabled;
        self
    }

    /// Build the Shell instance.
    ///
    /// Fails when the root is not a directory on the filesystem or when
    /// population fails.
    pub async fn build(self) -> Result<Shell> {
        let fs = self.fs.unwrap_or_else(|| Arc::new(InMemoryFs::new()));
        let root = self.root.unwrap_or_else(|| PathBuf::from("/"));

        let meta = fs.stat(&root).await?;
        if !meta.file_type.is_dir() {
            return Err(Error::Execution(format!(
                "jail root {} is not a directory",
                root.display()
            )));
        }

        let jail = Jail::new(root, Arc::clone(&fs));
        let mut interpreter = Interpreter::new(fs, jail, self.profile);

        for (key, value) in &self.env {
            interpreter.set_env(key, value);
        }
        for (name, builtin) in self.builtins {
            interpreter.register(name, builtin);
        }
        interpreter.set_fallback(self.fallback);
        interpreter.set_network(self.network);
        if let Some(input) = self.input {
            interpreter.set_input(input);
        }
        if let Some(delay) = self.panic_delay {
            interpreter.set_panic_delay(delay);
        }
        if let Some(len) = self.log_message_limit {
            interpreter.set_log_message_limit(len);
        }
        interpreter.set_persist_log(self.log_file);

        interpreter.boot(self.populate).await?;
        Ok(Shell { interpreter })
    }
}
