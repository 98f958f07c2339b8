//! Interpreter for fake shell command lines
//!
//! A line is evaluated in layers: operator sequencing (`;`, `&&`, `||`), then
//! pipes, then a single command with its redirection. Each sequence segment
//! is parsed only when it runs, so variables set by an earlier segment are
//! visible to later ones.

mod state;

pub use state::{CommandResult, SESSION_TERMINATED, Session};
pub(crate) use state::is_protected;

use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::builtins::{self, Builtin, Context, InputSource, NoInput};
use crate::error::{Error, Result};
use crate::fallback::{FallbackPolicy, KERNEL_OOPS, SEGFAULT_TEXT, SQUIDNET_TEXT};
use crate::fs::FileSystem;
use crate::jail::{Jail, JailedPath};
use crate::log::LOG_FILE_NAME;
use crate::network::NetworkOverrides;
use crate::parser::{Expander, ParsedCommand, Redirect, SequenceToken, split_pipes, tokenize};
use crate::profile::SystemProfile;
use crate::skeleton;

/// Default stall before the `panic` fallback prints its oops.
pub const DEFAULT_PANIC_DELAY: Duration = Duration::from_secs(10);

/// Directory holding transient pipe files.
const PIPE_DIR: &str = "/tmp";

/// Names tried before giving up on a free pipe file.
const PIPE_NAME_ATTEMPTS: usize = 16;

/// Interpreter state.
pub struct Interpreter {
    fs: Arc<dyn FileSystem>,
    jail: Jail,
    env: HashMap<String, String>,
    profile: SystemProfile,
    network: NetworkOverrides,
    input: Arc<dyn InputSource>,
    fallback: FallbackPolicy,
    builtins: HashMap<String, Box<dyn Builtin>>,
    session: Session,
    panic_delay: Duration,
    persist_log: bool,
}

impl Interpreter {
    /// Create an interpreter with the default command table.
    pub fn new(fs: Arc<dyn FileSystem>, jail: Jail, profile: SystemProfile) -> Self {
        let builtins = builtins::default_table(&profile);
        let env = profile.login_env();
        let session = Session::new(jail.root_path());

        Self {
            fs,
            jail,
            env,
            profile,
            network: NetworkOverrides::default(),
            input: Arc::new(NoInput),
            fallback: FallbackPolicy::default(),
            builtins,
            session,
            panic_delay: DEFAULT_PANIC_DELAY,
            persist_log: false,
        }
    }

    /// Set an environment variable.
    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env.insert(key.to_string(), value.to_string());
    }

    /// Set the policy for unknown commands.
    pub fn set_fallback(&mut self, fallback: FallbackPolicy) {
        self.fallback = fallback;
    }

    /// Set the canned responses `curl` answers with.
    pub fn set_network(&mut self, network: NetworkOverrides) {
        self.network = network;
    }

    /// Set where `read` takes interactive input from.
    pub fn set_input(&mut self, input: Arc<dyn InputSource>) {
        self.input = input;
    }

    /// Set how long the `panic` fallback stalls.
    pub fn set_panic_delay(&mut self, delay: Duration) {
        self.panic_delay = delay;
    }

    /// Append the session log to `shimsh.log` after every evaluation.
    pub fn set_persist_log(&mut self, persist: bool) {
        self.persist_log = persist;
    }

    /// Cap the length of recorded log messages.
    pub fn set_log_message_limit(&mut self, len: usize) {
        self.session.log = std::mem::take(&mut self.session.log).max_message_length(len);
    }

    /// Add or replace a command.
    pub fn register(&mut self, name: String, builtin: Box<dyn Builtin>) {
        self.builtins.insert(name, builtin);
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Path jail.
    pub fn jail(&self) -> &Jail {
        &self.jail
    }

    /// Simulated machine identity.
    pub fn profile(&self) -> &SystemProfile {
        &self.profile
    }

    /// Check the jail root, populate it when empty and create `/proc`.
    pub async fn boot(&mut self, populate: bool) -> Result<()> {
        self.session.log.record("shimsh: checking fakeroot");
        if populate {
            if skeleton::is_empty(self.fs.as_ref(), &self.jail).await? {
                self.session
                    .log
                    .record("shimsh: fakeroot is empty, populating structure");
                skeleton::populate(
                    self.fs.as_ref(),
                    &self.jail,
                    &self.profile,
                    &mut self.session.log,
                )
                .await?;
            } else {
                self.session.log.record("shimsh: fakeroot already populated");
            }
            self.session.process_owners = skeleton::create_proc(
                self.fs.as_ref(),
                &self.jail,
                &self.profile,
                &mut self.session.log,
            )
            .await?;
        }
        self.session.log.record("shimsh: startup complete");
        self.flush_log().await;
        Ok(())
    }

    /// Wipe and repopulate the root, then reset the session.
    pub async fn rebuild(&mut self) -> Result<()> {
        let mut ctx = Context {
            args: &[],
            session: &mut self.session,
            env: &self.env,
            fs: Arc::clone(&self.fs),
            jail: &self.jail,
            profile: &self.profile,
            network: &self.network,
            input: self.input.as_ref(),
        };
        let result = builtins::rebuild(&mut ctx).await;
        self.flush_log().await;
        result
    }

    /// Evaluate one line typed at the prompt.
    pub async fn evaluate(&mut self, line: &str) -> CommandResult {
        self.session
            .log
            .record(format!("shimsh: running command: {line}"));

        let mut line = line.trim();
        if let Some(rest) = line.strip_prefix("sudo ") {
            self.session.elevate();
            line = rest.trim();
        }

        let result = self.run_sequence(line).await;
        self.flush_log().await;
        result
    }

    async fn flush_log(&mut self) {
        if self.persist_log {
            let path = self.jail.root().join(LOG_FILE_NAME);
            self.session.log.flush(self.fs.as_ref(), &path).await;
        }
    }

    async fn run_sequence(&mut self, line: &str) -> CommandResult {
        let mut output = String::new();
        let mut exit_code = 0;

        for token in tokenize(line) {
            match token {
                SequenceToken::Command(text) => {
                    let result = self.run_pipeline(&text).await;
                    output.push_str(&result.output);
                    exit_code = result.exit_code;
                    if result.terminates_session() {
                        break;
                    }
                }
                SequenceToken::Operator(op) => {
                    if !op.continues_after(exit_code) {
                        self.session.log.record(format!(
                            "shimsh: short-circuit at '{op}' after exit code {exit_code}"
                        ));
                        break;
                    }
                }
            }
        }

        CommandResult { exit_code, output }
    }

    async fn run_pipeline(&mut self, text: &str) -> CommandResult {
        let stages = split_pipes(text);
        let last = stages.len().saturating_sub(1);

        let mut previous: Option<String> = None;
        let mut result = CommandResult::default();
        let mut redirect = None;

        for (i, stage) in stages.iter().enumerate() {
            let parsed = match self.parse(stage) {
                Ok(parsed) => parsed,
                Err(fault) => return fault,
            };
            if i == last {
                redirect = parsed.redirect.clone();
            }
            let Some(name) = parsed.name() else {
                continue;
            };
            if stages.len() > 1 {
                self.session
                    .log
                    .record(format!("shimsh: pipe stage {}: {name}", i + 1));
            }

            let mut argv = parsed.argv;
            let mut pipe_file = None;
            if let Some(input) = previous.as_deref() {
                if argv.iter().any(|w| w == "-") {
                    match self.write_pipe_input(input).await {
                        Ok(path) => {
                            let virt = path.virtual_path();
                            for word in argv.iter_mut().filter(|w| *w == "-") {
                                *word = virt.clone();
                            }
                            pipe_file = Some(path);
                        }
                        Err(e) => {
                            self.session
                                .log
                                .record(format!("shimsh: pipe error: {}", e.reason()));
                            return CommandResult::err(format!("shimsh: pipe: {}\n", e.reason()), 1);
                        }
                    }
                }
            }

            result = self.dispatch(argv).await;

            if let Some(path) = pipe_file {
                self.remove_pipe_input(&path).await;
            }
            if result.terminates_session() {
                return result;
            }
            previous = Some(result.output.clone());
        }

        match redirect {
            Some(redirect) => self.apply_redirect(&redirect, result).await,
            None => result,
        }
    }

    fn parse(&mut self, text: &str) -> std::result::Result<ParsedCommand, CommandResult> {
        let expander = Expander::new(&self.session.variables, &self.env);
        let parsed = ParsedCommand::parse(text, &expander);
        parsed.map_err(|e| {
            self.session
                .log
                .record(format!("shimsh: parse error: {}", e.reason()));
            CommandResult::err("", 2)
        })
    }

    /// Materialize piped output as a fresh file under `/tmp`.
    ///
    /// The file is never written through a link: names that already exist
    /// are skipped, and a `/tmp` that resolves somewhere protected is refused.
    async fn write_pipe_input(&mut self, input: &str) -> Result<JailedPath> {
        let dir = self.jail.resolve(&self.session.cwd, PIPE_DIR).await;
        if !self.session.may_modify(&dir) {
            return Err(Error::Execution(format!("{dir}: Permission denied")));
        }
        self.fs.mkdir(dir.host(), true).await?;

        for _ in 0..PIPE_NAME_ATTEMPTS {
            let id = self.session.next_pipe_id();
            let path = self
                .jail
                .resolve_entry(&dir, &format!(".shimsh-pipe-{id}"))
                .await;
            if self.fs.symlink_metadata(path.host()).await.is_ok() {
                self.session
                    .log
                    .record(format!("shimsh: pipe file {path} exists, skipping"));
                continue;
            }
            self.fs.write_file(path.host(), input.as_bytes()).await?;
            return Ok(path);
        }
        Err(Error::Execution("no free pipe file name".to_string()))
    }

    /// Delete a pipe file, unless the stage swapped it for something else.
    async fn remove_pipe_input(&mut self, path: &JailedPath) {
        match self.fs.symlink_metadata(path.host()).await {
            Ok(meta) if meta.file_type.is_file() => {
                if let Err(e) = self.fs.remove(path.host(), false).await {
                    tracing::debug!(target: "shimsh", error = %e, "pipe file cleanup failed");
                }
            }
            _ => {}
        }
    }

    async fn apply_redirect(&mut self, redirect: &Redirect, result: CommandResult) -> CommandResult {
        let raw = redirect.target.as_str();
        let target = self.jail.resolve(&self.session.cwd, raw).await;
        if !self.session.may_modify(&target) {
            self.session
                .log
                .record(format!("shimsh: redirect to {target} denied"));
            return CommandResult::err(format!("shimsh: {raw}: Permission denied\n"), 1);
        }

        let bytes = result.output.as_bytes();
        let written = if redirect.append {
            self.fs.append_file(target.host(), bytes).await
        } else {
            self.fs.write_file(target.host(), bytes).await
        };
        match written {
            Ok(()) => {
                let mode = if redirect.append { "appended" } else { "wrote" };
                self.session
                    .log
                    .record(format!("shimsh: {mode} output to {target}"));
                CommandResult::err("", result.exit_code)
            }
            Err(e) => {
                self.session
                    .log
                    .record(format!("shimsh: redirect to {target} failed: {}", e.reason()));
                CommandResult::err(format!("shimsh: {raw}: {}\n", e.reason()), 1)
            }
        }
    }

    async fn dispatch(&mut self, argv: Vec<String>) -> CommandResult {
        let mut argv = argv.as_slice();
        while argv.first().is_some_and(|w| w == "sudo") {
            argv = &argv[1..];
            if argv.is_empty() {
                return CommandResult::err("usage: sudo command\n", 1);
            }
            self.session.elevate();
        }
        let Some((name, args)) = argv.split_first() else {
            return CommandResult::default();
        };

        if args.is_empty() {
            if let Some((var, value)) = name.split_once('=') {
                if builtins::is_valid_name(var) {
                    self.session
                        .variables
                        .insert(var.to_string(), value.to_string());
                    self.session.log.record(format!("shimsh: set {var}"));
                    return CommandResult::default();
                }
            }
        }

        let Some(builtin) = self.builtins.get(name.as_str()) else {
            return self.fallback(name).await;
        };

        let ctx = Context {
            args,
            session: &mut self.session,
            env: &self.env,
            fs: Arc::clone(&self.fs),
            jail: &self.jail,
            profile: &self.profile,
            network: &self.network,
            input: self.input.as_ref(),
        };
        let outcome = AssertUnwindSafe(builtin.execute(ctx)).catch_unwind().await;

        let reason = match outcome {
            Ok(Ok(result)) => return result,
            Ok(Err(e)) => e.reason(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        self.session
            .log
            .record(format!("shimsh: error simulating '{name}': {reason}"));
        CommandResult::err(format!("shimsh: error simulating '{name}': {reason}\n"), 1)
    }

    async fn fallback(&mut self, name: &str) -> CommandResult {
        self.session.log.record(format!(
            "shimsh: unknown command '{name}', fallback mode {}",
            self.fallback
        ));
        match &self.fallback {
            FallbackPolicy::Error => {
                CommandResult::err(format!("shimsh: {name}: command not found\n"), 127)
            }
            FallbackPolicy::Segfault => CommandResult::err(SEGFAULT_TEXT, SESSION_TERMINATED),
            FallbackPolicy::Panic => {
                tokio::time::sleep(self.panic_delay).await;
                CommandResult::err(KERNEL_OOPS, SESSION_TERMINATED)
            }
            FallbackPolicy::Null => CommandResult::default(),
            FallbackPolicy::Squidnet => CommandResult::err(SQUIDNET_TEXT, 1),
            FallbackPolicy::Other(mode) => {
                self.session
                    .log
                    .record(format!("shimsh: unrecognized fallback mode '{mode}'"));
                CommandResult::default()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Context;
    use crate::fs::InMemoryFs;
    use async_trait::async_trait;

    fn interpreter() -> Interpreter {
        let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
        let jail = Jail::new("/", Arc::clone(&fs));
        Interpreter::new(fs, jail, SystemProfile::new())
    }

    struct Faulty;

    #[async_trait]
    impl Builtin for Faulty {
        async fn execute(&self, ctx: Context<'_>) -> Result<CommandResult> {
            match ctx.args.first().map(String::as_str) {
                Some("panic") => panic!("boom"),
                _ => Err(Error::Execution("disk on fire".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_sequence_short_circuit() {
        let mut interp = interpreter();
        let result = interp.evaluate("false && echo a; echo b").await;
        assert_eq!(result.output, "");
        assert_eq!(result.exit_code, 1);

        let result = interp.evaluate("false || echo a && echo b").await;
        assert_eq!(result.output, "a\nb\n");
    }

    #[tokio::test]
    async fn test_empty_line() {
        let mut interp = interpreter();
        assert_eq!(interp.evaluate("   ").await, CommandResult::ok(""));
        assert_eq!(interp.evaluate(";;").await, CommandResult::ok(""));
    }

    #[tokio::test]
    async fn test_parse_error_exits_2() {
        let mut interp = interpreter();
        let result = interp.evaluate("echo 'unterminated").await;
        assert_eq!(result, CommandResult::err("", 2));
        let log = interp.session().log.entries().join("\n");
        assert!(log.contains("shimsh: parse error:"));
    }

    #[tokio::test]
    async fn test_handler_faults_are_contained() {
        let mut interp = interpreter();
        interp.register("faulty".into(), Box::new(Faulty));

        let result = interp.evaluate("faulty").await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(
            result.output,
            "shimsh: error simulating 'faulty': disk on fire\n"
        );

        let result = interp.evaluate("faulty panic; echo still here").await;
        assert_eq!(
            result.output,
            "shimsh: error simulating 'faulty': boom\nstill here\n"
        );
    }

    #[tokio::test]
    async fn test_sudo_word_inside_sequence() {
        let mut interp = interpreter();
        assert_eq!(interp.evaluate("whoami").await.output, "inkling\n");
        let result = interp.evaluate("true && sudo whoami").await;
        assert_eq!(result.output, "root\n");
        assert!(interp.session().privileged);

        let result = interp.evaluate("sudo sudo").await;
        assert_eq!(result, CommandResult::err("usage: sudo command\n", 1));
    }

    #[tokio::test]
    async fn test_assignment_word() {
        let mut interp = interpreter();
        let result = interp.evaluate("GREETING=hi; echo $GREETING").await;
        assert_eq!(result.output, "hi\n");
    }

    #[tokio::test]
    async fn test_pipe_dash_receives_previous_output() {
        let mut interp = interpreter();
        let result = interp.evaluate("echo one two | cat -").await;
        assert_eq!(result.output, "one two\n");

        let result = interp.evaluate("echo ignored | echo fresh").await;
        assert_eq!(result.output, "fresh\n");

        // Transient files are cleaned up.
        let tmp = interp.fs.read_dir(std::path::Path::new("/tmp")).await.unwrap();
        assert!(tmp.is_empty());
    }

    #[tokio::test]
    async fn test_pipe_file_skips_planted_link() {
        let mut interp = interpreter();
        interp.evaluate("sudo mkdir -p /etc /tmp").await;
        interp.evaluate("sudo true").await;
        interp.evaluate("echo root:x:0:0 > /etc/passwd").await;
        interp.session.privileged = false;

        interp.evaluate("ln -s /etc/passwd /tmp/.shimsh-pipe-1").await;
        let result = interp.evaluate("echo hacked | cat -").await;
        assert_eq!(result, CommandResult::ok("hacked\n"));

        let passwd = interp.evaluate("cat /etc/passwd").await;
        assert_eq!(passwd, CommandResult::ok("root:x:0:0\n"));
        // The planted link is left alone; the pipe used the next name.
        let link = interp.fs.symlink_metadata(std::path::Path::new("/tmp/.shimsh-pipe-1")).await;
        assert!(link.unwrap().file_type.is_symlink());
        assert!(!interp.fs.exists(std::path::Path::new("/tmp/.shimsh-pipe-2")).await.unwrap());
        let log = interp.session().log.entries().join("\n");
        assert!(log.contains("shimsh: pipe file /tmp/.shimsh-pipe-1 exists, skipping"));
    }

    #[tokio::test]
    async fn test_pipe_file_refuses_protected_tmp() {
        let mut interp = interpreter();
        interp.evaluate("sudo mkdir -p /etc").await;
        interp.session.privileged = false;

        interp.evaluate("ln -s /etc /tmp").await;
        let result = interp.evaluate("echo hacked | cat -").await;
        assert_eq!(result, CommandResult::err("shimsh: pipe: /etc: Permission denied\n", 1));
        assert!(interp.fs.read_dir(std::path::Path::new("/etc")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipe_stages_are_logged() {
        let mut interp = interpreter();
        interp.evaluate("echo a | cat - | cat -").await;
        let log = interp.session().log.entries().join("\n");
        assert!(log.contains("shimsh: pipe stage 1: echo"));
        assert!(log.contains("shimsh: pipe stage 3: cat"));
    }

    #[tokio::test]
    async fn test_redirect_failures() {
        let mut interp = interpreter();
        let result = interp.evaluate("echo hi > /missing/out.txt").await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.output, "shimsh: /missing/out.txt: No such file or directory\n");

        interp.evaluate("sudo true").await;
        let result = interp.evaluate("echo hi > /").await;
        assert_eq!(result.output, "shimsh: /: Is a directory\n");
    }

    #[tokio::test]
    async fn test_redirect_into_protected_path() {
        let mut interp = interpreter();
        let result = interp.evaluate("echo pwned > /etc/motd").await;
        assert_eq!(result.output, "shimsh: /etc/motd: Permission denied\n");
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn test_redirect_keeps_exit_code() {
        let mut interp = interpreter();
        let result = interp.evaluate("cat nope > err.txt").await;
        assert_eq!(result.output, "");
        assert_eq!(result.exit_code, 1);
        let saved = interp.evaluate("cat err.txt").await.output;
        assert!(saved.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn test_fallback_modes() {
        let mut interp = interpreter();
        let result = interp.evaluate("frobnicate").await;
        assert_eq!(result.exit_code, 127);
        assert_eq!(result.output, "shimsh: frobnicate: command not found\n");

        interp.set_fallback(FallbackPolicy::Segfault);
        let result = interp.evaluate("frobnicate; echo never").await;
        assert_eq!(result.output, SEGFAULT_TEXT);
        assert!(result.terminates_session());

        interp.set_fallback(FallbackPolicy::Null);
        assert_eq!(interp.evaluate("frobnicate").await, CommandResult::ok(""));

        interp.set_fallback(FallbackPolicy::Squidnet);
        let result = interp.evaluate("frobnicate").await;
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("Error 2124-4508"));

        interp.set_fallback("haiku".parse().unwrap());
        assert_eq!(interp.evaluate("frobnicate").await, CommandResult::ok(""));
    }

    #[tokio::test]
    async fn test_panic_fallback_waits() {
        let mut interp = interpreter();
        interp.set_fallback(FallbackPolicy::Panic);
        interp.set_panic_delay(Duration::from_millis(10));

        let started = std::time::Instant::now();
        let result = interp.evaluate("frobnicate").await;
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert!(result.output.contains("Kernel panic - not syncing"));
        assert_eq!(result.exit_code, SESSION_TERMINATED);
    }

    #[tokio::test]
    async fn test_log_persisted_when_enabled() {
        let mut interp = interpreter();
        interp.set_persist_log(true);
        interp.evaluate("echo hi").await;

        let bytes = interp
            .fs
            .read_file(std::path::Path::new("/shimsh.log"))
            .await
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("shimsh: running command: echo hi\n"));
    }
}
