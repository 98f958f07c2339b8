//! shimsh CLI - interactive fake shell
//!
//! Usage:
//!   shimsh                         # Interactive session over ~/fakeroot
//!   shimsh -c 'uname -a'           # Evaluate one line and exit
//!   shimsh --in-memory             # Throwaway session, nothing on disk
//!   shimsh --os-flavor darwin --fallback segfault

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shimsh::{
    CommandResult, FallbackPolicy, FileSystem, HostFs, InMemoryFs, InputSource, NetworkOverrides,
    OsFlavor, Shell, SystemProfile, async_trait,
};

/// shimsh - fake interactive shell over a jailed directory
#[derive(Parser, Debug)]
#[command(name = "shimsh")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Evaluate the given line and exit with its code
    #[arg(short = 'c', long = "command")]
    command: Option<String>,

    /// Fallback mode for unknown commands (error, segfault, panic, null, squidnet)
    #[arg(long, default_value = "error")]
    fallback: FallbackPolicy,

    /// Simulated OS flavor (Linux, Darwin, BSD)
    #[arg(long, default_value = "Linux")]
    os_flavor: OsFlavor,

    /// Login name
    #[arg(long, default_value = "inkling")]
    username: String,

    /// User id
    #[arg(long, default_value_t = 1337)]
    uid: u32,

    /// Host name
    #[arg(long, default_value = "fakeos")]
    hostname: String,

    /// Distribution name
    #[arg(long, default_value = "FakeOS")]
    distro_name: String,

    /// Distribution codename
    #[arg(long, default_value = "marie")]
    distro_codename: String,

    /// Distribution id
    #[arg(long, default_value = "fakeos")]
    distro_id: String,

    /// Distribution version
    #[arg(long, default_value = "1.0")]
    distro_version: String,

    /// Kernel release (defaults per OS flavor)
    #[arg(long)]
    kernel_version: Option<String>,

    /// Package manager command name
    #[arg(long, default_value = "apt")]
    package_manager: String,

    /// Package manager mirror URL
    #[arg(long, default_value = "http://package.fakeos.org")]
    package_manager_mirror: String,

    /// JSON file with canned curl responses per host
    #[arg(long)]
    curl_overrides: Option<PathBuf>,

    /// Directory used as the fake root (default: ~/fakeroot)
    #[arg(long, conflicts_with = "in_memory")]
    fakeroot: Option<PathBuf>,

    /// Keep the fake root in memory instead of on disk
    #[arg(long)]
    in_memory: bool,

    /// Seconds the panic fallback stalls before printing
    #[arg(long, default_value_t = 10)]
    panic_delay: u64,

    /// Echo session log events to stderr
    #[arg(long)]
    log_dmesg: bool,
}

impl Args {
    fn profile(&self) -> SystemProfile {
        let mut profile = SystemProfile::new()
            .flavor(self.os_flavor)
            .username(&self.username)
            .uid(self.uid)
            .hostname(&self.hostname)
            .distro(
                &self.distro_name,
                &self.distro_codename,
                &self.distro_id,
                &self.distro_version,
            )
            .package_manager(&self.package_manager, &self.package_manager_mirror);
        if let Some(kernel) = &self.kernel_version {
            profile = profile.kernel_version(kernel);
        }
        profile
    }

    fn fakeroot(&self) -> Result<PathBuf> {
        match &self.fakeroot {
            Some(path) => Ok(path.clone()),
            None => dirs::home_dir()
                .map(|home| home.join("fakeroot"))
                .context("Could not determine home directory; pass --fakeroot"),
        }
    }
}

/// Answers `read` from the terminal.
struct TerminalInput;

#[async_trait]
impl InputSource for TerminalInput {
    async fn read_line(&self, prompt: &str) -> shimsh::Result<Option<String>> {
        let prompt = prompt.to_string();
        let line = tokio::task::spawn_blocking(move || -> std::io::Result<Option<String>> {
            use std::io::{BufRead, Write};

            let mut stdout = std::io::stdout();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;
            let mut line = String::new();
            if std::io::stdin().lock().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
        })
        .await
        .map_err(|e| shimsh::Error::Internal(format!("input task failed: {e}")))??;
        Ok(line)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.log_dmesg {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("shimsh=info"))
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let mut builder = Shell::builder()
        .profile(args.profile())
        .fallback(args.fallback.clone())
        .panic_delay(Duration::from_secs(args.panic_delay))
        .input(Arc::new(TerminalInput))
        .populate(true);

    if let Some(path) = &args.curl_overrides {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read curl overrides: {}", path.display()))?;
        let overrides = NetworkOverrides::from_json(&text)
            .with_context(|| format!("Invalid curl overrides: {}", path.display()))?;
        builder = builder.network_overrides(overrides);
    }

    builder = if args.in_memory {
        let fs: Arc<dyn FileSystem> = Arc::new(InMemoryFs::new());
        builder.fs(fs)
    } else {
        let dir = args.fakeroot()?;
        let host = HostFs::new(&dir)
            .with_context(|| format!("Failed to open fake root: {}", dir.display()))?;
        let root = host.root().to_path_buf();
        builder.fs(Arc::new(host)).root(root).log_file(true)
    };

    let mut shell = builder.build().await.context("Failed to start shell")?;
    tracing::debug!(flavor = %args.os_flavor, fallback = %args.fallback, "shell ready");

    if let Some(line) = args.command {
        let result = shell.evaluate(&line).await;
        print!("{}", result.output);
        std::process::exit(exit_status(&result));
    }

    repl(&mut shell).await
}

/// Process exit status for a result; the session sentinel maps to 0.
fn exit_status(result: &CommandResult) -> i32 {
    if result.terminates_session() {
        0
    } else {
        result.exit_code
    }
}

#[cfg(feature = "interactive")]
async fn repl(shell: &mut Shell) -> Result<()> {
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;

    let mut rl = DefaultEditor::new().context("Failed to initialize line editor")?;
    loop {
        match rl.readline(&shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                let result = shell.evaluate(&line).await;
                print!("{}", result.output);
                if result.terminates_session() {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("\n[exit]");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to read line"),
        }
    }
}

#[cfg(not(feature = "interactive"))]
async fn repl(shell: &mut Shell) -> Result<()> {
    use std::io::{BufRead, Write};

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", shell.prompt());
        std::io::stdout().flush().context("Failed to write prompt")?;
        let Some(line) = lines.next() else {
            println!("\n[exit]");
            return Ok(());
        };
        let line = line.context("Failed to read line")?;
        let result = shell.evaluate(&line).await;
        print!("{}", result.output);
        if result.terminates_session() {
            return Ok(());
        }
    }
}
