//! End-to-end tests through the public Shell API

use pretty_assertions::assert_eq;
use shimsh::{
    Builtin, BuiltinContext, CommandResult, FallbackPolicy, OsFlavor, SESSION_TERMINATED,
    ScriptedInput, Shell, SystemProfile, async_trait,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Echoes its arguments with a prefix.
struct PrefixEcho {
    prefix: String,
}

#[async_trait]
impl Builtin for PrefixEcho {
    async fn execute(&self, ctx: BuiltinContext<'_>) -> shimsh::Result<CommandResult> {
        Ok(CommandResult::ok(format!(
            "{}{}\n",
            self.prefix,
            ctx.args.join(" ")
        )))
    }
}

/// Counts invocations through shared state.
struct Counter {
    count: Arc<AtomicU64>,
}

#[async_trait]
impl Builtin for Counter {
    async fn execute(&self, _ctx: BuiltinContext<'_>) -> shimsh::Result<CommandResult> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CommandResult::ok(format!("{n}\n")))
    }
}

/// Reads a file through the jail, the way catalog commands do.
struct Slurp;

#[async_trait]
impl Builtin for Slurp {
    async fn execute(&self, mut ctx: BuiltinContext<'_>) -> shimsh::Result<CommandResult> {
        let Some(raw) = ctx.args.first() else {
            return Ok(CommandResult::err("usage: slurp FILE\n", 1));
        };
        let path = ctx.resolve(raw).await;
        ctx.log(format!("slurp {path}"));
        let bytes = ctx.fs.read_file(path.host()).await?;
        Ok(CommandResult::ok(String::from_utf8_lossy(&bytes).to_uppercase()))
    }
}

#[tokio::test]
async fn test_sequence_and_short_circuit() {
    let mut shell = Shell::new();
    assert_eq!(shell.evaluate("echo a; echo b").await, CommandResult::ok("a\nb\n"));
    assert_eq!(shell.evaluate("false && echo a").await, CommandResult::err("", 1));
    assert_eq!(shell.evaluate("false || echo a").await, CommandResult::ok("a\n"));
    assert_eq!(shell.evaluate("").await, CommandResult::ok(""));
}

#[tokio::test]
async fn test_short_circuit_stops_whole_line() {
    let mut shell = Shell::new();
    let result = shell.evaluate("true || echo skipped; echo also skipped").await;
    assert_eq!(result, CommandResult::ok(""));
}

#[tokio::test]
async fn test_redirect_round_trip() {
    let mut shell = Shell::new();
    assert_eq!(shell.evaluate("echo hi > out.txt").await, CommandResult::ok(""));
    assert_eq!(shell.evaluate("cat out.txt").await.output, "hi\n");
    shell.evaluate("echo bye >> out.txt").await;
    assert_eq!(shell.evaluate("cat out.txt").await.output, "hi\nbye\n");
}

#[tokio::test]
async fn test_quoted_redirect_is_literal() {
    let mut shell = Shell::new();
    let result = shell.evaluate("echo 'a > b' \">\" c").await;
    assert_eq!(result.output, "a > b > c\n");
    assert_eq!(shell.evaluate("ls").await.output, "");
}

#[tokio::test]
async fn test_pipe_with_dash() {
    let mut shell = Shell::new();
    shell.evaluate("echo alpha > a.txt; echo beta >> a.txt").await;
    let result = shell.evaluate("cat a.txt | grep bet -").await;
    assert_eq!(result.output, "beta\n");
    assert_eq!(result.exit_code, 0);

    let result = shell.evaluate("cat a.txt | head -n 1 - | cat - > first.txt").await;
    assert_eq!(result, CommandResult::ok(""));
    assert_eq!(shell.evaluate("cat first.txt").await.output, "alpha\n");
}

#[tokio::test]
async fn test_pipe_splitting_ignores_quotes() {
    let mut shell = Shell::new();
    // The bar splits even inside quotes; the second stage is `b'`.
    let result = shell.evaluate("echo 'a|b'").await;
    assert_eq!(result.exit_code, 2);
}

#[tokio::test]
async fn test_sudo_prefix_is_sticky() {
    let mut shell = Shell::new();
    assert_eq!(shell.evaluate("whoami").await.output, "inkling\n");
    shell.evaluate("sudo true").await;
    assert_eq!(shell.evaluate("whoami").await.output, "root\n");
    assert!(shell.evaluate("id").await.output.starts_with("uid=0(root)"));
    assert!(shell.session().privileged);
}

#[tokio::test]
async fn test_privilege_faults() {
    let mut shell = Shell::builder().populate(true).build().await.unwrap();

    let result = shell.evaluate("rm /etc/passwd").await;
    assert_eq!(result.exit_code, 1);
    assert!(result.output.contains("Permission denied"));

    let result = shell.evaluate("echo x >> /etc/passwd").await;
    assert_eq!(result.output, "shimsh: /etc/passwd: Permission denied\n");

    assert_eq!(shell.evaluate("apt update").await.exit_code, 100);
    assert_eq!(shell.evaluate("kill 1").await.exit_code, 1);

    shell.evaluate("sudo true").await;
    assert_eq!(shell.evaluate("echo x >> /etc/passwd").await.exit_code, 0);
    assert!(shell.evaluate("tail -n 1 /etc/passwd").await.output.starts_with("x"));
}

#[tokio::test]
async fn test_fallback_policies() {
    let mut shell = Shell::new();
    let result = shell.evaluate("frobnicate").await;
    assert_eq!(result, CommandResult::err("shimsh: frobnicate: command not found\n", 127));

    let mut shell = Shell::builder()
        .fallback(FallbackPolicy::Segfault)
        .build()
        .await
        .unwrap();
    let result = shell.evaluate("frobnicate").await;
    assert_eq!(result.output, "Segmentation fault (core dumped)\n");
    assert_eq!(result.exit_code, SESSION_TERMINATED);

    let mut shell = Shell::builder()
        .fallback(FallbackPolicy::Panic)
        .panic_delay(Duration::ZERO)
        .build()
        .await
        .unwrap();
    let result = shell.evaluate("frobnicate").await;
    assert!(result.terminates_session());
    assert!(result.output.starts_with("[  401.742398] BUG:"));
}

#[tokio::test]
async fn test_custom_builtins() {
    let count = Arc::new(AtomicU64::new(0));
    let mut shell = Shell::builder()
        .builtin(
            "say",
            Box::new(PrefixEcho {
                prefix: ">> ".to_string(),
            }),
        )
        .builtin(
            "tick",
            Box::new(Counter {
                count: Arc::clone(&count),
            }),
        )
        .builtin("slurp", Box::new(Slurp))
        .build()
        .await
        .unwrap();

    assert_eq!(shell.evaluate("say hello world").await.output, ">> hello world\n");
    assert_eq!(shell.evaluate("tick; tick").await.output, "1\n2\n");
    assert_eq!(count.load(Ordering::SeqCst), 2);

    shell.evaluate("echo quiet > note").await;
    assert_eq!(shell.evaluate("slurp note").await.output, "QUIET\n");
    // Climbing out clamps to the root directory, which cannot be read.
    let result = shell.evaluate("slurp ../../note").await;
    assert_eq!(
        result.output,
        "shimsh: error simulating 'slurp': Is a directory\n"
    );
    assert_eq!(shell.evaluate("echo shout | slurp -").await.output, "SHOUT\n");

    let result = shell.evaluate("slurp missing").await;
    assert_eq!(result.exit_code, 1);
    assert!(result.output.starts_with("shimsh: error simulating 'slurp': "));
}

#[tokio::test]
async fn test_custom_builtin_overrides_catalog() {
    let mut shell = Shell::builder()
        .builtin("whoami", Box::new(PrefixEcho { prefix: "nobody".to_string() }))
        .build()
        .await
        .unwrap();
    assert_eq!(shell.evaluate("whoami").await.output, "nobody\n");
}

#[tokio::test]
async fn test_flavors_end_to_end() {
    for (flavor, kernel, home) in [
        (OsFlavor::Linux, "Linux\n", "/home/inkling"),
        (OsFlavor::Darwin, "Darwin\n", "/Users/inkling"),
        (OsFlavor::Bsd, "FreeBSD\n", "/home/inkling"),
    ] {
        let mut shell = Shell::builder()
            .profile(SystemProfile::new().flavor(flavor))
            .populate(true)
            .build()
            .await
            .unwrap();
        assert_eq!(shell.evaluate("uname").await.output, kernel);
        assert_eq!(shell.evaluate("echo $HOME").await.output, format!("{home}\n"));
        assert_eq!(shell.evaluate(&format!("cd {home} && pwd")).await.exit_code, 0);
        assert!(shell.evaluate("ls -a").await.output.contains(".profile"));
    }
}

#[tokio::test]
async fn test_links_into_protected_dirs_stay_read_only() {
    let mut shell = Shell::builder().populate(true).build().await.unwrap();
    let motd = shell.evaluate("cat /etc/motd").await.output;
    let passwd = shell.evaluate("cat /etc/passwd").await.output;

    assert_eq!(shell.evaluate("ln -s /etc x").await.exit_code, 0);
    let result = shell.evaluate("echo a > x/motd").await;
    assert_eq!(result, CommandResult::err("shimsh: x/motd: Permission denied\n", 1));
    let result = shell.evaluate("echo a > x/planted").await;
    assert_eq!(result.exit_code, 1);

    shell.evaluate("ln -s /etc/passwd p").await;
    let result = shell.evaluate("echo a >> p").await;
    assert_eq!(result, CommandResult::err("shimsh: p: Permission denied\n", 1));

    for line in ["touch x/new", "mkdir x/dir", "rm x/motd", "rm -r x/network"] {
        assert_eq!(shell.evaluate(line).await.exit_code, 1, "{line}");
    }

    assert_eq!(shell.evaluate("cat /etc/motd").await.output, motd);
    assert_eq!(shell.evaluate("cat /etc/passwd").await.output, passwd);
    assert_eq!(shell.evaluate("cat /etc/planted").await.exit_code, 1);
    assert!(!shell.session().privileged);
}

#[tokio::test]
async fn test_pipe_file_cannot_be_hijacked() {
    let mut shell = Shell::builder().populate(true).build().await.unwrap();
    let passwd = shell.evaluate("cat /etc/passwd").await.output;

    let result = shell.evaluate("echo hacked > /etc/passwd").await;
    assert_eq!(result, CommandResult::err("shimsh: /etc/passwd: Permission denied\n", 1));

    assert_eq!(shell.evaluate("ln -s /etc/passwd /tmp/.shimsh-pipe-1").await.exit_code, 0);
    let result = shell.evaluate("echo hacked | cat -").await;
    assert_eq!(result, CommandResult::ok("hacked\n"));

    assert_eq!(shell.evaluate("cat /etc/passwd").await.output, passwd);
    assert!(shell.evaluate("ls /etc").await.output.contains("passwd\n"));

    // A /tmp swapped for a link into /etc is refused outright.
    shell.evaluate("rm -rf /tmp").await;
    shell.evaluate("ln -s /etc /tmp").await;
    let result = shell.evaluate("echo hacked | cat -").await;
    assert_eq!(result, CommandResult::err("shimsh: pipe: /etc: Permission denied\n", 1));
    assert_eq!(shell.evaluate("cat /etc/passwd").await.output, passwd);
}

#[tokio::test]
async fn test_read_through_builder_input() {
    let mut shell = Shell::builder()
        .input(Arc::new(ScriptedInput::new(["s3cret"])))
        .build()
        .await
        .unwrap();
    let result = shell.evaluate("read -p 'Password: ' PW && echo got $PW").await;
    assert_eq!(result.output, "got s3cret\n");
    assert_eq!(shell.evaluate("read PW").await.exit_code, 1);
}
