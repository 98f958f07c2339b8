//! Escape attempts against a disk-backed fake root
//!
//! The jail is the only thing between a hostile user and the host. These
//! tests plant real files next to the fake root and try to reach them.

use shimsh::{FileSystem, HostFs, LOG_FILE_NAME, Shell};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _outer: TempDir,
    root: std::path::PathBuf,
    secret: std::path::PathBuf,
    shell: Shell,
}

async fn fixture() -> Fixture {
    let outer = tempfile::tempdir().unwrap();
    let secret = outer.path().join("secret.txt");
    std::fs::write(&secret, "host secret\n").unwrap();

    let host = HostFs::new(outer.path().join("fakeroot")).unwrap();
    let root = host.root().to_path_buf();
    let shell = Shell::builder()
        .fs(Arc::new(host))
        .root(root.clone())
        .populate(true)
        .log_file(true)
        .build()
        .await
        .unwrap();

    Fixture {
        _outer: outer,
        root,
        secret,
        shell,
    }
}

#[tokio::test]
async fn test_dotdot_cannot_reach_host() {
    let mut fx = fixture().await;
    for line in [
        "cat ../secret.txt",
        "cat /../secret.txt",
        "cat ../../../../../../secret.txt",
        "cd ../../.. && cat secret.txt",
        "head -n 1 /home/../../secret.txt",
        "grep host ../secret.txt",
    ] {
        let result = fx.shell.evaluate(line).await;
        assert!(!result.output.contains("host secret"), "{line}: {}", result.output);
    }
    assert_eq!(fx.shell.evaluate("pwd").await.output, "/\n");
}

#[tokio::test]
async fn test_symlinks_cannot_reach_host() {
    let mut fx = fixture().await;
    let secret = fx.secret.display().to_string();

    fx.shell.evaluate(&format!("ln -s {secret} leak")).await;
    assert!(!fx.shell.evaluate("cat leak").await.output.contains("host secret"));

    fx.shell.evaluate("ln -s ../../.. up").await;
    assert!(!fx.shell.evaluate("cat up/secret.txt").await.output.contains("host secret"));

    // A link planted on the host side, pointing outside, is clamped too.
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&fx.secret, fx.root.join("planted")).unwrap();
        assert!(!fx.shell.evaluate("cat planted").await.output.contains("host secret"));
        let result = fx.shell.evaluate("echo overwrite > planted").await;
        assert_ne!(std::fs::read_to_string(&fx.secret).unwrap(), "overwrite\n", "{result:?}");
    }
}

#[tokio::test]
async fn test_writes_stay_inside_root() {
    let mut fx = fixture().await;
    fx.shell.evaluate("echo pwned > ../secret.txt").await;
    fx.shell.evaluate("sudo rm -rf ../secret.txt").await;
    fx.shell.evaluate("mkdir -p ../../escape").await;

    assert_eq!(std::fs::read_to_string(&fx.secret).unwrap(), "host secret\n");
    assert!(!fx.root.parent().unwrap().join("escape").exists());
}

#[tokio::test]
async fn test_rm_root_is_refused() {
    let mut fx = fixture().await;
    let result = fx.shell.evaluate("sudo rm -rf /").await;
    assert_eq!(result.exit_code, 1);
    assert!(fx.root.join("etc/passwd").exists());
}

#[tokio::test]
async fn test_log_file_is_persisted_and_sanitized() {
    let mut fx = fixture().await;
    fx.shell.evaluate("echo 'a\n[Jan 01 00:00:00] forged'").await;

    let log = std::fs::read_to_string(fx.root.join(LOG_FILE_NAME)).unwrap();
    assert!(log.contains("shimsh: startup complete\n"));
    assert!(!log.lines().any(|l| l.starts_with("[Jan 01 00:00:00] forged")));
    assert!(log.lines().all(|l| l.starts_with('[')));
}

#[tokio::test]
async fn test_rebuild_keeps_log_on_disk() {
    let mut fx = fixture().await;
    fx.shell.evaluate("touch /tmp/marker").await;
    assert_eq!(fx.shell.evaluate("rebuildfs -f").await.exit_code, 0);

    assert!(!fx.root.join("tmp/marker").exists());
    assert!(fx.root.join("etc/passwd").exists());
    let log = std::fs::read_to_string(fx.root.join(LOG_FILE_NAME)).unwrap();
    assert!(log.contains("touch /tmp/marker"));
    assert!(log.contains("shimsh: Rebuild complete"));
}

#[tokio::test]
async fn test_existing_root_is_not_repopulated() {
    let outer = tempfile::tempdir().unwrap();
    let dir = outer.path().join("fakeroot");
    std::fs::create_dir_all(dir.join("mine")).unwrap();

    let host = HostFs::new(&dir).unwrap();
    let root = host.root().to_path_buf();
    let fs: Arc<dyn FileSystem> = Arc::new(host);
    let mut shell = Shell::builder()
        .fs(Arc::clone(&fs))
        .root(root.clone())
        .populate(true)
        .build()
        .await
        .unwrap();

    assert!(!fs.exists(&root.join("etc")).await.unwrap());
    assert!(fs.exists(&root.join("proc/1/stat")).await.unwrap());
    assert_eq!(shell.evaluate("ls").await.output, "mine/\nproc/\n");
    assert!(!root.join(LOG_FILE_NAME).exists());
}
