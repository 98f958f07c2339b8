//! Fake root filesystem layout
//!
//! An empty jail root is filled with a small, OS-flavored tree so that
//! `ls /`, `cat /etc/passwd` and `ps` have something plausible to show.
//! Population only ever writes below the jail root.

use rand::Rng;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builtins::catalog_names;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::jail::Jail;
use crate::log::{LOG_FILE_NAME, SessionLog};
use crate::profile::{OsFlavor, SystemProfile};

/// Size of the fabricated `/dev/zero` and `/dev/urandom` contents.
const DEVICE_BYTES: usize = 4096;

/// A fabricated process: pid, command name, owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeProcess {
    pub pid: u32,
    pub command: &'static str,
    pub owner: String,
}

/// The process table for a profile. Deterministic apart from `/proc` stats.
pub fn processes(profile: &SystemProfile) -> Vec<FakeProcess> {
    let user = profile.username.as_str();
    let table: &[(u32, &'static str, &str)] = match profile.flavor {
        OsFlavor::Linux => &[
            (1, "systemd", "root"),
            (2, "kthreadd", "root"),
            (100, "login", "root"),
            (101, "sshd", "root"),
            (102, "bash", user),
        ],
        OsFlavor::Darwin => &[
            (1, "launchd", "root"),
            (50, "loginwindow", user),
            (51, "WindowServer", "_windowserver"),
            (52, "sshd", "root"),
            (100, "zsh", user),
        ],
        OsFlavor::Bsd => &[
            (1, "init", "root"),
            (30, "getty", "root"),
            (31, "sshd", "root"),
            (100, "csh", user),
        ],
    };
    table
        .iter()
        .map(|&(pid, command, owner)| FakeProcess {
            pid,
            command,
            owner: owner.to_string(),
        })
        .collect()
}

/// Directories created for every flavor.
const COMMON_DIRS: &[&str] = &["/bin", "/sbin", "/etc", "/tmp", "/dev", "/usr/bin", "/usr/sbin"];

fn flavor_dirs(flavor: OsFlavor) -> &'static [&'static str] {
    match flavor {
        OsFlavor::Linux => &[
            "/lib", "/lib64", "/root", "/var/log", "/var/tmp", "/var/run", "/var/lib",
            "/var/cache", "/var/spool", "/var/mail", "/proc", "/boot", "/media", "/mnt",
            "/srv", "/opt", "/run", "/sys", "/etc/network",
        ],
        OsFlavor::Darwin => &[
            "/System/Library/CoreServices", "/System/Library/Frameworks",
            "/System/Library/Extensions", "/System/Library/LaunchDaemons",
            "/System/Applications", "/Applications/Utilities", "/Users/Shared", "/Volumes",
            "/private/tmp", "/private/var/log", "/private/var/run", "/Library/Preferences",
            "/Library/Logs", "/opt", "/proc",
        ],
        OsFlavor::Bsd => &[
            "/root", "/var/log", "/var/tmp", "/var/run", "/var/mail", "/boot", "/mnt",
            "/media", "/proc", "/usr/local/bin", "/usr/local/sbin",
        ],
    }
}

/// Placeholder binaries and empty files, by directory.
fn flavor_stubs(profile: &SystemProfile) -> Vec<(&'static str, Vec<String>)> {
    let names = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    match profile.flavor {
        OsFlavor::Linux => {
            let mut usr_bin = names(&[
                "nano", "python3", "vim", "which", "man", "less", "more", "clear", "top",
                "htop", "ssh", "scp", "wget", "tar", "gzip", "gunzip", "zip", "unzip",
            ]);
            usr_bin.push(profile.package_manager.clone());
            vec![
                ("/sbin", names(&[
                    "init", "reboot", "shutdown", "halt", "fsck", "mount", "umount", "ifconfig",
                    "sysctl",
                ])),
                ("/usr/bin", usr_bin),
                ("/usr/sbin", names(&[
                    "sshd", "useradd", "userdel", "groupadd", "groupdel", "adduser", "deluser",
                    "service",
                ])),
                ("/var/log", names(&["syslog", "auth.log", "dmesg", "kern.log", "messages", "boot.log"])),
                ("/dev", names(&["tty", "sda", "sda1", "loop0"])),
                ("/boot", names(&["vmlinuz", "initrd.img", "grub"])),
            ]
        }
        OsFlavor::Darwin => vec![
            ("/bin", names(&["zsh", "sh", "bash", "open"])),
            ("/sbin", names(&[
                "reboot", "shutdown", "ifconfig", "diskutil", "mount", "umount", "fsck", "sysctl",
            ])),
            ("/usr/bin", names(&[
                "open", "sw_vers", "python3", "vim", "nano", "which", "man", "less", "more",
                "clear", "top", "ssh", "scp", "tar", "gzip", "gunzip", "zip", "unzip", "osascript",
            ])),
            ("/usr/sbin", names(&["sshd", "diskutil", "systemsetup"])),
            ("/dev", names(&["tty", "disk0", "disk1"])),
        ],
        OsFlavor::Bsd => vec![
            ("/bin", names(&["sh", "csh", "tcsh"])),
            ("/sbin", names(&[
                "init", "reboot", "shutdown", "halt", "ifconfig", "sysctl", "mount", "umount",
                "fsck",
            ])),
            ("/usr/bin", names(&[
                "csh", "less", "vi", "which", "man", "more", "clear", "top", "ssh", "scp", "tar",
                "gzip", "gunzip", "zip", "unzip",
            ])),
            ("/usr/sbin", names(&["sshd", "service", "pw", "adduser", "rmuser"])),
            ("/var/log", names(&["messages", "auth.log", "dmesg", "cron"])),
            ("/dev", names(&["tty", "ada0", "ada0p2"])),
            ("/boot", names(&["kernel", "loader.conf"])),
        ],
    }
}

/// Files with real content.
fn flavor_files(profile: &SystemProfile) -> Vec<(&'static str, String)> {
    let user = &profile.username;
    let uid = profile.uid;
    let home = profile.home_dir();
    let login_shell = format!("/bin/{}", profile.flavor.shell());
    let hosts = "127.0.0.1\tlocalhost\n::1\tlocalhost\n".to_string();

    let mut files = vec![
        ("/etc/hosts", hosts),
        ("/etc/hostname", format!("{}\n", profile.hostname)),
        ("/etc/localtime", String::new()),
        (
            "/etc/os-release",
            format!(
                "NAME=\"{name}\"\nID={id}\nVERSION=\"{version}\"\nPRETTY_NAME=\"{name} {version}\"\n",
                name = profile.distro_name,
                id = profile.distro_id,
                version = profile.distro_version,
            ),
        ),
    ];

    match profile.flavor {
        OsFlavor::Linux => files.extend([
            (
                "/etc/passwd",
                format!("root:x:0:0:root:/root:/bin/bash\n{user}:x:{uid}:{uid}:{user}:{home}:{login_shell}\n"),
            ),
            (
                "/etc/shadow",
                format!("root:*:19376:0:99999:7:::\n{user}:*:19376:0:99999:7:::\n"),
            ),
            ("/etc/group", format!("root:x:0:\n{user}:x:{uid}:{user}\n")),
            ("/etc/resolv.conf", "nameserver 8.8.8.8\n".to_string()),
            (
                "/etc/issue",
                format!(
                    "Welcome to {} {} (simulated)\n",
                    profile.distro_name, profile.distro_version
                ),
            ),
            (
                "/etc/fstab",
                "proc /proc proc defaults 0 0\n/dev/sda1 / ext4 defaults 0 1\n".to_string(),
            ),
            ("/etc/motd", format!("Welcome to {}!\n", profile.distro_name)),
            (
                "/etc/profile",
                "# /etc/profile: system-wide .profile file for the Bourne shell\n".to_string(),
            ),
            ("/etc/bash.bashrc", "# System-wide bashrc\n".to_string()),
            (
                "/etc/network/interfaces",
                "auto lo\niface lo inet loopback\nauto eth0\niface eth0 inet dhcp\n".to_string(),
            ),
        ]),
        OsFlavor::Darwin => files.extend([
            (
                "/etc/passwd",
                format!(
                    "root:*:0:0:System Administrator:/var/root:/bin/sh\n{user}:*:{uid}:20:{user}:{home}:{login_shell}\n"
                ),
            ),
            ("/etc/group", format!("wheel:*:0:root\nstaff:*:20:{user}\n")),
            ("/etc/resolv.conf", "nameserver 1.1.1.1\n".to_string()),
            ("/etc/profile", "# /etc/profile for macOS\n".to_string()),
            ("/etc/bashrc", "# /etc/bashrc for macOS\n".to_string()),
            ("/etc/fstab", String::new()),
            ("/etc/motd", "Welcome to Darwin (simulated)\n".to_string()),
        ]),
        OsFlavor::Bsd => files.extend([
            (
                "/etc/passwd",
                format!(
                    "root:*:0:0:Charlie Root:/root:/bin/sh\n{user}:*:{uid}:{uid}:{user}:{home}:{login_shell}\n"
                ),
            ),
            ("/etc/group", format!("wheel:*:0:root\n{user}:*:{uid}:{user}\n")),
            (
                "/etc/rc.conf",
                format!("hostname=\"{}\"\nifconfig_em0=\"DHCP\"\n", profile.hostname),
            ),
            (
                "/etc/fstab",
                "/dev/ada0p2 / ufs rw 1 1\nproc /proc procfs rw 0 0\n".to_string(),
            ),
            ("/etc/motd", "Welcome to BSD (simulated)\n".to_string()),
            ("/etc/profile", "# /etc/profile for BSD\n".to_string()),
        ]),
    }
    files
}

/// macOS application bundles under `/Applications`.
const DARWIN_APPS: &[&str] = &[
    "Safari.app",
    "Calculator.app",
    "TextEdit.app",
    "Preview.app",
    "Utilities/Terminal.app",
    "Utilities/Activity Monitor.app",
    "Utilities/Disk Utility.app",
];

struct Writer<'a> {
    fs: &'a dyn FileSystem,
    jail: &'a Jail,
    log: &'a mut SessionLog,
}

impl Writer<'_> {
    fn host(&self, virt: &str) -> PathBuf {
        self.jail.root().join(virt.trim_start_matches('/'))
    }

    async fn dir(&mut self, virt: &str) -> Result<()> {
        self.fs.mkdir(&self.host(virt), true).await
    }

    async fn file(&mut self, virt: &str, content: &[u8]) -> Result<()> {
        let path = self.host(virt);
        if let Some(parent) = path.parent() {
            self.fs.mkdir(parent, true).await?;
        }
        self.fs.write_file(&path, content).await?;
        self.log.record(format!("shimsh: created {virt}"));
        Ok(())
    }
}

/// True when the root holds nothing but the session log.
pub async fn is_empty(fs: &dyn FileSystem, jail: &Jail) -> Result<bool> {
    let entries = fs.read_dir(jail.root()).await?;
    Ok(entries.iter().all(|e| e.name == LOG_FILE_NAME))
}

/// Write the flavored tree below the jail root.
pub async fn populate(
    fs: &dyn FileSystem,
    jail: &Jail,
    profile: &SystemProfile,
    log: &mut SessionLog,
) -> Result<()> {
    log.record(format!(
        "shimsh: populating simulated filesystem for {}",
        profile.flavor
    ));
    let mut w = Writer { fs, jail, log };

    for dir in COMMON_DIRS.iter().chain(flavor_dirs(profile.flavor)) {
        w.dir(dir).await?;
    }

    for (dir, stubs) in flavor_stubs(profile) {
        for name in stubs {
            w.file(&format!("{dir}/{name}"), b"").await?;
        }
    }
    for name in catalog_names(profile) {
        let stub = format!("# simulated {name} binary\n");
        w.file(&format!("/bin/{name}"), stub.as_bytes()).await?;
    }

    for (path, content) in flavor_files(profile) {
        w.file(path, content.as_bytes()).await?;
    }

    let mut noise = vec![0u8; DEVICE_BYTES];
    rand::thread_rng().fill(noise.as_mut_slice());
    w.file("/dev/null", b"").await?;
    w.file("/dev/zero", &[0u8; DEVICE_BYTES]).await?;
    w.file("/dev/random", &noise).await?;
    w.file("/dev/urandom", &noise).await?;

    let home = profile.home_dir();
    w.dir(&home).await?;
    w.file(
        &format!("{home}/.bashrc"),
        b"# Simulated bashrc\nalias ll='ls -l'\n",
    )
    .await?;
    w.file(
        &format!("{home}/.profile"),
        b"# Simulated profile\nexport PATH=$PATH:/usr/local/bin\n",
    )
    .await?;

    if profile.flavor == OsFlavor::Darwin {
        for app in DARWIN_APPS {
            let bundle = format!("/Applications/{app}");
            let name = app.rsplit('/').next().unwrap_or(app).trim_end_matches(".app");
            w.dir(&format!("{bundle}/Contents/MacOS")).await?;
            let plist = format!(
                "<?xml version='1.0'?><plist><dict><key>CFBundleName</key><string>{name}</string></dict></plist>"
            );
            w.file(&format!("{bundle}/Contents/Info.plist"), plist.as_bytes())
                .await?;
        }
    }

    w.log.record("shimsh: filesystem population complete");
    Ok(())
}

/// Write `/proc/<pid>/{cmdline,stat}` and return each process's owner.
pub async fn create_proc(
    fs: &dyn FileSystem,
    jail: &Jail,
    profile: &SystemProfile,
    log: &mut SessionLog,
) -> Result<BTreeMap<u32, String>> {
    let mut w = Writer { fs, jail, log };
    w.dir("/proc").await?;

    let mut owners = BTreeMap::new();
    for process in processes(profile) {
        let FakeProcess {
            pid,
            command,
            owner,
        } = process;
        let (utime, stime, start, vsz, rss) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(100..=300),
                rng.gen_range(50..=150),
                rng.gen_range(10_000..=50_000),
                rng.gen_range(10_000..=30_000),
                rng.gen_range(5_000..=10_000),
            )
        };
        let stat: String = format!(
            "{pid} ({command}) S 1 1 1 0 -1 4194560 300 0 0 0 {utime} {stime} 0 0 20 0 1 0 {start} {vsz} {rss}"
        );
        w.file(
            &format!("/proc/{pid}/cmdline"),
            format!("/usr/sbin/{command}").as_bytes(),
        )
        .await?;
        w.file(&format!("/proc/{pid}/stat"), stat.as_bytes()).await?;
        owners.insert(pid, owner);
    }
    Ok(owners)
}

/// Remove everything under the root except the session log.
pub async fn wipe(fs: &dyn FileSystem, jail: &Jail) -> Result<()> {
    for entry in fs.read_dir(jail.root()).await? {
        if entry.name == LOG_FILE_NAME {
            continue;
        }
        fs.remove(&jail.root().join(&entry.name), true).await?;
    }
    Ok(())
}
