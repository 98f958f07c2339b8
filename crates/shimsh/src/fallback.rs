//! What happens when a command has no handler

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Behavior for commands with no registered handler.
///
/// Parsed from a mode string; unknown modes are kept as [`FallbackPolicy::Other`]
/// and answer with empty output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// `error`: exit 127 with "command not found"
    #[default]
    Error,
    /// `segfault`: pretend the shell crashed and end the session
    Segfault,
    /// `panic`: stall, print a kernel oops and end the session
    Panic,
    /// `null`: succeed silently
    Null,
    /// `squidnet`: claim the sandbox connection dropped
    Squidnet,
    /// Any other mode string
    Other(String),
}

impl FallbackPolicy {
    /// Mode string this policy was parsed from.
    pub fn as_str(&self) -> &str {
        match self {
            FallbackPolicy::Error => "error",
            FallbackPolicy::Segfault => "segfault",
            FallbackPolicy::Panic => "panic",
            FallbackPolicy::Null => "null",
            FallbackPolicy::Squidnet => "squidnet",
            FallbackPolicy::Other(mode) => mode,
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = s.trim().to_ascii_lowercase();
        Ok(match mode.as_str() {
            "error" => FallbackPolicy::Error,
            "segfault" => FallbackPolicy::Segfault,
            "panic" => FallbackPolicy::Panic,
            "null" => FallbackPolicy::Null,
            "squidnet" => FallbackPolicy::Squidnet,
            _ => FallbackPolicy::Other(mode),
        })
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) const SEGFAULT_TEXT: &str = "Segmentation fault (core dumped)\n";

pub(crate) const SQUIDNET_TEXT: &str =
    "Error 2124-4508: Connection to SquidNet Sandbox lost. Please try again.\n";

pub(crate) const KERNEL_OOPS: &str = "\
[  401.742398] BUG: unable to handle kernel NULL pointer dereference at 0000000000000010
[  401.742415] IP: __copy_to_user+0x3a/0x60
[  401.742419] PGD 0 P4D 0
[  401.742423] Oops: 0000 [#1] SMP PTI
[  401.742427] CPU: 2 PID: 1327 Comm: bash Not tainted 5.4.0-162-generic #179-Ubuntu
[  401.742434] RIP: 0010:__copy_to_user+0x3a/0x60
[  401.742454] RSP: 0018:ffffb02e404d3d40 EFLAGS: 00010206
[  401.742457] RAX: 0000000000000000 RBX: ffff96b1c33a7800 RCX: 0000000000000000
[  401.742460] RDX: 0000000000000010 RSI: 00007ffd44fa8210 RDI: 0000000000000000
[  401.742478] CR2: 0000000000000010 CR3: 00000007b28a8000 CR4: 00000000003606e0
[  401.742481] Call Trace:
[  401.742485]  __do_sys_read+0xa4/0x110
[  401.742488]  do_syscall_64+0x57/0x190
[  401.742491]  entry_SYSCALL_64_after_hwframe+0x44/0xa9
[  401.742529] Modules linked in: i915 drm_kms_helper drm fb_sys_fops
[  401.742534] ---[ end trace 0cfeb2c4f5bca001 ]---
[  401.742558] Kernel panic - not syncing: Fatal exception in interrupt
[  401.742562] Kernel Offset: 0x21e000000 from 0xffffffff81000000 (relocation range: 0xffffffff80000000-0xffffffffbfffffff)
[  401.742566] ---[ end Kernel panic - not syncing: Fatal exception in interrupt ]---
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_modes() {
        assert_eq!("error".parse(), Ok(FallbackPolicy::Error));
        assert_eq!("SEGFAULT".parse(), Ok(FallbackPolicy::Segfault));
        assert_eq!(" panic ".parse(), Ok(FallbackPolicy::Panic));
        assert_eq!("null".parse(), Ok(FallbackPolicy::Null));
    }

    #[test]
    fn test_unknown_mode_is_kept() {
        let policy: FallbackPolicy = "haiku".parse().unwrap();
        assert_eq!(policy, FallbackPolicy::Other("haiku".to_string()));
        assert_eq!(policy.to_string(), "haiku");
    }
}
