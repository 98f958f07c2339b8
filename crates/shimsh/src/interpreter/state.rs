//! Interpreter state types

use chrono::{DateTime, Local};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::jail::JailedPath;
use crate::log::SessionLog;

/// Exit code asking the host to end the interactive session.
///
/// Deliberately outside the 0-255 range a real command can return.
pub const SESSION_TERMINATED: i32 = 9999;

/// Result of a command or of a whole line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code
    pub exit_code: i32,
    /// Text the user sees
    pub output: String,
}

impl CommandResult {
    /// Create a successful result with the given output.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
        }
    }

    /// Create a failed result with the given output.
    pub fn err(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    /// Check if the result indicates success.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// True when the host should end the session.
    pub fn terminates_session(&self) -> bool {
        self.exit_code == SESSION_TERMINATED
    }
}

/// Virtual paths that only root may change.
const PROTECTED_PREFIXES: &[&str] = &[
    "/bin", "/boot", "/dev", "/etc", "/lib", "/proc", "/root", "/sbin", "/sys", "/usr",
];

/// True for paths under a system prefix owned by root.
pub(crate) fn is_protected(path: &JailedPath) -> bool {
    let virt = path.virtual_path();
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| virt == *prefix || virt.starts_with(&format!("{prefix}/")))
}

/// Mutable state of the one session an interpreter serves.
#[derive(Debug)]
pub struct Session {
    /// Current working directory
    pub cwd: JailedPath,
    /// Set by `sudo`, never cleared except by a rebuild
    pub privileged: bool,
    /// Shell variables, looked up before the environment
    pub variables: HashMap<String, String>,
    /// Event log, never cleared
    pub log: SessionLog,
    /// Owner of each fabricated process
    pub process_owners: BTreeMap<u32, String>,
    started: Instant,
    started_at: DateTime<Local>,
    pipe_seq: u64,
}

impl Session {
    /// Fresh unprivileged session in `cwd`.
    pub fn new(cwd: JailedPath) -> Self {
        Self {
            cwd,
            privileged: false,
            variables: HashMap::new(),
            log: SessionLog::new(),
            process_owners: BTreeMap::new(),
            started: Instant::now(),
            started_at: Local::now(),
            pipe_seq: 0,
        }
    }

    /// Back to a freshly logged-in state. The log and uptime survive.
    pub fn reset(&mut self, cwd: JailedPath) {
        self.cwd = cwd;
        self.privileged = false;
        self.variables.clear();
    }

    /// Turn on root for the rest of the session.
    pub fn elevate(&mut self) {
        if !self.privileged {
            self.log.record("shimsh: sudo detected, elevating privileges");
        }
        self.privileged = true;
    }

    /// Whether the current identity may change `path`.
    pub fn may_modify(&self, path: &JailedPath) -> bool {
        self.privileged || !is_protected(path)
    }

    /// Time since the session began.
    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Wall-clock time the session began.
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Next number for a transient pipe file.
    pub(crate) fn next_pipe_id(&mut self) -> u64 {
        self.pipe_seq += 1;
        self.pipe_seq
    }
}
