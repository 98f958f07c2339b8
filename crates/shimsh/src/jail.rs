//! Path containment
//!
//! Every path a command touches goes through [`Jail::resolve`]. The result is
//! a [`JailedPath`], which can only be produced here and is always the jail
//! root or something below it.
//!
//! Resolution walks the path one component at a time against the backing
//! filesystem, reading symlinks as it goes. Anything that would leave the
//! root clamps the *whole* result to the root:
//!
//! - `..` while already at the root
//! - an absolute symlink target that is not under the root
//! - a symlink loop or an unreadable link
//!
//! Paths outside the root are never looked at.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::fs::FileSystem;

/// Symlinks followed during one resolution before giving up.
const MAX_LINK_HOPS: usize = 40;

/// A host path known to be inside the jail root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailedPath {
    host: PathBuf,
    root: PathBuf,
}

impl JailedPath {
    /// Path on the backing filesystem.
    pub fn host(&self) -> &Path {
        &self.host
    }

    /// Path as the user sees it, rooted at the jail: `/home/inkling`.
    pub fn virtual_path(&self) -> String {
        let rel = self.host.strip_prefix(&self.root).unwrap_or(Path::new(""));
        let mut out = String::from("/");
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        out.push_str(&parts.join("/"));
        out
    }

    /// True for the jail root itself.
    pub fn is_root(&self) -> bool {
        self.host == self.root
    }

    /// Final component, `/` for the root.
    pub fn file_name(&self) -> String {
        match self.host.file_name() {
            Some(name) if !self.is_root() => name.to_string_lossy().into_owned(),
            _ => "/".to_string(),
        }
    }
}

impl fmt::Display for JailedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.virtual_path())
    }
}

/// Maps user-supplied paths onto a fixed root.
#[derive(Clone)]
pub struct Jail {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for Jail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jail").field("root", &self.root).finish()
    }
}

impl Jail {
    /// Create a jail over `fs` rooted at `root`.
    ///
    /// `root` must be an absolute path in the backend's namespace.
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    /// The root as a host path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The root as a jailed path.
    pub fn root_path(&self) -> JailedPath {
        JailedPath {
            host: self.root.clone(),
            root: self.root.clone(),
        }
    }

    /// Resolve `raw` against `cwd`. Never fails; escapes clamp to the root.
    pub async fn resolve(&self, cwd: &JailedPath, raw: &str) -> JailedPath {
        match self.walk(cwd, raw).await {
            Some(host) if host.starts_with(&self.root) => JailedPath {
                host,
                root: self.root.clone(),
            },
            _ => {
                tracing::debug!(target: "shimsh::jail", path = raw, "clamped to jail root");
                self.root_path()
            }
        }
    }

    /// Like [`Jail::resolve`], but a symlink in the last component is not
    /// followed. For commands that act on the entry itself (`rm`, `ln`).
    pub async fn resolve_entry(&self, cwd: &JailedPath, raw: &str) -> JailedPath {
        let path = Path::new(raw);
        let Some(Component::Normal(name)) = path.components().next_back() else {
            return self.resolve(cwd, raw).await;
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().into_owned(),
            _ if raw.starts_with('/') => "/".to_string(),
            _ => ".".to_string(),
        };
        match self.walk(cwd, &parent).await {
            Some(dir) if dir.starts_with(&self.root) => JailedPath {
                host: dir.join(name),
                root: self.root.clone(),
            },
            _ => self.root_path(),
        }
    }

    /// Present a host-side link target the way `ls -l` should show it.
    pub fn display_target(&self, target: &Path) -> String {
        match target.strip_prefix(&self.root) {
            Ok(rel) if target.is_absolute() => {
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect();
                format!("/{}", parts.join("/"))
            }
            _ => target.to_string_lossy().into_owned(),
        }
    }

    async fn walk(&self, cwd: &JailedPath, raw: &str) -> Option<PathBuf> {
        let mut current = if raw.starts_with('/') {
            self.root.clone()
        } else {
            cwd.host.clone()
        };
        let mut pending = parts(Path::new(raw));
        let mut hops = 0;

        while let Some(part) = pending.pop_front() {
            if part == ".." {
                if current == self.root {
                    return None;
                }
                current.pop();
                continue;
            }

            let next = current.join(&part);
            let is_link = matches!(
                self.fs.symlink_metadata(&next).await,
                Ok(meta) if meta.file_type.is_symlink()
            );
            if !is_link {
                // Missing entries are fine: the caller may be about to create them.
                current = next;
                continue;
            }

            hops += 1;
            if hops > MAX_LINK_HOPS {
                return None;
            }
            let target = self.fs.read_link(&next).await.ok()?;
            let mut spliced = if target.is_absolute() {
                let inside = target.strip_prefix(&self.root).ok()?;
                current = self.root.clone();
                parts(inside)
            } else {
                parts(&target)
            };
            spliced.extend(pending);
            pending = spliced;
        }

        Some(current)
    }
}

/// Normal and `..` components; root, prefix and `.` are dropped.
fn parts(path: &Path) -> VecDeque<OsString> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_os_string()),
            Component::ParentDir => Some(OsString::from("..")),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}
