//! Filesystem trait definitions

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

/// Async filesystem trait.
///
/// Paths handed to a `FileSystem` are backend paths that have already been
/// resolved by the [`Jail`](crate::Jail). Backends do not follow symlinks in
/// `symlink_metadata`, `read_link` or `remove`; the jail relies on that to
/// walk links itself.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file's contents.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write contents to a file, replacing it.
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Append contents to a file, creating it when missing.
    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory.
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a file, symlink or directory.
    async fn remove(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Get metadata, following a final symlink.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// Get metadata of the entry itself.
    async fn symlink_metadata(&self, path: &Path) -> Result<Metadata>;

    /// Read directory entries (unsorted).
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a symbolic link at `link` pointing to `target`.
    async fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Read a symbolic link's target.
    async fn read_link(&self, path: &Path) -> Result<PathBuf>;
}

/// File metadata.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// File type
    pub file_type: FileType,
    /// File size in bytes
    pub size: u64,
    /// File permissions (Unix mode)
    pub mode: u32,
    /// Last modification time
    pub modified: SystemTime,
    /// Creation time
    pub created: SystemTime,
}

impl Metadata {
    pub(crate) fn new(file_type: FileType, size: u64) -> Self {
        let mode = match file_type {
            FileType::File => 0o644,
            FileType::Directory => 0o755,
            FileType::Symlink => 0o777,
        };
        let now = SystemTime::now();
        Self {
            file_type,
            size,
            mode,
            modified: now,
            created: now,
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(FileType::File, 0)
    }
}

/// File type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
}

impl FileType {
    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }

    /// Name used by `stat` output.
    pub fn describe(&self) -> &'static str {
        match self {
            FileType::File => "regular file",
            FileType::Directory => "directory",
            FileType::Symlink => "symbolic link",
        }
    }
}

/// Directory entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name (not full path)
    pub name: String,
    /// Entry metadata (of the entry itself, links not followed)
    pub metadata: Metadata,
}
