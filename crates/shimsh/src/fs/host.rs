//! Disk-backed filesystem rooted at a host directory.
//!
//! Paths are host paths produced by the [`Jail`](crate::Jail). `HostFs`
//! refuses anything that is not under its root, so a handler that forgets to
//! go through the jail gets an error instead of the host filesystem.

use async_trait::async_trait;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::traits::{DirEntry, FileSystem, FileType, Metadata};
use crate::error::Result;

/// Filesystem backed by a real directory (the "fakeroot").
#[derive(Debug, Clone)]
pub struct HostFs {
    root: PathBuf,
}

impl HostFs {
    /// Open (creating if needed) a host directory as the filesystem root.
    ///
    /// The root is canonicalized so that jail prefix checks compare like
    /// with like even when the given path goes through symlinks.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The canonical host root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check(&self, path: &Path) -> io::Result<()> {
        if path.starts_with(&self.root) {
            Ok(())
        } else {
            Err(io::Error::new(
                ErrorKind::PermissionDenied,
                "path is outside the filesystem root",
            ))
        }
    }
}

fn convert(meta: &std::fs::Metadata) -> Metadata {
    let file_type = if meta.file_type().is_symlink() {
        FileType::Symlink
    } else if meta.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    };

    let mut converted = Metadata::new(file_type, meta.len());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        converted.mode = meta.permissions().mode() & 0o7777;
    }
    if let Ok(modified) = meta.modified() {
        converted.modified = modified;
    }
    if let Ok(created) = meta.created() {
        converted.created = created;
    }
    converted
}

#[async_trait]
impl FileSystem for HostFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.check(path)?;
        Ok(fs::read(path).await?)
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.check(path)?;
        Ok(fs::write(path, content).await?)
    }

    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        self.check(path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(content).await?;
        file.flush().await?;
        Ok(())
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        self.check(path)?;
        if recursive {
            fs::create_dir_all(path).await?;
        } else {
            fs::create_dir(path).await?;
        }
        Ok(())
    }

    async fn remove(&self, path: &Path, recursive: bool) -> Result<()> {
        self.check(path)?;
        let meta = fs::symlink_metadata(path).await?;
        if !meta.is_dir() {
            fs::remove_file(path).await?;
            return Ok(());
        }

        if path == self.root {
            // The root itself stays; only its contents go.
            if !recursive {
                return Err(io::Error::other("Device or resource busy").into());
            }
            let mut dir = fs::read_dir(path).await?;
            while let Some(entry) = dir.next_entry().await? {
                let child = entry.path();
                if entry.file_type().await?.is_dir() {
                    fs::remove_dir_all(&child).await?;
                } else {
                    fs::remove_file(&child).await?;
                }
            }
        } else if recursive {
            fs::remove_dir_all(path).await?;
        } else {
            fs::remove_dir(path).await?;
        }
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        self.check(path)?;
        Ok(convert(&fs::metadata(path).await?))
    }

    async fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        self.check(path)?;
        Ok(convert(&fs::symlink_metadata(path).await?))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        self.check(path)?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let metadata = fs::symlink_metadata(entry.path()).await?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                metadata: convert(&metadata),
            });
        }

        Ok(entries)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.check(path)?;
        Ok(fs::symlink_metadata(path).await.is_ok())
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        self.check(link)?;
        #[cfg(unix)]
        let created = fs::symlink(target, link).await;
        #[cfg(not(unix))]
        let created: io::Result<()> = {
            let _ = target;
            Err(io::Error::new(ErrorKind::Unsupported, "symlinks are not supported"))
        };
        Ok(created?)
    }

    async fn read_link(&self, path: &Path) -> Result<PathBuf> {
        self.check(path)?;
        Ok(fs::read_link(path).await?)
    }
}
