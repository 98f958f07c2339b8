//! In-memory filesystem implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use super::traits::{DirEntry, FileSystem, FileType, Metadata};
use crate::error::{Error, Result};

const MAX_LINK_HOPS: usize = 40;

/// In-memory filesystem.
///
/// Stores all files and directories in memory using a HashMap. Starts with
/// only `/`; the skeleton populator builds the rest.
pub struct InMemoryFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

#[derive(Debug, Clone)]
enum FsEntry {
    File { content: Vec<u8>, metadata: Metadata },
    Directory { metadata: Metadata },
    Symlink { target: PathBuf, metadata: Metadata },
}

impl FsEntry {
    fn metadata(&self) -> &Metadata {
        match self {
            FsEntry::File { metadata, .. }
            | FsEntry::Directory { metadata }
            | FsEntry::Symlink { metadata, .. } => metadata,
        }
    }

    fn directory() -> Self {
        FsEntry::Directory {
            metadata: Metadata::new(FileType::Directory, 0),
        }
    }
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFs {
    /// Create a new in-memory filesystem containing only the root directory.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), FsEntry::directory());

        Self {
            entries: RwLock::new(entries),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<PathBuf, FsEntry>>> {
        self.entries
            .read()
            .map_err(|_| Error::Internal("filesystem lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<PathBuf, FsEntry>>> {
        self.entries
            .write()
            .map_err(|_| Error::Internal("filesystem lock poisoned".to_string()))
    }

    fn normalize_path(path: &Path) -> PathBuf {
        let mut result = PathBuf::from("/");

        for component in path.components() {
            match component {
                Component::Normal(name) => result.push(name),
                Component::ParentDir => {
                    result.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }

        result
    }

    fn check_parent(entries: &HashMap<PathBuf, FsEntry>, path: &Path) -> Result<()> {
        match path.parent() {
            None => Ok(()),
            Some(parent) => match entries.get(parent) {
                Some(FsEntry::Directory { .. }) => Ok(()),
                Some(_) => Err(IoError::other("Not a directory").into()),
                None => Err(IoError::new(ErrorKind::NotFound, "parent directory not found").into()),
            },
        }
    }

    /// Follow symlinks until a non-link entry (or a missing one) is reached.
    fn follow(entries: &HashMap<PathBuf, FsEntry>, path: &Path) -> Result<PathBuf> {
        let mut current = path.to_path_buf();
        for _ in 0..MAX_LINK_HOPS {
            match entries.get(&current) {
                Some(FsEntry::Symlink { target, .. }) => {
                    let base = current.parent().unwrap_or(Path::new("/"));
                    current = Self::normalize_path(&base.join(target));
                }
                _ => return Ok(current),
            }
        }
        Err(IoError::other("Too many levels of symbolic links").into())
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let entries = self.read()?;
        let path = Self::follow(&entries, &Self::normalize_path(path))?;

        match entries.get(&path) {
            Some(FsEntry::File { content, .. }) => Ok(content.clone()),
            Some(_) => Err(IoError::other("Is a directory").into()),
            None => Err(IoError::new(ErrorKind::NotFound, "file not found").into()),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = Self::normalize_path(path);
        let mut entries = self.write()?;

        Self::check_parent(&entries, &path)?;
        if let Some(FsEntry::Directory { .. }) = entries.get(&path) {
            return Err(IoError::other("Is a directory").into());
        }

        let created = entries
            .get(&path)
            .map(|e| e.metadata().created)
            .unwrap_or_else(SystemTime::now);
        let mut metadata = Metadata::new(FileType::File, content.len() as u64);
        metadata.created = created;

        entries.insert(
            path,
            FsEntry::File {
                content: content.to_vec(),
                metadata,
            },
        );

        Ok(())
    }

    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = Self::normalize_path(path);

        // Release the lock before falling back to write_file
        {
            let mut entries = self.write()?;
            match entries.get_mut(&path) {
                Some(FsEntry::File {
                    content: existing,
                    metadata,
                }) => {
                    existing.extend_from_slice(content);
                    metadata.size = existing.len() as u64;
                    metadata.modified = SystemTime::now();
                    return Ok(());
                }
                Some(FsEntry::Directory { .. }) => {
                    return Err(IoError::other("Is a directory").into());
                }
                Some(FsEntry::Symlink { .. }) => {
                    return Err(IoError::other("Too many levels of symbolic links").into());
                }
                None => {}
            }
        }

        self.write_file(&path, content).await
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = Self::normalize_path(path);
        let mut entries = self.write()?;

        if recursive {
            let mut current = PathBuf::from("/");
            for component in path.components().skip(1) {
                current.push(component);
                match entries.get(&current) {
                    Some(FsEntry::Directory { .. }) => {}
                    Some(_) => return Err(IoError::new(ErrorKind::AlreadyExists, "file exists").into()),
                    None => {
                        entries.insert(current.clone(), FsEntry::directory());
                    }
                }
            }
        } else {
            Self::check_parent(&entries, &path)?;

            if entries.contains_key(&path) {
                return Err(IoError::new(ErrorKind::AlreadyExists, "directory exists").into());
            }

            entries.insert(path, FsEntry::directory());
        }

        Ok(())
    }

    async fn remove(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = Self::normalize_path(path);
        let mut entries = self.write()?;

        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {
                if recursive {
                    let to_remove: Vec<PathBuf> = entries
                        .keys()
                        .filter(|p| p.starts_with(&path) && **p != path)
                        .cloned()
                        .collect();

                    for p in to_remove {
                        entries.remove(&p);
                    }
                } else {
                    let has_children = entries.keys().any(|p| p.parent() == Some(path.as_path()));
                    if has_children {
                        return Err(IoError::other("Directory not empty").into());
                    }
                }
                // The root itself can be emptied but never removed.
                if path != Path::new("/") {
                    entries.remove(&path);
                }
            }
            Some(FsEntry::File { .. }) | Some(FsEntry::Symlink { .. }) => {
                entries.remove(&path);
            }
            None => {
                return Err(IoError::new(ErrorKind::NotFound, "not found").into());
            }
        }

        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let entries = self.read()?;
        let path = Self::follow(&entries, &Self::normalize_path(path))?;

        entries
            .get(&path)
            .map(|e| e.metadata().clone())
            .ok_or_else(|| IoError::new(ErrorKind::NotFound, "not found").into())
    }

    async fn symlink_metadata(&self, path: &Path) -> Result<Metadata> {
        let path = Self::normalize_path(path);
        let entries = self.read()?;

        entries
            .get(&path)
            .map(|e| e.metadata().clone())
            .ok_or_else(|| IoError::new(ErrorKind::NotFound, "not found").into())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = Self::normalize_path(path);
        let entries = self.read()?;

        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => Ok(entries
                .iter()
                .filter(|(p, _)| p.parent() == Some(path.as_path()))
                .map(|(p, entry)| DirEntry {
                    name: p
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    metadata: entry.metadata().clone(),
                })
                .collect()),
            Some(_) => Err(IoError::other("Not a directory").into()),
            None => Err(IoError::new(ErrorKind::NotFound, "not found").into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = Self::normalize_path(path);
        let entries = self.read()?;
        Ok(entries.contains_key(&path))
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let link = Self::normalize_path(link);
        let mut entries = self.write()?;

        Self::check_parent(&entries, &link)?;
        if entries.contains_key(&link) {
            return Err(IoError::new(ErrorKind::AlreadyExists, "file exists").into());
        }

        entries.insert(
            link,
            FsEntry::Symlink {
                target: target.to_path_buf(),
                metadata: Metadata::new(FileType::Symlink, target.as_os_str().len() as u64),
            },
        );

        Ok(())
    }

    async fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let path = Self::normalize_path(path);
        let entries = self.read()?;

        match entries.get(&path) {
            Some(FsEntry::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(IoError::new(ErrorKind::InvalidInput, "not a symlink").into()),
            None => Err(IoError::new(ErrorKind::NotFound, "not found").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read_file() {
        let fs = InMemoryFs::new();
        fs.mkdir(Path::new("/tmp"), false).await.unwrap();

        fs.write_file(Path::new("/tmp/test.txt"), b"hello world")
            .await
            .unwrap();

        let content = fs.read_file(Path::new("/tmp/test.txt")).await.unwrap();
        assert_eq!(content, b"hello world");
    }

    #[tokio::test]
    async fn test_write_requires_parent() {
        let fs = InMemoryFs::new();
        let result = fs.write_file(Path::new("/missing/file"), b"x").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_append_creates_then_extends() {
        let fs = InMemoryFs::new();
        fs.append_file(Path::new("/log"), b"one\n").await.unwrap();
        fs.append_file(Path::new("/log"), b"two\n").await.unwrap();
        assert_eq!(fs.read_file(Path::new("/log")).await.unwrap(), b"one\ntwo\n");
        assert_eq!(fs.stat(Path::new("/log")).await.unwrap().size, 8);
    }

    #[tokio::test]
    async fn test_mkdir_and_read_dir() {
        let fs = InMemoryFs::new();

        fs.mkdir(Path::new("/tmp/mydir"), true).await.unwrap();
        fs.write_file(Path::new("/tmp/mydir/file.txt"), b"test")
            .await
            .unwrap();

        let entries = fs.read_dir(Path::new("/tmp/mydir")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "file.txt");
    }

    #[tokio::test]
    async fn test_remove_non_empty_dir_requires_recursive() {
        let fs = InMemoryFs::new();
        fs.mkdir(Path::new("/a/b"), true).await.unwrap();

        assert!(fs.remove(Path::new("/a"), false).await.is_err());
        fs.remove(Path::new("/a"), true).await.unwrap();
        assert!(!fs.exists(Path::new("/a/b")).await.unwrap());
        assert!(!fs.exists(Path::new("/a")).await.unwrap());
    }

    #[tokio::test]
    async fn test_emptying_root_keeps_root() {
        let fs = InMemoryFs::new();
        fs.mkdir(Path::new("/etc"), false).await.unwrap();
        fs.remove(Path::new("/"), true).await.unwrap();
        assert!(fs.exists(Path::new("/")).await.unwrap());
        assert!(fs.read_dir(Path::new("/")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_symlink_metadata_does_not_follow() {
        let fs = InMemoryFs::new();
        fs.mkdir(Path::new("/data"), false).await.unwrap();
        fs.write_file(Path::new("/data/real"), b"abc").await.unwrap();
        fs.symlink(Path::new("real"), Path::new("/data/link"))
            .await
            .unwrap();

        let lmeta = fs.symlink_metadata(Path::new("/data/link")).await.unwrap();
        assert!(lmeta.file_type.is_symlink());

        let meta = fs.stat(Path::new("/data/link")).await.unwrap();
        assert!(meta.file_type.is_file());
        assert_eq!(fs.read_file(Path::new("/data/link")).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_symlink_loop_is_an_error() {
        let fs = InMemoryFs::new();
        fs.symlink(Path::new("/b"), Path::new("/a")).await.unwrap();
        fs.symlink(Path::new("/a"), Path::new("/b")).await.unwrap();
        assert!(fs.read_file(Path::new("/a")).await.is_err());
    }
}
