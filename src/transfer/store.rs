//! Destinations for finalized files
//!
//! Ownership of a [`FinalizedFile`] moves into the store. Nothing in the
//! engine keeps a copy.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::engine::FinalizedFile;
use crate::config::ClientConfig;
use crate::error::StoreError;

pub trait FileStore {
    fn store(&mut self, file: FinalizedFile) -> Result<(), StoreError>;
}

/// Hands files to another task over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelFileStore {
    sender: UnboundedSender<FinalizedFile>,
}

impl ChannelFileStore {
    pub fn new(sender: UnboundedSender<FinalizedFile>) -> Self {
        Self { sender }
    }

    /// A store plus the receiving end of its channel
    pub fn channel() -> (Self, UnboundedReceiver<FinalizedFile>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl FileStore for ChannelFileStore {
    fn store(&mut self, file: FinalizedFile) -> Result<(), StoreError> {
        self.sender.send(file).map_err(|_| StoreError::Disconnected)
    }
}

/// Writes `<root>/<site folder>/<NAME>`, or `<root>/<NAME>` when the site
/// folder does not exist. Names that could leave the target directory are
/// refused.
#[derive(Debug, Clone)]
pub struct DirectoryFileStore {
    root: PathBuf,
    site_folder: Option<String>,
}

impl DirectoryFileStore {
    pub fn new(root: impl Into<PathBuf>, site_folder: Option<String>) -> Self {
        Self { root: root.into(), site_folder }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.transfer_root.clone(), config.site_folder.clone())
    }

    pub fn target_dir(&self) -> PathBuf {
        match &self.site_folder {
            Some(site) if self.root.join(site).is_dir() => self.root.join(site),
            _ => self.root.clone(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.target_dir().join(name)
    }
}

impl FileStore for DirectoryFileStore {
    fn store(&mut self, file: FinalizedFile) -> Result<(), StoreError> {
        let io_error = |path: &Path| {
            let path = path.display().to_string();
            move |source| StoreError::Io { path, source }
        };

        check_file_name(&file.name)?;
        let dir = self.target_dir();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        let path = dir.join(&file.name);
        fs::write(&path, &file.data).map_err(io_error(&path))?;
        info!("stored {} ({} bytes)", path.display(), file.data.len());
        Ok(())
    }
}

/// A name must be a single plain path component
fn check_file_name(name: &str) -> Result<(), StoreError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if unsafe_name {
        warn!("refusing to store '{}'", name.escape_debug());
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Keeps files in memory
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    pub files: Vec<FinalizedFile>,
}

impl FileStore for MemoryFileStore {
    fn store(&mut self, file: FinalizedFile) -> Result<(), StoreError> {
        self.files.push(file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn file(name: &str, data: &[u8]) -> FinalizedFile {
        FinalizedFile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            data: data.to_vec(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_directory_store_uses_site_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("SITE")).unwrap();
        let mut store = DirectoryFileStore::new(dir.path(), Some("SITE".to_string()));

        store.store(file("REPORT", b"abc")).unwrap();
        assert_eq!(fs::read(dir.path().join("SITE").join("REPORT")).unwrap(), b"abc");
    }

    #[test]
    fn test_directory_store_falls_back_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryFileStore::new(dir.path(), Some("MISSING".to_string()));

        store.store(file("REPORT", b"abc")).unwrap();
        assert!(dir.path().join("REPORT").is_file());
        assert!(!dir.path().join("MISSING").exists());
    }

    #[test]
    fn test_directory_store_refuses_path_names() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("transfers");
        let mut store = DirectoryFileStore::new(&target, None);

        for name in ["../evil", "a/b", "..", "", "C:\\evil", "/etc/evil"] {
            assert!(
                matches!(store.store(file(name, b"x")), Err(StoreError::InvalidName(_))),
                "{name:?} was accepted"
            );
        }
        assert!(!root.path().join("evil").exists());
        assert!(!target.exists());

        store.store(file("USER1.SYS1.DATA", b"x")).unwrap();
        assert!(target.join("USER1.SYS1.DATA").is_file());
    }

    #[tokio::test]
    async fn test_channel_store_delivers_once() {
        let (mut store, mut receiver) = ChannelFileStore::channel();
        let sent = file("DATA", b"xyz");
        store.store(sent.clone()).unwrap();

        assert_eq!(receiver.recv().await, Some(sent));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_channel_store_disconnected() {
        let (mut store, receiver) = ChannelFileStore::channel();
        drop(receiver);
        assert!(matches!(store.store(file("X", b"")), Err(StoreError::Disconnected)));
    }
}
