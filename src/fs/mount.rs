//! Mount-style distributed filesystem (DBFS-like).
//!
//! Datasets are addressed through the local mount point (`/dbfs/...`), but
//! the only listing primitive is a host-provided utility that speaks the
//! internal form (`dbfs:/...`). The utility is injected by the caller; it is
//! never looked up implicitly.

use async_trait::async_trait;
use std::sync::Arc;

use super::FilesystemAdapter;
use crate::error::{Error, Result};
use crate::glob::{emulate_glob, DirEntry, DirectoryLister, ListError};
use crate::path::{add_mount_prefix, strip_mount_prefix, MOUNT_INTERNAL_MARKER, MOUNT_PREFIX};

const BACKEND: &str = "mount";

/// Entry returned by the host listing utility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountFileInfo {
    /// Internal path, e.g. `dbfs:/mnt/cars/v1/`
    pub path: String,
    pub name: String,
    pub is_dir: bool,
}

/// Host-provided one-level directory listing
#[async_trait]
pub trait MountUtility: Send + Sync {
    /// List `path` (mount prefix already removed). Listing a path that does
    /// not exist must fail with [`ListError::NotFound`].
    async fn ls(&self, path: &str) -> std::result::Result<Vec<MountFileInfo>, ListError>;
}

/// Adapter emulating glob and existence over a [`MountUtility`]
#[derive(Clone)]
pub struct MountFs {
    utility: Arc<dyn MountUtility>,
}

impl MountFs {
    pub fn new(utility: Arc<dyn MountUtility>) -> Self {
        MountFs { utility }
    }
}

#[async_trait]
impl DirectoryLister for MountFs {
    async fn list_children(&self, path: &str) -> std::result::Result<Vec<DirEntry>, ListError> {
        let entries = self.utility.ls(path).await?;
        Ok(entries
            .into_iter()
            .map(|info| DirEntry {
                path: strip_mount_prefix(&info.path, MOUNT_INTERNAL_MARKER).to_string(),
                is_dir: info.is_dir,
            })
            .collect())
    }
}

#[async_trait]
impl FilesystemAdapter for MountFs {
    fn name(&self) -> &str {
        BACKEND
    }

    /// A listing of the exact path succeeds. Only a not-found listing means
    /// `false`; any other utility failure is reported.
    async fn exists(&self, path: &str) -> Result<bool> {
        let internal = match strip_mount_prefix(path, MOUNT_PREFIX) {
            "" => "/",
            internal => internal,
        };
        match self.utility.ls(internal).await {
            Ok(_) => Ok(true),
            Err(ListError::NotFound(_)) => Ok(false),
            Err(ListError::Transport(source)) => Err(Error::Transport {
                backend: BACKEND,
                source,
            }),
        }
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let internal = strip_mount_prefix(pattern, MOUNT_PREFIX);
        let matched = emulate_glob(internal, self).await?;
        Ok(matched
            .iter()
            .map(|path| add_mount_prefix(path, MOUNT_PREFIX))
            .collect())
    }
}
