//! Backend adapters answering existence and glob queries.
//!
//! Every backend is reduced to two questions: does this path exist, and which
//! paths match this pattern. "Not found" is never an error at this layer;
//! adapters answer `false` or an empty listing and reserve
//! [`Error::Transport`](crate::Error::Transport) for genuine backend failures.

pub mod hdfs;
pub mod local;
pub mod metrics;
pub mod mount;
pub mod object_store;

pub use hdfs::{HdfsClient, HdfsFs, WebHdfsClient};
pub use local::LocalFs;
pub use metrics::{BackendMetrics, Instrumented};
pub use mount::{MountFileInfo, MountFs, MountUtility};
pub use self::object_store::{GlobOptions, ObjectStoreFs};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Existence and pattern queries against one storage backend
#[async_trait]
pub trait FilesystemAdapter: Send + Sync {
    /// Short backend name used in logs and errors
    fn name(&self) -> &str;

    /// Check whether `path` exists (file or directory)
    async fn exists(&self, path: &str) -> Result<bool>;

    /// All paths matching `pattern`, sorted ascending and deduplicated
    async fn glob(&self, pattern: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<A: FilesystemAdapter + ?Sized> FilesystemAdapter for Arc<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        (**self).exists(path).await
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).glob(pattern).await
    }
}
