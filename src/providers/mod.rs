//! Backend construction from a parsed location and its credentials.

mod s3;

pub use s3::{S3Config, create_object_store};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::fs::hdfs::{DEFAULT_NAMENODE_URL, DEFAULT_USER};
use crate::fs::{FilesystemAdapter, HdfsFs, LocalFs, MountFs, MountUtility, ObjectStoreFs, WebHdfsClient};
use crate::path::{Location, PosixPath, Scheme};

/// Everything needed to reach a location's backend
#[derive(Clone, Default)]
pub struct BackendOptions {
    /// Backend credentials: S3 keys (see [`S3Config::from_credentials`]) or
    /// HDFS `url`/`user`
    pub credentials: HashMap<String, String>,
    /// Listing utility for mount-style locations, supplied by the host
    pub mount_utility: Option<Arc<dyn MountUtility>>,
    /// Whether the dataset is versioned (only affects diagnostics)
    pub versioned: bool,
}

impl BackendOptions {
    pub fn with_credentials(mut self, credentials: HashMap<String, String>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_mount_utility(mut self, utility: Arc<dyn MountUtility>) -> Self {
        self.mount_utility = Some(utility);
        self
    }

    pub fn versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }
}

/// Build the adapter serving `location`.
///
/// Mount-style locations fall back to the local adapter when no listing
/// utility was supplied, as the mount point is then browsed like any local
/// directory.
pub async fn filesystem_for(
    location: &Location,
    options: &BackendOptions,
) -> Result<Arc<dyn FilesystemAdapter>> {
    let adapter: Arc<dyn FilesystemAdapter> = match location.scheme() {
        Scheme::Local => Arc::new(LocalFs::new()),

        Scheme::ObjectStore => {
            let bucket = PosixPath::parse(location.base_path())
                .segments()
                .first()
                .cloned()
                .unwrap_or_default();
            let config = S3Config::from_credentials(&options.credentials)?;
            let store = create_object_store(&bucket, config).await?;
            Arc::new(ObjectStoreFs::new(store, bucket))
        }

        Scheme::DistributedFs => {
            if options.versioned {
                tracing::warn!(
                    location = %location,
                    "HDFS support for versioned datasets is in beta and uses insecure \
                     `user.name` authentication, please use with caution"
                );
            }
            let url = options
                .credentials
                .get("url")
                .map(String::as_str)
                .unwrap_or(DEFAULT_NAMENODE_URL);
            let user = options
                .credentials
                .get("user")
                .map(String::as_str)
                .unwrap_or(DEFAULT_USER);
            Arc::new(HdfsFs::new(WebHdfsClient::new(url, user)?))
        }

        Scheme::MountFs => match &options.mount_utility {
            Some(utility) => Arc::new(MountFs::new(Arc::clone(utility))),
            None => {
                tracing::debug!(location = %location, "no mount utility supplied, using local filesystem");
                Arc::new(LocalFs::new())
            }
        },
    };

    tracing::debug!(location = %location, backend = adapter.name(), "selected backend");
    Ok(adapter)
}
