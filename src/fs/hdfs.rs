//! HDFS backend over the WebHDFS REST API.
//!
//! HDFS offers no server-side glob. Existence is a status lookup and globbing
//! is a recursive walk from the pattern's literal prefix. Both are free
//! functions over the [`HdfsClient`] capability so any client (the bundled
//! [`WebHdfsClient`], a test fake) can back them.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeSet;
use url::Url;

use super::FilesystemAdapter;
use crate::error::{Error, Result};
use crate::glob::{literal_prefix, GlobMatcher, ListError};
use crate::path::PosixPath;

const BACKEND: &str = "hdfs";

/// Namenode HTTP address used when none is configured.
pub const DEFAULT_NAMENODE_URL: &str = "http://localhost:9870";

/// HDFS user used when none is configured.
pub const DEFAULT_USER: &str = "hadoop";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// Subset of a WebHDFS `FileStatus` object
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// Child name relative to the listed directory; empty for direct lookups
    #[serde(default)]
    pub path_suffix: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

impl FileStatus {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

/// Minimal HDFS client capability
#[async_trait]
pub trait HdfsClient: Send + Sync {
    /// Status of `path`, `None` when it does not exist
    async fn status(&self, path: &str) -> Result<Option<FileStatus>>;

    /// Immediate children of a directory
    async fn list_status(&self, path: &str) -> std::result::Result<Vec<FileStatus>, ListError>;
}

/// Whether `path` exists; a missing path is `false`, never an error.
pub async fn hdfs_exists<C>(client: &C, path: &str) -> Result<bool>
where
    C: HdfsClient + ?Sized,
{
    Ok(client.status(path).await?.is_some())
}

/// Glob by walking the tree below the pattern's literal prefix.
///
/// The walk never descends deeper than the pattern itself. Directories and
/// files are both tested against the pattern. A prefix that does not exist
/// yields an empty result.
pub async fn hdfs_glob<C>(client: &C, pattern: &str) -> Result<Vec<String>>
where
    C: HdfsClient + ?Sized,
{
    let matcher = GlobMatcher::new(pattern)?;
    let max_depth = PosixPath::parse(pattern).segments().len();
    let mut prefix = literal_prefix(pattern);
    if prefix.is_empty() {
        prefix = "/".to_string();
    }

    let mut matched = BTreeSet::new();
    if matcher.matches(&prefix) {
        matched.insert(prefix.clone());
    }
    let mut pending = vec![prefix.clone()];

    while let Some(dir) = pending.pop() {
        let children = match client.list_status(&dir).await {
            Ok(children) => children,
            Err(ListError::NotFound(_)) if dir == prefix => {
                tracing::debug!(%prefix, pattern, "hdfs glob prefix does not exist");
                return Ok(Vec::new());
            }
            // Removed while walking
            Err(ListError::NotFound(_)) => continue,
            Err(ListError::Transport(source)) => {
                return Err(Error::Transport {
                    backend: BACKEND,
                    source,
                });
            }
        };

        let parent = PosixPath::parse(&dir);
        for child in children.iter().filter(|c| !c.path_suffix.is_empty()) {
            let path = parent.child(&child.path_suffix);
            let rendered = path.to_string();
            if matcher.matches(&rendered) {
                matched.insert(rendered.clone());
            }
            if child.is_dir() && path.segments().len() < max_depth {
                pending.push(rendered);
            }
        }
    }

    Ok(matched.into_iter().collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusResponse {
    file_status: FileStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListResponse {
    file_statuses: FileStatuses,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileStatuses {
    #[serde(default)]
    file_status: Vec<FileStatus>,
}

/// WebHDFS client using simple (insecure) `user.name` authentication
#[derive(Debug, Clone)]
pub struct WebHdfsClient {
    http: reqwest::Client,
    base_url: Url,
    user: String,
}

impl WebHdfsClient {
    pub fn new(namenode_url: &str, user: impl Into<String>) -> Result<Self> {
        let mut normalized = namenode_url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)
            .map_err(|e| Error::Config(format!("invalid namenode url '{namenode_url}': {e}")))?;

        Ok(WebHdfsClient {
            http: reqwest::Client::new(),
            base_url,
            user: user.into(),
        })
    }

    /// Relative paths live under the user's home directory.
    fn absolute(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            PosixPath::parse(&format!("/user/{}/{path}", self.user)).to_string()
        }
    }

    fn endpoint(&self, path: &str, op: &str) -> Result<Url> {
        let relative = format!("webhdfs/v1{}", self.absolute(path));
        let mut url = self
            .base_url
            .join(&relative)
            .map_err(|e| Error::Config(format!("invalid hdfs path '{path}': {e}")))?;
        url.query_pairs_mut()
            .append_pair("op", op)
            .append_pair("user.name", &self.user);
        Ok(url)
    }

    /// Issue a GET; `Ok(None)` on 404.
    async fn get(&self, url: Url) -> Result<Option<reqwest::Response>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(BACKEND, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::transport(BACKEND, format!("HTTP {status}: {body}")))
            }
        }
    }
}

#[async_trait]
impl HdfsClient for WebHdfsClient {
    async fn status(&self, path: &str) -> Result<Option<FileStatus>> {
        let url = self.endpoint(path, "GETFILESTATUS")?;
        let Some(response) = self.get(url).await? else {
            return Ok(None);
        };
        let parsed: StatusResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(BACKEND, e))?;
        Ok(Some(parsed.file_status))
    }

    async fn list_status(&self, path: &str) -> std::result::Result<Vec<FileStatus>, ListError> {
        let to_list_error = |e: Error| match e {
            Error::Transport { source, .. } => ListError::Transport(source),
            other => ListError::Transport(Box::new(other)),
        };

        let url = self.endpoint(path, "LISTSTATUS").map_err(to_list_error)?;
        let Some(response) = self.get(url).await.map_err(to_list_error)? else {
            return Err(ListError::NotFound(path.to_string()));
        };
        let parsed: ListResponse = response
            .json()
            .await
            .map_err(|e| ListError::Transport(Box::new(e)))?;
        Ok(parsed.file_statuses.file_status)
    }
}

/// Filesystem adapter over any [`HdfsClient`]
pub struct HdfsFs<C = WebHdfsClient> {
    client: C,
}

impl<C: HdfsClient> HdfsFs<C> {
    pub fn new(client: C) -> Self {
        HdfsFs { client }
    }
}

#[async_trait]
impl<C: HdfsClient> FilesystemAdapter for HdfsFs<C> {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        hdfs_exists(&self.client, path).await
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        hdfs_glob(&self.client, pattern).await
    }
}
