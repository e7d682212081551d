use async_trait::async_trait;

use super::FilesystemAdapter;
use crate::error::{Error, Result};
use crate::glob::MATCH_OPTIONS;

/// Local or POSIX-mounted filesystem with native glob support
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        LocalFs
    }
}

#[async_trait]
impl FilesystemAdapter for LocalFs {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match tokio::fs::try_exists(path).await {
            Ok(found) => Ok(found),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::transport("local", e)),
        }
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let owned = pattern.to_string();
        let walk = tokio::task::spawn_blocking(move || {
            let paths = glob::glob_with(&owned, MATCH_OPTIONS).map_err(|source| {
                Error::MalformedPattern {
                    pattern: owned.clone(),
                    source,
                }
            })?;

            let mut matched = Vec::new();
            for entry in paths {
                match entry {
                    Ok(path) => matched.push(path.to_string_lossy().into_owned()),
                    // Unreadable directories are skipped, same as a shell glob
                    Err(e) => tracing::debug!(path = %e.path().display(), "skipping unreadable entry"),
                }
            }
            Ok::<_, Error>(matched)
        });

        let mut matched = walk.await.map_err(|e| Error::transport("local", e))??;
        matched.sort();
        matched.dedup();
        Ok(matched)
    }
}
