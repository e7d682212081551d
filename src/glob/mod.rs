//! Glob emulation for backends without a native pattern listing.
//!
//! Only the shape used for version discovery is supported: a literal prefix,
//! one wildcard directory level, and a leaf token (`base/*/leaf`). Matching is
//! shell-style (`*`, `?`, `[...]`); wildcards never cross `/`.

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;

use crate::error::{BoxError, Error, Result};
use crate::path::PosixPath;

const WILDCARD_CHARS: [char; 3] = ['*', '?', '['];

pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One immediate child reported by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full location of the entry, in the same namespace as the listed path.
    pub path: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn dir(path: impl Into<String>) -> Self {
        DirEntry {
            path: path.into(),
            is_dir: true,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        DirEntry {
            path: path.into(),
            is_dir: false,
        }
    }

    /// Final path component, ignoring a trailing `/`.
    pub fn name(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

/// Why a listing produced no entries.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The listed directory does not exist. Distinct from an empty directory.
    #[error("no such directory: {0}")]
    NotFound(String),

    #[error("listing failed: {0}")]
    Transport(#[source] BoxError),
}

/// One-level directory listing primitive.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    async fn list_children(&self, path: &str) -> std::result::Result<Vec<DirEntry>, ListError>;
}

/// Compiled shell-style matcher.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: Pattern,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern).map_err(|source| Error::MalformedPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(GlobMatcher { pattern: compiled })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(path, MATCH_OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Check whether a string contains any glob metacharacter.
pub fn has_wildcard(segment: &str) -> bool {
    segment.contains(WILDCARD_CHARS)
}

/// Leading `/`-separated segments of `pattern` that contain no wildcard.
///
/// Stops at the first wildcard segment; `"/a/*/b"` gives `"/a"`.
pub fn literal_prefix(pattern: &str) -> String {
    pattern
        .split('/')
        .take_while(|part| !has_wildcard(part))
        .collect::<Vec<_>>()
        .join("/")
}

/// Literal prefix with a listable fallback when the pattern starts with a
/// wildcard segment.
pub fn listing_root(pattern: &str) -> String {
    let prefix = literal_prefix(pattern);
    if !prefix.is_empty() {
        prefix
    } else if pattern.starts_with('/') {
        "/".to_string()
    } else {
        ".".to_string()
    }
}

/// Emulate `glob(pattern)` with a one-level listing of the literal prefix.
///
/// Each child of the prefix is a candidate as-is, and every directory child is
/// also extended with the pattern's leaf token (the leaf is assumed present,
/// version directories are only ever written whole). Candidates matching the
/// whole pattern are kept. A prefix that does not exist yields no matches.
pub async fn emulate_glob<L>(pattern: &str, lister: &L) -> Result<Vec<String>>
where
    L: DirectoryLister + ?Sized,
{
    let matcher = GlobMatcher::new(pattern)?;
    let prefix = listing_root(pattern);
    let leaf = pattern.rsplit('/').next().unwrap_or(pattern);

    let entries = match lister.list_children(&prefix).await {
        Ok(entries) => entries,
        Err(ListError::NotFound(path)) => {
            tracing::debug!(%path, pattern, "glob prefix does not exist");
            return Ok(Vec::new());
        }
        Err(ListError::Transport(source)) => {
            return Err(Error::Transport {
                backend: "directory listing",
                source,
            });
        }
    };

    let mut matched = BTreeSet::new();
    for entry in &entries {
        let path = PosixPath::parse(entry.path.trim_end_matches('/'));
        let mut candidates = vec![path.to_string()];
        if entry.is_dir {
            candidates.push(path.child(leaf).to_string());
        }
        matched.extend(candidates.into_iter().filter(|c| matcher.matches(c)));
    }

    Ok(matched.into_iter().collect())
}
