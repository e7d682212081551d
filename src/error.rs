//! Error types shared by the path, filesystem and version layers.
//!
//! Adapters never report "not found" through this type for `exists`/`glob`
//! queries; those collapse to `false` or an empty listing. The not-found
//! variants here are raised by the resolver once an empty enumeration has
//! become a user-visible failure.

use thiserror::Error;

/// Boxed error used for collaborator failures (backend clients, engines).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An explicitly requested load version does not exist.
    #[error(
        "version '{version}' of {base_path} not found (searched {pattern}; available: {})",
        display_versions(.available)
    )]
    VersionNotFound {
        base_path: String,
        version: String,
        pattern: String,
        available: Vec<String>,
    },

    /// No version directories exist at all.
    #[error("did not find any versions for {base_path} (searched {pattern})")]
    NoVersions { base_path: String, pattern: String },

    /// The save target is already present; versions are never overwritten.
    #[error("save path '{path}' for version '{version}' already exists, will not overwrite")]
    VersionConflict { path: String, version: String },

    /// Network, authentication or protocol failure from a backend client.
    #[error("{backend} backend error: {source}")]
    Transport {
        backend: &'static str,
        #[source]
        source: BoxError,
    },

    /// A glob pattern the matcher could not compile.
    #[error("malformed glob pattern '{pattern}': {source}")]
    MalformedPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("unsupported filesystem scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid version token '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure reported by the dataframe engine, passed through unchanged.
    #[error("dataframe engine error: {0}")]
    Engine(#[source] BoxError),
}

impl Error {
    /// Wrap a backend client failure.
    pub fn transport(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Transport {
            backend,
            source: source.into(),
        }
    }

    /// True for the recoverable "nothing to load" outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::VersionNotFound { .. } | Error::NoVersions { .. })
    }
}

fn display_versions(versions: &[String]) -> String {
    if versions.is_empty() {
        "none".to_string()
    } else {
        versions.join(", ")
    }
}
