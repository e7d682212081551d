//! Location parsing and backend path normalization.
//!
//! A user-facing location such as `s3a://bucket/data/cars` is split into a
//! verbatim scheme prefix (`s3a://`) and a backend-relative path
//! (`bucket/data/cars`). Backends only ever see the relative form; the prefix
//! is re-attached when paths are handed back to the dataframe engine.
//!
//! Mount-style filesystems are addressed through a local mount point
//! (`/dbfs/...`) while their own tooling speaks an internal form
//! (`dbfs:/...`). The helpers here translate between the two.

pub mod posix;

pub use posix::PosixPath;

use crate::error::{Error, Result};

/// Local mount point of the mount-style filesystem.
pub const MOUNT_PREFIX: &str = "/dbfs";

/// Scheme marker used by the mount utility in the paths it returns.
pub const MOUNT_INTERNAL_MARKER: &str = "dbfs:";

const SCHEME_SEPARATOR: &str = "://";

/// Storage backend family a location lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Local,
    ObjectStore,
    DistributedFs,
    MountFs,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Local => "local",
            Scheme::ObjectStore => "object-store",
            Scheme::DistributedFs => "distributed-fs",
            Scheme::MountFs => "mount-fs",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed dataset location.
///
/// `base_path` never carries the scheme prefix; `prefix` keeps the exact
/// text that was split off so the original location can be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    scheme: Scheme,
    prefix: String,
    base_path: String,
}

impl Location {
    /// Parse and classify a location string.
    pub fn parse(location: &str) -> Result<Self> {
        let (prefix, path) = split(location);
        let scheme = match prefix {
            "" if path.starts_with(MOUNT_PREFIX) => Scheme::MountFs,
            "" | "file://" => Scheme::Local,
            "s3://" | "s3a://" | "s3n://" => Scheme::ObjectStore,
            "hdfs://" => Scheme::DistributedFs,
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        };

        if prefix == "s3n://" {
            tracing::warn!(
                location,
                "`s3n` filesystem is deprecated, please consider switching to `s3a`"
            );
        }

        let trimmed = path.trim_end_matches('/');
        let base_path = if trimmed.is_empty() { path } else { trimmed };
        let parsed = PosixPath::parse(base_path);
        if parsed.file_name().is_none() {
            return Err(Error::Config(format!(
                "location '{location}' has no final path component"
            )));
        }
        // Versions are discovered by globbing below the base path
        if let Some(segment) = parsed.wildcard_segment() {
            return Err(Error::Config(format!(
                "location '{location}' contains glob characters in '{segment}'"
            )));
        }

        Ok(Location {
            scheme,
            prefix: prefix.to_string(),
            base_path: base_path.to_string(),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The verbatim scheme prefix, e.g. `s3a://`, or an empty string.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Backend-relative base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Rebuild the user-facing location string.
    pub fn to_uri(&self) -> String {
        format!("{}{}", self.prefix, self.base_path)
    }

    /// Path handed to the dataframe engine for a backend path under this
    /// location: scheme prefix re-attached, mount prefix removed.
    pub fn engine_path(&self, path: &str) -> String {
        strip_mount_prefix(&format!("{}{}", self.prefix, path), MOUNT_PREFIX).to_string()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.prefix, self.base_path)
    }
}

/// Split a location into `(scheme_prefix, relative_path)`.
///
/// The prefix includes the `://` separator. Without a separator the prefix is
/// empty and the whole string is the relative path.
pub fn split(location: &str) -> (&str, &str) {
    match location.find(SCHEME_SEPARATOR) {
        Some(pos) => {
            let end = pos + SCHEME_SEPARATOR.len();
            (&location[..end], &location[end..])
        }
        None => ("", location),
    }
}

/// Remove `prefix` from the start of `path`, only on an exact leading match.
pub fn strip_mount_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Inverse of [`strip_mount_prefix`].
pub fn add_mount_prefix(path: &str, prefix: &str) -> String {
    format!("{prefix}{path}")
}
