//! Version tokens and version resolution.
//!
//! A version is an opaque string naming one save's output directory. Tokens
//! generated here are fixed-width UTC timestamps, so plain string order is
//! chronological order and "latest" is simply the maximum.

pub mod resolver;

pub use resolver::{CachedVersion, VersionResolver};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::glob::has_wildcard;

/// `strftime` layout of generated tokens, e.g. `2024-05-01T09.15.42.017Z`.
pub const VERSION_FORMAT: &str = "%Y-%m-%dT%H.%M.%S%.3fZ";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Validate a user-supplied token.
    ///
    /// A token must be usable as exactly one path segment and must not be
    /// mistaken for a pattern when it is globbed for.
    pub fn parse(token: &str) -> Result<Self> {
        let reason = if token.is_empty() {
            Some("must not be empty")
        } else if token == "." || token == ".." {
            Some("must not be a relative path component")
        } else if token.contains('/') {
            Some("must not contain '/'")
        } else if has_wildcard(token) {
            Some("must not contain glob characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidVersion {
                version: token.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(Version(token.to_string())),
        }
    }

    /// Token for the current moment.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Version(timestamp.format(VERSION_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Requested versions for one dataset. `None` means latest (load) or a fresh
/// timestamp (save).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    pub load: Option<Version>,
    pub save: Option<Version>,
}

impl VersionSpec {
    pub fn new(load: Option<Version>, save: Option<Version>) -> Self {
        VersionSpec { load, save }
    }

    /// Build from optional raw tokens, validating each.
    pub fn from_tokens(load: Option<&str>, save: Option<&str>) -> Result<Self> {
        Ok(VersionSpec {
            load: load.map(Version::parse).transpose()?,
            save: save.map(Version::parse).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_format() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 2).unwrap()
            + chrono::Duration::milliseconds(17);
        assert_eq!(Version::at(ts).as_str(), "2024-05-01T09.05.02.017Z");
    }

    #[test]
    fn test_generated_tokens_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert!(Version::at(early) < Version::at(late));
        assert_eq!(Version::now().as_str().len(), Version::at(late).as_str().len());
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        for token in ["", ".", "..", "a/b", "v*", "v?", "v[1]"] {
            assert!(
                matches!(Version::parse(token), Err(Error::InvalidVersion { .. })),
                "{token:?} should be rejected"
            );
        }
        assert_eq!(Version::parse("v1").unwrap().as_str(), "v1");
    }

    #[test]
    fn test_serde_validates() {
        let spec: VersionSpec = serde_json::from_str(r#"{"load":"v1","save":null}"#).unwrap();
        assert_eq!(spec.load.unwrap().as_str(), "v1");
        assert!(serde_json::from_str::<VersionSpec>(r#"{"load":"a/b"}"#).is_err());
    }
}
