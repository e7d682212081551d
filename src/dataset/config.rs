use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{Error, Result};
use crate::path::Location;
use crate::version::VersionSpec;

/// Engine options passed through untouched
pub type Options = BTreeMap<String, serde_json::Value>;

fn default_format() -> String {
    "parquet".to_string()
}

fn default_versioned() -> bool {
    true
}

/// Dataset configuration, typically deserialized from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Location of the dataset, optionally with a scheme (`s3a://`, `hdfs://`)
    pub base_location: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub load_options: Options,
    #[serde(default)]
    pub save_options: Options,
    #[serde(default = "default_versioned")]
    pub versioned: bool,
    #[serde(default)]
    pub load_version: Option<String>,
    #[serde(default)]
    pub save_version: Option<String>,
    #[serde(default, skip_serializing)]
    pub credentials: HashMap<String, String>,
}

impl DatasetConfig {
    /// Versioned parquet dataset at `base_location` with default options.
    pub fn new(base_location: impl Into<String>) -> Self {
        DatasetConfig {
            base_location: base_location.into(),
            format: default_format(),
            load_options: Options::new(),
            save_options: Options::new(),
            versioned: default_versioned(),
            load_version: None,
            save_version: None,
            credentials: HashMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid dataset config: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn with_load_version(mut self, version: impl Into<String>) -> Self {
        self.load_version = Some(version.into());
        self
    }

    pub fn with_save_version(mut self, version: impl Into<String>) -> Self {
        self.save_version = Some(version.into());
        self
    }

    pub fn unversioned(mut self) -> Self {
        self.versioned = false;
        self
    }

    /// Parse the location and version tokens.
    ///
    /// Returns `None` for the version spec of an unversioned dataset.
    pub fn validate(&self) -> Result<(Location, Option<VersionSpec>)> {
        let location = Location::parse(&self.base_location)?;
        if self.format.trim().is_empty() {
            return Err(Error::Config("format must not be empty".to_string()));
        }

        if !self.versioned {
            if self.load_version.is_some() || self.save_version.is_some() {
                return Err(Error::Config(format!(
                    "dataset '{}' is not versioned but a load or save version was given",
                    self.base_location
                )));
            }
            return Ok((location, None));
        }

        let spec = VersionSpec::from_tokens(self.load_version.as_deref(), self.save_version.as_deref())?;
        Ok((location, Some(spec)))
    }
}
