//! Versioned dataset facade.
//!
//! Ties a [`DatasetConfig`] to a backend adapter, a [`VersionResolver`] and
//! the dataframe engine that actually moves bytes. The engine only ever sees
//! concrete paths; format and options pass through untouched.

pub mod config;

pub use config::{DatasetConfig, Options};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{BoxError, Error, Result};
use crate::fs::{FilesystemAdapter, MountUtility};
use crate::path::Location;
use crate::providers::{self, BackendOptions};
use crate::version::{VersionResolver, VersionSpec};

/// Dataframe engine performing the actual reads and writes
#[async_trait]
pub trait DataFrameEngine: Send + Sync {
    type Table: Send + Sync;

    async fn load(
        &self,
        path: &str,
        format: &str,
        options: &Options,
    ) -> std::result::Result<Self::Table, BoxError>;

    async fn save(
        &self,
        path: &str,
        table: &Self::Table,
        format: &str,
        options: &Options,
    ) -> std::result::Result<(), BoxError>;
}

/// Serializable summary of a dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetDescription {
    pub location: String,
    pub backend: String,
    pub format: String,
    pub load_options: Options,
    pub save_options: Options,
    pub version: Option<VersionSpec>,
}

pub struct VersionedDataset<E> {
    config: DatasetConfig,
    location: Location,
    fs: Arc<dyn FilesystemAdapter>,
    /// `None` for unversioned datasets
    resolver: Option<VersionResolver>,
    engine: E,
}

impl<E: DataFrameEngine> VersionedDataset<E> {
    /// Create a dataset over an already constructed adapter.
    pub fn new(config: DatasetConfig, fs: Arc<dyn FilesystemAdapter>, engine: E) -> Result<Self> {
        let (location, spec) = config.validate()?;
        let resolver = spec
            .map(|spec| VersionResolver::for_location(&location, spec, Arc::clone(&fs)))
            .transpose()?;

        Ok(VersionedDataset {
            config,
            location,
            fs,
            resolver,
            engine,
        })
    }

    /// Create a dataset, building the backend from the config's location and
    /// credentials.
    pub async fn open(
        config: DatasetConfig,
        engine: E,
        mount_utility: Option<Arc<dyn MountUtility>>,
    ) -> Result<Self> {
        let (location, _) = config.validate()?;
        let options = BackendOptions {
            credentials: config.credentials.clone(),
            mount_utility,
            versioned: config.versioned,
        };
        let fs = providers::filesystem_for(&location, &options).await?;
        Self::new(config, fs, engine)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn resolver(&self) -> Option<&VersionResolver> {
        self.resolver.as_ref()
    }

    /// Backend path to read from.
    pub async fn load_path(&mut self) -> Result<String> {
        match &mut self.resolver {
            Some(resolver) => resolver.resolve_load_path().await,
            None => Ok(self.location.base_path().to_string()),
        }
    }

    /// Backend path to write to.
    pub async fn save_path(&mut self) -> Result<String> {
        match &mut self.resolver {
            Some(resolver) => resolver.resolve_save_path().await,
            None => Ok(self.location.base_path().to_string()),
        }
    }

    pub async fn load(&mut self) -> Result<E::Table> {
        let load_path = self.load_path().await?;
        let path = self.location.engine_path(&load_path);
        tracing::info!(%path, format = %self.config.format, "loading dataset");
        self.engine
            .load(&path, &self.config.format, &self.config.load_options)
            .await
            .map_err(Error::Engine)
    }

    /// Save under a new session: versions resolved earlier are discarded.
    pub async fn save(&mut self, table: &E::Table) -> Result<()> {
        self.release();
        let save_path = self.save_path().await?;
        let path = self.location.engine_path(&save_path);
        tracing::info!(%path, format = %self.config.format, "saving dataset");
        self.engine
            .save(&path, table, &self.config.format, &self.config.save_options)
            .await
            .map_err(Error::Engine)?;

        if let Some(resolver) = &mut self.resolver {
            let saved = resolver.save_version().await?;
            let loaded = resolver.load_version().await?;
            if loaded != saved {
                tracing::warn!(
                    location = %self.location,
                    save_version = %saved,
                    load_version = %loaded,
                    "save version does not match load version, \
                     the dataset may have been written by another process"
                );
            }
        }
        Ok(())
    }

    /// Whether there is anything to load.
    pub async fn exists(&mut self) -> Result<bool> {
        let path = match self.load_path().await {
            Ok(path) => path,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };
        self.fs.exists(&path).await
    }

    /// End the current session.
    pub fn release(&mut self) {
        if let Some(resolver) = &mut self.resolver {
            resolver.release();
        }
    }

    pub fn describe(&self) -> DatasetDescription {
        DatasetDescription {
            location: self.location.to_uri(),
            backend: self.fs.name().to_string(),
            format: self.config.format.clone(),
            load_options: self.config.load_options.clone(),
            save_options: self.config.save_options.clone(),
            version: self.resolver.as_ref().map(|r| r.requested().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{Instrumented, LocalFs};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Engine that writes a marker file and records every call
    #[derive(Default)]
    struct RecordingEngine {
        saved: Mutex<Vec<String>>,
        loaded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DataFrameEngine for RecordingEngine {
        type Table = String;

        async fn load(
            &self,
            path: &str,
            _format: &str,
            _options: &Options,
        ) -> std::result::Result<String, BoxError> {
            self.loaded.lock().unwrap().push(path.to_string());
            Ok(std::fs::read_to_string(format!("{path}/part-0000"))?)
        }

        async fn save(
            &self,
            path: &str,
            table: &String,
            _format: &str,
            _options: &Options,
        ) -> std::result::Result<(), BoxError> {
            self.saved.lock().unwrap().push(path.to_string());
            std::fs::create_dir_all(path)?;
            std::fs::write(format!("{path}/part-0000"), table)?;
            Ok(())
        }
    }

    fn dataset(dir: &TempDir, config: impl FnOnce(DatasetConfig) -> DatasetConfig) -> VersionedDataset<RecordingEngine> {
        let base = dir.path().join("cars").display().to_string();
        let config = config(DatasetConfig::new(base));
        VersionedDataset::new(config, Arc::new(LocalFs::new()), RecordingEngine::default()).unwrap()
    }

    #[tokio::test]
    async fn test_save_then_load_latest() {
        let dir = TempDir::new().unwrap();
        let mut ds = dataset(&dir, |c| c);

        assert!(!ds.exists().await.unwrap());
        ds.save(&"first".to_string()).await.unwrap();
        assert!(ds.exists().await.unwrap());
        assert_eq!(ds.load().await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_explicit_save_version_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut writer = dataset(&dir, |c| c.with_save_version("v1"));
        writer.save(&"one".to_string()).await.unwrap();

        let mut reader = dataset(&dir, |c| c.with_load_version("v1"));
        let expected = dir.path().join("cars/v1/cars").display().to_string();
        assert_eq!(reader.load_path().await.unwrap(), expected);
        assert_eq!(reader.load().await.unwrap(), "one");
        assert_eq!(reader.engine.loaded.lock().unwrap().as_slice(), [expected]);
    }

    #[tokio::test]
    async fn test_conflicting_save_does_not_write() {
        let dir = TempDir::new().unwrap();
        let mut first = dataset(&dir, |c| c.with_save_version("v1"));
        first.save(&"one".to_string()).await.unwrap();

        let mut second = dataset(&dir, |c| c.with_save_version("v1"));
        let err = second.save(&"two".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::VersionConflict { .. }));
        assert!(second.engine.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unversioned_uses_base_path() {
        let dir = TempDir::new().unwrap();
        let mut ds = dataset(&dir, |c| c.unversioned());
        ds.save(&"plain".to_string()).await.unwrap();

        let expected = dir.path().join("cars").display().to_string();
        assert_eq!(ds.engine.saved.lock().unwrap().as_slice(), [expected]);
        assert!(ds.exists().await.unwrap());
        assert!(ds.describe().version.is_none());
    }

    #[tokio::test]
    async fn test_load_session_is_stable() {
        let dir = TempDir::new().unwrap();
        let mut writer = dataset(&dir, |c| c.with_save_version("v1"));
        writer.save(&"one".to_string()).await.unwrap();

        let base = dir.path().join("cars").display().to_string();
        let fs = Arc::new(Instrumented::new(LocalFs::new()));
        let mut reader =
            VersionedDataset::new(DatasetConfig::new(base), fs.clone(), RecordingEngine::default()).unwrap();
        assert_eq!(reader.load().await.unwrap(), "one");

        let mut newer = dataset(&dir, |c| c.with_save_version("v2"));
        newer.save(&"two".to_string()).await.unwrap();

        assert_eq!(reader.load().await.unwrap(), "one");
        assert_eq!(fs.metrics().glob_calls(), 1);

        reader.release();
        assert_eq!(reader.load().await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_save_older_explicit_version_keeps_latest_load() {
        let dir = TempDir::new().unwrap();
        let mut newer = dataset(&dir, |c| c.with_save_version("v2"));
        newer.save(&"two".to_string()).await.unwrap();

        let mut older = dataset(&dir, |c| c.with_save_version("v1"));
        older.save(&"one".to_string()).await.unwrap();

        let cached = older.resolver().unwrap().cached().clone();
        assert_eq!(cached.save.unwrap().as_str(), "v1");
        assert_eq!(cached.load.unwrap().as_str(), "v2");
        assert_eq!(older.load().await.unwrap(), "two");

        let expected = dir.path().join("cars/v1/cars").display().to_string();
        assert_eq!(older.engine.saved.lock().unwrap().as_slice(), [expected]);
    }

    #[tokio::test]
    async fn test_open_selects_backend_from_location() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("cars").display().to_string();
        let ds = VersionedDataset::open(DatasetConfig::new(base), RecordingEngine::default(), None)
            .await
            .unwrap();
        assert_eq!(ds.describe().backend, "local");

        let config = DatasetConfig::new("ftp://host/cars");
        let err = VersionedDataset::open(config, RecordingEngine::default(), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsupportedScheme(_)));
    }

    #[test]
    fn test_describe() {
        let dir = TempDir::new().unwrap();
        let ds = dataset(&dir, |c| c.with_load_version("v1"));
        let description = ds.describe();
        assert_eq!(description.backend, "local");
        assert_eq!(description.format, "parquet");
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["version"]["load"], "v1");
    }
}
