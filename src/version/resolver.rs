use std::sync::Arc;

use super::{Version, VersionSpec};
use crate::error::{Error, Result};
use crate::fs::FilesystemAdapter;
use crate::path::{Location, PosixPath};

/// Versions resolved during the current session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedVersion {
    pub load: Option<Version>,
    pub save: Option<Version>,
}

/// Resolves concrete load and save paths for a versioned dataset.
///
/// Layout on the backend is `<base>/<version>/<leaf>` where `<leaf>` is the
/// last component of `<base>`. Each of the load and save versions is
/// resolved at most once per session and then served from memory, so a
/// session keeps reading the version it first saw even if newer ones appear.
pub struct VersionResolver {
    /// Scheme prefix shown in errors, e.g. `s3a://`
    prefix: String,
    base: PosixPath,
    leaf: String,
    requested: VersionSpec,
    cache: CachedVersion,
    fs: Arc<dyn FilesystemAdapter>,
}

impl VersionResolver {
    pub fn new(base_path: &str, requested: VersionSpec, fs: Arc<dyn FilesystemAdapter>) -> Result<Self> {
        let base = PosixPath::parse(base_path);
        if let Some(segment) = base.wildcard_segment() {
            return Err(Error::Config(format!(
                "base path '{base_path}' contains glob characters in '{segment}'"
            )));
        }
        let leaf = base
            .file_name()
            .ok_or_else(|| Error::Config(format!("base path '{base_path}' has no final component")))?
            .to_string();

        Ok(VersionResolver {
            prefix: String::new(),
            base,
            leaf,
            requested,
            cache: CachedVersion::default(),
            fs,
        })
    }

    /// Resolver for a parsed location; errors report the full location
    /// including its scheme.
    pub fn for_location(
        location: &Location,
        requested: VersionSpec,
        fs: Arc<dyn FilesystemAdapter>,
    ) -> Result<Self> {
        let mut resolver = Self::new(location.base_path(), requested, fs)?;
        resolver.prefix = location.prefix().to_string();
        Ok(resolver)
    }

    /// User-facing base location, scheme included.
    pub fn base_path(&self) -> String {
        format!("{}{}", self.prefix, self.base)
    }

    pub fn requested(&self) -> &VersionSpec {
        &self.requested
    }

    pub fn cached(&self) -> &CachedVersion {
        &self.cache
    }

    /// `<base>/<version>/<leaf>`
    pub fn versioned_path(&self, version: &Version) -> String {
        self.base.child(version.as_str()).child(&self.leaf).to_string()
    }

    /// Pattern matching every version of this dataset.
    pub fn pattern(&self) -> String {
        self.base.child("*").child(&self.leaf).to_string()
    }

    /// Every existing version, ascending. Always queries the backend.
    pub async fn list_versions(&self) -> Result<Vec<Version>> {
        let pattern = self.pattern();
        let paths = self.fs.glob(&pattern).await?;

        let mut versions: Vec<Version> = paths
            .iter()
            .filter_map(|path| {
                let token = PosixPath::parse(path).parent()?.file_name()?.to_string();
                match Version::parse(&token) {
                    Ok(version) => Some(version),
                    Err(e) => {
                        tracing::debug!(%path, error = %e, "ignoring non-version match");
                        None
                    }
                }
            })
            .collect();
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    /// Version to load: the requested one if it exists, else the latest.
    pub async fn load_version(&mut self) -> Result<Version> {
        if let Some(version) = &self.cache.load {
            tracing::debug!(base = %self.base, %version, "load version cached");
            return Ok(version.clone());
        }

        let version = match self.requested.load.clone() {
            Some(version) => {
                if !self.fs.exists(&self.versioned_path(&version)).await? {
                    let available = self.list_versions().await?;
                    return Err(Error::VersionNotFound {
                        base_path: self.base_path(),
                        version: version.to_string(),
                        pattern: format!("{}{}", self.prefix, self.pattern()),
                        available: available.iter().map(Version::to_string).collect(),
                    });
                }
                version
            }
            None => self
                .list_versions()
                .await?
                .pop()
                .ok_or_else(|| Error::NoVersions {
                    base_path: self.base_path(),
                    pattern: format!("{}{}", self.prefix, self.pattern()),
                })?,
        };

        tracing::info!(base = %self.base, %version, "resolved load version");
        self.cache.load = Some(version.clone());
        Ok(version)
    }

    pub async fn resolve_load_path(&mut self) -> Result<String> {
        let version = self.load_version().await?;
        Ok(self.versioned_path(&version))
    }

    /// Version to save under: the requested one or a fresh timestamp.
    ///
    /// Fails with [`Error::VersionConflict`] if the target already exists.
    /// The check and the later write are not atomic; two writers saving the
    /// same explicit version can both pass it.
    pub async fn save_version(&mut self) -> Result<Version> {
        if let Some(version) = &self.cache.save {
            tracing::debug!(base = %self.base, %version, "save version cached");
            return Ok(version.clone());
        }

        let version = self.requested.save.clone().unwrap_or_else(Version::now);
        let path = self.versioned_path(&version);
        if self.fs.exists(&path).await? {
            return Err(Error::VersionConflict {
                path: format!("{}{path}", self.prefix),
                version: version.to_string(),
            });
        }

        tracing::info!(base = %self.base, %version, "resolved save version");
        self.cache.save = Some(version.clone());
        Ok(version)
    }

    pub async fn resolve_save_path(&mut self) -> Result<String> {
        let version = self.save_version().await?;
        Ok(self.versioned_path(&version))
    }

    /// End the session: the next resolution queries the backend again.
    pub fn release(&mut self) {
        self.cache = CachedVersion::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FilesystemAdapter, Instrumented};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Adapter over a fixed set of existing paths
    #[derive(Default)]
    struct FakeFs {
        paths: Mutex<BTreeSet<String>>,
    }

    impl FakeFs {
        fn with(paths: &[&str]) -> Self {
            FakeFs {
                paths: Mutex::new(paths.iter().map(|p| p.to_string()).collect()),
            }
        }

        fn add(&self, path: &str) {
            self.paths.lock().unwrap().insert(path.to_string());
        }
    }

    #[async_trait]
    impl FilesystemAdapter for FakeFs {
        fn name(&self) -> &str {
            "fake"
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.paths.lock().unwrap().contains(path))
        }

        async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
            let matcher = crate::glob::GlobMatcher::new(pattern)?;
            Ok(self
                .paths
                .lock()
                .unwrap()
                .iter()
                .filter(|p| matcher.matches(p))
                .cloned()
                .collect())
        }
    }

    fn v(token: &str) -> Version {
        Version::parse(token).unwrap()
    }

    fn resolver(fs: Arc<dyn FilesystemAdapter>, spec: VersionSpec) -> VersionResolver {
        VersionResolver::new("data/cars", spec, fs).unwrap()
    }

    #[test]
    fn test_paths() {
        let r = resolver(Arc::new(FakeFs::default()), VersionSpec::default());
        assert_eq!(r.versioned_path(&v("v1")), "data/cars/v1/cars");
        assert_eq!(r.pattern(), "data/cars/*/cars");
    }

    #[tokio::test]
    async fn test_latest_is_max_version() {
        let fs = Arc::new(FakeFs::with(&[
            "data/cars/2024-01-01T00.00.00.000Z/cars",
            "data/cars/2024-03-01T00.00.00.000Z/cars",
            "data/cars/2024-02-01T00.00.00.000Z/cars",
        ]));
        let mut r = resolver(fs, VersionSpec::default());
        assert_eq!(
            r.resolve_load_path().await.unwrap(),
            "data/cars/2024-03-01T00.00.00.000Z/cars"
        );
    }

    #[tokio::test]
    async fn test_load_is_memoized() {
        let fake = Arc::new(FakeFs::with(&["data/cars/v1/cars"]));
        let fs = Arc::new(Instrumented::new(fake.clone()));
        let mut r = resolver(fs.clone(), VersionSpec::default());

        let first = r.resolve_load_path().await.unwrap();
        fake.add("data/cars/v2/cars");
        let second = r.resolve_load_path().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fs.metrics().total_calls(), 1);

        r.release();
        assert_eq!(r.resolve_load_path().await.unwrap(), "data/cars/v2/cars");
    }

    #[tokio::test]
    async fn test_explicit_load_version() {
        let fs = Arc::new(FakeFs::with(&["data/cars/v1/cars", "data/cars/v2/cars"]));
        let mut r = resolver(fs, VersionSpec::new(Some(v("v1")), None));
        assert_eq!(r.resolve_load_path().await.unwrap(), "data/cars/v1/cars");
    }

    #[tokio::test]
    async fn test_explicit_load_version_missing() {
        let fs = Arc::new(FakeFs::with(&["data/cars/v1/cars"]));
        let mut r = resolver(fs, VersionSpec::new(Some(v("v9")), None));

        match r.resolve_load_path().await.unwrap_err() {
            Error::VersionNotFound {
                base_path,
                pattern,
                available,
                ..
            } => {
                assert_eq!(base_path, "data/cars");
                assert_eq!(pattern, "data/cars/*/cars");
                assert_eq!(available, vec!["v1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(r.cached().load.is_none());
    }

    #[tokio::test]
    async fn test_no_versions() {
        let mut r = resolver(Arc::new(FakeFs::default()), VersionSpec::default());
        let err = r.resolve_load_path().await.unwrap_err();
        assert!(matches!(err, Error::NoVersions { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_save_conflict() {
        let fs = Arc::new(FakeFs::with(&["data/cars/v1/cars"]));
        let mut r = resolver(fs, VersionSpec::new(None, Some(v("v1"))));
        let err = r.resolve_save_path().await.unwrap_err();
        assert!(matches!(err, Error::VersionConflict { ref version, .. } if version == "v1"));
        assert!(r.cached().save.is_none());
    }

    #[tokio::test]
    async fn test_save_generates_timestamp_once() {
        let fs = Arc::new(Instrumented::new(FakeFs::default()));
        let mut r = resolver(fs.clone(), VersionSpec::default());

        let first = r.resolve_save_path().await.unwrap();
        let second = r.resolve_save_path().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fs.metrics().exists_calls(), 1);

        let version = r.cached().save.clone().unwrap();
        assert_eq!(version.as_str().len(), "2024-01-01T00.00.00.000Z".len());
    }

    #[tokio::test]
    async fn test_non_version_matches_ignored() {
        let fs = Arc::new(FakeFs::with(&["data/cars/v1/cars", "data/cars/[x]/cars"]));
        let r = resolver(fs, VersionSpec::default());
        assert_eq!(r.list_versions().await.unwrap(), vec![v("v1")]);
    }

    #[test]
    fn test_base_path_with_glob_characters_rejected() {
        let err = VersionResolver::new("data/run[1]/cars", VersionSpec::default(), Arc::new(FakeFs::default()))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_errors_report_full_location() {
        let location = Location::parse("s3a://bucket/data/cars").unwrap();
        let fs = Arc::new(FakeFs::with(&["bucket/data/cars/v1/cars"]));
        let mut r = VersionResolver::for_location(&location, VersionSpec::new(Some(v("v9")), Some(v("v1"))), fs).unwrap();

        match r.resolve_load_path().await.unwrap_err() {
            Error::VersionNotFound { base_path, pattern, .. } => {
                assert_eq!(base_path, "s3a://bucket/data/cars");
                assert_eq!(pattern, "s3a://bucket/data/cars/*/cars");
            }
            other => panic!("unexpected error: {other}"),
        }
        match r.resolve_save_path().await.unwrap_err() {
            Error::VersionConflict { path, .. } => assert_eq!(path, "s3a://bucket/data/cars/v1/cars"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
