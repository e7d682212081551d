//! Versioned dataset paths on local, object-store, HDFS and mounted
//! filesystems.
//!
//! Each save of a dataset lands in its own directory,
//! `<base>/<version>/<leaf>`, where the version is a sortable UTC timestamp.
//! Loading picks the latest version (or an explicit one) by enumerating those
//! directories, which on backends without a native glob is emulated with
//! directory listings.

pub mod cache;
pub mod dataset;
pub mod error;
pub mod fs;
pub mod glob;
pub mod path;
pub mod providers;
pub mod version;

pub use dataset::{DataFrameEngine, DatasetConfig, VersionedDataset};
pub use error::{Error, Result};
pub use fs::FilesystemAdapter;
pub use path::{Location, Scheme};
pub use version::{Version, VersionResolver, VersionSpec};
