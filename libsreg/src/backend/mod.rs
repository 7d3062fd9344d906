//! Remote storage backends.
//!
//! A backend moves image files between the local machine and one storage
//! provider. The client façade owns exactly one backend, chosen when it is
//! built, and records every transfer in the metadata store; backends never
//! write to the store themselves.

pub mod filesystem;
pub mod google_drive;
pub mod google_storage;

pub use filesystem::FilesystemBackend;
pub use google_drive::GoogleDriveBackend;
pub use google_storage::GoogleStorageBackend;

use crate::cache::ImageCache;
use crate::config::{BackendKind, Config};
use crate::database::{Container, MetadataStore};
use crate::digest::Digest;
use crate::error::{Result, SregError};
use crate::http::HttpConfig;
use crate::names::{IMAGE_EXTENSION, ImageName};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;


/// MIME type used for uploaded images.
pub(crate) const IMAGE_CONTENT_TYPE: &str = "application/octet-stream";

/// A local image on its way to a backend.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Absolute path of the image file.
    pub path: PathBuf,
    /// Fully resolved name, version included.
    pub image: ImageName,
    /// Key/value metadata attached to the remote object.
    pub properties: BTreeMap<String, String>,
    /// File size in bytes.
    pub size: u64,
}

/// The outcome of a push or pull, or a search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub uri: String,
    /// Provider identifier of the remote object.
    pub remote_id: Option<String>,
    /// Remote location of the object.
    pub url: Option<String>,
    pub size: Option<u64>,
    /// Local file, set after a pull.
    pub path: Option<PathBuf>,
    /// Metadata attached to the remote object.
    pub properties: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            remote_id: None,
            url: None,
            size: None,
            path: None,
            properties: BTreeMap::new(),
        }
    }

    /// The parsed image name of this descriptor.
    pub fn image_name(&self) -> Result<ImageName> {
        self.uri.parse()
    }
}

impl From<&Container> for Descriptor {
    fn from(container: &Container) -> Self {
        Self {
            uri: container.uri.clone(),
            remote_id: None,
            url: container.url.clone(),
            size: None,
            path: container.image.as_ref().map(PathBuf::from),
            properties: container.properties(),
        }
    }
}

/// Operations every storage provider supports.
pub trait Backend {
    /// Backend name, recorded as the `client` of stored containers.
    fn name(&self) -> &str;

    /// Uploads a local image.
    ///
    /// Failures are reported as `Upload` errors.
    fn push(&self, upload: &Upload) -> Result<Descriptor>;

    /// Downloads `image` into `cache` and returns its descriptor with `path`
    /// set. Without a version the most recent matching object is used.
    ///
    /// A missing remote object is `NotFound`; other failures are `Download`
    /// errors.
    fn pull(&self, image: &ImageName, cache: &ImageCache) -> Result<Descriptor>;

    /// Searches known containers.
    fn search(&self, store: &MetadataStore, term: &str) -> Result<Vec<Descriptor>> {
        Ok(store.search(term)?.iter().map(Descriptor::from).collect())
    }

    /// Searches known containers by inspection label.
    fn label_search(
        &self,
        store: &MetadataStore,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<Vec<Descriptor>> {
        Ok(store
            .label_search(key, value)?
            .iter()
            .map(Descriptor::from)
            .collect())
    }
}

/// Wraps a push failure as an `Upload` error.
///
/// Configuration problems are not transfer failures and pass through.
pub(crate) fn upload_error(path: &Path, err: SregError) -> SregError {
    match err {
        SregError::Upload { .. } | SregError::Configuration { .. } => err,
        other => SregError::upload(path.display().to_string(), other),
    }
}

/// Wraps a pull failure as a `Download` error, keeping `NotFound` and
/// `Configuration` as is.
pub(crate) fn download_error(uri: &str, err: SregError) -> SregError {
    match err {
        SregError::NotFound { .. } | SregError::Download { .. } | SregError::Configuration { .. } => {
            err
        }
        other => SregError::download(uri, other),
    }
}

/// Matches a stored object name against an unversioned `image`.
///
/// `object` is a storage name relative to the backend root. Returns the
/// version encoded in the name (`None` for an unversioned object), or `None`
/// altogether when the object belongs to another image.
pub(crate) fn stored_version(image: &ImageName, object: &str) -> Option<Option<String>> {
    let prefix = format!("{}/{}:{}", image.collection, image.name, image.tag);
    let rest = object
        .strip_prefix(&prefix)?
        .strip_suffix(&format!(".{}", IMAGE_EXTENSION))?;
    match rest {
        "" => Some(None),
        r => match r.strip_prefix('@') {
            Some(v) if !v.is_empty() && !v.contains('/') => Some(Some(v.to_string())),
            _ => None,
        },
    }
}

/// Checks a downloaded file against its content version.
///
/// A mismatching file is removed so it is never served from the cache.
pub(crate) fn verify_download(path: &Path, image: &ImageName) -> Result<()> {
    let Some(version) = &image.version else {
        return Ok(());
    };
    if let Err(e) = Digest::verify_file(path, version) {
        if let Err(remove) = fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), remove);
        }
        return Err(e);
    }
    Ok(())
}

/// Builds the backend selected by `config.backend`.
///
/// Unknown backend names and missing backend settings are `Configuration`
/// errors.
pub fn from_config(config: &Config) -> Result<Box<dyn Backend>> {
    let http = HttpConfig::from_config(config);
    let backend: Box<dyn Backend> = match config.backend_kind()? {
        BackendKind::Filesystem => Box::new(FilesystemBackend::from_config(config)?),
        BackendKind::GoogleDrive => {
            Box::new(GoogleDriveBackend::from_config(&config.google_drive, http)?)
        }
        BackendKind::GoogleStorage => {
            Box::new(GoogleStorageBackend::from_config(&config.google_storage, http)?)
        }
    };
    Ok(backend)
}
