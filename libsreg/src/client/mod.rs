//! The client façade.
//!
//! A [`Client`] owns one backend, the metadata store, the local image cache
//! and an inspector. Pushes and pulls go through the backend first and are
//! recorded in the store afterwards, so the store only ever describes images
//! that made it to (or from) the remote.
//!
//! # Examples
//!
//! ```no_run
//! use libsreg::{Client, Config};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.filesystem.root = Some("/srv/images".into());
//!
//!     let client = Client::from_config(&config)?;
//!     let pushed = client.push(Path::new("tool.sif"), "labs/tool", Some("1.0"))?;
//!     println!("Pushed {}", pushed.uri);
//!
//!     let pulled = client.pull("labs/tool:1.0")?;
//!     println!("Pulled to {:?}", pulled.path);
//!     Ok(())
//! }
//! ```

use crate::backend::{self, Backend, Descriptor, Upload};
use crate::cache::ImageCache;
use crate::config::Config;
use crate::database::{Collection, Container, MetadataStore, NewContainer};
use crate::digest::file_version;
use crate::error::{Result, SregError};
use crate::metadata::{self, CommandInspector, Inspector};
use crate::names::ImageName;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};


/// High-level interface over one backend and the local metadata store.
pub struct Client {
    backend: Box<dyn Backend>,
    store: MetadataStore,
    cache: ImageCache,
    inspector: Box<dyn Inspector>,
}

impl Client {
    /// Builds a client from configuration.
    ///
    /// The backend named by `config.backend` is constructed and the metadata
    /// store is opened immediately, so an unknown backend, missing backend
    /// settings or an unusable database path fail here with a
    /// `Configuration` error.
    pub fn from_config(config: &Config) -> Result<Self> {
        ClientBuilder::new().with_config(config.clone()).build()
    }

    /// Creates a builder for injecting components explicitly.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Pushes the image at `path` under `name`.
    ///
    /// An explicit `tag` overrides one embedded in `name`. Without a version
    /// in `name`, the content digest of the file is used. Pushing the same
    /// file twice updates the existing container instead of adding one.
    ///
    /// A `path` that is not a regular file is a `NotFound` error; the backend
    /// and the store are not touched.
    pub fn push(&self, path: &Path, name: &str, tag: Option<&str>) -> Result<Descriptor> {
        let file = image_file(path)?;

        let mut image = ImageName::parse_with_tag(name, tag)?;
        if image.version.is_none() {
            image = image.with_version(file_version(&file.path)?);
        }
        debug!("Pushing {} as {}", file.path.display(), image);

        let document = metadata::inspect_or(
            self.inspector.as_ref(),
            &file.path,
            metadata::names_document(&image),
        );
        let mut properties = metadata::properties(&document);
        properties.extend(image.to_properties());

        let upload = Upload {
            path: file.path.clone(),
            image: image.clone(),
            properties,
            size: file.size,
        };
        let descriptor = self.backend.push(&upload)?;

        let mut new = NewContainer::from_image(&image, self.backend.name(), &document)
            .with_image(file.path.display().to_string());
        if let Some(url) = &descriptor.url {
            new = new.with_url(url);
        }
        let container = self.record(&image, &new)?;

        info!("Recorded {} (container {})", container.uri, container.id);
        Ok(descriptor)
    }

    /// Pulls `uri` into the local cache.
    ///
    /// Without a version the backend's most recent match is pulled. The
    /// returned descriptor carries the local path.
    pub fn pull(&self, uri: &str) -> Result<Descriptor> {
        let image: ImageName = uri.parse()?;
        let descriptor = self.backend.pull(&image, &self.cache)?;

        let path = descriptor.path.clone().ok_or_else(|| {
            SregError::download(
                uri,
                SregError::validation("Backend returned no local path"),
            )
        })?;
        let resolved = descriptor.image_name()?;

        let fallback = if descriptor.properties.is_empty() {
            metadata::names_document(&resolved)
        } else {
            properties_document(&descriptor.properties)
        };
        let document = metadata::inspect_or(self.inspector.as_ref(), &path, fallback);

        let mut new = NewContainer::from_image(&resolved, self.backend.name(), &document)
            .with_image(path.display().to_string());
        if let Some(url) = &descriptor.url {
            new = new.with_url(url);
        }
        let container = self.record(&resolved, &new)?;

        info!("Recorded {} (container {})", container.uri, container.id);
        Ok(descriptor)
    }

    /// Searches known containers by name, uri or collection.
    ///
    /// No match is an empty list, never an error.
    pub fn search(&self, term: &str) -> Result<Vec<Descriptor>> {
        self.backend.search(&self.store, term)
    }

    /// Searches known containers by inspection label.
    ///
    /// `None` for `key` or `value` matches anything.
    pub fn label_search(&self, key: Option<&str>, value: Option<&str>) -> Result<Vec<Descriptor>> {
        self.backend.label_search(&self.store, key, value)
    }

    /// Looks up a known container by uri.
    ///
    /// Without a version the most recently recorded match is returned.
    pub fn find(&self, uri: &str) -> Result<Container> {
        self.store
            .find_container(uri)?
            .ok_or_else(|| SregError::not_found("container", uri))
    }

    /// Every known container.
    pub fn containers(&self) -> Result<Vec<Container>> {
        self.store.list_containers()
    }

    pub fn collections(&self) -> Result<Vec<Collection>> {
        self.store.list_collections()
    }

    /// Deletes a collection together with its containers.
    ///
    /// Returns the number of containers removed. Only local records are
    /// deleted; remote objects are left in place.
    pub fn delete_collection(&mut self, name: &str) -> Result<usize> {
        self.store.delete_collection(name)
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    fn record(&self, image: &ImageName, new: &NewContainer) -> Result<Container> {
        let collection = self.store.get_or_create_collection(&image.collection)?;
        self.store.upsert_container(&collection, new)
    }
}

/// Builder for creating a [`Client`] with explicit components.
///
/// Components that are not set are created from the configuration (the
/// default configuration unless [`with_config`](Self::with_config) is used).
///
/// # Examples
///
/// ```
/// use libsreg::backend::FilesystemBackend;
/// use libsreg::cache::ImageCache;
/// use libsreg::client::ClientBuilder;
/// use libsreg::database::MetadataStore;
///
/// let client = ClientBuilder::new()
///     .with_backend(Box::new(FilesystemBackend::new("/srv/images")))
///     .with_store(MetadataStore::open_in_memory().unwrap())
///     .with_cache(ImageCache::new("/tmp/sregistry-cache"))
///     .build()
///     .unwrap();
/// assert_eq!(client.backend_name(), "filesystem");
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<Config>,
    backend: Option<Box<dyn Backend>>,
    store: Option<MetadataStore>,
    cache: Option<ImageCache>,
    inspector: Option<Box<dyn Inspector>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration used for components not set explicitly.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_backend(mut self, backend: Box<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_store(mut self, store: MetadataStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cache(mut self, cache: ImageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_inspector(mut self, inspector: Box<dyn Inspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Builds the client.
    ///
    /// The backend is created before the store is opened, so configuration
    /// mistakes are reported without touching the database.
    pub fn build(self) -> Result<Client> {
        let config = self.config.unwrap_or_default();

        let backend = match self.backend {
            Some(backend) => backend,
            None => backend::from_config(&config)?,
        };
        let store = match self.store {
            Some(store) => store,
            None => MetadataStore::open(&config.database)?,
        };
        let cache = self
            .cache
            .unwrap_or_else(|| ImageCache::from_config(&config));
        let inspector = self.inspector.unwrap_or_else(|| {
            Box::new(CommandInspector::from_config(&config.inspector)) as Box<dyn Inspector>
        });

        debug!("Using {} backend", backend.name());
        Ok(Client {
            backend,
            store,
            cache,
            inspector,
        })
    }
}

struct ImageFile {
    path: PathBuf,
    size: u64,
}

/// Resolves `path` to an absolute path of an existing regular file.
fn image_file(path: &Path) -> Result<ImageFile> {
    let not_found = || SregError::not_found("image file", path.display().to_string());

    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(SregError::validation_with_source(
                format!("Cannot read {}", path.display()),
                e,
            ));
        }
    };
    if !meta.is_file() {
        return Err(not_found());
    }

    let absolute = fs::canonicalize(path).map_err(|e| {
        SregError::validation_with_source(format!("Cannot resolve {}", path.display()), e)
    })?;
    Ok(ImageFile {
        path: absolute,
        size: meta.len(),
    })
}

/// Remote properties as a document, used when a pulled image cannot be
/// inspected.
fn properties_document(properties: &BTreeMap<String, String>) -> Value {
    let map: Map<String, Value> = properties
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}
