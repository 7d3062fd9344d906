//! A directory acting as the remote store.
//!
//! Images are copied to `<root>/<storage name>` and their properties are
//! written next to them as `<object>.json`. Useful for shared network mounts
//! and for exercising the client without a cloud account.

use super::{Backend, Descriptor, Upload, download_error, stored_version, verify_download};
use crate::cache::ImageCache;
use crate::config::{BackendKind, Config};
use crate::error::{Result, SregError};
use crate::names::ImageName;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

const SIDECAR_EXTENSION: &str = "json";

/// Filesystem backend.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Creates a backend storing objects under `root`.
    ///
    /// The directory is created on first push.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the backend from `filesystem.root`, which is required.
    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.filesystem.root {
            Some(root) => Ok(Self::new(root)),
            None => Err(SregError::configuration(
                "The filesystem backend needs a root directory \
                 (filesystem.root or SREGISTRY_FILESYSTEM_ROOT)",
                None::<String>,
            )),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, image: &ImageName) -> PathBuf {
        self.root.join(image.storage_name())
    }

    /// Finds the stored object for `image`.
    ///
    /// Without a version the most recently modified object with the same
    /// collection, name and tag is chosen.
    fn resolve(&self, image: &ImageName) -> Result<(ImageName, PathBuf)> {
        if image.version.is_some() {
            let path = self.object_path(image);
            if path.is_file() {
                return Ok((image.clone(), path));
            }
            return Err(SregError::not_found("image", image.uri()));
        }

        let dir = self.root.join(&image.collection);
        let mut newest: Option<(SystemTime, ImageName, PathBuf)> = None;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SregError::not_found("image", image.uri()));
            }
            Err(e) => {
                return Err(SregError::download_with_source(
                    image.uri(),
                    format!("Cannot list {}", dir.display()),
                    e,
                ));
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let object = format!(
                "{}/{}",
                image.collection,
                entry.file_name().to_string_lossy()
            );
            let Some(version) = stored_version(image, &object) else {
                continue;
            };

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().is_none_or(|(time, _, _)| modified > *time) {
                let mut found = image.clone();
                found.version = version;
                newest = Some((modified, found, entry.path()));
            }
        }

        newest
            .map(|(_, found, path)| (found, path))
            .ok_or_else(|| SregError::not_found("image", image.uri()))
    }

    fn read_properties(object: &Path) -> BTreeMap<String, String> {
        let sidecar = sidecar_path(object);
        match fs::read(&sidecar) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", sidecar.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }

    fn write_object(&self, upload: &Upload, dest: &Path) -> io::Result<()> {
        copy_atomic(&upload.path, dest)?;
        let properties = serde_json::to_vec_pretty(&upload.properties)?;
        fs::write(sidecar_path(dest), properties)
    }
}

impl Backend for FilesystemBackend {
    fn name(&self) -> &str {
        BackendKind::Filesystem.as_str()
    }

    fn push(&self, upload: &Upload) -> Result<Descriptor> {
        let dest = self.object_path(&upload.image);
        debug!("Copying {} to {}", upload.path.display(), dest.display());

        self.write_object(upload, &dest).map_err(|e| {
            SregError::upload_with_source(
                upload.path.display().to_string(),
                format!("Cannot write {}", dest.display()),
                e,
            )
        })?;

        info!("Pushed {} to {}", upload.image, dest.display());
        Ok(Descriptor {
            uri: upload.image.uri(),
            remote_id: Some(upload.image.storage_name()),
            url: Some(file_url(&dest)),
            size: Some(upload.size),
            path: None,
            properties: upload.properties.clone(),
        })
    }

    fn pull(&self, image: &ImageName, cache: &ImageCache) -> Result<Descriptor> {
        let uri = image.uri();
        let (resolved, object) = self.resolve(image).map_err(|e| download_error(&uri, e))?;
        let dest = cache.path_for(&resolved)?;

        if cache.lookup(&resolved)?.is_none() {
            cache.prepare(&dest)?;
            copy_atomic(&object, &dest).map_err(|e| {
                SregError::download_with_source(
                    &uri,
                    format!("Cannot copy {}", object.display()),
                    e,
                )
            })?;
            verify_download(&dest, &resolved).map_err(|e| download_error(&uri, e))?;
        } else {
            debug!("Using cached {}", dest.display());
        }

        let size = fs::metadata(&dest).map(|m| m.len()).ok();
        info!("Pulled {} to {}", resolved, dest.display());
        Ok(Descriptor {
            uri: resolved.uri(),
            remote_id: Some(resolved.storage_name()),
            url: Some(file_url(&object)),
            size,
            path: Some(dest),
            properties: Self::read_properties(&object),
        })
    }
}

fn sidecar_path(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Copies `src` to `dest` through a temporary file in the destination
/// directory, so readers never observe a partial file.
pub(crate) fn copy_atomic(src: &Path, dest: &Path) -> io::Result<u64> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut input = File::open(src)?;
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    let copied = io::copy(&mut input, temp.as_file_mut())?;
    temp.persist(dest).map_err(|e| e.error)?;
    Ok(copied)
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
