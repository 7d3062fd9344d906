//! Google Cloud Storage backend (JSON API).
//!
//! Objects are named `<base>/<storage name>` inside a single bucket, and the
//! image properties are stored as object metadata. The bucket must already
//! exist; it is checked once, before the first transfer.

use super::{
    Backend, Descriptor, IMAGE_CONTENT_TYPE, Upload, download_error, stored_version, upload_error,
    verify_download,
};
use crate::auth::Credentials;
use crate::cache::ImageCache;
use crate::config::{BackendKind, GoogleStorage};
use crate::error::{Result, SregError};
use crate::http::{HttpClient, HttpConfig};
use crate::names::{IMAGE_EXTENSION, ImageName};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, info};

const OBJECT_FIELDS: &str = "name,size,updated,metadata";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<StorageObject>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StorageObject {
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl StorageObject {
    fn size(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Google Cloud Storage backend.
#[derive(Debug)]
pub struct GoogleStorageBackend {
    http: HttpClient,
    bucket: String,
    base: String,
    checked: OnceCell<()>,
}

impl GoogleStorageBackend {
    /// Creates a backend storing objects in `bucket` under the `base` prefix.
    pub fn new(http: HttpClient, bucket: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            http,
            bucket: bucket.into(),
            base: base.into().trim_matches('/').to_string(),
            checked: OnceCell::new(),
        }
    }

    /// Creates the backend from the `google_storage` settings.
    ///
    /// An access token and a bucket are required.
    pub fn from_config(config: &GoogleStorage, http: HttpConfig) -> Result<Self> {
        let credentials = Credentials::required_token(
            config.token.as_deref(),
            "google_storage.token or SREGISTRY_GOOGLE_STORAGE_TOKEN",
        )?;
        let bucket = config
            .bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                SregError::configuration(
                    "The Google Storage backend needs a bucket \
                     (google_storage.bucket or SREGISTRY_GOOGLE_STORAGE_BUCKET)",
                    None::<String>,
                )
            })?;
        let client = HttpClient::new(&config.api_url, credentials, http)?;
        Ok(Self::new(client, bucket, config.base.as_str()))
    }

    /// Full object name of `image` in the bucket.
    fn object_name(&self, image: &ImageName) -> String {
        if self.base.is_empty() {
            image.storage_name()
        } else {
            format!("{}/{}", self.base, image.storage_name())
        }
    }

    /// Object name relative to the base prefix.
    fn relative_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.base.is_empty() {
            Some(name)
        } else {
            name.strip_prefix(&self.base)?.strip_prefix('/')
        }
    }

    fn gs_url(&self, name: &str) -> String {
        format!("gs://{}/{}", self.bucket, name)
    }

    fn ensure_bucket(&self) -> Result<()> {
        if self.checked.get().is_some() {
            return Ok(());
        }

        let url = self.http.segments_url(&["storage", "v1", "b", &self.bucket])?;
        match self.http.get_json::<Value>(&url, &[("fields", "name")]) {
            Ok(_) => {
                debug!("Bucket {} is reachable", self.bucket);
                let _ = self.checked.set(());
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(SregError::configuration(
                format!("Bucket {} does not exist", self.bucket),
                None::<String>,
            )),
            Err(e) => Err(e),
        }
    }

    fn upload(&self, upload: &Upload) -> Result<StorageObject> {
        self.ensure_bucket()?;

        let name = self.object_name(&upload.image);
        let url = self
            .http
            .segments_url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        let metadata = json!({
            "name": name,
            "contentType": IMAGE_CONTENT_TYPE,
            "metadata": upload.properties,
        });

        let session = self.http.start_resumable(
            &url,
            &[("uploadType", "resumable"), ("name", name.as_str())],
            &metadata,
            IMAGE_CONTENT_TYPE,
            upload.size,
        )?;
        self.http
            .upload_file(&session, &upload.path, IMAGE_CONTENT_TYPE)
    }

    fn object_url(&self, name: &str) -> Result<String> {
        self.http
            .segments_url(&["storage", "v1", "b", &self.bucket, "o", name])
    }

    /// Finds the object for `image`.
    ///
    /// Without a version the most recently updated object with the same
    /// collection, name and tag is chosen.
    fn lookup(&self, image: &ImageName) -> Result<(ImageName, StorageObject)> {
        self.ensure_bucket()?;

        if image.version.is_some() {
            let url = self.object_url(&self.object_name(image))?;
            let object: StorageObject = self
                .http
                .get_json(&url, &[("fields", OBJECT_FIELDS)])
                .map_err(|e| {
                    if e.is_not_found() {
                        SregError::not_found("image", image.uri())
                    } else {
                        e
                    }
                })?;
            return Ok((image.clone(), object));
        }

        let object_name = self.object_name(image);
        let suffix = format!(".{}", IMAGE_EXTENSION);
        let prefix = object_name.strip_suffix(&suffix).unwrap_or(&object_name);
        let url = self
            .http
            .segments_url(&["storage", "v1", "b", &self.bucket, "o"])?;

        let mut newest: Option<(ImageName, StorageObject)> = None;
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("prefix", prefix)];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.as_str()));
            }
            let page: ObjectList = self.http.get_json(&url, &query)?;

            for object in page.items {
                let Some(version) = self
                    .relative_name(&object.name)
                    .and_then(|relative| stored_version(image, relative))
                else {
                    continue;
                };
                if newest
                    .as_ref()
                    .is_none_or(|(_, current)| object.updated > current.updated)
                {
                    let mut found = image.clone();
                    found.version = object.metadata.get("version").cloned().or(version);
                    newest = Some((found, object));
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        newest.ok_or_else(|| SregError::not_found("image", image.uri()))
    }
}

impl Backend for GoogleStorageBackend {
    fn name(&self) -> &str {
        BackendKind::GoogleStorage.as_str()
    }

    fn push(&self, upload: &Upload) -> Result<Descriptor> {
        let object = self
            .upload(upload)
            .map_err(|e| upload_error(&upload.path, e))?;

        info!("Pushed {} to {}", upload.image, self.gs_url(&object.name));
        Ok(Descriptor {
            uri: upload.image.uri(),
            url: Some(self.gs_url(&object.name)),
            size: object.size().or(Some(upload.size)),
            path: None,
            properties: upload.properties.clone(),
            remote_id: Some(object.name),
        })
    }

    fn pull(&self, image: &ImageName, cache: &ImageCache) -> Result<Descriptor> {
        let uri = image.uri();
        let (resolved, object) = self.lookup(image).map_err(|e| download_error(&uri, e))?;
        let dest = cache.path_for(&resolved)?;

        if cache.lookup(&resolved)?.is_none() {
            cache.prepare(&dest)?;
            self.object_url(&object.name)
                .and_then(|url| self.http.download_to(&url, &[("alt", "media")], &dest))
                .and_then(|_| verify_download(&dest, &resolved))
                .map_err(|e| download_error(&uri, e))?;
        } else {
            debug!("Using cached {}", dest.display());
        }

        info!("Pulled {} from {} to {}", resolved, self.bucket, dest.display());
        Ok(Descriptor {
            uri: resolved.uri(),
            url: Some(self.gs_url(&object.name)),
            size: fs::metadata(&dest).map(|m| m.len()).ok(),
            path: Some(dest),
            properties: object.metadata,
            remote_id: Some(object.name),
        })
    }
}

#[cfg(test)]
#[path = "google_storage_tests.rs"]
mod tests;
