//! Google Drive backend (Drive v3 REST API).
//!
//! Images are uploaded into a single folder named by `google_drive.root`,
//! with the image properties stored as Drive file `properties`. Pulls look
//! files up by those properties, newest modification first.

use super::{
    Backend, Descriptor, IMAGE_CONTENT_TYPE, Upload, download_error, upload_error,
    verify_download,
};
use crate::auth::Credentials;
use crate::cache::ImageCache;
use crate::config::{BackendKind, GoogleDrive};
use crate::error::{Result, SregError};
use crate::http::{HttpClient, HttpConfig};
use crate::names::ImageName;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::Deserialize;
use serde_json::{Value, json};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Drive rejects a property whose key and value together exceed this size.
pub const MAX_PROPERTY_BYTES: usize = 124;

const FILE_FIELDS: &str = "id,name,size,properties,modifiedTime";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

/// Google Drive backend.
#[derive(Debug)]
pub struct GoogleDriveBackend {
    http: HttpClient,
    root: String,
    thumbnail: Option<PathBuf>,
    folder_id: OnceCell<String>,
}

impl GoogleDriveBackend {
    /// Creates a backend using `http`, storing images in the folder `root`.
    pub fn new(http: HttpClient, root: impl Into<String>, thumbnail: Option<PathBuf>) -> Self {
        Self {
            http,
            root: root.into(),
            thumbnail,
            folder_id: OnceCell::new(),
        }
    }

    /// Creates the backend from the `google_drive` settings.
    ///
    /// An access token is required.
    pub fn from_config(config: &GoogleDrive, http: HttpConfig) -> Result<Self> {
        let credentials = Credentials::required_token(
            config.token.as_deref(),
            "google_drive.token or SREGISTRY_GOOGLE_DRIVE_TOKEN",
        )?;
        if config.root.trim().is_empty() {
            return Err(SregError::configuration(
                "google_drive.root cannot be empty",
                None::<String>,
            ));
        }
        let client = HttpClient::new(&config.api_url, credentials, http)?;
        Ok(Self::new(client, config.root.trim(), config.thumbnail.clone()))
    }

    /// Looks up the root folder.
    fn find_folder(&self) -> Result<Option<String>> {
        if let Some(id) = self.folder_id.get() {
            return Ok(Some(id.clone()));
        }

        let q = format!(
            "mimeType='{}' and name={} and trashed=false",
            FOLDER_MIME_TYPE,
            quote(&self.root)
        );
        let list: FileList = self
            .http
            .get_json("/drive/v3/files", &[("q", q.as_str()), ("fields", "files(id,name)")])?;

        Ok(list.files.into_iter().next().map(|folder| {
            debug!("Found Drive folder {} ({})", self.root, folder.id);
            self.folder_id.get_or_init(|| folder.id).clone()
        }))
    }

    /// Looks up the root folder, creating it if missing.
    fn folder(&self) -> Result<String> {
        if let Some(id) = self.find_folder()? {
            return Ok(id);
        }

        let created: DriveFile = self.http.create_json(
            "/drive/v3/files",
            &[("fields", "id")],
            &json!({"name": self.root, "mimeType": FOLDER_MIME_TYPE}),
        )?;
        info!("Created Drive folder {} ({})", self.root, created.id);
        Ok(self.folder_id.get_or_init(|| created.id).clone())
    }

    fn attach_thumbnail(&self, file_id: &str) {
        let Some(thumbnail) = &self.thumbnail else {
            return;
        };

        let image = match fs::read(thumbnail) {
            Ok(bytes) => URL_SAFE.encode(bytes),
            Err(e) => {
                warn!("Cannot read thumbnail {}: {}", thumbnail.display(), e);
                return;
            }
        };
        let body = json!({
            "contentHints": {"thumbnail": {"image": image, "mimeType": "image/png"}}
        });

        let path = format!("/drive/v3/files/{}", file_id);
        if let Err(e) = self.http.patch_json::<Value>(&path, &[("fields", "id")], &body) {
            warn!("Failed to attach thumbnail to {}: {}", file_id, e);
        }
    }

    fn upload(&self, upload: &Upload) -> Result<DriveFile> {
        let folder = self.folder()?;
        let metadata = json!({
            "name": upload.image.storage_name(),
            "mimeType": IMAGE_CONTENT_TYPE,
            "parents": [folder],
            "properties": drive_properties(&upload.properties),
        });

        let session = self.http.start_resumable(
            "/upload/drive/v3/files",
            &[("uploadType", "resumable"), ("fields", FILE_FIELDS)],
            &metadata,
            IMAGE_CONTENT_TYPE,
            upload.size,
        )?;
        let file: DriveFile = self
            .http
            .upload_file(&session, &upload.path, IMAGE_CONTENT_TYPE)?;

        self.attach_thumbnail(&file.id);
        Ok(file)
    }

    /// Finds the newest file matching `image`.
    fn lookup(&self, image: &ImageName) -> Result<DriveFile> {
        let not_found = || SregError::not_found("image", image.uri());
        let folder = self.find_folder()?.ok_or_else(not_found)?;

        let mut q = format!("{} in parents and trashed=false", quote(&folder));
        let mut wanted = vec![
            ("collection", image.collection.as_str()),
            ("image", image.name.as_str()),
            ("tag", image.tag.as_str()),
        ];
        if let Some(version) = &image.version {
            wanted.push(("version", version.as_str()));
        }
        for (key, value) in wanted {
            q.push_str(&format!(
                " and properties has {{ key={} and value={} }}",
                quote(key),
                quote(value)
            ));
        }

        let fields = format!("files({})", FILE_FIELDS);
        let list: FileList = self.http.get_json(
            "/drive/v3/files",
            &[
                ("q", q.as_str()),
                ("orderBy", "modifiedTime desc"),
                ("fields", fields.as_str()),
            ],
        )?;

        list.files.into_iter().next().ok_or_else(not_found)
    }

    fn file_url(&self, id: &str) -> String {
        self.http.url(&format!("/drive/v3/files/{}?alt=media", id))
    }
}

impl Backend for GoogleDriveBackend {
    fn name(&self) -> &str {
        BackendKind::GoogleDrive.as_str()
    }

    fn push(&self, upload: &Upload) -> Result<Descriptor> {
        let file = self
            .upload(upload)
            .map_err(|e| upload_error(&upload.path, e))?;

        info!("Pushed {} to Google Drive ({})", upload.image, file.id);
        Ok(Descriptor {
            uri: upload.image.uri(),
            url: Some(self.file_url(&file.id)),
            size: file
                .size
                .and_then(|s| s.parse().ok())
                .or(Some(upload.size)),
            path: None,
            properties: upload.properties.clone(),
            remote_id: Some(file.id),
        })
    }

    fn pull(&self, image: &ImageName, cache: &ImageCache) -> Result<Descriptor> {
        let uri = image.uri();
        let file = self.lookup(image).map_err(|e| download_error(&uri, e))?;

        let resolved = match file.properties.get("version") {
            Some(version) => image.clone().with_version(version.as_str()),
            None => image.clone(),
        };
        let dest = cache.path_for(&resolved)?;

        if cache.lookup(&resolved)?.is_none() {
            cache.prepare(&dest)?;
            self.http
                .download_to(
                    &format!("/drive/v3/files/{}", file.id),
                    &[("alt", "media")],
                    &dest,
                )
                .and_then(|_| verify_download(&dest, &resolved))
                .map_err(|e| download_error(&uri, e))?;
        } else {
            debug!("Using cached {}", dest.display());
        }

        info!("Pulled {} from Google Drive to {}", resolved, dest.display());
        Ok(Descriptor {
            uri: resolved.uri(),
            url: Some(self.file_url(&file.id)),
            size: fs::metadata(&dest).map(|m| m.len()).ok(),
            path: Some(dest),
            properties: file.properties,
            remote_id: Some(file.id),
        })
    }
}

/// Drops properties Drive would reject for their size.
pub(crate) fn drive_properties(properties: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    properties
        .iter()
        .filter(|(key, value)| {
            let fits = key.len() + value.len() <= MAX_PROPERTY_BYTES;
            if !fits {
                warn!("Skipping property {}: too long for Google Drive", key);
            }
            fits
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Quotes a value for a Drive search query.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
#[path = "google_drive_tests.rs"]
mod tests;
