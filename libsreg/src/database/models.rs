//! Rows of the metadata store.

use crate::metadata;
use crate::names::{ImageName, format_uri};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A named grouping of containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    /// Random token assigned at creation.
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// One versioned image known to the store.
///
/// The owning [`Collection`] is always loaded with the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub id: i64,
    pub name: String,
    pub tag: String,
    pub version: Option<String>,
    /// Name of the backend the container was pushed to or pulled from.
    pub client: String,
    pub collection: Collection,
    /// Inspection document, as JSON text.
    pub metrics: String,
    /// Local path of the image file.
    pub image: Option<String>,
    /// Remote location of the image file.
    pub url: Option<String>,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

impl Container {
    /// The canonical uri computed from the container's parts.
    pub fn derived_uri(&self) -> String {
        format_uri(
            &self.collection.name,
            &self.name,
            &self.tag,
            self.version.as_deref(),
        )
    }

    /// The container's parsed image name.
    pub fn image_name(&self) -> ImageName {
        ImageName {
            collection: self.collection.name.clone(),
            name: self.name.clone(),
            tag: self.tag.clone(),
            version: self.version.clone(),
        }
    }

    /// The inspection document, or `Value::Null` when `metrics` is not JSON.
    pub fn metrics_document(&self) -> Value {
        serde_json::from_str(&self.metrics).unwrap_or(Value::Null)
    }

    /// Flattened properties of the inspection document.
    pub fn properties(&self) -> BTreeMap<String, String> {
        metadata::metrics_properties(&self.metrics)
    }
}

/// Values for creating or updating a container.
///
/// # Examples
///
/// ```
/// use libsreg::database::NewContainer;
///
/// let new = NewContainer::new("tool", "latest", "filesystem", "{}")
///     .with_version("abc")
///     .with_image("/images/tool.sif");
/// assert_eq!(new.version.as_deref(), Some("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContainer {
    pub name: String,
    pub tag: String,
    pub version: Option<String>,
    pub client: String,
    pub metrics: String,
    pub image: Option<String>,
    pub url: Option<String>,
}

impl NewContainer {
    pub fn new(
        name: impl Into<String>,
        tag: impl Into<String>,
        client: impl Into<String>,
        metrics: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            version: None,
            client: client.into(),
            metrics: metrics.into(),
            image: None,
            url: None,
        }
    }

    /// Starts from the name, tag and version of `image`.
    pub fn from_image(image: &ImageName, client: impl Into<String>, metrics: &Value) -> Self {
        let new = Self::new(&image.name, &image.tag, client, metrics.to_string());
        match &image.version {
            Some(version) => new.with_version(version),
            None => new,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = (!version.is_empty()).then_some(version);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
