//! Image name parsing and the canonical uri grammar.
//!
//! Every container known to sreg is identified by a uri of the form
//! `<collection>/<name>:<tag>[@<version>]`. The same string is typed by users,
//! stored in the metadata database and attached to remote objects, so parsing
//! and formatting must round-trip exactly.

use crate::error::{Result, SregError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// Collection used when a name has no `<collection>/` part.
pub const DEFAULT_COLLECTION: &str = "library";

/// Tag used when a name has no `:<tag>` part.
pub const DEFAULT_TAG: &str = "latest";

/// File extension of stored image files.
pub const IMAGE_EXTENSION: &str = "sif";

/// A parsed image name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageName {
    /// Collection (namespace) name, may itself contain `/`.
    pub collection: String,
    /// Image name within the collection.
    pub name: String,
    /// Tag, `latest` unless given.
    pub tag: String,
    /// Version string, usually a content hash.
    pub version: Option<String>,
}

impl ImageName {
    /// Parses an image name, applying an explicit tag if one is given.
    ///
    /// An explicit `tag` wins over a tag embedded in `input`. A leading
    /// `scheme://` is ignored, so `gdrive://labs/tool` parses like `labs/tool`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::names::ImageName;
    ///
    /// let name = ImageName::parse_with_tag("labs/tool", Some("v1")).unwrap();
    /// assert_eq!(name.uri(), "labs/tool:v1");
    /// ```
    pub fn parse_with_tag(input: &str, tag: Option<&str>) -> Result<Self> {
        let trimmed = input.trim();
        let without_scheme = match trimmed.split_once("://") {
            Some((_, rest)) => rest,
            None => trimmed,
        };

        if without_scheme.is_empty() {
            return Err(SregError::validation("Image name cannot be empty"));
        }
        if without_scheme.chars().any(char::is_whitespace) {
            return Err(SregError::validation(format!(
                "Image name cannot contain whitespace: '{}'",
                input
            )));
        }

        // The version may contain ':' or '/', so split it off first.
        let (rest, version) = match without_scheme.split_once('@') {
            Some((rest, version)) => (rest, Some(version)),
            None => (without_scheme, None),
        };

        let (collection, image_and_tag) = match rest.rsplit_once('/') {
            Some((collection, image)) => (collection.trim_matches('/'), image),
            None => (DEFAULT_COLLECTION, rest),
        };

        let (image, embedded_tag) = match image_and_tag.split_once(':') {
            Some((image, tag)) => (image, Some(tag)),
            None => (image_and_tag, None),
        };

        let tag = match tag.filter(|t| !t.trim().is_empty()) {
            Some(explicit) => explicit.trim(),
            None => match embedded_tag {
                Some(t) if t.is_empty() => {
                    return Err(SregError::validation(format!(
                        "Empty tag in image name '{}'",
                        input
                    )));
                }
                Some(t) => t,
                None => DEFAULT_TAG,
            },
        };

        if collection.is_empty() {
            return Err(SregError::validation(format!(
                "Empty collection in image name '{}'",
                input
            )));
        }
        if image.is_empty() {
            return Err(SregError::validation(format!(
                "Missing image name in '{}'",
                input
            )));
        }
        if tag.contains(':') || tag.contains('/') {
            return Err(SregError::validation(format!(
                "Invalid tag '{}' in image name '{}'",
                tag, input
            )));
        }

        let version = match version {
            Some(v) if v.is_empty() => None,
            Some(v) => Some(v.to_string()),
            None => None,
        };

        Ok(Self {
            collection: collection.to_lowercase(),
            name: image.to_lowercase(),
            tag: tag.to_lowercase(),
            version,
        })
    }

    /// Builds a name from already separated parts.
    pub fn from_parts(
        collection: &str,
        name: &str,
        tag: &str,
        version: Option<&str>,
    ) -> Result<Self> {
        let mut uri = format!("{}/{}:{}", collection, name, tag);
        if let Some(v) = version.filter(|v| !v.is_empty()) {
            uri.push('@');
            uri.push_str(v);
        }
        Self::parse_with_tag(&uri, None)
    }

    /// Returns a copy with the given version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = if version.is_empty() {
            None
        } else {
            Some(version)
        };
        self
    }

    /// The canonical uri: `<collection>/<name>:<tag>[@<version>]`.
    pub fn uri(&self) -> String {
        format_uri(&self.collection, &self.name, &self.tag, self.version.as_deref())
    }

    /// The uri without tag and version: `<collection>/<name>`.
    pub fn url(&self) -> String {
        format!("{}/{}", self.collection, self.name)
    }

    /// Relative path of the stored object: `<collection>/<name>:<tag>@<version>.sif`.
    ///
    /// The version is omitted (together with `@`) when unknown. Names and tags
    /// never contain `:`, so distinct images never share an object name.
    pub fn storage_name(&self) -> String {
        match &self.version {
            Some(version) => format!(
                "{}/{}:{}@{}.{}",
                self.collection, self.name, self.tag, version, IMAGE_EXTENSION
            ),
            None => format!(
                "{}/{}:{}.{}",
                self.collection, self.name, self.tag, IMAGE_EXTENSION
            ),
        }
    }

    /// Name components as key/value pairs, attached to remote objects.
    ///
    /// The keys are `collection`, `image`, `tag`, `version` (when known),
    /// `uri` and `storage`.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();
        properties.insert("collection".to_string(), self.collection.clone());
        properties.insert("image".to_string(), self.name.clone());
        properties.insert("tag".to_string(), self.tag.clone());
        if let Some(version) = &self.version {
            properties.insert("version".to_string(), version.clone());
        }
        properties.insert("uri".to_string(), self.uri());
        properties.insert("storage".to_string(), self.storage_name());
        properties
    }
}

impl FromStr for ImageName {
    type Err = SregError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_tag(s, None)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Formats the canonical uri from its parts.
///
/// The `@<version>` suffix is only added when `version` is non-empty.
///
/// # Examples
///
/// ```
/// use libsreg::names::format_uri;
///
/// assert_eq!(format_uri("labs", "tool", "latest", None), "labs/tool:latest");
/// assert_eq!(format_uri("labs", "tool", "latest", Some("")), "labs/tool:latest");
/// assert_eq!(format_uri("labs", "tool", "latest", Some("abc")), "labs/tool:latest@abc");
/// ```
pub fn format_uri(collection: &str, name: &str, tag: &str, version: Option<&str>) -> String {
    match version.filter(|v| !v.is_empty()) {
        Some(version) => format!("{}/{}:{}@{}", collection, name, tag, version),
        None => format!("{}/{}:{}", collection, name, tag),
    }
}
