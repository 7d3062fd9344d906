//! Container inspection metadata.
//!
//! Images are described by the JSON document printed by
//! `singularity inspect --json <image>`. The document is stored verbatim as a
//! container's `metrics`; this module runs the inspection tool and flattens
//! the document into the key/value properties that backends attach to remote
//! objects and that label search matches against.

use crate::config;
use crate::error::{Result, SregError};
use crate::names::ImageName;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Produces the inspection document for a local image file.
pub trait Inspector {
    fn inspect(&self, path: &Path) -> Result<Value>;
}

/// Runs an external program as `<program> inspect --json <path>`.
#[derive(Debug, Clone)]
pub struct CommandInspector {
    program: String,
}

impl CommandInspector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &config::Inspector) -> Self {
        Self::new(config.program.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Inspector for CommandInspector {
    fn inspect(&self, path: &Path) -> Result<Value> {
        debug!("Running {} inspect --json {}", self.program, path.display());

        let output = Command::new(&self.program)
            .args(["inspect", "--json"])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    SregError::not_found("inspection program", &self.program)
                } else {
                    SregError::validation_with_source(
                        format!("Failed to run {}", self.program),
                        e,
                    )
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SregError::validation(format!(
                "{} inspect exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            SregError::validation_with_source(
                format!("{} inspect printed invalid JSON", self.program),
                e,
            )
        })
    }
}

/// Inspects `path`, returning `fallback` when inspection fails.
///
/// Inspection is best effort: a missing tool or an unreadable image only
/// costs the richer metadata.
pub fn inspect_or(inspector: &dyn Inspector, path: &Path, fallback: Value) -> Value {
    match inspector.inspect(path) {
        Ok(document) => document,
        Err(e) => {
            warn!("Inspection of {} failed, using name metadata: {}", path.display(), e);
            fallback
        }
    }
}

/// The names document of an image, used when no inspection is available.
///
/// # Examples
///
/// ```
/// use libsreg::metadata::names_document;
/// use libsreg::names::ImageName;
///
/// let image: ImageName = "library/tool:1.0".parse().unwrap();
/// let doc = names_document(&image);
/// assert_eq!(doc["uri"], "library/tool:1.0");
/// ```
pub fn names_document(image: &ImageName) -> Value {
    let map: Map<String, Value> = image
        .to_properties()
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Value::Object(map)
}

/// Flattens an inspection document into key/value properties.
///
/// Scalar entries at the top level and inside `data` are kept, with labels
/// (see [`labels`]) applied last. Nested objects and arrays are dropped.
pub fn properties(document: &Value) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();

    if let Some(top) = document.as_object() {
        insert_scalars(&mut props, top);
    }
    if let Some(data) = document.get("data").and_then(Value::as_object) {
        insert_scalars(&mut props, data);
    }
    props.extend(labels(document));

    props
}

/// Extracts container labels from an inspection document.
///
/// Labels are read from `data.attributes.labels`, `attributes.labels` and a
/// top-level `labels` object, later locations overriding earlier ones.
pub fn labels(document: &Value) -> BTreeMap<String, String> {
    let locations = [
        document.pointer("/data/attributes/labels"),
        document.pointer("/attributes/labels"),
        document.get("labels"),
    ];

    let mut labels = BTreeMap::new();
    for map in locations.into_iter().flatten().filter_map(Value::as_object) {
        insert_scalars(&mut labels, map);
    }
    labels
}

/// Parses stored `metrics` text into flattened properties.
///
/// Text that is not valid JSON has no properties.
pub fn metrics_properties(metrics: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<Value>(metrics) {
        Ok(document) => properties(&document),
        Err(e) => {
            debug!("Ignoring unparseable metrics: {}", e);
            BTreeMap::new()
        }
    }
}

/// Returns true when `props` holds a pair matching `key` and `value`.
///
/// `None` on either side matches anything; comparisons are exact.
pub fn matches_label(
    props: &BTreeMap<String, String>,
    key: Option<&str>,
    value: Option<&str>,
) -> bool {
    match (key, value) {
        (Some(k), Some(v)) => props.get(k).is_some_and(|found| found == v),
        (Some(k), None) => props.contains_key(k),
        (None, Some(v)) => props.values().any(|found| found == v),
        (None, None) => true,
    }
}

fn insert_scalars(props: &mut BTreeMap<String, String>, map: &Map<String, Value>) {
    for (key, value) in map {
        if let Some(s) = scalar_string(value) {
            props.insert(key.clone(), s);
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
