use super::*;
use serde_json::json;
use std::path::PathBuf;

struct FixedInspector(Value);

impl Inspector for FixedInspector {
    fn inspect(&self, _path: &Path) -> Result<Value> {
        Ok(self.0.clone())
    }
}

struct FailingInspector;

impl Inspector for FailingInspector {
    fn inspect(&self, path: &Path) -> Result<Value> {
        Err(SregError::not_found("image", path.display().to_string()))
    }
}

fn singularity_document() -> Value {
    json!({
        "type": "container",
        "data": {
            "attributes": {
                "labels": {
                    "maintainer": "dinosaur",
                    "org.label-schema.build-size": "333MB",
                    "GPU": true
                },
                "environment": "export PATH=/usr/bin"
            },
            "type": "container"
        }
    })
}

#[test]
fn test_labels_from_singularity_document() {
    let labels = labels(&singularity_document());

    assert_eq!(labels.len(), 3);
    assert_eq!(labels["maintainer"], "dinosaur");
    assert_eq!(labels["org.label-schema.build-size"], "333MB");
    assert_eq!(labels["GPU"], "true");
}

#[test]
fn test_labels_from_other_locations() {
    let doc = json!({
        "attributes": {"labels": {"a": "1", "b": "attributes"}},
        "labels": {"b": "top", "c": 3}
    });
    let labels = labels(&doc);

    assert_eq!(labels["a"], "1");
    assert_eq!(labels["b"], "top");
    assert_eq!(labels["c"], "3");
}

#[test]
fn test_labels_missing() {
    assert!(labels(&json!({"data": {}})).is_empty());
    assert!(labels(&json!("not an object")).is_empty());
}

#[test]
fn test_properties_flatten_scalars_and_labels() {
    let props = properties(&singularity_document());

    assert_eq!(props["type"], "container");
    assert_eq!(props["maintainer"], "dinosaur");
    // Nested objects are not flattened
    assert!(!props.contains_key("attributes"));
    assert!(!props.contains_key("environment"));
}

#[test]
fn test_properties_labels_override_data() {
    let doc = json!({
        "name": "outer",
        "data": {"name": "inner", "attributes": {"labels": {"name": "label"}}}
    });
    assert_eq!(properties(&doc)["name"], "label");
}

#[test]
fn test_properties_skip_null_and_arrays() {
    let doc = json!({"a": null, "b": [1, 2], "c": 1.5});
    let props = properties(&doc);

    assert_eq!(props.len(), 1);
    assert_eq!(props["c"], "1.5");
}

#[test]
fn test_names_document() {
    let image: ImageName = "labs/tool:1.0@abc".parse().unwrap();
    let doc = names_document(&image);

    assert_eq!(doc["collection"], "labs");
    assert_eq!(doc["image"], "tool");
    assert_eq!(doc["tag"], "1.0");
    assert_eq!(doc["version"], "abc");
    assert_eq!(doc["uri"], "labs/tool:1.0@abc");

    // The names document flattens back to the same properties
    assert_eq!(properties(&doc), image.to_properties());
}

#[test]
fn test_metrics_properties_invalid_json() {
    assert!(metrics_properties("{not json").is_empty());
    assert_eq!(metrics_properties(r#"{"tag": "latest"}"#)["tag"], "latest");
}

#[test]
fn test_matches_label() {
    let props = properties(&singularity_document());

    assert!(matches_label(&props, Some("maintainer"), Some("dinosaur")));
    assert!(!matches_label(&props, Some("maintainer"), Some("Dinosaur")));
    assert!(!matches_label(&props, Some("maintainer"), Some("dino")));
    assert!(matches_label(&props, Some("maintainer"), None));
    assert!(matches_label(&props, None, Some("333MB")));
    assert!(!matches_label(&props, Some("missing"), None));
    assert!(matches_label(&props, None, None));
}

#[test]
fn test_inspect_or_uses_document() {
    let inspector = FixedInspector(json!({"data": {"size": 10}}));
    let doc = inspect_or(&inspector, Path::new("tool.sif"), json!({}));
    assert_eq!(doc["data"]["size"], 10);
}

#[test]
fn test_inspect_or_falls_back() {
    let fallback = json!({"uri": "library/tool:latest"});
    let doc = inspect_or(&FailingInspector, Path::new("tool.sif"), fallback.clone());
    assert_eq!(doc, fallback);
}

#[test]
fn test_command_inspector_missing_program() {
    let inspector = CommandInspector::new("sreg-no-such-inspector");
    let result = inspector.inspect(&PathBuf::from("/tmp/tool.sif"));
    assert!(result.unwrap_err().is_not_found());
}

#[test]
fn test_command_inspector_from_config() {
    let inspector = CommandInspector::from_config(&config::Inspector::default());
    assert_eq!(inspector.program(), "singularity");
}

#[cfg(unix)]
#[test]
fn test_command_inspector_non_zero_exit() {
    // `false inspect --json <path>` exits 1 without output
    let inspector = CommandInspector::new("false");
    let result = inspector.inspect(Path::new("/tmp/tool.sif"));
    assert!(matches!(result, Err(SregError::Validation { .. })));
}

#[cfg(unix)]
#[test]
fn test_command_inspector_invalid_json() {
    // `echo inspect --json <path>` prints plain text
    let inspector = CommandInspector::new("echo");
    let result = inspector.inspect(Path::new("/tmp/tool.sif"));
    assert!(matches!(result, Err(SregError::Validation { .. })));
}
