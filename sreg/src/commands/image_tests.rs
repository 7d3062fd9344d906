use super::*;
use crate::commands::testing::fixture;
use std::fs;

#[test]
fn test_push_image_view() {
    let f = fixture();

    let view = push_image(&f.client, &f.image, "labs/tool", Some("1.0")).unwrap();

    assert!(view.uri.starts_with("labs/tool:1.0@"));
    assert!(view.url.is_some());
    let pretty = view.format_pretty();
    assert!(pretty.contains("URI:  labs/tool:1.0@"));
}

#[test]
fn test_push_missing_file() {
    let f = fixture();

    let err = push_image(&f.client, &f.dir.path().join("missing.sif"), "labs/tool", None)
        .unwrap_err();

    assert!(err.is_not_found());
}

#[test]
fn test_pull_image_view() {
    let f = fixture();
    push_image(&f.client, &f.image, "labs/tool", None).unwrap();

    let view = pull_image(&f.client, "labs/tool").unwrap();

    let path = view.path.clone().unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"image contents");
    assert!(view.format_pretty().contains(&format!("Path: {}", path.display())));
}

#[test]
fn test_image_path() {
    let f = fixture();
    push_image(&f.client, &f.image, "labs/tool", None).unwrap();

    let path = image_path(&f.client, "labs/tool:latest").unwrap();

    assert_eq!(path, fs::canonicalize(&f.image).unwrap());
}

#[test]
fn test_image_path_unknown() {
    let f = fixture();
    assert!(image_path(&f.client, "labs/tool").unwrap_err().is_not_found());
}

#[test]
fn test_container_details() {
    let f = fixture();
    push_image(&f.client, &f.image, "labs/tool", Some("2.0")).unwrap();

    let details = container_details(&f.client, "labs/tool:2.0").unwrap();

    assert_eq!(details.collection, "labs");
    assert_eq!(details.name, "tool");
    assert_eq!(details.tag, "2.0");
    assert_eq!(details.client, "filesystem");
    assert_eq!(details.metrics["collection"], "labs");

    let pretty = details.format_pretty();
    assert!(pretty.contains("Collection: labs"));
    assert!(pretty.contains("Backend:    filesystem"));
    assert!(!pretty.contains("Labels:"));
}

#[test]
fn test_container_details_json() {
    let f = fixture();
    push_image(&f.client, &f.image, "labs/tool", None).unwrap();

    let details = container_details(&f.client, "labs/tool").unwrap();
    let output = format::format_output(&details, OutputFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(json["tag"], "latest");
    assert_eq!(json["metrics"]["image"], "tool");
}

#[test]
fn test_details_lists_labels() {
    let f = fixture();
    push_image(&f.client, &f.image, "labs/tool", None).unwrap();
    let mut details = container_details(&f.client, "labs/tool").unwrap();
    details
        .labels
        .insert("maintainer".to_string(), "vsoch".to_string());

    let pretty = details.format_pretty();

    assert!(pretty.contains("Labels:\n  maintainer: vsoch"));
}
