use super::*;
use std::str::FromStr;

#[test]
fn test_parse_full_uri() {
    let name = ImageName::from_str("labs/tool:1.0@abc123").unwrap();
    assert_eq!(name.collection, "labs");
    assert_eq!(name.name, "tool");
    assert_eq!(name.tag, "1.0");
    assert_eq!(name.version, Some("abc123".to_string()));
}

#[test]
fn test_parse_applies_defaults() {
    let name = ImageName::from_str("tool").unwrap();
    assert_eq!(name.collection, DEFAULT_COLLECTION);
    assert_eq!(name.tag, DEFAULT_TAG);
    assert_eq!(name.version, None);
    assert_eq!(name.uri(), "library/tool:latest");
}

#[test]
fn test_parse_strips_scheme() {
    let name = ImageName::from_str("gdrive://labs/tool:dev").unwrap();
    assert_eq!(name.uri(), "labs/tool:dev");
}

#[test]
fn test_parse_nested_collection() {
    let name = ImageName::from_str("org/team/tool:v2").unwrap();
    assert_eq!(name.collection, "org/team");
    assert_eq!(name.name, "tool");
    assert_eq!(name.uri(), "org/team/tool:v2");
}

#[test]
fn test_parse_lowercases_name_but_not_version() {
    let name = ImageName::from_str("Labs/Tool:Latest@ABC").unwrap();
    assert_eq!(name.uri(), "labs/tool:latest@ABC");
}

#[test]
fn test_explicit_tag_wins() {
    let name = ImageName::parse_with_tag("labs/tool:old", Some("new")).unwrap();
    assert_eq!(name.tag, "new");

    let name = ImageName::parse_with_tag("labs/tool", Some("  ")).unwrap();
    assert_eq!(name.tag, DEFAULT_TAG);
}

#[test]
fn test_empty_version_is_none() {
    let name = ImageName::from_str("labs/tool:latest@").unwrap();
    assert_eq!(name.version, None);
    assert_eq!(name.uri(), "labs/tool:latest");
}

#[test]
fn test_parse_rejects_invalid_input() {
    for input in ["", "   ", "labs/", "/tool", "labs/tool:", "labs/my tool", ":tag"] {
        let result = ImageName::from_str(input);
        assert!(
            matches!(result, Err(SregError::Validation { .. })),
            "expected validation error for {:?}",
            input
        );
    }
}

#[test]
fn test_uri_round_trip() {
    let cases = [
        ("labs", "tool", "latest", None),
        ("labs", "tool", "latest", Some("e3b0c44298fc1c149afbf4c8996fb924")),
        ("org/team", "analysis", "v1.2.3", Some("20240101")),
        ("library", "busybox", "1.36", None),
    ];

    for (collection, name, tag, version) in cases {
        let uri = format_uri(collection, name, tag, version);
        let parsed = ImageName::from_str(&uri).unwrap();
        assert_eq!(parsed.collection, collection);
        assert_eq!(parsed.name, name);
        assert_eq!(parsed.tag, tag);
        assert_eq!(parsed.version.as_deref(), version);
        assert_eq!(parsed.uri(), uri);
    }
}

#[test]
fn test_with_version() {
    let name = ImageName::from_str("labs/tool").unwrap().with_version("abc");
    assert_eq!(name.uri(), "labs/tool:latest@abc");

    let cleared = name.with_version("");
    assert_eq!(cleared.version, None);
}

#[test]
fn test_storage_name() {
    let name = ImageName::from_str("labs/tool:latest@abc").unwrap();
    assert_eq!(name.storage_name(), "labs/tool:latest@abc.sif");

    let unversioned = ImageName::from_str("labs/tool").unwrap();
    assert_eq!(unversioned.storage_name(), "labs/tool:latest.sif");
}

#[test]
fn test_to_properties() {
    let name = ImageName::from_str("labs/tool:latest@abc").unwrap();
    let properties = name.to_properties();

    assert_eq!(properties["collection"], "labs");
    assert_eq!(properties["image"], "tool");
    assert_eq!(properties["tag"], "latest");
    assert_eq!(properties["version"], "abc");
    assert_eq!(properties["uri"], "labs/tool:latest@abc");
    assert_eq!(properties["storage"], "labs/tool:latest@abc.sif");
}

#[test]
fn test_from_parts() {
    let name = ImageName::from_parts("labs", "tool", "latest", Some("")).unwrap();
    assert_eq!(name.version, None);
    assert_eq!(name.to_string(), "labs/tool:latest");
}
