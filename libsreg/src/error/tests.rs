use super::*;
use std::error::Error;

#[test]
fn test_network_error_connection_refused() {
    let err = SregError::Network {
        message: "connection refused".to_string(),
        source: None,
    };

    assert!(matches!(err, SregError::Network { .. }));
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_authentication_error_display() {
    let err = SregError::authentication("invalid token", Some(401));

    assert!(err.to_string().contains("invalid token"));
    assert!(err.to_string().contains("401"));
}

#[test]
fn test_not_found_error_local_file() {
    let err = SregError::not_found("file", "/tmp/missing.sif");

    assert!(err.is_not_found());
    assert!(err.to_string().contains("file"));
    assert!(err.to_string().contains("/tmp/missing.sif"));
}

#[test]
fn test_configuration_error_keeps_path() {
    let err = SregError::configuration("parent directory is not writable", Some("/root/db"));

    match err {
        SregError::Configuration { path, .. } => assert_eq!(path, Some("/root/db".to_string())),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_configuration_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err = SregError::configuration_with_source("cannot open", Some("/db"), io_err);

    assert!(err.source().is_some());
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_upload_error_wraps_cause() {
    let cause = SregError::server("backend unavailable", 503);
    let err = SregError::upload("/images/tool.sif", cause);

    assert!(err.to_string().contains("/images/tool.sif"));
    assert!(err.to_string().contains("backend unavailable"));
    let source = err.source().expect("upload error should keep its cause");
    assert!(source.to_string().contains("503"));
}

#[test]
fn test_download_error_wraps_cause() {
    let cause = SregError::authentication("token expired", Some(401));
    let err = SregError::download("labs/tool:latest", cause);

    assert!(matches!(err, SregError::Download { .. }));
    assert!(err.to_string().contains("labs/tool:latest"));
}

#[test]
fn test_duplicate_name_error() {
    let err = SregError::duplicate_name("labs");

    assert!(matches!(err, SregError::DuplicateName { .. }));
    assert_eq!(err.to_string(), "Collection already exists: labs");
}

#[test]
fn test_retryable_classification() {
    assert!(SregError::network("timed out").is_retryable());
    assert!(SregError::rate_limit("slow down", Some(2)).is_retryable());
    assert!(SregError::server("bad gateway", 502).is_retryable());

    assert!(!SregError::authentication("nope", Some(403)).is_retryable());
    assert!(!SregError::not_found("object", "x").is_retryable());
    assert!(!SregError::validation("bad").is_retryable());
}

#[test]
fn test_rusqlite_error_becomes_storage_error() {
    let err: SregError = rusqlite::Error::QueryReturnedNoRows.into();

    assert!(matches!(err, SregError::Storage { .. }));
    assert!(err.source().is_some());
}
