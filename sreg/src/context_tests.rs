use super::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::tempdir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_verbosity_from_count() {
    assert_eq!(VerbosityLevel::from_count(0), VerbosityLevel::Normal);
    assert_eq!(VerbosityLevel::from_count(1), VerbosityLevel::Verbose);
    assert_eq!(VerbosityLevel::from_count(2), VerbosityLevel::VeryVerbose);
    assert_eq!(VerbosityLevel::from_count(7), VerbosityLevel::Trace);
}

#[test]
fn test_verbosity_log_filter() {
    assert_eq!(VerbosityLevel::Normal.log_filter(), "warn");
    assert_eq!(VerbosityLevel::Verbose.log_filter(), "info");
    assert_eq!(VerbosityLevel::VeryVerbose.log_filter(), "debug");
    assert_eq!(VerbosityLevel::Trace.log_filter(), "trace");
}

#[test]
fn test_build_precedence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "backend: google-drive\nstorage: /from/file\nfilesystem:\n  root: /srv/images\n",
    )
    .unwrap();

    // File over defaults
    let ctx = AppContext::build_with(
        Some(&path),
        None,
        ColorChoice::Never,
        VerbosityLevel::Normal,
        env(&[]),
    )
    .unwrap();
    assert_eq!(ctx.config.backend, "google-drive");
    assert_eq!(ctx.config.storage, PathBuf::from("/from/file"));

    // Environment over file, flag over environment
    let ctx = AppContext::build_with(
        Some(&path),
        Some("filesystem"),
        ColorChoice::Never,
        VerbosityLevel::Verbose,
        env(&[
            ("SREGISTRY_CLIENT", "google-storage"),
            ("SREGISTRY_STORAGE", "/from/env"),
        ]),
    )
    .unwrap();
    assert_eq!(ctx.config.backend, "filesystem");
    assert_eq!(ctx.config.storage, PathBuf::from("/from/env"));
    assert_eq!(ctx.verbosity, VerbosityLevel::Verbose);
}

#[test]
fn test_build_missing_explicit_config() {
    let dir = tempdir().unwrap();
    let result = AppContext::build_with(
        Some(&dir.path().join("missing.yaml")),
        None,
        ColorChoice::Auto,
        VerbosityLevel::Normal,
        env(&[]),
    );
    assert!(matches!(result, Err(SregError::Configuration { .. })));
}

#[test]
fn test_client_with_configured_database() {
    let dir = tempdir().unwrap();
    let ctx = AppContext::build_with(
        None,
        None,
        ColorChoice::Never,
        VerbosityLevel::Normal,
        env(&[
            ("SREGISTRY_DATABASE", dir.path().join("sreg.db").to_str().unwrap()),
            ("SREGISTRY_STORAGE", dir.path().join("cache").to_str().unwrap()),
            ("SREGISTRY_FILESYSTEM_ROOT", dir.path().join("remote").to_str().unwrap()),
        ]),
    )
    .unwrap();

    let client = ctx.client().unwrap();

    assert_eq!(client.backend_name(), "filesystem");
    assert!(dir.path().join("sreg.db").exists());
}

#[test]
fn test_client_does_not_create_configured_database_dir() {
    let dir = tempdir().unwrap();
    let database = dir.path().join("missing").join("sreg.db");
    let ctx = AppContext::build_with(
        None,
        None,
        ColorChoice::Never,
        VerbosityLevel::Normal,
        env(&[
            ("SREGISTRY_DATABASE", database.to_str().unwrap()),
            ("SREGISTRY_FILESYSTEM_ROOT", dir.path().join("remote").to_str().unwrap()),
        ]),
    )
    .unwrap();

    assert!(matches!(ctx.client(), Err(SregError::Configuration { .. })));
    assert!(!dir.path().join("missing").exists());
}
