use super::*;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.backend, "filesystem");
    assert!(config.database.ends_with("sregistry/sregistry.db"));
    assert!(config.storage.ends_with("sregistry/images"));

    assert_eq!(config.network.timeout, 300);

    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.initial_backoff_ms, 500);
    assert_eq!(config.retry.max_backoff_ms, 8000);

    assert_eq!(config.inspector.program, "singularity");

    assert!(config.filesystem.root.is_none());
    assert!(config.google_drive.token.is_none());
    assert_eq!(config.google_drive.root, "sregistry");
    assert!(config.google_storage.bucket.is_none());
    assert_eq!(config.google_storage.base, "sregistry");
}

#[test]
fn test_from_str_empty_yaml() {
    let config = Config::from_yaml_str("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_from_str_partial_yaml() {
    let yaml = r#"
backend: google-storage
retry:
  max_attempts: 5
google_storage:
  bucket: images
"#;
    let config = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(config.backend, "google-storage");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.google_storage.bucket, Some("images".to_string()));

    // Unspecified values keep their defaults
    assert_eq!(config.retry.initial_backoff_ms, 500);
    assert_eq!(config.google_storage.base, "sregistry");
    assert_eq!(config.network.timeout, 300);
}

#[test]
fn test_from_str_invalid_yaml() {
    let result = Config::from_yaml_str("retry:\n  max_attempts: [not, a, number]\n");
    assert!(matches!(result, Err(SregError::Configuration { .. })));
}

#[test]
fn test_load_without_path_is_default() {
    let config = Config::load(None).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "backend: gdrive\ndatabase: /tmp/sreg-test.db").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.backend, "gdrive");
    assert_eq!(config.database, PathBuf::from("/tmp/sreg-test.db"));
}

#[test]
fn test_load_missing_file_fails() {
    let result = Config::load(Some(Path::new("/nonexistent/sregistry/config.yaml")));
    assert!(matches!(result, Err(SregError::Configuration { .. })));
}

#[test]
fn test_apply_env_overrides() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("SREGISTRY_CLIENT", "google-drive"),
        ("SREGISTRY_DATABASE", "/data/sregistry.db"),
        ("SREGISTRY_STORAGE", "/data/images"),
        ("SREGISTRY_GOOGLE_DRIVE_TOKEN", "ya29.token"),
        ("SREGISTRY_GOOGLE_DRIVE_ROOT", "containers"),
        ("SREGISTRY_GOOGLE_STORAGE_BUCKET", ""),
    ]);

    let mut config = Config::default();
    config.apply_env_with(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.backend, "google-drive");
    assert_eq!(config.database, PathBuf::from("/data/sregistry.db"));
    assert_eq!(config.storage, PathBuf::from("/data/images"));
    assert_eq!(config.google_drive.token, Some("ya29.token".to_string()));
    assert_eq!(config.google_drive.root, "containers");
    // Empty values are ignored
    assert!(config.google_storage.bucket.is_none());
}

#[test]
fn test_backend_kind_parsing() {
    assert_eq!(
        "filesystem".parse::<BackendKind>().unwrap(),
        BackendKind::Filesystem
    );
    assert_eq!(
        "google_drive".parse::<BackendKind>().unwrap(),
        BackendKind::GoogleDrive
    );
    assert_eq!("GDRIVE".parse::<BackendKind>().unwrap(), BackendKind::GoogleDrive);
    assert_eq!("gs".parse::<BackendKind>().unwrap(), BackendKind::GoogleStorage);
}

#[test]
fn test_unknown_backend_is_configuration_error() {
    let err = "dropbox".parse::<BackendKind>().unwrap_err();
    assert!(matches!(err, SregError::Configuration { .. }));
    assert!(err.to_string().contains("dropbox"));
}

#[test]
fn test_backend_kind_round_trip() {
    for kind in BackendKind::ALL {
        assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
    }
}

#[test]
fn test_retry_backoff_doubles_and_caps() {
    let policy = RetryPolicy {
        max_attempts: 6,
        initial_backoff_ms: 500,
        max_backoff_ms: 3000,
    };

    assert_eq!(policy.backoff(1), Duration::from_millis(500));
    assert_eq!(policy.backoff(2), Duration::from_millis(1000));
    assert_eq!(policy.backoff(3), Duration::from_millis(2000));
    assert_eq!(policy.backoff(4), Duration::from_millis(3000));
    assert_eq!(policy.backoff(40), Duration::from_millis(3000));
}

#[test]
fn test_retry_none() {
    let policy = RetryPolicy::none();
    assert_eq!(policy.max_attempts, 1);
    assert_eq!(policy.backoff(1), Duration::ZERO);
}
