use super::*;
use tempfile::tempdir;

fn image(uri: &str) -> ImageName {
    uri.parse().unwrap()
}

#[test]
fn test_cache_new() {
    let temp_dir = tempdir().unwrap();
    let cache = ImageCache::new(temp_dir.path());
    assert_eq!(cache.root(), temp_dir.path());
}

#[test]
fn test_cache_from_config() {
    let mut config = Config::default();
    config.storage = PathBuf::from("/data/images");

    let cache = ImageCache::from_config(&config);
    assert_eq!(cache.root(), Path::new("/data/images"));
}

#[test]
fn test_path_for_versions_differ() {
    let cache = ImageCache::new("/cache");

    let v1 = cache.path_for(&image("labs/tool:latest@aaa")).unwrap();
    let v2 = cache.path_for(&image("labs/tool:latest@bbb")).unwrap();

    assert_eq!(v1, PathBuf::from("/cache/labs/tool:latest@aaa.sif"));
    assert_ne!(v1, v2);
}

#[test]
fn test_path_for_nested_collection() {
    let cache = ImageCache::new("/cache");
    let path = cache.path_for(&image("group/team/tool:1.0")).unwrap();
    assert_eq!(path, PathBuf::from("/cache/group/team/tool:1.0.sif"));
}

#[test]
fn test_path_for_rejects_traversal() {
    let cache = ImageCache::new("/cache");
    let result = cache.path_for(&image("../etc/tool:1.0"));
    assert!(matches!(result, Err(SregError::Validation { .. })));
}

#[test]
fn test_lookup() {
    let temp_dir = tempdir().unwrap();
    let cache = ImageCache::new(temp_dir.path());
    let versioned = image("labs/tool:latest@aaa");

    // Miss before the file exists
    assert!(cache.lookup(&versioned).unwrap().is_none());

    let path = cache.path_for(&versioned).unwrap();
    cache.prepare(&path).unwrap();
    fs::write(&path, b"image").unwrap();

    assert_eq!(cache.lookup(&versioned).unwrap(), Some(path));

    // Unversioned names always go to the remote
    assert!(cache.lookup(&image("labs/tool:latest")).unwrap().is_none());
}

#[test]
fn test_stats_and_clear() {
    let temp_dir = tempdir().unwrap();
    let cache = ImageCache::new(temp_dir.path());

    for uri in ["labs/a:1@x", "labs/b:1@y", "other/c:1@z"] {
        let path = cache.path_for(&image(uri)).unwrap();
        cache.prepare(&path).unwrap();
        fs::write(&path, b"12345").unwrap();
    }

    let stats = cache.stats().unwrap();
    assert_eq!(stats.entries, 3);
    assert_eq!(stats.size, 15);

    let cleared = cache.clear().unwrap();
    assert_eq!(cleared.removed_files, 3);
    assert_eq!(cleared.reclaimed_space, 15);

    assert_eq!(cache.stats().unwrap(), CacheStats::default());
}

#[test]
fn test_stats_missing_root() {
    let temp_dir = tempdir().unwrap();
    let cache = ImageCache::new(temp_dir.path().join("missing"));

    assert_eq!(cache.stats().unwrap(), CacheStats::default());
    assert_eq!(cache.clear().unwrap(), ClearStats::default());
}
