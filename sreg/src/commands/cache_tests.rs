use super::*;
use crate::commands::testing::fixture;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_cache_stats_missing_root() {
    let dir = tempdir().unwrap();
    let cache = ImageCache::new(dir.path().join("never-created"));

    let view = cache_stats(&cache).unwrap();

    assert_eq!(view.entries, 0);
    assert_eq!(view.size, 0);
}

#[test]
fn test_cache_stats_after_pull() {
    let f = fixture();
    f.client.push(&f.image, "labs/tool", None).unwrap();
    f.client.pull("labs/tool").unwrap();

    let view = cache_stats(f.client.cache()).unwrap();

    assert_eq!(view.entries, 1);
    assert_eq!(view.size, 14);
    assert!(view.format_pretty().contains("Images:   1"));
    assert!(view.format_pretty().contains("14 B"));
}

#[test]
fn test_cache_stats_json() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("labs")).unwrap();
    fs::write(dir.path().join("labs").join("tool:latest@v.sif"), b"abc").unwrap();
    let cache = ImageCache::new(dir.path());

    let view = cache_stats(&cache).unwrap();
    let output = format::format_output(&view, OutputFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(json["entries"], 1);
    assert_eq!(json["size"], 3);
}

#[test]
fn test_clear_summary() {
    let stats = ClearStats {
        removed_files: 2,
        reclaimed_space: 2048,
    };
    assert_eq!(clear_summary(&stats), "Removed 2 file(s), reclaimed 2 KiB");
}
