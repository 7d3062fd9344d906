//! Clients over a scratch directory for command tests.

use libsreg::backend::FilesystemBackend;
use libsreg::metadata::CommandInspector;
use libsreg::{Client, ImageCache, MetadataStore};
use std::fs;
use std::path::PathBuf;
use tempfile::{TempDir, tempdir};

pub struct Fixture {
    pub dir: TempDir,
    pub image: PathBuf,
    pub client: Client,
}

/// A filesystem-backed client with one image file ready to push.
pub fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let image = dir.path().join("tool.sif");
    fs::write(&image, b"image contents").unwrap();

    let client = Client::builder()
        .with_backend(Box::new(FilesystemBackend::new(dir.path().join("remote"))))
        .with_store(MetadataStore::open_in_memory().unwrap())
        .with_cache(ImageCache::new(dir.path().join("cache")))
        .with_inspector(Box::new(CommandInspector::new("sreg-test-missing-inspector")))
        .build()
        .unwrap();

    Fixture { dir, image, client }
}
