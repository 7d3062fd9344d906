//! Local image cache.
//!
//! Pulled images are stored under the cache root at their storage name
//! (`<collection>/<name>:<tag>@<version>.sif`), so two versions of the same
//! image never share a path and a repeated pull of a known version can be
//! served from disk.

use crate::config::Config;
use crate::error::{Result, SregError};
use crate::names::ImageName;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[cfg(test)]
mod tests;

/// Statistics about the cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of files on disk.
    pub entries: u64,
    /// Total size of those files in bytes.
    pub size: u64,
}

/// Statistics returned after a clear operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClearStats {
    /// The number of files removed.
    pub removed_files: u64,
    /// The total disk space reclaimed in bytes.
    pub reclaimed_space: u64,
}

/// Directory holding pulled images.
#[derive(Debug, Clone)]
pub struct ImageCache {
    root: PathBuf,
}

impl ImageCache {
    /// Creates a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the cache configured by `storage`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.storage.clone())
    }

    /// Returns the cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the local path for `image`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::cache::ImageCache;
    /// use libsreg::names::ImageName;
    ///
    /// let cache = ImageCache::new("/var/cache/sregistry");
    /// let image: ImageName = "labs/tool:1.0@abc".parse().unwrap();
    /// assert_eq!(
    ///     cache.path_for(&image).unwrap(),
    ///     std::path::PathBuf::from("/var/cache/sregistry/labs/tool:1.0@abc.sif")
    /// );
    /// ```
    pub fn path_for(&self, image: &ImageName) -> Result<PathBuf> {
        let key = image.storage_name();
        if key.split('/').any(|part| part == "..") || key.starts_with('/') {
            return Err(SregError::validation(format!(
                "Invalid cache path for {}",
                image
            )));
        }
        Ok(self.root.join(key))
    }

    /// Returns the cached file for `image` if it is present.
    ///
    /// Only versioned names can be served from the cache; without a version
    /// the remote decides which object is current.
    pub fn lookup(&self, image: &ImageName) -> Result<Option<PathBuf>> {
        if image.version.is_none() {
            return Ok(None);
        }
        let path = self.path_for(image)?;
        Ok(path.is_file().then_some(path))
    }

    /// Creates the directory that will hold `path`.
    pub fn prepare(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SregError::configuration_with_source(
                    "Failed to create cache directory",
                    Some(parent.display().to_string()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Removes every file from the cache.
    pub fn clear(&self) -> Result<ClearStats> {
        let mut stats = ClearStats::default();

        if !self.root.exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Ok(metadata) = fs::metadata(path) {
                stats.reclaimed_space += metadata.len();
            }
            if fs::remove_file(path).is_ok() {
                stats.removed_files += 1;
            }
        }

        debug!(
            "Cleared {} file(s) from {}",
            stats.removed_files,
            self.root.display()
        );
        Ok(stats)
    }

    /// Gets statistics about the cache.
    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();

        if !self.root.exists() {
            return Ok(stats);
        }

        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            if let Ok(metadata) = entry.metadata() {
                stats.entries += 1;
                stats.size += metadata.len();
            }
        }

        Ok(stats)
    }
}
