use super::{confirm, exit_with};
use crate::context::AppContext;
use crate::format::{self, Formattable, OutputFormat};
use libsreg::cache::ClearStats;
use libsreg::format::format_size;
use libsreg::{ImageCache, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Cache location and usage
#[derive(Debug, Clone, Serialize)]
pub struct CacheView {
    pub root: PathBuf,
    pub entries: u64,
    pub size: u64,
}

impl Formattable for CacheView {
    fn format_pretty(&self) -> String {
        format!(
            "Location: {}\nImages:   {}\nSize:     {}",
            self.root.display(),
            self.entries,
            format_size(self.size)
        )
    }
}

/// Usage of the image cache
pub fn cache_stats(cache: &ImageCache) -> Result<CacheView> {
    let stats = cache.stats()?;
    Ok(CacheView {
        root: cache.root().to_path_buf(),
        entries: stats.entries,
        size: stats.size,
    })
}

/// Summary line for a clear operation
pub fn clear_summary(stats: &ClearStats) -> String {
    format!(
        "Removed {} file(s), reclaimed {}",
        stats.removed_files,
        format_size(stats.reclaimed_space)
    )
}

/// Handle the cache stats command
pub fn handle_cache_stats(ctx: &AppContext, format: OutputFormat) {
    let cache = ImageCache::from_config(&ctx.config);
    match cache_stats(&cache) {
        Ok(view) => format::print_formatted(format::format_output(&view, format)),
        Err(e) => exit_with(e),
    }
}

/// Handle the cache clear command
///
/// Only pulled image files are removed; the metadata database keeps its
/// records.
pub fn handle_cache_clear(ctx: &AppContext, force: bool) {
    let cache = ImageCache::from_config(&ctx.config);

    if !force
        && !confirm(&format!(
            "Remove all pulled images from {}?",
            cache.root().display()
        ))
    {
        println!("Cancelled.");
        return;
    }

    let formatter = format::create_formatter(ctx.color);
    match cache.clear() {
        Ok(stats) if stats.removed_files == 0 => formatter.warning("Cache is already empty"),
        Ok(stats) => formatter.success(&clear_summary(&stats)),
        Err(e) => exit_with(e),
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
