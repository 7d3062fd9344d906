//! Human-readable rendering of sizes, ages and versions.
//!
//! Shared by the CLI tables and log messages.

use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use humansize::{BINARY, format_size as format_size_human};


/// Characters of a content version shown in listings.
pub const SHORT_VERSION_LEN: usize = 12;

/// Formats a byte size using binary units (KiB, MiB).
///
/// # Examples
///
/// ```
/// use libsreg::format::format_size;
///
/// assert_eq!(format_size(5 * 1024 * 1024), "5 MiB");
/// ```
pub fn format_size(size_bytes: u64) -> String {
    format_size_human(size_bytes, BINARY)
}

/// Formats an optional size, using `-` when it is unknown.
pub fn format_optional_size(size_bytes: Option<u64>) -> String {
    size_bytes.map(format_size).unwrap_or_else(|| "-".to_string())
}

/// Formats a timestamp relative to now, such as "a day ago".
pub fn format_age(timestamp: &DateTime<Utc>) -> String {
    timestamp.humanize()
}

/// Shortens a content digest version for display.
///
/// Versions that are not content digests are shown in full.
///
/// # Examples
///
/// ```
/// use libsreg::format::short_version;
///
/// let digest = "a".repeat(64);
/// assert_eq!(short_version(&digest), "aaaaaaaaaaaa");
/// assert_eq!(short_version("1.0.2"), "1.0.2");
/// ```
pub fn short_version(version: &str) -> &str {
    if crate::digest::Digest::is_content_version(version) {
        &version[..SHORT_VERSION_LEN]
    } else {
        version
    }
}
