//! Content digests of image files.
//!
//! When a push does not name a version, the version is the sha256 of the
//! file content in lowercase hex. Pulled files whose version has that shape
//! are checked against it after download.

use crate::error::{Result, SregError};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;


/// Length of a sha256 digest in hex characters.
const SHA256_HEX_LEN: usize = 64;

/// A sha256 content digest, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Computes the digest of a file by streaming its content.
    pub fn of_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                SregError::not_found("file", path.display().to_string())
            } else {
                SregError::validation_with_source(
                    format!("Failed to open {} for hashing", path.display()),
                    e,
                )
            }
        })?;

        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|e| {
            SregError::validation_with_source(format!("Failed to read {}", path.display()), e)
        })?;

        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// Computes the digest of an in-memory buffer.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The hex digest.
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Returns true if `version` looks like a sha256 content digest.
    pub fn is_content_version(version: &str) -> bool {
        version.len() == SHA256_HEX_LEN
            && version
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    /// Verifies that the file at `path` hashes to `expected`.
    ///
    /// Versions that are not sha256 digests are accepted without hashing.
    pub fn verify_file(path: &Path, expected: &str) -> Result<()> {
        if !Self::is_content_version(expected) {
            return Ok(());
        }

        let computed = Self::of_file(path)?;
        if computed.hex() != expected {
            return Err(SregError::validation(format!(
                "Digest mismatch for {}: expected {}, computed {}",
                path.display(),
                expected,
                computed
            )));
        }
        Ok(())
    }
}

impl FromStr for Digest {
    type Err = SregError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix("sha256:").unwrap_or(s).to_lowercase();
        if !Self::is_content_version(&hex) {
            return Err(SregError::validation(format!(
                "Invalid digest format: {}",
                s
            )));
        }
        Ok(Digest(hex))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the version string for an image file from its content.
///
/// # Examples
///
/// ```no_run
/// use libsreg::digest::file_version;
/// use std::path::Path;
///
/// let version = file_version(Path::new("tool.sif")).unwrap();
/// assert_eq!(version.len(), 64);
/// ```
pub fn file_version(path: &Path) -> Result<String> {
    Ok(Digest::of_file(path)?.0)
}
