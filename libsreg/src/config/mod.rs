//! Application configuration.
//!
//! This module manages configuration with sensible defaults, loading from a
//! YAML file and merging with `SREGISTRY_*` environment variables. The
//! resulting [`Config`] is passed explicitly to the client façade; nothing in
//! the library reads process-wide state on its own.

use crate::error::{Result, SregError};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Environment variable naming the active backend.
pub const ENV_CLIENT: &str = "SREGISTRY_CLIENT";
/// Environment variable for the metadata database path.
pub const ENV_DATABASE: &str = "SREGISTRY_DATABASE";
/// Environment variable for the local image cache directory.
pub const ENV_STORAGE: &str = "SREGISTRY_STORAGE";
/// Environment variable for the configuration file path.
pub const ENV_CONFIG: &str = "SREGISTRY_CONFIG";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Name of the active backend (see [`BackendKind`]).
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path of the metadata database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Directory holding pulled images.
    #[serde(default = "default_storage")]
    pub storage: PathBuf,

    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub inspector: Inspector,

    #[serde(default)]
    pub filesystem: Filesystem,

    #[serde(default)]
    pub google_drive: GoogleDrive,

    #[serde(default)]
    pub google_storage: GoogleStorage,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database: default_database(),
            storage: default_storage(),
            network: Network::default(),
            retry: RetryPolicy::default(),
            inspector: Inspector::default(),
            filesystem: Filesystem::default(),
            google_drive: GoogleDrive::default(),
            google_storage: GoogleStorage::default(),
        }
    }
}

impl Config {
    /// Parses a `Config` from a YAML string on top of the defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults_builder()?.add_source(File::from_str(s, FileFormat::Yaml));

        Self::from_builder(builder, None)
    }

    /// Loads a `Config` from an optional file path.
    ///
    /// Without a path the defaults are returned. A path that does not exist
    /// is a configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults_builder()?;

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder, path)
    }

    /// Applies `SREGISTRY_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies `SREGISTRY_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get(ENV_CLIENT) {
            self.backend = backend;
        }
        if let Some(database) = get(ENV_DATABASE) {
            self.database = PathBuf::from(database);
        }
        if let Some(storage) = get(ENV_STORAGE) {
            self.storage = PathBuf::from(storage);
        }
        if let Some(root) = get("SREGISTRY_FILESYSTEM_ROOT") {
            self.filesystem.root = Some(PathBuf::from(root));
        }
        if let Some(token) = get("SREGISTRY_GOOGLE_DRIVE_TOKEN") {
            self.google_drive.token = Some(token);
        }
        if let Some(root) = get("SREGISTRY_GOOGLE_DRIVE_ROOT") {
            self.google_drive.root = root;
        }
        if let Some(thumbnail) = get("SREGISTRY_GOOGLE_DRIVE_THUMBNAIL") {
            self.google_drive.thumbnail = Some(PathBuf::from(thumbnail));
        }
        if let Some(bucket) = get("SREGISTRY_GOOGLE_STORAGE_BUCKET") {
            self.google_storage.bucket = Some(bucket);
        }
        if let Some(token) = get("SREGISTRY_GOOGLE_STORAGE_TOKEN") {
            self.google_storage.token = Some(token);
        }
        if let Some(base) = get("SREGISTRY_GOOGLE_STORAGE_BASE") {
            self.google_storage.base = base;
        }
    }

    /// Parses the configured backend name.
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend.parse()
    }

    fn defaults_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = ConfigRs::try_from(&Config::default()).map_err(|e| {
            SregError::configuration_with_source(
                "Failed to serialize default configuration",
                None::<String>,
                e,
            )
        })?;
        Ok(ConfigRs::builder().add_source(defaults))
    }

    /// Creates a `Config` from a `config::ConfigBuilder`.
    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                SregError::configuration_with_source(
                    "Failed to load configuration",
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })
    }
}

/// Backends known to the client façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A local or mounted directory acting as the remote store.
    Filesystem,
    /// Google Drive (v3 REST API).
    GoogleDrive,
    /// Google Cloud Storage (JSON API).
    GoogleStorage,
}

impl BackendKind {
    /// All backends, in display order.
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Filesystem,
        BackendKind::GoogleDrive,
        BackendKind::GoogleStorage,
    ];

    /// The canonical backend name, as stored in `Container.client`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Filesystem => "filesystem",
            BackendKind::GoogleDrive => "google-drive",
            BackendKind::GoogleStorage => "google-storage",
        }
    }
}

impl FromStr for BackendKind {
    type Err = SregError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "filesystem" | "local" => Ok(BackendKind::Filesystem),
            "google-drive" | "gdrive" => Ok(BackendKind::GoogleDrive),
            "google-storage" | "gs" | "gcs" => Ok(BackendKind::GoogleStorage),
            other => {
                let known: Vec<&str> = BackendKind::ALL.iter().map(|k| k.as_str()).collect();
                Err(SregError::configuration(
                    format!(
                        "Unknown backend '{}' (expected one of: {})",
                        other,
                        known.join(", ")
                    ),
                    None::<String>,
                ))
            }
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
        }
    }
}

/// Bounded retry policy for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, doubled for each further attempt.
    #[serde(default = "default_retry_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single delay, including server supplied `Retry-After`.
    #[serde(default = "default_retry_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            initial_backoff_ms: default_retry_initial_backoff_ms(),
            max_backoff_ms: default_retry_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before attempt number `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

/// Container inspection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inspector {
    /// Executable invoked as `<program> inspect --json <image>`.
    #[serde(default = "default_inspector_program")]
    pub program: String,
}

impl Default for Inspector {
    fn default() -> Self {
        Self {
            program: default_inspector_program(),
        }
    }
}

/// Settings for the filesystem backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Filesystem {
    /// Directory acting as the remote store.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Settings for the Google Drive backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleDrive {
    /// OAuth2 access token.
    #[serde(default)]
    pub token: Option<String>,

    /// Name of the folder holding pushed images.
    #[serde(default = "default_base")]
    pub root: String,

    /// PNG attached to uploads as a thumbnail.
    #[serde(default)]
    pub thumbnail: Option<PathBuf>,

    #[serde(default = "default_google_api_url")]
    pub api_url: String,
}

impl Default for GoogleDrive {
    fn default() -> Self {
        Self {
            token: None,
            root: default_base(),
            thumbnail: None,
            api_url: default_google_api_url(),
        }
    }
}

/// Settings for the Google Cloud Storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoogleStorage {
    /// OAuth2 access token.
    #[serde(default)]
    pub token: Option<String>,

    /// Bucket holding pushed images.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Object name prefix inside the bucket.
    #[serde(default = "default_base")]
    pub base: String,

    #[serde(default = "default_storage_api_url")]
    pub api_url: String,
}

impl Default for GoogleStorage {
    fn default() -> Self {
        Self {
            token: None,
            bucket: None,
            base: default_base(),
            api_url: default_storage_api_url(),
        }
    }
}

/// Returns the default configuration file path.
///
/// `SREGISTRY_CONFIG` wins; otherwise `<config dir>/sregistry/config.yaml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CONFIG)
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }
    app_dir(dirs::config_dir()).join("config.yaml")
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("sregistry")
}

fn default_backend() -> String {
    BackendKind::Filesystem.as_str().to_string()
}

fn default_database() -> PathBuf {
    app_dir(dirs::config_dir()).join("sregistry.db")
}

fn default_storage() -> PathBuf {
    app_dir(dirs::cache_dir()).join("images")
}

fn default_network_timeout() -> u64 {
    300 // image uploads can be large
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_initial_backoff_ms() -> u64 {
    500
}

fn default_retry_max_backoff_ms() -> u64 {
    8000
}

fn default_inspector_program() -> String {
    "singularity".to_string()
}

fn default_base() -> String {
    "sregistry".to_string()
}

fn default_google_api_url() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_storage_api_url() -> String {
    "https://storage.googleapis.com".to_string()
}
