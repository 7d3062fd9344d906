//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. `SREGISTRY_*` environment variables
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::format::ColorChoice;
use libsreg::config::{self, Config};
use libsreg::{Client, Result, SregError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Verbosity level selected with repeated `-v` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl VerbosityLevel {
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Normal,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::VeryVerbose,
            _ => VerbosityLevel::Trace,
        }
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_filter(self) -> &'static str {
        match self {
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::VeryVerbose => "debug",
            VerbosityLevel::Trace => "trace",
        }
    }
}

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    pub color: ColorChoice,
    pub verbosity: VerbosityLevel,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > env vars > CLI flags
    ///
    /// An explicit `config_path` must exist. The default path is only read
    /// when a file is present there.
    pub fn build(
        config_path: Option<&Path>,
        backend: Option<&str>,
        color: ColorChoice,
        verbosity: VerbosityLevel,
    ) -> Result<Self> {
        Self::build_with(config_path, backend, color, verbosity, |key| {
            std::env::var(key).ok()
        })
    }

    fn build_with<F>(
        config_path: Option<&Path>,
        backend: Option<&str>,
        color: ColorChoice,
        verbosity: VerbosityLevel,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(config::default_config_path()).filter(|p| p.is_file()),
        };

        if let Some(path) = &path {
            debug!("Loading configuration from {}", path.display());
        }
        let mut config = Config::load(path.as_deref())?;
        config.apply_env_with(lookup);

        if let Some(name) = backend {
            config.backend = name.to_string();
        }

        Ok(Self {
            config,
            color,
            verbosity,
        })
    }

    /// Opens a client for the resolved configuration.
    ///
    /// The directory of the default database is created on first use; a
    /// configured database path must already have its parent directory.
    pub fn client(&self) -> Result<Client> {
        if self.config.database == Config::default().database
            && let Some(parent) = self.config.database.parent()
        {
            create_dir(parent)?;
        }
        Client::from_config(&self.config)
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        SregError::configuration_with_source(
            "Failed to create data directory",
            Some(dir.display().to_string()),
            e,
        )
    })
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
