//! sreg - local registry client for container images
//!
//! libsreg tracks container images in a local SQLite database and moves the
//! image files to and from pluggable remote storage: a plain directory,
//! Google Drive or Google Cloud Storage.
//!
//! # Quick Start
//!
//! ```no_run
//! use libsreg::{Client, Config};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::load(None)?;
//!     config.apply_env();
//!
//!     let client = Client::from_config(&config)?;
//!     client.push(Path::new("tool.sif"), "labs/tool", None)?;
//!
//!     for hit in client.search("tool")? {
//!         println!("{}", hit.uri);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`Client`] - push, pull and search through one backend
//! - [`ClientBuilder`] - injects backends, stores and inspectors explicitly
//! - [`Backend`] - the contract every storage provider implements
//! - [`MetadataStore`] - collections and containers known locally
//! - [`ImageName`] - the `<collection>/<name>:<tag>[@<version>]` grammar
//! - [`Config`] - typed configuration with YAML and environment overrides

#![warn(clippy::all)]

/// Returns the libsreg crate version.
///
/// # Examples
///
/// ```
/// let version = libsreg::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use backend::{Backend, Descriptor, Upload};
pub use cache::ImageCache;
pub use client::{Client, ClientBuilder};
pub use config::{BackendKind, Config};
pub use database::{Collection, Container, MetadataStore};
pub use digest::Digest;
pub use error::{Result, SregError};
pub use names::ImageName;

pub mod auth;
pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod database;
pub mod digest;
pub mod error;
pub mod format;
pub mod http;
pub mod metadata;
pub mod names;
#[doc(hidden)]
pub mod retry;
