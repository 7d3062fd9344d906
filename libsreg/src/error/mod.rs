//! Error types for sreg
//!
//! This module provides the single error type shared by the metadata store,
//! the backends and the client façade. Transport-level failures (network,
//! authentication, rate limiting, server errors) are produced by the HTTP
//! layer and usually reach callers wrapped inside an `Upload` or `Download`
//! error.

use thiserror::Error;

#[cfg(test)]
mod tests;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for sreg operations
#[derive(Error, Debug)]
pub enum SregError {
    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Authentication errors (401, 403, token issues)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Resource not found: local file, container, collection or remote object
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Validation errors (malformed image name, digest mismatch, bad response)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Configuration errors (unknown backend, missing settings, bad store path)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<BoxError>,
    },

    /// Metadata store failures after initialization
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A push could not transfer the file to the remote backend
    #[error("Upload of {path} failed: {message}")]
    Upload {
        path: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A pull could not transfer the file from the remote backend
    #[error("Download of {uri} failed: {message}")]
    Download {
        uri: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A collection with the same name already exists
    #[error("Collection already exists: {name}")]
    DuplicateName { name: String },
}

/// Result type alias for sreg operations
pub type Result<T> = std::result::Result<T, SregError>;

impl SregError {
    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::error::SregError;
    ///
    /// let err = SregError::network("connection refused");
    /// assert!(matches!(err, SregError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::error::SregError;
    ///
    /// let err = SregError::not_found("container", "library/alpine:latest");
    /// assert!(matches!(err, SregError::NotFound { .. }));
    /// ```
    pub fn not_found<S: Into<String>, N: Into<String>>(resource_type: S, name: N) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::error::SregError;
    ///
    /// let err = SregError::validation("image name cannot be empty");
    /// assert!(matches!(err, SregError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::error::SregError;
    ///
    /// let err = SregError::configuration("unknown backend 'ftp'", None::<String>);
    /// assert!(matches!(err, SregError::Configuration { .. }));
    /// ```
    pub fn configuration<S: Into<String>, P: Into<String>>(message: S, path: Option<P>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn configuration_with_source<S, P, E>(message: S, path: Option<P>, source: E) -> Self
    where
        S: Into<String>,
        P: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Configuration {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new storage error with a source error.
    pub fn storage<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps a failure that happened while pushing `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::error::SregError;
    ///
    /// let cause = SregError::server("backend unavailable", 503);
    /// let err = SregError::upload("/tmp/tool.sif", cause);
    /// assert!(matches!(err, SregError::Upload { .. }));
    /// ```
    pub fn upload<P: Into<String>>(path: P, source: SregError) -> Self {
        Self::Upload {
            path: path.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an upload error caused by a lower level failure, such as I/O.
    pub fn upload_with_source<P, S, E>(path: P, message: S, source: E) -> Self
    where
        P: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upload {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps a failure that happened while pulling `uri`.
    pub fn download<U: Into<String>>(uri: U, source: SregError) -> Self {
        Self::Download {
            uri: uri.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a download error caused by a lower level failure, such as I/O.
    pub fn download_with_source<U, S, E>(uri: U, message: S, source: E) -> Self
    where
        U: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Download {
            uri: uri.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new duplicate collection name error.
    pub fn duplicate_name<S: Into<String>>(name: S) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Returns true for transient transport failures worth another attempt.
    ///
    /// Timeouts and connection failures, rate limiting and 5xx responses are
    /// retryable. Everything else fails immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimit { .. } | Self::Server { .. }
        )
    }

    /// Returns true if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<rusqlite::Error> for SregError {
    fn from(error: rusqlite::Error) -> Self {
        SregError::storage("Database query failed", error)
    }
}
