//! Credentials for remote storage backends.
//!
//! The cloud backends authenticate with OAuth2 access tokens sent as
//! `Authorization: Bearer <token>`. Obtaining or refreshing tokens is left to
//! the provider tooling; sreg only carries the token it is configured with.

use crate::error::{Result, SregError};


/// Credentials attached to backend requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication (public buckets, local test servers)
    Anonymous,

    /// Bearer token authentication (OAuth2 access token)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Bearer token credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::auth::Credentials;
    ///
    /// let creds = Credentials::bearer("ya29.token");
    /// assert_eq!(creds.to_header_value().unwrap(), "Bearer ya29.token");
    /// ```
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Builds bearer credentials from a configured token.
    ///
    /// A missing or blank token is a configuration error naming `setting`, so
    /// a misconfigured backend fails before any request is made.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::auth::Credentials;
    ///
    /// assert!(Credentials::required_token(Some("abc"), "google_drive.token").is_ok());
    /// assert!(Credentials::required_token(None, "google_drive.token").is_err());
    /// ```
    pub fn required_token(token: Option<&str>, setting: &str) -> Result<Self> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Ok(Self::bearer(token)),
            None => Err(SregError::configuration(
                format!("Missing access token ({})", setting),
                None::<String>,
            )),
        }
    }

    /// Returns the Authorization header value for these credentials.
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}
