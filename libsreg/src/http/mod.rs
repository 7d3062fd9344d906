//! Blocking HTTP client shared by the cloud backends.
//!
//! This module wraps a reqwest blocking client with the pieces every remote
//! backend needs: a normalized base URL, bearer authentication, translation of
//! HTTP failures into [`SregError`] variants, and bounded retries for
//! transient failures.

use crate::auth::Credentials;
use crate::config::{self, RetryPolicy};
use crate::error::{Result, SregError};
use crate::retry::with_retry;
use reqwest::blocking::{Body, Client as ReqwestClient, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;
use tracing::debug;


/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libsreg::http::HttpConfig;
///
/// let config = HttpConfig::new().with_timeout(60);
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds (default: 300)
    pub timeout_seconds: u64,
    /// Retry policy applied to every request
    pub retry: RetryPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = config::Config::default();
        Self {
            timeout_seconds: defaults.network.timeout,
            retry: defaults.retry,
        }
    }
}

impl HttpConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the HTTP settings from the application configuration.
    pub fn from_config(config: &config::Config) -> Self {
        Self {
            timeout_seconds: config.network.timeout,
            retry: config.retry.clone(),
        }
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: ReqwestClient,
    base_url: String,
    credentials: Credentials,
    config: HttpConfig,
}

impl HttpClient {
    /// Creates a new client for `base_url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsreg::auth::Credentials;
    /// use libsreg::http::{HttpClient, HttpConfig};
    ///
    /// let client = HttpClient::new(
    ///     "https://www.googleapis.com/",
    ///     Credentials::bearer("token"),
    ///     HttpConfig::new(),
    /// )
    /// .unwrap();
    /// assert_eq!(client.base_url(), "https://www.googleapis.com");
    /// ```
    pub fn new(base_url: &str, credentials: Credentials, config: HttpConfig) -> Result<Self> {
        let base_url = Self::normalize_url(base_url)?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SregError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
            config,
        })
    }

    /// Normalizes a base URL by ensuring it has a scheme and removing trailing slashes.
    pub(crate) fn normalize_url(url: &str) -> Result<String> {
        let url = url.trim();

        if url.is_empty() {
            return Err(SregError::validation("API URL cannot be empty"));
        }

        let url = if !url.starts_with("http://") && !url.starts_with("https://") {
            format!("https://{}", url)
        } else {
            url.to_string()
        };

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds an absolute URL from `path`.
    ///
    /// Absolute URLs (such as resumable upload sessions) are returned as is.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Builds a URL from path segments, percent-encoding each one.
    ///
    /// A `/` inside a segment is encoded, which is how object names that
    /// contain slashes are addressed.
    pub fn segments_url(&self, segments: &[&str]) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SregError::validation_with_source("Invalid API URL", e))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SregError::validation("API URL cannot have path segments"))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url.to_string())
    }

    /// Sends a GET request and parses the JSON response.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.url(path);
        self.execute("GET", &url, || {
            self.request(Method::GET, &url).query(query)
        })
        .and_then(Self::parse_json)
    }

    /// Sends a POST request with a JSON body and parses the JSON response.
    pub fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T> {
        let url = self.url(path);
        self.execute("POST", &url, || {
            self.request(Method::POST, &url).query(query).json(body)
        })
        .and_then(Self::parse_json)
    }

    /// Sends a POST that creates a resource and parses the JSON response.
    ///
    /// The request is sent once. Failures are never retried, so one call
    /// creates at most one resource.
    pub fn create_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("POST {} (no retry)", url);
        self.send(self.request(Method::POST, &url).query(query).json(body), &url)
            .and_then(Self::parse_json)
    }

    /// Sends a PATCH request with a JSON body and parses the JSON response.
    pub fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T> {
        let url = self.url(path);
        self.execute("PATCH", &url, || {
            self.request(Method::PATCH, &url).query(query).json(body)
        })
        .and_then(Self::parse_json)
    }

    /// Opens a resumable upload session and returns its URL.
    ///
    /// The session URL comes back in the `Location` header; `metadata`
    /// describes the object being created.
    pub fn start_resumable(
        &self,
        path: &str,
        query: &[(&str, &str)],
        metadata: &Value,
        content_type: &str,
        size: u64,
    ) -> Result<String> {
        let url = self.url(path);
        let response = self.execute("POST", &url, || {
            self.request(Method::POST, &url)
                .query(query)
                .header("X-Upload-Content-Type", content_type)
                .header("X-Upload-Content-Length", size)
                .json(metadata)
        })?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| SregError::validation("Upload session response missing Location header"))
    }

    /// Uploads the file at `path` to a resumable session and parses the
    /// JSON description of the created object.
    pub fn upload_file<T: DeserializeOwned>(
        &self,
        session_url: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<T> {
        let size = fs::metadata(path)
            .map_err(|e| SregError::network_with_source(format!("Cannot read {}", path.display()), e))?
            .len();

        let response = with_retry(&self.config.retry, "PUT upload", || {
            // The body is consumed by each attempt, so the file is reopened.
            let file = File::open(path).map_err(|e| {
                SregError::network_with_source(format!("Cannot open {}", path.display()), e)
            })?;
            let request = self
                .request(Method::PUT, session_url)
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_LENGTH, size)
                .body(Body::sized(file, size));
            self.send(request, session_url)
        })?;

        debug!("Uploaded {} ({} bytes)", path.display(), size);
        Self::parse_json(response)
    }

    /// Downloads `path` into `dest`, returning the number of bytes written.
    ///
    /// The body is streamed into a temporary file next to `dest` that is
    /// renamed into place once complete, so an interrupted download never
    /// leaves a partial image behind.
    pub fn download_to(&self, path: &str, query: &[(&str, &str)], dest: &Path) -> Result<u64> {
        let url = self.url(path);
        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| {
            SregError::network_with_source(format!("Cannot create {}", dir.display()), e)
        })?;

        with_retry(&self.config.retry, "GET download", || {
            let mut response =
                self.send(self.request(Method::GET, &url).query(query), &url)?;

            let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
                SregError::network_with_source("Failed to create temporary download file", e)
            })?;
            let written = response
                .copy_to(temp.as_file_mut())
                .map_err(|e| SregError::network_with_source("Failed to read response body", e))?;
            temp.persist(dest).map_err(|e| {
                SregError::network_with_source(format!("Cannot write {}", dest.display()), e.error)
            })?;

            debug!("Downloaded {} to {} ({} bytes)", url, dest.display(), written);
            Ok(written)
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.http_client.request(method, url);
        if let Some(auth_header) = self.credentials.to_header_value() {
            request = request.header(AUTHORIZATION, auth_header);
        }
        request
    }

    fn execute<F>(&self, method: &str, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let what = format!("{} {}", method, url);
        with_retry(&self.config.retry, &what, || self.send(build(), url))
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| Self::translate_reqwest_error(e, url, self.config.timeout_seconds))?;
        Self::check_response_status(response)
    }

    fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let url = response.url().to_string();
        response.json().map_err(|e| {
            SregError::validation_with_source(format!("Failed to parse response from {}", url), e)
        })
    }

    /// Translates a reqwest error into a SregError.
    fn translate_reqwest_error(error: reqwest::Error, url: &str, timeout: u64) -> SregError {
        if error.is_timeout() {
            SregError::network(format!("Request to {} timed out after {} seconds", url, timeout))
        } else if error.is_connect() {
            SregError::network_with_source(format!("Failed to connect to {}", url), error)
        } else if error.is_request() {
            SregError::network_with_source(format!("Failed to send request to {}", url), error)
        } else {
            SregError::network_with_source(format!("Network error communicating with {}", url), error)
        }
    }

    /// Checks the HTTP response status and translates errors to SregError.
    fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let error_body = response
            .text()
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(SregError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(SregError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(SregError::not_found("remote object", &url)),
            StatusCode::TOO_MANY_REQUESTS => Err(SregError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            s if s.is_server_error() => Err(SregError::server(
                format!("Server error from {}: {}", url, error_body),
                status.as_u16(),
            )),
            _ => Err(SregError::validation(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                error_body
            ))),
        }
    }
}

/// Parses a `Retry-After` value given either as seconds or as an HTTP date.
fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }
    let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let seconds = (date.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_seconds();
    Some(seconds.max(0) as u64)
}
