//! Client configuration.
//!
//! The backend host is injected here and nowhere else; request paths are
//! always joined onto [`ClientConfig::base_url`].

use reqwest::Url;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL is not an absolute http(s) URL.
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// Offending value
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A numeric environment variable could not be parsed.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidNumber {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },
}

/// Backend client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL (e.g. "http://192.168.1.87:8080"), without trailing slash.
    pub base_url: String,

    /// Whole-request timeout enforced by the transport.
    ///
    /// Default: 10 seconds
    pub request_timeout: Duration,

    /// Connection establishment timeout.
    ///
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// File backing the persisted session, if any.
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a configuration for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` unless `base_url` is an absolute
    /// `http` or `https` URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `BOXOFFICE_BASE_URL` | `http://localhost:8080` |
    /// | `BOXOFFICE_REQUEST_TIMEOUT_SECS` | `10` |
    /// | `BOXOFFICE_CONNECT_TIMEOUT_SECS` | `5` |
    /// | `BOXOFFICE_SESSION_FILE` | unset (session kept in memory) |
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or a timeout is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var("BOXOFFICE_BASE_URL") {
            Ok(url) => Self::new(url)?,
            Err(_) => Self::default(),
        };
        if let Some(secs) = seconds_from_env("BOXOFFICE_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = seconds_from_env("BOXOFFICE_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.session_file = env::var_os("BOXOFFICE_SESSION_FILE").map(PathBuf::from);
        Ok(config)
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the session file.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Absolute URL for an API path such as `/api/categories`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Absolute URL of an uploaded event image.
    ///
    /// Images are served from `{base_url}/uploaded-images/{image_ref}`.
    #[must_use]
    pub fn image_url(&self, image_ref: &str) -> String {
        format!("{}/uploaded-images/{}", self.base_url, image_ref.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            session_file: None,
        }
    }
}

fn normalize_base_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw,
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn seconds_from_env(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(None),
    }
}
