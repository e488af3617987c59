//! Client configuration.
//!
//! A `ClientConfig` is a plain value: build one per backend, hand it to
//! `ApiClient::new`, and it stays fixed for the life of that client. Several
//! clients with different configs can live side by side.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::http::Headers;
use crate::interceptor::{DEFAULT_CSRF_COOKIE, DEFAULT_CSRF_HEADER};

/// API root of the development backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";

pub const ENV_BASE_URL: &str = "BOOKDESK_API_BASE_URL";
pub const ENV_CSRF_COOKIE: &str = "BOOKDESK_CSRF_COOKIE";
pub const ENV_CSRF_HEADER: &str = "BOOKDESK_CSRF_HEADER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relative request URLs are appended to this.
    pub base_url: String,
    /// Sent with every request unless the request sets the same header.
    pub default_headers: Headers,
    /// Cookie the CSRF token is read from.
    pub csrf_cookie_name: String,
    /// Header the CSRF token is written to.
    pub csrf_header_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_headers: [("Content-Type", "application/json")].into_iter().collect(),
            csrf_cookie_name: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header_name: DEFAULT_CSRF_HEADER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let config = Self {
            base_url: base_url.to_string(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `BOOKDESK_API_BASE_URL`, `BOOKDESK_CSRF_COOKIE`
    /// and `BOOKDESK_CSRF_HEADER` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Ok(cookie) = std::env::var(ENV_CSRF_COOKIE) {
            config.csrf_cookie_name = cookie;
        }
        if let Ok(header) = std::env::var(ENV_CSRF_HEADER) {
            config.csrf_header_name = header;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.set(name, value);
        self
    }

    /// Check that `base_url` is an absolute URL that can carry paths and
    /// that the CSRF cookie and header names are not blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.csrf_cookie_name.trim().is_empty() {
            return Err(ConfigError::EmptyName { field: "csrf_cookie_name" });
        }
        if self.csrf_header_name.trim().is_empty() {
            return Err(ConfigError::EmptyName { field: "csrf_header_name" });
        }
        let url = Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::NotABase(self.base_url.clone()));
        }
        Ok(())
    }
}
