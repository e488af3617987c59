//! Error types for the dashboard client core.
//!
//! # Design
//! `NotFound` and `Forbidden` get dedicated variants because callers
//! distinguish "the record does not exist" and "the server refused the
//! request" (usually a missing or stale CSRF token) from other failures.
//! All other unexpected statuses land in `HttpError` with the raw status and
//! body for debugging.

use thiserror::Error;

use crate::types::ApiErrorBody;

/// Errors returned by `ApiClient` parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned 403.
    #[error("forbidden: {body}")]
    Forbidden { body: String },

    /// The server returned a status other than the expected one.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    /// The `error` or `detail` message from a rejected response body, if the
    /// body is the backend's JSON error shape.
    pub fn server_message(&self) -> Option<String> {
        let body = match self {
            ApiError::Forbidden { body } | ApiError::HttpError { body, .. } => body,
            _ => return None,
        };
        let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
        parsed.message().map(str::to_string)
    }
}

/// Errors raised while building a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base url {0:?} cannot be used as a base")]
    NotABase(String),

    /// `csrf_cookie_name` or `csrf_header_name` is blank.
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },
}

/// Errors raised while building a `RouteTable`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route name {0:?} is used more than once")]
    DuplicateName(String),

    #[error("routes {first:?} and {second:?} match the same paths")]
    DuplicatePattern { first: String, second: String },

    #[error("route {path:?} has neither a name nor children")]
    UnnamedLeaf { path: String },

    #[error("invalid parameter segment {segment:?} in {path:?}")]
    InvalidParam { path: String, segment: String },
}
