//! CSRF header injection for outgoing requests.
//!
//! # Design
//! The interceptor does not read cookies itself. It receives a token
//! provider and only calls it for state-changing methods, so safe requests
//! never touch cookie state. A missing token is not an error: the request
//! goes out unchanged and the server decides whether to reject it.

use tracing::debug;

use crate::http::HttpRequest;

/// Header the token is attached under unless configured otherwise.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie the token is read from unless configured otherwise.
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Attaches a CSRF token to POST, PUT, PATCH and DELETE requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfInterceptor {
    header_name: String,
}

impl Default for CsrfInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_CSRF_HEADER)
    }
}

impl CsrfInterceptor {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Return `request` with the token header set iff the method is mutating
    /// and `token_provider` yields a token. An empty token is still sent.
    pub fn intercept<F>(&self, mut request: HttpRequest, token_provider: F) -> HttpRequest
    where
        F: FnOnce() -> Option<String>,
    {
        self.apply(&mut request, token_provider);
        request
    }

    /// In-place form of [`intercept`](Self::intercept). Returns whether the
    /// header was written.
    pub fn apply<F>(&self, request: &mut HttpRequest, token_provider: F) -> bool
    where
        F: FnOnce() -> Option<String>,
    {
        if !request.method.is_mutating() {
            return false;
        }
        match token_provider() {
            Some(token) => {
                request.headers.set(self.header_name.clone(), token);
                debug!(method = %request.method, url = %request.url, header = %self.header_name, "attached csrf token");
                true
            }
            None => {
                debug!(method = %request.method, url = %request.url, "no csrf token available, sending without it");
                false
            }
        }
    }
}
