//! Request preparation, dispatch and response parsing for the management API.
//!
//! # Design
//! `ApiClient` holds only its `ClientConfig` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Between the two, `prepare` resolves the URL, merges the
//! default headers and runs the CSRF interceptor against the cookie string
//! the caller passes in. `dispatch` does the same and then hands the request
//! to a `Transport`, returning whatever it returns.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::{self, Resource};
use crate::config::ClientConfig;
use crate::cookie;
use crate::error::{ApiError, ConfigError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::interceptor::CsrfInterceptor;
use crate::types::{DashboardStats, NewPayment};

/// Synchronous, stateless client for the management API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    interceptor: CsrfInterceptor,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let interceptor = CsrfInterceptor::new(config.csrf_header_name.clone());
        Ok(Self { config, interceptor })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Append a relative `url` to the base URL. Absolute URLs pass through.
    pub fn resolve_url(&self, url: &str) -> String {
        if is_absolute_url(url) {
            return url.to_string();
        }
        if url.is_empty() {
            return self.config.base_url.clone();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    /// Make `request` ready for the wire.
    ///
    /// Resolves the URL, fills in default headers the request does not set,
    /// and attaches the CSRF token from `cookies` to mutating requests.
    pub fn prepare(&self, mut request: HttpRequest, cookies: &str) -> HttpRequest {
        request.url = self.resolve_url(&request.url);
        request.headers.merge_defaults(&self.config.default_headers);
        self.interceptor.apply(&mut request, || {
            cookie::extract(cookies, &self.config.csrf_cookie_name)
        });
        request
    }

    /// Prepare `request` and execute it on `transport`.
    ///
    /// Transport errors and error statuses come back exactly as the
    /// transport produced them.
    pub fn dispatch<T: Transport>(
        &self,
        transport: &T,
        cookies: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse, T::Error> {
        let request = self.prepare(request, cookies);
        debug!(method = %request.method, url = %request.url, "dispatching request");
        transport.execute(request)
    }

    pub fn build_list(&self, resource: Resource) -> HttpRequest {
        self.request(HttpMethod::Get, &resource.collection_path())
    }

    pub fn build_get(&self, resource: Resource, id: u64) -> HttpRequest {
        self.request(HttpMethod::Get, &resource.item_path(id))
    }

    pub fn build_create<T: Serialize>(&self, resource: Resource, input: &T) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, &resource.collection_path(), input)
    }

    pub fn build_update<T: Serialize>(&self, resource: Resource, id: u64, input: &T) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &resource.item_path(id), input)
    }

    pub fn build_partial_update<T: Serialize>(
        &self,
        resource: Resource,
        id: u64,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Patch, &resource.item_path(id), input)
    }

    pub fn build_delete(&self, resource: Resource, id: u64) -> HttpRequest {
        self.request(HttpMethod::Delete, &resource.item_path(id))
    }

    pub fn build_record_payment(&self, invoice_id: u64, payment: &NewPayment) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, &api::record_payment_path(invoice_id), payment)
    }

    pub fn build_dashboard_stats(&self) -> HttpRequest {
        self.request(HttpMethod::Get, api::DASHBOARD_STATS_PATH)
    }

    pub fn build_debtors(&self) -> HttpRequest {
        self.request(HttpMethod::Get, api::DEBTORS_PATH)
    }

    /// Business insights report; the payload shape is backend-defined, so
    /// read it with [`parse_get`](Self::parse_get).
    pub fn build_insights(&self) -> HttpRequest {
        self.request(HttpMethod::Get, api::INSIGHTS_PATH)
    }

    pub fn parse_list<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Vec<T>, ApiError> {
        check_status(&response, 200)?;
        from_body(&response)
    }

    pub fn parse_get<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response, 200)?;
        from_body(&response)
    }

    pub fn parse_create<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response, 201)?;
        from_body(&response)
    }

    /// Parses both PUT and PATCH responses.
    pub fn parse_update<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response, 200)?;
        from_body(&response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)?;
        Ok(())
    }

    pub fn parse_record_payment<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response, 200)?;
        from_body(&response)
    }

    pub fn parse_dashboard_stats(&self, response: HttpResponse) -> Result<DashboardStats, ApiError> {
        check_status(&response, 200)?;
        from_body(&response)
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.resolve_url(path))
    }

    fn json_request<T: Serialize>(&self, method: HttpMethod, path: &str, input: &T) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(self.request(method, path).with_body(body))
    }
}

/// `scheme://...` or protocol-relative `//host/...`.
fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn from_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map unexpected status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    match response.status {
        s if s == expected => Ok(()),
        403 => Err(ApiError::Forbidden {
            body: response.body.clone(),
        }),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::http::Headers;
    use crate::types::Author;

    const COOKIES: &str = "sessionid=abc; csrftoken=XYZ123; theme=dark";

    fn client() -> ApiClient {
        ApiClient::new(ClientConfig::new("http://localhost:8000/api/").unwrap()).unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Headers::new(),
            body: body.to_string(),
        }
    }

    /// Records every request and answers with a fixed response.
    struct Recorder {
        sent: RefCell<Vec<HttpRequest>>,
        reply: Result<HttpResponse, String>,
    }

    impl Recorder {
        fn replying(reply: Result<HttpResponse, String>) -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                reply,
            }
        }
    }

    impl Transport for Recorder {
        type Error = String;

        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.sent.borrow_mut().push(request);
            self.reply.clone()
        }
    }

    #[test]
    fn relative_urls_join_the_base() {
        let c = client();
        assert_eq!(c.resolve_url("customers/"), "http://localhost:8000/api/customers/");
        assert_eq!(c.resolve_url("/customers/"), "http://localhost:8000/api/customers/");
        assert_eq!(c.resolve_url(""), "http://localhost:8000/api/");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let c = client();
        assert_eq!(c.resolve_url("https://cdn.example.com/x"), "https://cdn.example.com/x");
        assert_eq!(c.resolve_url("//cdn.example.com/x"), "//cdn.example.com/x");
        assert_eq!(c.resolve_url("search/?next=http://x"), "http://localhost:8000/api/search/?next=http://x");
    }

    #[test]
    fn base_without_trailing_slash() {
        let c = ApiClient::new(ClientConfig::new("http://localhost:8000/api").unwrap()).unwrap();
        assert_eq!(c.resolve_url("books/"), "http://localhost:8000/api/books/");
    }

    #[test]
    fn prepare_post_attaches_token_and_defaults() {
        let req = client().prepare(HttpRequest::new("POST", "customers/"), COOKIES);
        assert_eq!(req.url, "http://localhost:8000/api/customers/");
        assert_eq!(req.headers.get("X-CSRFToken"), Some("XYZ123"));
        assert_eq!(req.headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn prepare_get_has_no_token() {
        let req = client().prepare(HttpRequest::new("GET", "customers/"), COOKIES);
        assert!(!req.headers.contains("X-CSRFToken"));
        assert_eq!(req.headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn request_headers_win_over_defaults() {
        let req = HttpRequest::new("POST", "invoices/").with_header("content-type", "text/csv");
        let req = client().prepare(req, "");
        assert_eq!(req.headers.get("Content-Type"), Some("text/csv"));
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn configured_cookie_and_header_names() {
        let config = ClientConfig {
            csrf_cookie_name: "XSRF-TOKEN".to_string(),
            csrf_header_name: "X-XSRF-TOKEN".to_string(),
            ..ClientConfig::default()
        };
        let c = ApiClient::new(config).unwrap();
        let req = c.prepare(HttpRequest::new("DELETE", "books/1/"), "csrftoken=no; XSRF-TOKEN=yes");
        assert_eq!(req.headers.get("X-XSRF-TOKEN"), Some("yes"));
        assert!(!req.headers.contains("X-CSRFToken"));
    }

    #[test]
    fn dispatch_sends_prepared_request() {
        let transport = Recorder::replying(Ok(response(204, "")));
        let resp = client()
            .dispatch(&transport, COOKIES, client().build_delete(Resource::Books, 9))
            .unwrap();
        assert_eq!(resp.status, 204);
        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://localhost:8000/api/books/9/");
        assert_eq!(sent[0].headers.get("X-CSRFToken"), Some("XYZ123"));
    }

    #[test]
    fn dispatch_without_cookie_sends_no_token() {
        let transport = Recorder::replying(Ok(response(403, "")));
        let resp = client()
            .dispatch(&transport, "", client().build_delete(Resource::Books, 9))
            .unwrap();
        assert_eq!(resp.status, 403);
        assert!(!transport.sent.borrow()[0].headers.contains("X-CSRFToken"));
    }

    #[test]
    fn dispatch_surfaces_transport_error_unchanged() {
        let transport = Recorder::replying(Err("connection refused".to_string()));
        let err = client()
            .dispatch(&transport, COOKIES, client().build_list(Resource::Customers))
            .unwrap_err();
        assert_eq!(err, "connection refused");
    }

    #[test]
    fn two_clients_side_by_side() {
        let a = client();
        let b = ApiClient::new(ClientConfig::new("https://staging.example.com/api/").unwrap()).unwrap();
        assert_eq!(a.build_list(Resource::Books).url, "http://localhost:8000/api/books/");
        assert_eq!(b.build_list(Resource::Books).url, "https://staging.example.com/api/books/");
    }

    #[test]
    fn build_list_produces_correct_request() {
        let req = client().build_list(Resource::RouteAxes);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/route-axes/");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_create_serializes_body() {
        let input = Author {
            id: None,
            name: "Chinua Achebe".to_string(),
        };
        let req = client().build_create(Resource::Authors, &input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/api/authors/");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Chinua Achebe"}));
    }

    #[test]
    fn build_partial_update_uses_patch() {
        let req = client()
            .build_partial_update(Resource::Publishers, 4, &serde_json::json!({"phone_number": "0803"}))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, "http://localhost:8000/api/publishers/4/");
    }

    #[test]
    fn build_record_payment_targets_action() {
        let payment = NewPayment {
            amount: 1500.0,
            notes: String::new(),
        };
        let req = client().build_record_payment(3, &payment).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/api/invoices/3/record_payment/");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"amount": 1500.0}));
    }

    #[test]
    fn parse_list_success() {
        let authors: Vec<Author> = client()
            .parse_list(response(200, r#"[{"id":1,"name":"Soyinka"}]"#))
            .unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].name, "Soyinka");
    }

    #[test]
    fn parse_create_wrong_status() {
        let err = client()
            .parse_create::<Author>(response(500, "internal error"))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_forbidden() {
        let err = client()
            .parse_create::<Author>(response(403, r#"{"detail":"CSRF Failed: CSRF token missing."}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { ref body } if body.contains("CSRF")));
    }

    #[test]
    fn parse_get_not_found() {
        let err = client().parse_get::<Author>(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_delete_success() {
        assert!(client().parse_delete(response(204, "")).is_ok());
    }

    #[test]
    fn parse_dashboard_stats_success() {
        let stats = client()
            .parse_dashboard_stats(response(
                200,
                r#"{"customer_count":4,"book_count":10,"debtors_count":1}"#,
            ))
            .unwrap();
        assert_eq!(stats.book_count, 10);
    }

    #[test]
    fn parse_list_bad_json() {
        let err = client().parse_list::<Author>(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn build_insights_is_a_plain_get() {
        let req = client().build_insights();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/insights/");
        assert!(req.body.is_none());
    }

    #[test]
    fn rejected_payment_exposes_server_message() {
        let err = client()
            .parse_record_payment::<serde_json::Value>(response(400, r#"{"error":"Amount is required."}"#))
            .unwrap_err();
        assert_eq!(err.server_message().as_deref(), Some("Amount is required."));

        let err = client()
            .parse_create::<Author>(response(403, r#"{"detail":"CSRF Failed: CSRF token missing."}"#))
            .unwrap_err();
        assert_eq!(err.server_message().as_deref(), Some("CSRF Failed: CSRF token missing."));

        assert_eq!(ApiError::NotFound.server_message(), None);
    }
}
