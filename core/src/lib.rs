//! Client core of the bookshop admin dashboard.
//!
//! # Overview
//! Prepares requests for the management API and resolves dashboard
//! navigation paths, without touching the network (host-does-IO pattern).
//! The host executes the HTTP round-trip, which keeps the core
//! deterministic and testable.
//!
//! # Design
//! - `ApiClient` is stateless; it holds only its `ClientConfig`.
//! - Cookie state is an argument, never a global: every `prepare` /
//!   `dispatch` call receives the current cookie string and the CSRF
//!   interceptor reads its token from there.
//! - Each API operation is split into `build_*` (produces a request) and
//!   `parse_*` (consumes a response), so the I/O boundary is explicit.
//! - `RouteTable` is compiled once and only read afterwards.

pub mod api;
pub mod client;
pub mod config;
pub mod cookie;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod routes;
pub mod types;

pub use api::Resource;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, RouteError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, Transport};
pub use interceptor::CsrfInterceptor;
pub use routes::{dashboard_routes, RouteEntry, RouteMatch, RouteTable, ViewId};
pub use types::{ApiErrorBody, Author, DashboardStats, NewPayment, Publisher, RouteAxis};
