//! In-memory stand-in for the bookshop management API.
//!
//! Serves the REST collections under `/api/{collection}/`, the invoice
//! payment action and the dashboard counters. State-changing requests must
//! carry an `X-CSRFToken` header equal to the `csrftoken` cookie, otherwise
//! they are rejected with 403 before reaching a handler. The cookie is read
//! with the same decoder the client core uses, so percent-encoded tokens
//! compare equal to the decoded header value.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use bookdesk_core::{cookie, interceptor::DEFAULT_CSRF_COOKIE, ApiErrorBody, DashboardStats};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const CSRF_COOKIE: &str = DEFAULT_CSRF_COOKIE;
pub const CSRF_HEADER: &str = "x-csrftoken";

pub const COLLECTIONS: [&str; 6] = [
    "authors",
    "books",
    "customers",
    "invoices",
    "publishers",
    "route-axes",
];

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    collections: HashMap<String, BTreeMap<u64, Value>>,
}

impl Store {
    fn collection(&mut self, name: &str) -> &mut BTreeMap<u64, Value> {
        self.collections.entry(name.to_string()).or_default()
    }

    fn record(&self, collection: &str, id: u64) -> Option<&Value> {
        self.collections.get(collection)?.get(&id)
    }

    fn count(&self, name: &str) -> usize {
        self.collections.get(name).map_or(0, BTreeMap::len)
    }
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<ApiErrorBody>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let mut api = Router::new()
        .route("/dashboard-stats/", get(dashboard_stats))
        .route("/invoices/{id}/record_payment/", post(record_payment));
    for name in COLLECTIONS {
        api = api
            .route(&format!("/{name}/"), collection_routes(name))
            .route(&format!("/{name}/{{id}}/"), record_routes(name));
    }
    Router::new()
        .nest("/api", api.with_state(db))
        .layer(middleware::from_fn(csrf_protect))
        .layer(TraceLayer::new_for_http())
}

fn collection_routes(name: &'static str) -> MethodRouter<Db> {
    get(move |State(db): State<Db>| list(db, name))
        .post(move |State(db): State<Db>, Json(body): Json<Value>| create(db, name, body))
}

fn record_routes(name: &'static str) -> MethodRouter<Db> {
    get(move |State(db): State<Db>, Path(id): Path<u64>| fetch(db, name, id))
        .put(move |State(db): State<Db>, Path(id): Path<u64>, Json(body): Json<Value>| {
            replace(db, name, id, body)
        })
        .patch(move |State(db): State<Db>, Path(id): Path<u64>, Json(body): Json<Value>| {
            update(db, name, id, body)
        })
        .delete(move |State(db): State<Db>, Path(id): Path<u64>| remove(db, name, id))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "management api listening");
    }
    axum::serve(listener, app()).await
}

async fn csrf_protect(request: Request, next: Next) -> Response {
    let mutating = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(request.method());
    if !mutating {
        return next.run(request).await;
    }
    match csrf_failure(request.headers()) {
        Some(reason) => {
            warn!(method = %request.method(), uri = %request.uri(), reason, "csrf check failed");
            let body = ApiErrorBody {
                detail: Some(format!("CSRF Failed: {reason}")),
                ..ApiErrorBody::default()
            };
            (StatusCode::FORBIDDEN, Json(body)).into_response()
        }
        None => next.run(request).await,
    }
}

fn csrf_failure(headers: &HeaderMap) -> Option<&'static str> {
    let cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(cookie::parse)
        .find(|(name, _)| name == CSRF_COOKIE)
        .map(|(_, value)| value);
    let token = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    match (cookie, token) {
        (None, _) => Some("CSRF cookie not set."),
        (Some(_), None) => Some("CSRF token missing."),
        (Some(cookie), Some(token)) if cookie != token => Some("CSRF token incorrect."),
        _ => None,
    }
}

fn not_found() -> Failure {
    let body = ApiErrorBody {
        detail: Some("Not found.".to_string()),
        ..ApiErrorBody::default()
    };
    (StatusCode::NOT_FOUND, Json(body))
}

fn bad_request(message: impl Into<String>) -> Failure {
    let body = ApiErrorBody {
        error: Some(message.into()),
        ..ApiErrorBody::default()
    };
    (StatusCode::BAD_REQUEST, Json(body))
}

fn object(body: Value) -> Result<Map<String, Value>, Failure> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(bad_request("Expected a JSON object.")),
    }
}

async fn list(db: Db, collection: &'static str) -> Json<Vec<Value>> {
    let store = db.read().await;
    let records = store.collections.get(collection);
    Json(records.map_or_else(Vec::new, |records| records.values().cloned().collect()))
}

async fn create(db: Db, collection: &'static str, body: Value) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut record = object(body)?;
    if collection == "invoices" {
        record.entry("total").or_insert(json!(0.0));
        record.insert("amount_paid".to_string(), json!(0.0));
        record.insert("status".to_string(), json!("UNPAID"));
    }

    let mut store = db.write().await;
    store.next_id += 1;
    let id = store.next_id;
    record.insert("id".to_string(), json!(id));
    let record = Value::Object(record);
    store.collection(collection).insert(id, record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn fetch(db: Db, collection: &'static str, id: u64) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.record(collection, id).cloned().map(Json).ok_or_else(not_found)
}

async fn replace(db: Db, collection: &'static str, id: u64, body: Value) -> Result<Json<Value>, Failure> {
    let mut record = object(body)?;
    let mut store = db.write().await;
    let slot = store.collection(collection).get_mut(&id).ok_or_else(not_found)?;
    record.insert("id".to_string(), json!(id));
    *slot = Value::Object(record);
    Ok(Json(slot.clone()))
}

async fn update(db: Db, collection: &'static str, id: u64, body: Value) -> Result<Json<Value>, Failure> {
    let changes = object(body)?;
    let mut store = db.write().await;
    let slot = store.collection(collection).get_mut(&id).ok_or_else(not_found)?;
    if let Value::Object(record) = slot {
        for (key, value) in changes {
            if key != "id" {
                record.insert(key, value);
            }
        }
    }
    Ok(Json(slot.clone()))
}

async fn remove(db: Db, collection: &'static str, id: u64) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store
        .collection(collection)
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Positive amount from a JSON number or numeric string.
fn payment_amount(amount: Option<&Value>) -> Result<f64, Failure> {
    let parsed = match amount {
        None | Some(Value::Null) => return Err(bad_request("Amount is required.")),
        Some(Value::String(s)) if s.is_empty() => return Err(bad_request("Amount is required.")),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        Some(_) => None,
    };
    match parsed {
        Some(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(bad_request("A valid, positive number is required for the amount.")),
    }
}

async fn record_payment(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PaymentInput>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let invoice = store.collection("invoices").get_mut(&id).ok_or_else(not_found)?;
    let Value::Object(invoice) = invoice else {
        return Err(not_found());
    };

    if invoice.get("status").and_then(Value::as_str) == Some("PAID") {
        return Err(bad_request("This invoice has already been fully paid."));
    }
    let amount = payment_amount(input.amount.as_ref())?;

    let total = invoice.get("total").and_then(Value::as_f64).unwrap_or(0.0);
    let paid_before = invoice.get("amount_paid").and_then(Value::as_f64).unwrap_or(0.0);
    let balance_due = total - paid_before;
    if amount > balance_due {
        return Err(bad_request(format!(
            "Payment amount (₦{amount:.2}) exceeds the balance due (₦{balance_due:.2})."
        )));
    }

    let paid_after = paid_before + amount;
    let status = if paid_after >= total { "PAID" } else { "PARTIALLY_PAID" };
    invoice.insert("amount_paid".to_string(), json!(paid_after));
    invoice.insert("status".to_string(), json!(status));
    let payments = invoice.entry("payments").or_insert_with(|| json!([]));
    if let Value::Array(payments) = payments {
        payments.push(json!({ "amount": amount, "notes": input.notes.unwrap_or_default() }));
    }
    Ok(Json(Value::Object(invoice.clone())))
}

async fn dashboard_stats(State(db): State<Db>) -> Json<DashboardStats> {
    let store = db.read().await;
    let debtors_count = store.collections.get("invoices").map_or(0, |invoices| {
        invoices
            .values()
            .filter(|inv| matches!(inv.get("status").and_then(Value::as_str), Some("UNPAID" | "PARTIALLY_PAID")))
            .count()
    });
    Json(DashboardStats {
        customer_count: store.count("customers") as u64,
        book_count: store.count("books") as u64,
        debtors_count: debtors_count as u64,
    })
}
