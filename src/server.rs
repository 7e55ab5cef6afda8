//! HTTP surface: the price query endpoint and a health check

use crate::{query::QueryService, tracker::PriceTracker};
use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state handed to every route handler
pub struct AppState {
    pub query: Arc<QueryService>,
    pub tracker: Arc<PriceTracker>,
    /// Form field holding the requested coin
    pub param: String,
}

/// Builds the router serving price queries on `path` and health on `/health`
pub fn router(state: Arc<AppState>, path: &str) -> Router {
    Router::new()
        .route(path, any(price))
        .route("/health", get(health))
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// `<path>?<param>=<coin>`: cached price of one coin or of all coins
///
/// Any method is accepted. The coin is read from a form-encoded body first,
/// then from the query string. Rejected coins are reported in-band with
/// `"ok": 0` and a 200 status.
async fn price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    body: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let from_body = body.ok().and_then(|Form(mut form)| form.remove(&state.param));
    let requested = from_body
        .or_else(|| query.get(&state.param).cloned())
        .unwrap_or_default();
    let result = state.query.handle(&requested);
    tracing::debug!(
        coin = %requested,
        ok = result.ok,
        entries = result.data.len(),
        "Answered price query"
    );
    render_json(&result)
}

/// `GET /health`: tracker health and upstream metrics
async fn health(State(state): State<Arc<AppState>>) -> Json<crate::types::ComponentHealth> {
    Json(state.tracker.health_check().await)
}

/// Writes `value` as indented JSON, or a plain-text 500 if it cannot be encoded
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Response {
    let mut body = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(b"    "));

    match value.serialize(&mut serializer) {
        Ok(()) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response");
            internal_error("json serialization failed")
        }
    }
}

fn internal_error(msg: &str) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let body = format!(
        "{} {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        msg
    );
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
