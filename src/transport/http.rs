//! HTTP surface.
//!
//! Tool endpoints answer 200 even when the envelope reports an error; status
//! codes describe framing only (400 bad body, 404 unknown route, 500 internal).

use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::envelope::Envelope;
use crate::tools::ToolArgs;
use crate::types::{Error, Result};

type AppState = Arc<Dispatcher>;

/// Build the router with CORS applied to every response, fallbacks included.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/fda", query_route("fda_drug_lookup"))
        .route("/api/pubmed", query_route("pubmed_search"))
        .route("/api/health_finder", query_route("health_topics"))
        .route("/api/clinical_trials", query_route("clinical_trials_search"))
        .route("/api/medical_terminology", query_route("lookup_icd_code"))
        .route("/mcp/call-tool", post(call_tool))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(dispatcher)
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn serve(dispatcher: Arc<Dispatcher>, addr: &str, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        session = %dispatcher.session_id(),
        cache_ttl_secs = dispatcher.cache_ttl().as_secs(),
        "http_server_listening"
    );

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("http_server_stopped");
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

async fn health(State(dispatcher): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "session_id": dispatcher.session_id(),
        "cache_ttl_seconds": dispatcher.cache_ttl().as_secs(),
        "uptime_seconds": dispatcher.uptime().as_secs(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// GET endpoint forwarding its query string as the argument bag.
fn query_route(tool: &'static str) -> MethodRouter<AppState> {
    get(
        move |State(dispatcher): State<AppState>, Query(query): Query<Vec<(String, String)>>| {
            dispatch(dispatcher, tool.to_string(), query_args(query))
        },
    )
}

/// Query values stay strings; the tools normalise them. `open_access` is the
/// one flag and is true only for the literal `true`. A repeated key keeps its
/// first value.
fn query_args(query: Vec<(String, String)>) -> ToolArgs {
    let mut args = ToolArgs::new();
    for (name, value) in query {
        if args.contains_key(&name) {
            continue;
        }
        let value = if name == "open_access" {
            Value::Bool(value == "true")
        } else {
            Value::String(value)
        };
        args.insert(name, value);
    }
    args
}

/// Tool name from a POST body. A missing name routes as `undefined` and a
/// non-string one as its JSON text, so both reach the dispatcher as unknown.
fn body_tool_name(body: &ToolArgs) -> String {
    match body.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    }
}

async fn call_tool(
    State(dispatcher): State<AppState>,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body
    };
    let body = match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(body)) => body,
        Ok(_) => return Ok(bad_body("expected a JSON object")),
        Err(err) => return Ok(bad_body(err)),
    };
    let name = body_tool_name(&body);
    let args = match body.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        _ => ToolArgs::new(),
    };

    dispatch(dispatcher, name, args).await
}

/// 400 for a body that is not a JSON object.
fn bad_body(reason: impl std::fmt::Display) -> Response {
    tracing::warn!(error = %reason, "http_bad_body");
    envelope_response(
        StatusCode::BAD_REQUEST,
        &Envelope::error(format!("Invalid JSON body: {reason}")),
    )
}

/// Run one call on its own task so a panicking tool surfaces as a 500
/// instead of tearing down the connection.
async fn dispatch(
    dispatcher: AppState,
    tool: String,
    args: ToolArgs,
) -> std::result::Result<Response, ApiError> {
    let outcome = tokio::spawn(async move { dispatcher.call_tool(&tool, &args).await })
        .await
        .map_err(|e| Error::internal(format!("tool task failed: {e}")))?;
    Ok(envelope_response(StatusCode::OK, &outcome.envelope))
}

async fn not_found() -> Response {
    envelope_response(StatusCode::NOT_FOUND, &Envelope::error("Not Found"))
}

fn envelope_response(status: StatusCode, envelope: &Envelope) -> Response {
    (status, Json(envelope.to_value())).into_response()
}

// =============================================================================
// Middleware & errors
// =============================================================================

async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    apply_cors(response.headers_mut());
    response
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

/// Crate errors reaching the HTTP boundary become a 500 error envelope.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "http_handler_failed");
        envelope_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &Envelope::error(self.0.to_string()),
        )
    }
}
