//! Router assembly and the HTTP middleware stack.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::dto::StatusResponse;
use crate::handlers;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub request_timeout: Duration,
    /// Allowed browser origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            cors_origins: vec!["http://localhost:3000".into()],
        }
    }
}

pub fn router(state: AppState, options: &RouterOptions) -> Router {
    let api = Router::new()
        .route("/messages/send", post(handlers::send_message))
        .route("/messages/inbox", get(handlers::inbox))
        .route("/messages/sent", get(handlers::sent))
        .route("/messages/{id}", delete(handlers::delete_message))
        .route("/messages/{id}/read", post(handlers::mark_read))
        .route("/feedback", post(handlers::submit_feedback))
        .route("/health", get(handlers::health));

    let app = Router::new()
        .nest("/api", api)
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found);

    bounded(app, options.request_timeout)
        .layer(cors_layer(&options.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Applies the request deadline, then gives every bodiless error response
/// (timeouts, unsupported methods) the JSON failure envelope.
fn bounded<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(middleware::map_response(json_error_body))
}

async fn json_error_body(res: Response) -> Response {
    let status = res.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || res.headers().contains_key(header::CONTENT_TYPE) {
        return res;
    }

    let message = status.canonical_reason().unwrap_or("Request failed");
    let allow = res.headers().get(header::ALLOW).cloned();
    let mut json = (status, Json(StatusResponse::failure(message))).into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
