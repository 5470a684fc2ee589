//! # HTTP Handlers
//!
//! Thin translation between JSON and `services`. Every failure leaves
//! through [`ApiError`].

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use domains::{AppError, NewFeedback};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::dto::{
    FeedbackRequest, HealthResponse, InboxResponse, SendMessageRequest, SendMessageResponse,
    SentMessageView, SentResponse, StatusResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// `POST /api/messages/send`
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(sender): AuthUser,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    let Json(request) = payload?;

    let outcome = state.messages.send(&sender, request.into()).await?;
    state
        .metrics
        .record_send(outcome.message.message_type, outcome.is_match);

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// `GET /api/messages/inbox`
pub async fn inbox(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<InboxResponse>> {
    let entries = state.messages.inbox(&user.id).await?;
    Ok(Json(InboxResponse::new(entries)))
}

/// `GET /api/messages/sent`
pub async fn sent(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<SentResponse>> {
    let messages = state.messages.sent(&user.id).await?;
    Ok(Json(SentResponse::new(
        messages.into_iter().map(SentMessageView::from).collect(),
    )))
}

/// `DELETE /api/messages/{id}`
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Path(id) = id?;
    state.messages.delete(id, &user.id).await?;
    Ok(Json(StatusResponse::ok("Message deleted")))
}

/// `POST /api/messages/{id}/read`
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Path(id) = id?;
    state.messages.mark_read(id, &user.id).await?;
    Ok(Json(StatusResponse::ok("Message marked as read")))
}

/// `POST /api/feedback`
pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = payload?;
    state
        .feedback
        .submit(NewFeedback { email: request.email, content: request.content })
        .await?;
    Ok(Json(StatusResponse::ok("Thank you for your feedback!")))
}

/// `GET /api/health`
pub async fn not_found() -> (StatusCode, Json<StatusResponse>) {
    (StatusCode::NOT_FOUND, Json(StatusResponse::failure("Route not found")))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "HeartConnect API is running".into(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .render()
        .map_err(|err| AppError::Internal(format!("metrics encoding failed: {err}")))?;
    Ok(([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body))
}
