//! Registration and ticket delivery routes

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use hackreg_core::Error;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, warn};

use crate::app::AppState;

/// `POST /api/v25/register`
///
/// Accepts the form webhook. The body is read raw so a non-JSON delivery
/// still goes through intake and raises the organizer alert.
pub async fn register(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        warn!(
            "Registration webhook body is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&body)
        );
        Value::Null
    });

    let outcome = state.intake.register(&payload).await;
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
    (status, outcome.message()).into_response()
}

/// `GET /api/v25/tickets/:ticket_code`
///
/// Renders the code on demand; the store is not consulted.
pub async fn ticket_image(
    State(state): State<Arc<AppState>>,
    Path(ticket_code): Path<String>,
) -> Response {
    match state.mailer.render(&ticket_code) {
        Ok(image) => ([(header::CONTENT_TYPE, "image/png")], image.png).into_response(),
        Err(Error::InvalidInput(message)) => (StatusCode::BAD_REQUEST, message).into_response(),
        Err(e) => {
            error!("Rendering ticket {} failed: {}", ticket_code, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went Wrong").into_response()
        }
    }
}

/// `POST /api/v25/tickets/:page_id`
pub async fn resend_ticket(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Response {
    match state.resend.resend_one(&record_id).await {
        Ok(_) => (StatusCode::OK, "Successfully Sent Email").into_response(),
        Err(Error::NotFound(_)) => (StatusCode::NOT_FOUND, "404 ID Not Found").into_response(),
        Err(e) if e.is_rate_limited() => {
            warn!("Resend of {} gave up: {}", record_id, e);
            (StatusCode::TOO_MANY_REQUESTS, "429 Rate Limited").into_response()
        }
        Err(e) => {
            error!("Resend of {} failed: {}", record_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went Wrong").into_response()
        }
    }
}

/// `POST /api/v25/tickets/resend-all`
pub async fn resend_all(State(state): State<Arc<AppState>>) -> Response {
    match state.resend.resend_all().await {
        Ok(processed) => Json(json!({ "processed": processed })).into_response(),
        Err(e) => {
            error!("Bulk resend aborted: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went Wrong").into_response()
        }
    }
}
