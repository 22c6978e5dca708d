//! Check-in station routes

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hackreg_core::{CheckInResult, Day, Error, Meal};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::app::AppState;

/// Status for a meal that was already claimed
const ALREADY_CLAIMED: u16 = 250;

/// `POST /api/v25/checkin`
///
/// Body: `{"ticketCode": "...", "day": "Friday", "meal": "Lunch"}` with
/// `meal` optional. Day and meal are checked before the store is touched.
/// A body that is not JSON is a plain 400, whatever its content type.
pub async fn redeem(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Ok(body) = serde_json::from_slice::<Value>(&body) else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };

    let Some(day) = str_field(&body, "day").and_then(|d| d.parse::<Day>().ok()) else {
        return (StatusCode::BAD_REQUEST, "Invalid Day").into_response();
    };

    let meal = match body.get("meal") {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_str().map(str::parse::<Meal>) {
            Some(Ok(meal)) => Some(meal),
            _ => return (StatusCode::BAD_REQUEST, "Invalid Meal").into_response(),
        },
    };

    let Some(ticket_code) = str_field(&body, "ticketCode").filter(|code| !code.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    };

    let result = match meal {
        Some(meal) => state.desk.claim_meal(ticket_code, day, meal).await,
        None => state.desk.check_in(ticket_code, day).await,
    };

    (result_status(&result), result.status).into_response()
}

/// `GET /api/v25/checkin/:ticket_code`
pub async fn attendee(
    State(state): State<Arc<AppState>>,
    Path(ticket_code): Path<String>,
) -> Response {
    match state.desk.attendee(&ticket_code).await {
        Ok(Some(attendee)) => Json(attendee).into_response(),
        Ok(None) | Err(Error::InvalidInput(_)) => {
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
        Err(e) => {
            error!("Lookup of ticket {} failed: {}", ticket_code, e);
            (StatusCode::SERVICE_UNAVAILABLE, "Record store unavailable").into_response()
        }
    }
}

fn str_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

fn result_status(result: &CheckInResult) -> StatusCode {
    if result.success {
        StatusCode::OK
    } else if result.warning {
        StatusCode::from_u16(ALREADY_CLAIMED).unwrap_or(StatusCode::OK)
    } else {
        StatusCode::BAD_REQUEST
    }
}
