//! HTTP routes
//!
//! Two route groups under `/api/v25`: the check-in station API and the
//! registration/ticket API. Handlers map every outcome to a status and a
//! plain-text or JSON body; nothing propagates out of a handler.

mod checkin;
mod tickets;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::AppState;

/// Build the router for both route groups
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v25/checkin", post(checkin::redeem))
        .route("/api/v25/checkin/:ticket_code", get(checkin::attendee))
        .route("/api/v25/register", post(tickets::register))
        .route("/api/v25/tickets/resend-all", post(tickets::resend_all))
        // GET takes a ticket code, POST a store record id
        .route(
            "/api/v25/tickets/:id",
            get(tickets::ticket_image).post(tickets::resend_ticket),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
