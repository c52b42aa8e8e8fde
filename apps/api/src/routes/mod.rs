pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::peer::handlers::handle_peer_discussion;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview page
        .route("/", get(handlers::handle_page))
        .route("/submit", post(handlers::handle_form_submit))
        .route("/retry", post(handlers::handle_form_retry))
        .route("/restart", post(handlers::handle_restart))
        .route("/export", get(handlers::handle_export))
        // Interview JSON API
        .route("/api/session", get(handlers::handle_get_session))
        .route("/api/submit", post(handlers::handle_api_submit))
        .route("/api/retry", post(handlers::handle_api_retry))
        .route("/api/deliverable", get(handlers::handle_deliverable))
        // Peer discussion helper
        .route("/api/peer-discussion", post(handle_peer_discussion))
        .with_state(state)
}
